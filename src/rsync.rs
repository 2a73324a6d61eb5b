// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Rsync option building.
//!
//! Turn a structured [`RsyncConfig`] into the flat list of command-line
//! arguments handed to the rsync binary.
//!
//! # Merging
//!
//! Every operation builds its options from two configurations: a caller
//! supplied override, and the site-wide default loaded from `deploy.toml`.
//! Merging happens per key by whole replacement. If the override defines a
//! key, even as an empty list, the default value of that key is discarded
//! entirely. Lists are never concatenated.
//!
//! # Ordering
//!
//! Rsync evaluates include, exclude, and filter rules in first-match order,
//! so every list keeps the order it was written in. The builder always emits
//! its categories in the same sequence: options, includes, excludes, then
//! filters.
//!
//! # Escaping
//!
//! No escaping is performed here. Each returned string is meant to be one
//! argv entry, so patterns like `*.log` or `my uploads` pass through
//! untouched.

use serde::{Deserialize, Serialize};
use std::{fs::File, path::Path};
use tracing::debug;

/// Structured rsync configuration.
///
/// Every field is optional so that a key left out of an override can be told
/// apart from a key explicitly set to an empty value.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RsyncConfig {
    /// Glob patterns to exclude.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Vec<String>>,

    /// File with additional exclude patterns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_file: Option<String>,

    /// Glob patterns to force include.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include: Option<Vec<String>>,

    /// File with additional include patterns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_file: Option<String>,

    /// Raw rsync filter rules.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Vec<String>>,

    /// File merged as a global filter rule set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_file: Option<String>,

    /// Name of filter file merged on a per-directory basis.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_perdir: Option<String>,

    /// Bare flag names without leading dashes, e.g., "delete-after".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

impl RsyncConfig {
    /// Default used when `deploy.toml` does not define an `[rsync]` table.
    ///
    /// Per-directory `.deployfilter` files are merged, and deletion is
    /// deferred until after the transfer so those filter files reach the
    /// receiving side before anything gets removed.
    pub fn recipe_default() -> Self {
        Self {
            exclude: Some(Vec::new()),
            filter_perdir: Some(".deployfilter".into()),
            options: Some(vec!["delete-after".into()]),
            ..Default::default()
        }
    }

    /// Minimal default used when the configured `[rsync]` value is unusable.
    pub fn fallback() -> Self {
        Self {
            exclude: Some(vec![".git".into()]),
            options: Some(vec!["delete-after".into()]),
            ..Default::default()
        }
    }

    /// Override containing nothing but a filter rule list.
    pub fn with_filter(filter: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            filter: Some(filter.into_iter().map(Into::into).collect()),
            ..Default::default()
        }
    }

    /// Merge this configuration over a set of defaults.
    ///
    /// Keys defined here replace the default key as a whole.
    pub fn merge(&self, defaults: &RsyncConfig) -> RsyncConfig {
        RsyncConfig {
            exclude: self.exclude.clone().or_else(|| defaults.exclude.clone()),
            exclude_file: self
                .exclude_file
                .clone()
                .or_else(|| defaults.exclude_file.clone()),
            include: self.include.clone().or_else(|| defaults.include.clone()),
            include_file: self
                .include_file
                .clone()
                .or_else(|| defaults.include_file.clone()),
            filter: self.filter.clone().or_else(|| defaults.filter.clone()),
            filter_file: self
                .filter_file
                .clone()
                .or_else(|| defaults.filter_file.clone()),
            filter_perdir: self
                .filter_perdir
                .clone()
                .or_else(|| defaults.filter_perdir.clone()),
            options: self.options.clone().or_else(|| defaults.options.clone()),
        }
    }

    /// Append a bare flag to the option list.
    pub fn push_option(&mut self, option: impl Into<String>) {
        self.options.get_or_insert_with(Vec::new).push(option.into());
    }
}

/// Build rsync command-line arguments from a configuration and its defaults.
///
/// Files referenced by `include-file`, `exclude-file`, and `filter-file` are
/// only passed along if they exist locally as readable regular files. Missing
/// files are skipped without error. The per-directory filter name is never
/// checked, since it names a file inside the synced trees.
pub fn build_options(config: &RsyncConfig, defaults: &RsyncConfig) -> Vec<String> {
    let merged = config.merge(defaults);

    let mut args = Vec::new();
    args.extend(build_flags(non_empty(&merged.options)));
    args.extend(build_includes(
        non_empty(&merged.include),
        merged.include_file.as_deref(),
    ));
    args.extend(build_excludes(
        non_empty(&merged.exclude),
        merged.exclude_file.as_deref(),
    ));
    args.extend(build_filters(
        non_empty(&merged.filter),
        merged.filter_file.as_deref(),
        merged.filter_perdir.as_deref(),
    ));

    // INVARIANT: Empty arguments make rsync treat them as paths.
    args.retain(|arg| !arg.is_empty());
    args
}

/// Prefix each bare flag with `--`.
pub fn build_flags<'a>(options: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    options
        .into_iter()
        .map(|option| format!("--{option}"))
        .collect()
}

/// Build `--include` arguments, plus `--include-from` for a usable file.
pub fn build_includes<'a>(
    includes: impl IntoIterator<Item = &'a str>,
    include_file: Option<&str>,
) -> Vec<String> {
    let mut args = includes
        .into_iter()
        .map(|include| format!("--include={include}"))
        .collect::<Vec<_>>();

    if let Some(path) = readable_file(include_file) {
        args.push(format!("--include-from={path}"));
    }

    args
}

/// Build `--exclude` arguments, plus `--exclude-from` for a usable file.
pub fn build_excludes<'a>(
    excludes: impl IntoIterator<Item = &'a str>,
    exclude_file: Option<&str>,
) -> Vec<String> {
    let mut args = excludes
        .into_iter()
        .map(|exclude| format!("--exclude={exclude}"))
        .collect::<Vec<_>>();

    if let Some(path) = readable_file(exclude_file) {
        args.push(format!("--exclude-from={path}"));
    }

    args
}

/// Build `--filter` arguments with optional merge and dir-merge rules.
pub fn build_filters<'a>(
    filters: impl IntoIterator<Item = &'a str>,
    filter_file: Option<&str>,
    filter_perdir: Option<&str>,
) -> Vec<String> {
    let mut args = filters
        .into_iter()
        .map(|filter| format!("--filter={filter}"))
        .collect::<Vec<_>>();

    if let Some(path) = readable_file(filter_file) {
        args.push(format!("--filter=merge {path}"));
    }

    if let Some(name) = filter_perdir.filter(|name| !name.is_empty()) {
        args.push(format!("--filter=dir-merge {name}"));
    }

    args
}

fn non_empty(entries: &Option<Vec<String>>) -> impl Iterator<Item = &str> {
    entries
        .iter()
        .flatten()
        .map(String::as_str)
        .filter(|entry| !entry.is_empty())
}

fn readable_file(path: Option<&str>) -> Option<&str> {
    let path = path.filter(|path| !path.is_empty())?;
    let is_file = Path::new(path)
        .metadata()
        .map(|meta| meta.is_file())
        .unwrap_or(false);

    if is_file && File::open(path).is_ok() {
        Some(path)
    } else {
        debug!("skip unreadable rsync rule file {path:?}");
        None
    }
}
