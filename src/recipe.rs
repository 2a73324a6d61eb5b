// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Deployment recipes.
//!
//! A __recipe__ pairs one file category of a WordPress site with the rsync
//! rules and directories used to move it between the local machine and a
//! remote host. Each category can be pushed, pulled, or synced, i.e., pushed
//! and then pulled.
//!
//! # Categories
//!
//! | category     | directory setting  | filter setting         | base path |
//! |--------------|--------------------|------------------------|-----------|
//! | `wp`         | `paths.wp_dir`     | `filters.wp`           | site root |
//! | `uploads`    | `paths.uploads_dir`| `filters.uploads`      | uploads   |
//! | `plugins`    | `paths.plugins_dir`| `filters.plugins`      | site root |
//! | `mu-plugins` | `paths.mu_plugins_dir` | `filters.mu_plugins` | site root |
//! | `themes`     | `paths.themes_dir` | `filters.themes`       | site root |
//! | `languages`  | `paths.languages_dir` | `filters.languages` | site root |
//!
//! Directories are resolved separately for each side of a transfer, so
//! `[localhost.paths]` and a host's `paths` table can each override `[paths]`.
//!
//! Custom packages each carry their own paths and filter, and the combined
//! `files` recipe runs every category of [`Category::FILES`] followed by the
//! packages. Languages are left out of `files`, they only move on request.

use crate::{
    config::{CategoryPaths, Package, RemoteHost, Settings},
    rsync::{build_options, RsyncConfig},
    sync::{FileSync, Transfer},
};

use std::fmt::{Display, Formatter, Result as FmtResult};
use tracing::{info, instrument, warn};

/// File category of a WordPress site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// WordPress core files.
    Wp,

    /// Media uploads.
    Uploads,

    /// Regular plugins.
    Plugins,

    /// Must-use plugins.
    MuPlugins,

    /// Themes.
    Themes,

    /// Translation files.
    Languages,
}

impl Category {
    /// Every category.
    pub const ALL: [Category; 6] = [
        Category::Wp,
        Category::Uploads,
        Category::Plugins,
        Category::MuPlugins,
        Category::Themes,
        Category::Languages,
    ];

    /// Categories of the combined `files` recipe, in the order they run.
    pub const FILES: [Category; 5] = [
        Category::Wp,
        Category::Uploads,
        Category::Plugins,
        Category::MuPlugins,
        Category::Themes,
    ];

    /// Directory of category inside target paths.
    pub fn dir(self, paths: &CategoryPaths) -> &str {
        match self {
            Category::Wp => &paths.wp_dir,
            Category::Uploads => &paths.uploads_dir,
            Category::Plugins => &paths.plugins_dir,
            Category::MuPlugins => &paths.mu_plugins_dir,
            Category::Themes => &paths.themes_dir,
            Category::Languages => &paths.languages_dir,
        }
    }
}

impl Display for Category {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(match self {
            Category::Wp => "wp",
            Category::Uploads => "uploads",
            Category::Plugins => "plugins",
            Category::MuPlugins => "mu-plugins",
            Category::Themes => "themes",
            Category::Languages => "languages",
        })
    }
}

/// Build rsync options of target category against a set of defaults.
///
/// The category's filter rules replace the default filter list, everything
/// else comes from the defaults.
pub fn category_options(
    settings: &Settings,
    defaults: &RsyncConfig,
    category: Category,
) -> Vec<String> {
    let filters = &settings.filters;
    let filter = match category {
        Category::Wp => &filters.wp,
        Category::Uploads => &filters.uploads,
        Category::Plugins => &filters.plugins,
        Category::MuPlugins => &filters.mu_plugins,
        Category::Themes => &filters.themes,
        Category::Languages => &filters.languages,
    };

    build_options(&RsyncConfig::with_filter(filter.iter().cloned()), defaults)
}

/// Recipe runner for one remote host.
#[derive(Debug)]
pub struct Recipe<'a, T>
where
    T: Transfer,
{
    settings: &'a Settings,
    host: &'a RemoteHost,
    defaults: RsyncConfig,
    transfer: T,
}

impl<'a, T> Recipe<'a, T>
where
    T: Transfer,
{
    /// Construct new recipe runner.
    ///
    /// Uses the `[rsync]` table of the settings as default rsync
    /// configuration.
    pub fn new(settings: &'a Settings, host: &'a RemoteHost, transfer: T) -> Self {
        Self {
            settings,
            host,
            defaults: settings.rsync.clone(),
            transfer,
        }
    }

    /// Replace default rsync configuration.
    pub fn with_defaults(mut self, defaults: RsyncConfig) -> Self {
        self.defaults = defaults;
        self
    }

    /// Rsync options used to transfer target category.
    pub fn options(&self, category: Category) -> Vec<String> {
        category_options(self.settings, &self.defaults, category)
    }

    /// Rsync options used to transfer target package.
    pub fn package_options(&self, package: &Package) -> Vec<String> {
        build_options(
            &RsyncConfig::with_filter(package.filter.iter().cloned()),
            &self.defaults,
        )
    }

    /// Push category from local machine to remote host.
    ///
    /// # Errors
    ///
    /// - Return [`RecipeError::Transfer`] if transfer fails.
    #[instrument(skip(self), fields(host = %self.host.name), level = "debug")]
    pub fn push(&self, category: Category) -> Result<()> {
        info!("push {category} to {}", self.host.name);
        let local = self.settings.local_paths();
        let remote = self.settings.remote_paths(self.host);
        self.file_sync(category).push(
            category.dir(&local),
            category.dir(&remote),
            &self.options(category),
        )?;

        Ok(())
    }

    /// Pull category from remote host to local machine.
    ///
    /// # Errors
    ///
    /// - Return [`RecipeError::Transfer`] if transfer fails.
    #[instrument(skip(self), fields(host = %self.host.name), level = "debug")]
    pub fn pull(&self, category: Category) -> Result<()> {
        info!("pull {category} from {}", self.host.name);
        let local = self.settings.local_paths();
        let remote = self.settings.remote_paths(self.host);
        self.file_sync(category).pull(
            category.dir(&remote),
            category.dir(&local),
            &self.options(category),
        )?;

        Ok(())
    }

    /// Push category, then pull it back.
    ///
    /// # Errors
    ///
    /// - Return [`RecipeError::Transfer`] if either transfer fails.
    pub fn sync(&self, category: Category) -> Result<()> {
        self.push(category)?;
        self.pull(category)
    }

    /// Push every custom package to its remote location.
    ///
    /// Remote package directories are created first if missing.
    ///
    /// # Errors
    ///
    /// - Return [`RecipeError::Transfer`] if any transfer fails.
    #[instrument(skip(self), fields(host = %self.host.name), level = "debug")]
    pub fn push_packages(&self) -> Result<()> {
        if self.settings.packages.is_empty() {
            warn!("no packages configured");
            return Ok(());
        }

        let sync = self.site_sync();
        for package in &self.settings.packages {
            info!("push package {:?} to {}", package.path, self.host.name);
            sync.ensure_remote_dir(&package.remote_path)?;
            sync.push(&package.path, &package.remote_path, &self.package_options(package))?;
        }

        Ok(())
    }

    /// Pull every custom package from its remote location.
    ///
    /// # Errors
    ///
    /// - Return [`RecipeError::Transfer`] if any transfer fails.
    #[instrument(skip(self), fields(host = %self.host.name), level = "debug")]
    pub fn pull_packages(&self) -> Result<()> {
        if self.settings.packages.is_empty() {
            warn!("no packages configured");
            return Ok(());
        }

        let sync = self.site_sync();
        for package in &self.settings.packages {
            info!("pull package {:?} from {}", package.path, self.host.name);
            sync.pull(&package.remote_path, &package.path, &self.package_options(package))?;
        }

        Ok(())
    }

    /// Push packages, then pull them back.
    ///
    /// # Errors
    ///
    /// - Return [`RecipeError::Transfer`] if any transfer fails.
    pub fn sync_packages(&self) -> Result<()> {
        self.push_packages()?;
        self.pull_packages()
    }

    /// Push every category and package, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// - Return [`RecipeError::Transfer`] if any transfer fails.
    pub fn push_files(&self) -> Result<()> {
        for category in Category::FILES {
            self.push(category)?;
        }

        self.push_packages()
    }

    /// Pull every category and package, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// - Return [`RecipeError::Transfer`] if any transfer fails.
    pub fn pull_files(&self) -> Result<()> {
        for category in Category::FILES {
            self.pull(category)?;
        }

        self.pull_packages()
    }

    /// Push all files, then pull them back.
    ///
    /// # Errors
    ///
    /// - Return [`RecipeError::Transfer`] if any transfer fails.
    pub fn sync_files(&self) -> Result<()> {
        self.push_files()?;
        self.pull_files()
    }

    fn site_sync(&self) -> FileSync<&T> {
        FileSync::new(
            self.settings.localhost.base_path(),
            self.host.base_path(),
            &self.transfer,
        )
    }

    fn file_sync(&self, category: Category) -> FileSync<&T> {
        match category {
            Category::Uploads => FileSync::new(
                self.settings.localhost.uploads_base_path(),
                self.host.uploads_base_path(),
                &self.transfer,
            ),
            _ => self.site_sync(),
        }
    }
}

/// All possible error types for recipes.
#[derive(Debug, thiserror::Error)]
pub enum RecipeError {
    /// File transfer fails.
    #[error(transparent)]
    Transfer(#[from] crate::sync::TransferError),
}

/// Friendly result alias :3
type Result<T, E = RecipeError> = std::result::Result<T, E>;
