// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine where the deployment configuration lives, and compose the
//! directory paths handed to rsync.

use std::path::PathBuf;

/// Default name of the deployment configuration file.
pub const CONFIG_FILE: &str = "deploy.toml";

/// Determine default absolute path to deployment configuration file.
///
/// Uses `deploy.toml` inside the current working directory. Does not check
/// if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWorkingDir`] if current working directory is unavailable.
pub fn default_config_path() -> Result<PathBuf> {
    std::env::current_dir()
        .map(|path| path.join(CONFIG_FILE))
        .map_err(NoWorkingDir)
}

/// Join base path and relative sub-path into a directory path.
///
/// The result always ends with exactly one trailing slash, which makes rsync
/// synchronize the _contents_ of the directory rather than nesting the
/// directory itself inside the destination. Redundant slashes at the seam are
/// collapsed, and an empty sub-path yields the base itself.
pub fn join_dir(base: impl AsRef<str>, relative: impl AsRef<str>) -> String {
    let base = base.as_ref().trim_end_matches('/');
    let relative = relative.as_ref().trim_matches('/');

    if relative.is_empty() {
        format!("{base}/")
    } else {
        format!("{base}/{relative}/")
    }
}

/// Current working directory cannot be determined.
#[derive(Debug, thiserror::Error)]
#[error("cannot determine current working directory")]
pub struct NoWorkingDir(#[source] std::io::Error);

/// Friendly result alias :3
pub type Result<T, E = NoWorkingDir> = std::result::Result<T, E>;
