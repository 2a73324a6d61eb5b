// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of the `deploy.toml` file that describes a WordPress
//! site, the hosts it gets deployed to, and how its file trees should be
//! synchronized. File I/O is left to the caller, except for the thin
//! [`Settings::load`] convenience.
//!
//! # General Layout
//!
//! A deployment configuration is composed of the following tables:
//!
//! - `[localhost]`: where the site lives on the local machine.
//! - `[[host]]`: each remote host the site can be deployed to.
//! - `[paths]`: directory of each file category relative to a host's base
//!   path.
//! - `[filters]`: rsync filter rules for each file category.
//! - `[[package]]`: custom packages synchronized to their own location.
//! - `[transfer]`: how rsync itself gets invoked.
//! - `[rsync]`: default [`RsyncConfig`] every transfer builds its options
//!   from.
//!
//! All tables are optional and fall back to sensible WordPress defaults.
//!
//! # Expansion
//!
//! Local paths undergo full shell expansion, i.e., environment variables
//! and a leading tilde are resolved. Remote paths only get environment
//! variables expanded, since a tilde would otherwise resolve to the local
//! user's home directory.

use crate::rsync::RsyncConfig;

use serde::{Deserialize, Deserializer, Serialize};
use std::{
    borrow::Cow,
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs::read_to_string,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::warn;

/// Deployment configuration layout.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct Settings {
    /// Local machine settings.
    #[serde(default)]
    pub localhost: Localhost,

    /// Listing of remote hosts.
    #[serde(default, rename = "host", skip_serializing_if = "Vec::is_empty")]
    pub hosts: Vec<RemoteHost>,

    /// File category directories.
    #[serde(default)]
    pub paths: CategoryPaths,

    /// File category filter rules.
    #[serde(default)]
    pub filters: CategoryFilters,

    /// Listing of custom packages.
    #[serde(default, rename = "package", skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<Package>,

    /// Rsync invocation settings.
    #[serde(default)]
    pub transfer: TransferSettings,

    /// Default rsync configuration.
    #[serde(
        default = "RsyncConfig::recipe_default",
        deserialize_with = "deserialize_rsync"
    )]
    pub rsync: RsyncConfig,
}

impl Settings {
    /// Read and parse configuration file at target path.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Read`] if file cannot be read.
    /// - Return [`ConfigError::Deserialize`] if file content is not valid.
    /// - Return [`ConfigError::ShellExpansion`] if path expansion fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_to_string(path.as_ref()).map_err(|err| ConfigError::Read {
            source: err,
            path: path.as_ref().to_path_buf(),
        })?;

        content.parse()
    }

    /// Category directories on the local machine.
    ///
    /// Keys set in `[localhost.paths]` take precedence over `[paths]`.
    pub fn local_paths(&self) -> CategoryPaths {
        self.localhost.paths.resolve(&self.paths)
    }

    /// Category directories on target remote host.
    ///
    /// Keys set in the host's `paths` table take precedence over `[paths]`.
    pub fn remote_paths(&self, host: &RemoteHost) -> CategoryPaths {
        host.paths.resolve(&self.paths)
    }

    /// Find remote host by name.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::UnknownHost`] if no host has target name.
    pub fn host(&self, name: impl AsRef<str>) -> Result<&RemoteHost> {
        self.hosts
            .iter()
            .find(|host| host.name == name.as_ref())
            .ok_or_else(|| ConfigError::UnknownHost(name.as_ref().into()))
    }

    fn expand(&mut self) -> Result<()> {
        self.localhost.current_path = expand_local(&self.localhost.current_path)?;
        if let Some(path) = self.localhost.uploads_path.as_mut() {
            *path = expand_local(path)?;
        }

        for host in &mut self.hosts {
            host.deploy_path = expand_remote(&host.deploy_path)?;
            if let Some(path) = host.release_path.as_mut() {
                *path = expand_remote(path)?;
            }
            if let Some(path) = host.uploads_path.as_mut() {
                *path = expand_remote(path)?;
            }
        }

        // INVARIANT: Only rule files are read locally, the per-directory name is remote.
        for path in [
            self.rsync.exclude_file.as_mut(),
            self.rsync.include_file.as_mut(),
            self.rsync.filter_file.as_mut(),
        ]
        .into_iter()
        .flatten()
        {
            *path = expand_local(path)?;
        }

        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            localhost: Localhost::default(),
            hosts: Vec::new(),
            paths: CategoryPaths::default(),
            filters: CategoryFilters::default(),
            packages: Vec::new(),
            transfer: TransferSettings::default(),
            rsync: RsyncConfig::recipe_default(),
        }
    }
}

impl FromStr for Settings {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut settings: Settings = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;
        settings.expand()?;

        Ok(settings)
    }
}

impl Display for Settings {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Local machine settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct Localhost {
    /// Document root of the local site.
    pub current_path: String,

    /// Directory containing the uploads directory, if not the document root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploads_path: Option<String>,

    /// Public URL of the local site.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,

    /// Local category directories that differ from `[paths]`.
    #[serde(default, skip_serializing_if = "PathOverrides::is_empty")]
    pub paths: PathOverrides,
}

impl Localhost {
    /// Base path all category directories are relative to.
    pub fn base_path(&self) -> &str {
        &self.current_path
    }

    /// Base path the uploads directory is relative to.
    pub fn uploads_base_path(&self) -> &str {
        self.uploads_path.as_deref().unwrap_or(self.base_path())
    }
}

impl Default for Localhost {
    fn default() -> Self {
        Self {
            current_path: ".".into(),
            uploads_path: None,
            public_url: None,
            paths: PathOverrides::default(),
        }
    }
}

/// Remote host settings.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct RemoteHost {
    /// Name used to select host on command line.
    pub name: String,

    /// Hostname or address to connect to through ssh.
    pub hostname: String,

    /// Remote user to log in as.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// Port the ssh daemon listens on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Root of the deployment on remote host.
    pub deploy_path: String,

    /// Document root of the deployed site, if not the deploy path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_path: Option<String>,

    /// Directory containing the uploads directory, e.g., a shared directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploads_path: Option<String>,

    /// Public URL of the deployed site.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,

    /// Category directories of this host that differ from `[paths]`.
    #[serde(default, skip_serializing_if = "PathOverrides::is_empty")]
    pub paths: PathOverrides,
}

impl RemoteHost {
    /// Base path all category directories are relative to.
    ///
    /// Uses the release path if one is set, otherwise the deploy path.
    pub fn base_path(&self) -> &str {
        self.release_path.as_deref().unwrap_or(&self.deploy_path)
    }

    /// Base path the uploads directory is relative to.
    pub fn uploads_base_path(&self) -> &str {
        self.uploads_path.as_deref().unwrap_or(self.base_path())
    }

    /// Login target in `[user@]hostname` form.
    pub fn ssh_target(&self) -> String {
        match &self.user {
            Some(user) => format!("{user}@{}", self.hostname),
            None => self.hostname.clone(),
        }
    }
}

/// Directory of each file category relative to a host's base path.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CategoryPaths {
    pub wp_dir: String,
    pub uploads_dir: String,
    pub plugins_dir: String,
    pub mu_plugins_dir: String,
    pub themes_dir: String,
    pub languages_dir: String,
}

impl Default for CategoryPaths {
    fn default() -> Self {
        Self {
            wp_dir: "".into(),
            uploads_dir: "wp-content/uploads".into(),
            plugins_dir: "wp-content/plugins".into(),
            mu_plugins_dir: "wp-content/mu-plugins".into(),
            themes_dir: "wp-content/themes".into(),
            languages_dir: "wp-content/languages".into(),
        }
    }
}

/// Per-host overrides of [`CategoryPaths`].
///
/// Lets a local tree use a different layout than the remote one, e.g., a
/// bedrock-style `app/themes` synchronized into a stock `wp-content/themes`.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wp_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploads_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugins_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mu_plugins_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub themes_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub languages_dir: Option<String>,
}

impl PathOverrides {
    /// Apply overrides on top of target paths.
    pub fn resolve(&self, paths: &CategoryPaths) -> CategoryPaths {
        let pick = |over: &Option<String>, base: &String| over.as_ref().unwrap_or(base).clone();
        CategoryPaths {
            wp_dir: pick(&self.wp_dir, &paths.wp_dir),
            uploads_dir: pick(&self.uploads_dir, &paths.uploads_dir),
            plugins_dir: pick(&self.plugins_dir, &paths.plugins_dir),
            mu_plugins_dir: pick(&self.mu_plugins_dir, &paths.mu_plugins_dir),
            themes_dir: pick(&self.themes_dir, &paths.themes_dir),
            languages_dir: pick(&self.languages_dir, &paths.languages_dir),
        }
    }

    /// No category directory is overridden.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Rsync filter rules of each file category.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CategoryFilters {
    pub wp: Vec<String>,
    pub uploads: Vec<String>,
    pub plugins: Vec<String>,
    pub mu_plugins: Vec<String>,
    pub themes: Vec<String>,
    pub languages: Vec<String>,
}

impl Default for CategoryFilters {
    fn default() -> Self {
        Self {
            wp: WP_CORE_FILTER.iter().map(ToString::to_string).collect(),
            uploads: Vec::new(),
            plugins: Vec::new(),
            mu_plugins: Vec::new(),
            themes: Vec::new(),
            languages: Vec::new(),
        }
    }
}

/// WordPress core files, leaving out uploads, themes, plugins, and
/// mu-plugins.
pub const WP_CORE_FILTER: &[&str] = &[
    "+ /wp-content/",
    "- /wp-content/mu-plugins/*",
    "- /wp-content/plugins/*",
    "- /wp-content/themes/*",
    "- /wp-content/uploads/*",
    "- /wp-content/upgrade",
    "- /wp-content/cache",
    "+ /wp-content/**",
    "+ /wp-admin/",
    "+ /wp-admin/**",
    "+ /wp-includes/",
    "+ /wp-includes/**",
    "+ wp-activate.php",
    "+ wp-blog-header.php",
    "+ wp-comments-post.php",
    "+ wp-config-sample.php",
    "+ wp-config.php",
    // Local overrides must be required from wp-config.php instead.
    "- wp-config-local.php",
    "+ wp-cron.php",
    "+ wp-links-opml.php",
    "+ wp-load.php",
    "+ wp-login.php",
    "+ wp-mail.php",
    "+ wp-settings.php",
    "+ wp-signup.php",
    "+ wp-trackback.php",
    "+ xmlrpc.php",
    "+ index.php",
    "- *",
];

/// Custom package synchronized to its own location.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct Package {
    /// Path relative to local base path.
    pub path: String,

    /// Path relative to remote base path.
    pub remote_path: String,

    /// Rsync filter rules of package.
    #[serde(default)]
    pub filter: Vec<String>,
}

/// Settings controlling the rsync invocation itself.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransferSettings {
    /// Short flags passed as one argument, e.g., "rz".
    pub flags: String,

    /// I/O timeout in seconds, zero disables it.
    pub timeout: u64,

    /// Extra arguments for the ssh remote shell.
    pub ssh_options: Vec<String>,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            flags: "rz".into(),
            timeout: 60,
            ssh_options: Vec::new(),
        }
    }
}

fn deserialize_rsync<'de, D>(deserializer: D) -> std::result::Result<RsyncConfig, D::Error>
where
    D: Deserializer<'de>,
{
    let value = toml::Value::deserialize(deserializer)?;
    Ok(value.try_into().unwrap_or_else(|err| {
        warn!("invalid rsync configuration, using fallback: {err}");
        RsyncConfig::fallback()
    }))
}

fn expand_local(path: &str) -> Result<String> {
    Ok(shellexpand::full(path)
        .map_err(ConfigError::ShellExpansion)?
        .into_owned())
}

fn expand_remote(path: &str) -> Result<String> {
    Ok(shellexpand::env(path)
        .map(Cow::into_owned)
        .map_err(ConfigError::ShellExpansion)?)
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read configuration file {path:?}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),

    /// Host name does not match any configured host.
    #[error("no host named {0:?} in configuration")]
    UnknownHost(String),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
