// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! WordPress file deployment through rsync.
//!
//! A WordPress site is made of several file trees that change at different
//! paces: core files, uploads, plugins, mu-plugins, themes, and any custom
//! packages developed alongside the site. Wpdeploy moves each of these trees
//! between a local checkout and one or more remote hosts, with its own rsync
//! filter rules, as described by a `deploy.toml` file.
//!
//! # Layers
//!
//! 1. [`rsync`] turns structured rsync configuration into arguments.
//! 2. [`sync`] composes local and remote directories, and runs the transfer.
//! 3. [`recipe`] ties both to the file categories of a site.
//!
//! # See Also
//!
//! 1. [rsync(1) - FILTER RULES](https://download.samba.org/pub/rsync/rsync.1#FILTER_RULES)
//! 2. [`Settings`](crate::config::Settings)

pub mod config;
pub mod path;
pub mod recipe;
pub mod rsync;
pub mod sync;

pub use config::Settings;
pub use recipe::{Category, Recipe};
pub use rsync::{build_options, RsyncConfig};
pub use sync::{FileSync, RsyncTransfer, Transfer};
