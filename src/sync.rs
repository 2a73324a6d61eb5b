// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! File synchronization between the local machine and a remote host.
//!
//! [`FileSync`] composes the local and remote base paths around a relative
//! directory, and hands the actual transfer off to a [`Transfer`]
//! implementation. The default implementation is [`RsyncTransfer`], which
//! runs the system rsync binary over ssh.
//!
//! # Trailing Slashes
//!
//! Both sides of a transfer always end with a slash. Rsync treats
//! `src/ dst/` as "copy the contents of src into dst", whereas `src dst/`
//! would create `dst/src`. Every path that leaves this module is built
//! through [`join_dir`] to keep that convention.

use crate::{
    config::{RemoteHost, TransferSettings},
    path::join_dir,
};

use indicatif::{ProgressBar, ProgressStyle};
use std::{ffi::OsStr, process::Command, time::Duration};
use tracing::{debug, info, instrument};

/// Upload and download primitive.
pub trait Transfer {
    /// Send local source to remote destination.
    fn upload(&self, source: &str, destination: &str, options: &[String]) -> Result<()>;

    /// Fetch remote source into local destination.
    fn download(&self, source: &str, destination: &str, options: &[String]) -> Result<()>;

    /// Make sure a directory exists on the remote host.
    fn ensure_remote_dir(&self, path: &str) -> Result<()>;
}

impl<T> Transfer for &T
where
    T: Transfer + ?Sized,
{
    fn upload(&self, source: &str, destination: &str, options: &[String]) -> Result<()> {
        (**self).upload(source, destination, options)
    }

    fn download(&self, source: &str, destination: &str, options: &[String]) -> Result<()> {
        (**self).download(source, destination, options)
    }

    fn ensure_remote_dir(&self, path: &str) -> Result<()> {
        (**self).ensure_remote_dir(path)
    }
}

/// Directory synchronization between a local and a remote base path.
#[derive(Debug, Clone)]
pub struct FileSync<T>
where
    T: Transfer,
{
    local_base: String,
    remote_base: String,
    transfer: T,
}

impl<T> FileSync<T>
where
    T: Transfer,
{
    /// Construct new file synchronizer.
    pub fn new(local_base: impl Into<String>, remote_base: impl Into<String>, transfer: T) -> Self {
        Self {
            local_base: local_base.into(),
            remote_base: remote_base.into(),
            transfer,
        }
    }

    /// Push local directory to remote directory.
    ///
    /// Both directories are relative to their respective base paths.
    ///
    /// # Errors
    ///
    /// - Return [`TransferError`] if the transfer fails.
    pub fn push(
        &self,
        source: impl AsRef<str>,
        destination: impl AsRef<str>,
        options: &[String],
    ) -> Result<()> {
        let source = join_dir(&self.local_base, source);
        let destination = join_dir(&self.remote_base, destination);
        self.transfer.upload(&source, &destination, options)
    }

    /// Pull remote directory into local directory.
    ///
    /// Both directories are relative to their respective base paths.
    ///
    /// # Errors
    ///
    /// - Return [`TransferError`] if the transfer fails.
    pub fn pull(
        &self,
        source: impl AsRef<str>,
        destination: impl AsRef<str>,
        options: &[String],
    ) -> Result<()> {
        let source = join_dir(&self.remote_base, source);
        let destination = join_dir(&self.local_base, destination);
        self.transfer.download(&source, &destination, options)
    }

    /// Make sure a directory relative to the remote base path exists.
    ///
    /// # Errors
    ///
    /// - Return [`TransferError`] if the directory cannot be created.
    pub fn ensure_remote_dir(&self, path: impl AsRef<str>) -> Result<()> {
        self.transfer
            .ensure_remote_dir(&join_dir(&self.remote_base, path))
    }
}

/// Transfer through the system rsync binary over ssh.
#[derive(Debug, Clone)]
pub struct RsyncTransfer {
    target: String,
    port: Option<u16>,
    settings: TransferSettings,
    dry_run: bool,
}

impl RsyncTransfer {
    /// Construct new rsync transfer to target remote host.
    pub fn new(host: &RemoteHost, settings: TransferSettings) -> Self {
        Self {
            target: host.ssh_target(),
            port: host.port,
            settings,
            dry_run: false,
        }
    }

    /// Only report what would be transferred.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Remote shell command passed to rsync through `-e`.
    ///
    /// Every ssh option stays a single argument once rsync splits the command
    /// back up, the same as it would in [`Self::ssh_args`].
    pub fn remote_shell(&self) -> String {
        let mut shell = vec!["ssh".to_string()];
        if let Some(port) = self.port {
            shell.push("-p".into());
            shell.push(port.to_string());
        }
        shell.extend(self.settings.ssh_options.iter().map(|opt| rsync_quote(opt)));
        shell.join(" ")
    }

    /// Full rsync argument list for a transfer.
    pub fn rsync_args(&self, source: &str, destination: &str, options: &[String]) -> Vec<String> {
        let mut args = Vec::new();
        if !self.settings.flags.is_empty() {
            args.push(format!("-{}", self.settings.flags));
        }
        args.push("-e".into());
        args.push(self.remote_shell());
        if self.settings.timeout > 0 {
            args.push(format!("--timeout={}", self.settings.timeout));
        }
        args.extend(options.iter().cloned());
        if self.dry_run {
            args.push("--dry-run".into());
        }
        args.push(source.into());
        args.push(destination.into());

        args
    }

    /// Address remote path as `[user@]hostname:path`.
    pub fn remote(&self, path: &str) -> String {
        format!("{}:{path}", self.target)
    }

    /// Command creating target directory through the remote login shell.
    ///
    /// A leading `~` is left unquoted so the remote shell expands it.
    pub fn mkdir_command(path: &str) -> String {
        match path.strip_prefix("~/") {
            Some("") => "mkdir -p ~/".into(),
            Some(rest) => format!("mkdir -p ~/{}", shell_quote(rest)),
            None if path == "~" => "mkdir -p ~".into(),
            None => format!("mkdir -p {}", shell_quote(path)),
        }
    }

    fn ssh_args(&self, command: impl Into<String>) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(port) = self.port {
            args.push("-p".into());
            args.push(port.to_string());
        }
        args.extend(self.settings.ssh_options.iter().cloned());
        args.push(self.target.clone());
        args.push(command.into());

        args
    }

    fn run(&self, source: &str, destination: &str, options: &[String]) -> Result<()> {
        let args = self.rsync_args(source, destination, options);
        debug!("rsync {}", args.join(" "));

        let bar = ProgressBar::new_spinner();
        bar.set_style(ProgressStyle::with_template(
            "{spinner:.green} {elapsed_precise:.green}  {msg}",
        )?);
        bar.set_message(format!("{source} -> {destination}"));
        bar.enable_steady_tick(Duration::from_millis(100));
        let output = syscall_non_interactive("rsync", &args);
        bar.finish_and_clear();

        let output = output?;
        if !output.is_empty() {
            info!("{output}");
        }

        Ok(())
    }
}

impl Transfer for RsyncTransfer {
    #[instrument(skip(self, options), level = "debug")]
    fn upload(&self, source: &str, destination: &str, options: &[String]) -> Result<()> {
        info!("push {source:?} to {:?}", self.remote(destination));
        self.run(source, &self.remote(destination), options)
    }

    #[instrument(skip(self, options), level = "debug")]
    fn download(&self, source: &str, destination: &str, options: &[String]) -> Result<()> {
        info!("pull {:?} to {destination:?}", self.remote(source));
        if !self.dry_run {
            mkdirp::mkdirp(destination).map_err(TransferError::LocalDir)?;
        }
        self.run(&self.remote(source), destination, options)
    }

    #[instrument(skip(self), level = "debug")]
    fn ensure_remote_dir(&self, path: &str) -> Result<()> {
        if self.dry_run {
            info!("would create {:?}", self.remote(path));
            return Ok(());
        }

        syscall_non_interactive("ssh", self.ssh_args(Self::mkdir_command(path)))?;
        Ok(())
    }
}

fn is_plain(arg: &str) -> bool {
    !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:@,+%".contains(c))
}

/// Quote argument for a POSIX shell.
fn shell_quote(arg: &str) -> String {
    if is_plain(arg) {
        return arg.into();
    }

    format!("'{}'", arg.replace('\'', r"'\''"))
}

/// Quote argument for rsync's own `-e` command splitting.
///
/// Rsync does not know backslash escapes, a doubled quote inside a quoted
/// word stands for the quote itself.
fn rsync_quote(arg: &str) -> String {
    if is_plain(arg) {
        return arg.into();
    }

    format!("'{}'", arg.replace('\'', "''"))
}

fn syscall_non_interactive(
    cmd: impl AsRef<OsStr>,
    args: impl IntoIterator<Item = impl AsRef<OsStr>>,
) -> Result<String> {
    let output = Command::new(cmd.as_ref()).args(args).output()?;
    let stdout = String::from_utf8_lossy(output.stdout.as_slice()).into_owned();
    let stderr = String::from_utf8_lossy(output.stderr.as_slice()).into_owned();
    let mut message = String::new();

    if !stdout.is_empty() {
        message.push_str(stdout.as_str());
    }

    if !stderr.is_empty() {
        message.push_str(stderr.as_str());
    }

    // INVARIANT: Chomp trailing newlines.
    let message = message.trim_end_matches(['\r', '\n']).to_string();

    if !output.status.success() {
        return Err(TransferError::Syscall(std::io::Error::other(format!(
            "command {:?} failed with {}:\n{message}",
            cmd.as_ref(),
            output.status
        ))));
    }

    Ok(message)
}

/// All possible error types for file transfers.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// External command could not be run, or exited with failure.
    #[error(transparent)]
    Syscall(#[from] std::io::Error),

    /// Local destination directory cannot be created.
    #[error("failed to create local directory")]
    LocalDir(#[source] std::io::Error),

    /// Style template cannot be set for progress bars.
    #[error(transparent)]
    IndicatifStyleTemplate(#[from] indicatif::style::TemplateError),
}

/// Friendly result alias :3
pub type Result<T, E = TransferError> = std::result::Result<T, E>;
