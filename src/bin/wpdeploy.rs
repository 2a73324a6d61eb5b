// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use wpdeploy::{
    config::Settings,
    path::default_config_path,
    recipe::{category_options, Category, Recipe},
    rsync::{build_options, RsyncConfig},
    sync::RsyncTransfer,
};

use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::{path::PathBuf, process::exit};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "wpdeploy [options] <command> [<target> <host>]",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        let config = match self.global.config.clone() {
            Some(path) => path,
            None => default_config_path()?,
        };
        let settings = Settings::load(config)?;
        let defaults = self.global.defaults(&settings);

        match self.command {
            Command::Push(opts) => run_task(&settings, defaults, &self.global, opts, Task::Push),
            Command::Pull(opts) => run_task(&settings, defaults, &self.global, opts, Task::Pull),
            Command::Sync(opts) => run_task(&settings, defaults, &self.global, opts, Task::Sync),
            Command::Options(opts) => run_options(&settings, defaults, opts),
            Command::Hosts => run_hosts(&settings),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Push files from local machine to remote host.
    #[command(override_usage = "wpdeploy push [options] <target> <host>")]
    Push(TaskOptions),

    /// Pull files from remote host to local machine.
    #[command(override_usage = "wpdeploy pull [options] <target> <host>")]
    Pull(TaskOptions),

    /// Push files to remote host, then pull them back.
    #[command(override_usage = "wpdeploy sync [options] <target> <host>")]
    Sync(TaskOptions),

    /// Show rsync options used for target.
    #[command(override_usage = "wpdeploy options [options] [<target>]")]
    Options(OptionsOptions),

    /// List configured remote hosts.
    #[command(override_usage = "wpdeploy hosts [options]")]
    Hosts,
}

#[derive(Args, Clone, Debug)]
struct GlobalOptions {
    /// Path to deployment configuration file.
    #[arg(short, long, global = true, value_name = "path")]
    pub config: Option<PathBuf>,

    /// Pass verbose flag to rsync, can be repeated.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only show what rsync would transfer.
    #[arg(long, global = true)]
    pub dry_run: bool,
}

impl GlobalOptions {
    fn defaults(&self, settings: &Settings) -> RsyncConfig {
        let mut defaults = settings.rsync.clone();
        for _ in 0..self.verbose {
            defaults.push_option("verbose");
        }

        defaults
    }
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct TaskOptions {
    /// File category to transfer.
    #[arg(required = true, value_enum, value_name = "target")]
    pub target: Target,

    /// Name of remote host from configuration.
    #[arg(required = true, value_name = "host")]
    pub host: String,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct OptionsOptions {
    /// File category to show options of, defaults only if omitted.
    #[arg(value_enum, value_name = "target")]
    pub target: Option<Target>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Target {
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

    /// Custom packages.
    Packages,

    /// Every category except languages, followed by packages.
    Files,
}

impl Target {
    fn category(self) -> Option<Category> {
        match self {
            Target::Wp => Some(Category::Wp),
            Target::Uploads => Some(Category::Uploads),
            Target::Plugins => Some(Category::Plugins),
            Target::MuPlugins => Some(Category::MuPlugins),
            Target::Themes => Some(Category::Themes),
            Target::Languages => Some(Category::Languages),
            Target::Packages | Target::Files => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Task {
    Push,
    Pull,
    Sync,
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_timer(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}

fn run_task(
    settings: &Settings,
    defaults: RsyncConfig,
    global: &GlobalOptions,
    opts: TaskOptions,
    task: Task,
) -> Result<()> {
    let host = settings.host(&opts.host)?;
    let transfer =
        RsyncTransfer::new(host, settings.transfer.clone()).with_dry_run(global.dry_run);
    let recipe = Recipe::new(settings, host, transfer).with_defaults(defaults);

    match (opts.target.category(), opts.target, task) {
        (Some(category), _, Task::Push) => recipe.push(category)?,
        (Some(category), _, Task::Pull) => recipe.pull(category)?,
        (Some(category), _, Task::Sync) => recipe.sync(category)?,
        (None, Target::Packages, Task::Push) => recipe.push_packages()?,
        (None, Target::Packages, Task::Pull) => recipe.pull_packages()?,
        (None, Target::Packages, Task::Sync) => recipe.sync_packages()?,
        (None, _, Task::Push) => recipe.push_files()?,
        (None, _, Task::Pull) => recipe.pull_files()?,
        (None, _, Task::Sync) => recipe.sync_files()?,
    }

    Ok(())
}

fn run_options(settings: &Settings, defaults: RsyncConfig, opts: OptionsOptions) -> Result<()> {
    let options = match opts.target {
        Some(Target::Packages) => {
            for package in &settings.packages {
                println!("# {}", package.path);
                let config = RsyncConfig::with_filter(package.filter.iter().cloned());
                for option in build_options(&config, &defaults) {
                    println!("{option}");
                }
            }
            return Ok(());
        }
        Some(target) => match target.category() {
            Some(category) => category_options(settings, &defaults, category),
            None => {
                for category in Category::FILES {
                    println!("# {category}");
                    for option in category_options(settings, &defaults, category) {
                        println!("{option}");
                    }
                }
                return Ok(());
            }
        },
        None => build_options(&RsyncConfig::default(), &defaults),
    };

    for option in options {
        println!("{option}");
    }

    Ok(())
}

fn run_hosts(settings: &Settings) -> Result<()> {
    for host in &settings.hosts {
        println!(
            "{}\t{}\t{}",
            host.name,
            host.ssh_target(),
            host.base_path()
        );
    }

    Ok(())
}
