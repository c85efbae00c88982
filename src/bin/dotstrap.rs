// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use dotstrap::{
    bootstrap::{Bootstrap, BootstrapOptions, Summary},
    config::BootstrapDefinition,
    link::fs::{Filesystem, HostFilesystem},
    path::{default_definition_path, PathContext},
};

use anyhow::Result;
use clap::{Parser, Subcommand};
use indicatif::ProgressBar;
use std::{path::PathBuf, process::exit};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "dotstrap [options] <command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Path to bootstrap definition file.
    #[arg(short, long, global = true, value_name = "path")]
    pub config: Option<PathBuf>,

    /// Path to local clone of dotfiles repository.
    #[arg(long, global = true, value_name = "path")]
    pub dotfiles: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        let definition = load_definition(self.config)?;
        let dotfiles = self.dotfiles.or_else(|| definition.settings.dotfiles.clone());
        let ctx = PathContext::from_host(dotfiles)?;

        match self.command {
            Command::Bootstrap(opts) => run_bootstrap(ctx, definition, opts),
            Command::Link(opts) => run_link(ctx, definition, opts),
            Command::Install(opts) => run_install(ctx, definition, opts),
            Command::Fonts(opts) => run_fonts(ctx, definition, opts),
            Command::Status => run_status(ctx, definition),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Install packages, link dotfiles, and install fonts.
    #[command(override_usage = "dotstrap bootstrap [options]")]
    Bootstrap(BootstrapArgs),

    /// Link dotfiles into place.
    #[command(override_usage = "dotstrap link [options]")]
    Link(DryRunArgs),

    /// Install packages through winget and scoop.
    #[command(override_usage = "dotstrap install [options]")]
    Install(DryRunArgs),

    /// Install fonts from font directory.
    #[command(override_usage = "dotstrap fonts [options]")]
    Fonts(DryRunArgs),

    /// Show link table, and what currently exists at each destination.
    #[command(override_usage = "dotstrap status")]
    Status,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct BootstrapArgs {
    /// Report intended changes without performing them.
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Do not link dotfiles.
    #[arg(long)]
    pub skip_links: bool,

    /// Do not install packages.
    #[arg(long)]
    pub skip_packages: bool,

    /// Do not install fonts.
    #[arg(long)]
    pub skip_fonts: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct DryRunArgs {
    /// Report intended changes without performing them.
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
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

fn load_definition(path: Option<PathBuf>) -> Result<BootstrapDefinition> {
    // INVARIANT: Explicitly requested definition must be readable.
    if let Some(path) = path {
        return Ok(BootstrapDefinition::load(path)?);
    }

    let path = default_definition_path()?;
    if path.exists() {
        info!("use bootstrap definition at {}", path.display());
        Ok(BootstrapDefinition::load(path)?)
    } else {
        info!("no bootstrap definition at {}, use defaults", path.display());
        Ok(BootstrapDefinition::default())
    }
}

fn run_bootstrap(
    ctx: PathContext,
    definition: BootstrapDefinition,
    opts: BootstrapArgs,
) -> Result<()> {
    let options = BootstrapOptions {
        dry_run: opts.dry_run,
        skip_links: opts.skip_links,
        skip_packages: opts.skip_packages,
        skip_fonts: opts.skip_fonts,
    };
    let summary = Bootstrap::new(ctx, definition, options).run();
    report(&summary);

    Ok(())
}

fn run_link(ctx: PathContext, definition: BootstrapDefinition, opts: DryRunArgs) -> Result<()> {
    let bootstrap = Bootstrap::new(
        ctx,
        definition,
        BootstrapOptions {
            dry_run: opts.dry_run,
            ..Default::default()
        },
    );
    let links = bootstrap.reconcile_links(HostFilesystem);
    report(&Summary {
        links: Some(links),
        ..Default::default()
    });

    Ok(())
}

fn run_install(ctx: PathContext, definition: BootstrapDefinition, opts: DryRunArgs) -> Result<()> {
    let bootstrap = Bootstrap::new(
        ctx,
        definition,
        BootstrapOptions {
            dry_run: opts.dry_run,
            ..Default::default()
        },
    );
    let steps = bootstrap.host_package_steps(ProgressBar::new_spinner());
    report(&Summary {
        packages: bootstrap.install_packages(steps),
        ..Default::default()
    });

    Ok(())
}

fn run_fonts(ctx: PathContext, definition: BootstrapDefinition, opts: DryRunArgs) -> Result<()> {
    let bootstrap = Bootstrap::new(
        ctx,
        definition,
        BootstrapOptions {
            dry_run: opts.dry_run,
            ..Default::default()
        },
    );
    let fonts = bootstrap.install_fonts(HostFilesystem, dotstrap::font::HostFontRegistry);
    report(&Summary {
        fonts,
        ..Default::default()
    });

    Ok(())
}

fn run_status(ctx: PathContext, definition: BootstrapDefinition) -> Result<()> {
    let host = HostFilesystem::new();
    let bootstrap = Bootstrap::new(ctx, definition, BootstrapOptions::default());
    for spec in &bootstrap.link_table() {
        let source = if host.exists(spec.source()) {
            "present"
        } else {
            "missing"
        };
        let destination = match std::fs::symlink_metadata(spec.destination()) {
            Ok(meta) if meta.file_type().is_symlink() => "link",
            Ok(meta) if meta.is_dir() => "directory",
            Ok(_) => "file",
            Err(_) => "absent",
        };
        info!("{spec} (source {source}, destination {destination})");
    }

    Ok(())
}

fn report(summary: &Summary) {
    for (label, packages) in &summary.packages {
        info!(
            "{label}: {} installed, {} failed",
            packages.installed.len(),
            packages.failed.len()
        );
        for (id, reason) in &packages.failed {
            warn!("{label}: {id}: {reason}");
        }
    }

    if let Some(links) = &summary.links {
        for entry in links.entries() {
            if let Some(err) = entry.outcome.error() {
                warn!("{}: {err}", entry.spec.destination().display());
            }
        }
    }

    if let Some(fonts) = &summary.fonts {
        for err in &fonts.failed {
            warn!("{err}");
        }
    }
}
