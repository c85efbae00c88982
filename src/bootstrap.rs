// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Machine bootstrap orchestration.
//!
//! A full bootstrap installs packages, reconciles the link table, and then
//! installs fonts, in that order. Each step runs regardless of how the
//! previous ones went, and each can be skipped. Failures inside a step are
//! logged and collected into the final [`Summary`], never raised, so an
//! unattended bootstrap always runs to the end.

use crate::{
    config::BootstrapDefinition,
    font::{FontInstaller, FontRegistry, FontReport, HostFontRegistry},
    link::{
        fs::{Filesystem, HostFilesystem},
        reconcile::{Reconciler, Report},
        LinkTable,
    },
    package::{CommandInstaller, InstallReport, PackageInstaller},
    path::PathContext,
};

use indicatif::ProgressBar;
use std::collections::BTreeSet;
use tracing::{error, info, instrument, warn};

/// Toggles for a bootstrap run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapOptions {
    /// Report intended changes without performing them.
    pub dry_run: bool,

    /// Skip link reconciliation.
    pub skip_links: bool,

    /// Skip package installation.
    pub skip_packages: bool,

    /// Skip font installation.
    pub skip_fonts: bool,
}

/// Package installer paired with the identifiers it should install.
pub struct PackageStep {
    pub installer: Box<dyn PackageInstaller>,
    pub ids: BTreeSet<String>,
}

/// Outcome of a bootstrap run.
#[derive(Debug, Default)]
pub struct Summary {
    /// Per package manager reports, by label.
    pub packages: Vec<(String, InstallReport)>,

    /// Link reconciliation report.
    pub links: Option<Report>,

    /// Font installation report.
    pub fonts: Option<FontReport>,
}

/// Bootstrap a machine from a path context and bootstrap definition.
#[derive(Debug, Clone)]
pub struct Bootstrap {
    ctx: PathContext,
    definition: BootstrapDefinition,
    options: BootstrapOptions,
}

impl Bootstrap {
    /// Construct new bootstrap run.
    pub fn new(
        ctx: PathContext,
        definition: BootstrapDefinition,
        options: BootstrapOptions,
    ) -> Self {
        Self {
            ctx,
            definition,
            options,
        }
    }

    /// Link table built from built-ins and bootstrap definition.
    pub fn link_table(&self) -> LinkTable {
        LinkTable::from_definition(&self.ctx, &self.definition)
    }

    /// Package steps for winget and scoop per bootstrap definition.
    pub fn host_package_steps(&self, bar: ProgressBar) -> Vec<PackageStep> {
        let listing = &self.definition.packages;
        [
            (CommandInstaller::winget(), &listing.winget),
            (CommandInstaller::scoop(), &listing.scoop),
        ]
        .into_iter()
        .map(|(installer, ids)| PackageStep {
            installer: Box::new(
                installer
                    .with_dry_run(self.options.dry_run)
                    .with_progress(bar.clone()),
            ),
            ids: ids.iter().cloned().collect(),
        })
        .collect()
    }

    /// Run every step that is not skipped against the host machine.
    pub fn run(&self) -> Summary {
        let steps = self.host_package_steps(ProgressBar::new_spinner());
        self.run_with(steps, HostFilesystem, HostFontRegistry)
    }

    /// Run every step that is not skipped with given capabilities.
    #[instrument(skip_all, level = "debug")]
    pub fn run_with<F, R>(&self, steps: Vec<PackageStep>, fs: F, registry: R) -> Summary
    where
        F: Filesystem,
        R: FontRegistry,
    {
        let mut summary = Summary::default();
        if self.options.dry_run {
            info!("dry run, nothing will be changed");
        }

        if self.options.skip_packages {
            info!("skip package installation");
        } else {
            summary.packages = self.install_packages(steps);
        }

        if self.options.skip_links {
            info!("skip link reconciliation");
        } else {
            summary.links = Some(self.reconcile_links(&fs));
        }

        if self.options.skip_fonts {
            info!("skip font installation");
        } else {
            summary.fonts = self.install_fonts(&fs, registry);
        }

        summary
    }

    /// Install packages of each step.
    pub fn install_packages(&self, steps: Vec<PackageStep>) -> Vec<(String, InstallReport)> {
        let mut reports = Vec::new();
        for step in steps {
            let label = step.installer.label().to_string();
            match step.installer.install(&step.ids) {
                Ok(report) => reports.push((label, report)),
                Err(err) => error!("{err:?}"),
            }
        }

        reports
    }

    /// Reconcile link table.
    pub fn reconcile_links<F>(&self, fs: F) -> Report
    where
        F: Filesystem,
    {
        Reconciler::new(fs)
            .with_dry_run(self.options.dry_run)
            .reconcile_all(&self.link_table())
    }

    /// Install fonts from configured font directory.
    ///
    /// Returns nothing when no font directory is configured.
    pub fn install_fonts<F, R>(&self, fs: F, registry: R) -> Option<FontReport>
    where
        F: Filesystem,
        R: FontRegistry,
    {
        let Some(source) = &self.definition.settings.fonts else {
            info!("no font directory configured");
            return None;
        };

        let source = self.ctx.source(source);
        let installer = FontInstaller::new(fs, registry).with_dry_run(self.options.dry_run);
        match installer.install_dir(&source, self.ctx.fonts()) {
            Ok(report) => Some(report),
            Err(err) => {
                warn!("{err:?}");
                None
            }
        }
    }
}

impl std::fmt::Debug for PackageStep {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt.debug_struct("PackageStep")
            .field("installer", &self.installer.label())
            .field("ids", &self.ids)
            .finish()
    }
}
