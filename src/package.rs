// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Package manager integration.
//!
//! Dotstrap does not manage packages itself. It hands lists of package
//! identifiers to external package managers through the [`PackageInstaller`]
//! capability, and records what each manager reported back. Nothing else in
//! dotstrap depends on whether, or in which order, packages got installed.

use crate::syscall::{syscall_non_interactive, SyscallError};

use indicatif::{ProgressBar, ProgressStyle};
use std::{collections::BTreeSet, ffi::OsString, time::Duration};
use tracing::{info, instrument, warn};

/// Ability to install packages by identifier.
pub trait PackageInstaller {
    /// Name of the package manager, for logging.
    fn label(&self) -> &str;

    /// Install every package in given set of identifiers.
    ///
    /// Individual package failures are recorded in the returned report, and
    /// never abort installation of the remaining packages.
    ///
    /// # Errors
    ///
    /// - Return [`PackageError::Unavailable`] if the package manager itself
    ///   cannot be run.
    fn install(&self, ids: &BTreeSet<String>) -> Result<InstallReport>;
}

/// Record of a package installation run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// Identifiers installed, or that would be in dry run mode.
    pub installed: Vec<String>,

    /// Identifiers that failed, along with the reason.
    pub failed: Vec<(String, String)>,
}

/// Package installer backed by an external command.
///
/// Runs `<program> <leading args>... <id> <trailing args>...` once per
/// package identifier.
#[derive(Debug, Clone)]
pub struct CommandInstaller {
    label: String,
    program: OsString,
    leading: Vec<OsString>,
    trailing: Vec<OsString>,
    dry_run: bool,
    bar: ProgressBar,
}

impl CommandInstaller {
    /// Construct new command installer.
    pub fn new(
        label: impl Into<String>,
        program: impl Into<OsString>,
        leading: impl IntoIterator<Item = impl Into<OsString>>,
        trailing: impl IntoIterator<Item = impl Into<OsString>>,
    ) -> Self {
        Self {
            label: label.into(),
            program: program.into(),
            leading: leading.into_iter().map(Into::into).collect(),
            trailing: trailing.into_iter().map(Into::into).collect(),
            dry_run: false,
            bar: ProgressBar::hidden(),
        }
    }

    /// Construct installer for winget.
    pub fn winget() -> Self {
        Self::new(
            "winget",
            "winget",
            ["install", "--id"],
            [
                "--exact",
                "--silent",
                "--accept-package-agreements",
                "--accept-source-agreements",
            ],
        )
    }

    /// Construct installer for scoop.
    ///
    /// Scoop is a PowerShell script on Windows, so it is run through the
    /// command interpreter.
    pub fn scoop() -> Self {
        if cfg!(windows) {
            Self::new("scoop", "cmd", ["/C", "scoop", "install"], Vec::<&str>::new())
        } else {
            Self::new("scoop", "scoop", ["install"], Vec::<&str>::new())
        }
    }

    /// Toggle dry run mode.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Show progress through given progress bar.
    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        self.bar = bar;
        self
    }

    fn args_for(&self, id: &str) -> Vec<OsString> {
        let mut args = self.leading.clone();
        args.push(id.into());
        args.extend(self.trailing.iter().cloned());
        args
    }

    fn style_bar(&self) -> Result<()> {
        let style = ProgressStyle::with_template("{elapsed_precise:.green} {spinner} {msg}")?;
        self.bar.set_style(style);
        self.bar.enable_steady_tick(Duration::from_millis(100));

        Ok(())
    }
}

impl PackageInstaller for CommandInstaller {
    fn label(&self) -> &str {
        &self.label
    }

    #[instrument(skip(self, ids), fields(manager = %self.label), level = "debug")]
    fn install(&self, ids: &BTreeSet<String>) -> Result<InstallReport> {
        let mut report = InstallReport::default();
        if ids.is_empty() {
            return Ok(report);
        }

        if self.dry_run {
            for id in ids {
                info!("would run {:?} {:?}", self.program, self.args_for(id));
                report.installed.push(id.clone());
            }
            return Ok(report);
        }

        self.style_bar()?;
        for id in ids {
            self.bar
                .set_message(format!("{}: installing {id}", self.label));
            let output = syscall_non_interactive(&self.program, self.args_for(id));
            match output {
                Ok(_) => {
                    self.bar.suspend(|| info!("{}: installed {id}", self.label));
                    report.installed.push(id.clone());
                }
                Err(err) if err.is_not_found() => {
                    self.bar.finish_and_clear();
                    return Err(PackageError::Unavailable {
                        source: err,
                        label: self.label.clone(),
                    });
                }
                Err(err) => {
                    self.bar
                        .suspend(|| warn!("{}: failed to install {id}: {err}", self.label));
                    report.failed.push((id.clone(), err.to_string()));
                }
            }
        }
        self.bar.finish_and_clear();

        Ok(report)
    }
}

/// Package installation error types.
#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    /// Package manager cannot be run at all.
    #[error("package manager {label} is unavailable")]
    Unavailable {
        #[source]
        source: SyscallError,
        label: String,
    },

    /// Style template cannot be set for progress bars.
    #[error(transparent)]
    IndicatifStyleTemplate(#[from] indicatif::style::TemplateError),
}

/// Friendly result alias :3
pub type Result<T, E = PackageError> = std::result::Result<T, E>;
