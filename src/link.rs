// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Declarative link management.
//!
//! A __link table__ maps destination paths to source paths inside the
//! dotfiles repository. Each entry promises that after reconciliation the
//! destination reflects the current content of its source, either through a
//! link of some kind, or through a plain copy when the host refuses to link.
//!
//! # Link Table
//!
//! Destinations are unique keys of the table, and iteration follows insertion
//! order. Sources may repeat, i.e., multiple destinations can fan out from the
//! same source file. The table is built once per invocation from the built-in
//! defaults and the bootstrap definition, and is never mutated while being
//! reconciled.
//!
//! # Link Kinds
//!
//! Windows does not hand out symbolic links to unprivileged users. Thus,
//! dotstrap treats a failing symlink as the expected case, and falls back to
//! whatever the host permits. Directories become junctions, which need no
//! privilege, or recursive copies. Files become symlinks, hard links (same
//! volume only), or byte copies. The kind that worked is never persisted, so
//! a later run may pick a different kind if permissions changed.
//!
//! # See Also
//!
//! 1. [`strategy`] for the fallback chains.
//! 2. [`reconcile`] for the reconciliation procedure.

pub mod fs;
pub mod reconcile;
pub mod strategy;

use crate::{config::BootstrapDefinition, path::PathContext};

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
};

/// Single destination to source pairing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSpec {
    destination: PathBuf,
    source: PathBuf,
}

impl LinkSpec {
    /// Construct new link specification.
    pub fn new(destination: impl Into<PathBuf>, source: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
            source: source.into(),
        }
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn source(&self) -> &Path {
        &self.source
    }
}

impl Display for LinkSpec {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(
            fmt,
            "{} -> {}",
            self.destination.display(),
            self.source.display()
        )
    }
}

/// Mechanism used to make a destination reflect its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    Symlink,
    HardLink,

    /// Windows directory junction.
    Junction,
    Copy,
}

impl Display for LinkKind {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(match self {
            Self::Symlink => "symlink",
            Self::HardLink => "hard link",
            Self::Junction => "junction",
            Self::Copy => "copy",
        })
    }
}

/// Ordered mapping of destinations to sources.
///
/// # Invariant
///
/// - No duplicate destinations.
/// - Insertion of an existing destination replaces its source in place.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LinkTable {
    entries: Vec<LinkSpec>,
}

impl LinkTable {
    /// Construct new empty link table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct built-in link table for given path context.
    pub fn defaults(ctx: &PathContext) -> Self {
        let home = ctx.home();
        let config = ctx.config();
        let local = ctx.local_data();
        let docs = ctx.documents();
        let profile = ctx.source("powershell/profile.ps1");

        [
            (home.join(".gitconfig"), ctx.source("git/gitconfig")),
            (home.join(".wezterm.lua"), ctx.source("wezterm/wezterm.lua")),
            (
                home.join(".config").join("starship.toml"),
                ctx.source("starship/starship.toml"),
            ),
            (
                docs.join("PowerShell").join("Microsoft.PowerShell_profile.ps1"),
                profile.clone(),
            ),
            (
                docs.join("WindowsPowerShell")
                    .join("Microsoft.PowerShell_profile.ps1"),
                profile,
            ),
            (
                local
                    .join("Packages")
                    .join("Microsoft.WindowsTerminal_8wekyb3d8bbwe")
                    .join("LocalState")
                    .join("settings.json"),
                ctx.source("windows-terminal/settings.json"),
            ),
            (local.join("nvim"), ctx.source("nvim")),
            (
                config.join("Code").join("User").join("settings.json"),
                ctx.source("vscode/settings.json"),
            ),
        ]
        .into_iter()
        .map(|(destination, source)| LinkSpec::new(destination, source))
        .collect()
    }

    /// Construct link table from built-ins and bootstrap definition.
    ///
    /// Link entries of the definition are appended to the built-in table,
    /// replacing built-ins with the same destination. Built-ins are skipped
    /// entirely if the definition asks for it.
    pub fn from_definition(ctx: &PathContext, definition: &BootstrapDefinition) -> Self {
        let mut table = if definition.settings.replace_default_links {
            Self::new()
        } else {
            Self::defaults(ctx)
        };

        for entry in &definition.links {
            table.insert(LinkSpec::new(
                ctx.destination(&entry.destination),
                ctx.source(&entry.source),
            ));
        }

        table
    }

    /// Insert link specification.
    ///
    /// Returns previous source of destination if it was already present.
    pub fn insert(&mut self, spec: LinkSpec) -> Option<PathBuf> {
        match self
            .entries
            .iter_mut()
            .find(|entry| entry.destination == spec.destination)
        {
            Some(entry) => Some(std::mem::replace(&mut entry.source, spec.source)),
            None => {
                self.entries.push(spec);
                None
            }
        }
    }

    /// Lookup source of destination.
    pub fn get(&self, destination: impl AsRef<Path>) -> Option<&Path> {
        self.entries
            .iter()
            .find(|entry| entry.destination == destination.as_ref())
            .map(LinkSpec::source)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LinkSpec> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<LinkSpec> for LinkTable {
    fn from_iter<I: IntoIterator<Item = LinkSpec>>(iter: I) -> Self {
        let mut table = Self::new();
        for spec in iter {
            table.insert(spec);
        }

        table
    }
}

impl<'table> IntoIterator for &'table LinkTable {
    type Item = &'table LinkSpec;
    type IntoIter = std::slice::Iter<'table, LinkSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
