// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Link creation fallback chains.
//!
//! Each way of making a destination reflect its source is a [`Strategy`].
//! Strategies are grouped into ordered chains per source type. The
//! reconciler walks a chain front to back, and stops at the first strategy
//! that succeeds. Because chains are plain data, their ordering can be
//! checked without touching the filesystem at all.

use crate::link::{fs::Filesystem, LinkKind};

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    io,
    path::Path,
};

const DIRECTORY_CHAIN: &[Strategy] = &[Strategy::Junction, Strategy::CopyTree];
const FILE_CHAIN: &[Strategy] = &[Strategy::Symlink, Strategy::HardLink, Strategy::CopyFile];

/// Type of source being linked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    File,
    Directory,
}

/// Single attempt at linking a destination to its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Directory junction.
    Junction,

    /// Recursive directory copy.
    CopyTree,

    /// Symbolic link to file.
    Symlink,

    /// Hard link to file, same volume only.
    HardLink,

    /// Byte copy of file.
    CopyFile,
}

impl Strategy {
    /// Ordered fallback chain for source kind.
    pub fn chain(kind: SourceKind) -> &'static [Strategy] {
        match kind {
            SourceKind::Directory => DIRECTORY_CHAIN,
            SourceKind::File => FILE_CHAIN,
        }
    }

    /// Kind of link this strategy produces.
    ///
    /// Junctions only exist on Windows. Elsewhere the junction strategy
    /// creates a directory symlink, and is reported as such.
    pub fn link_kind(self) -> LinkKind {
        match self {
            Self::Junction if cfg!(windows) => LinkKind::Junction,
            Self::Junction => LinkKind::Symlink,
            Self::Symlink => LinkKind::Symlink,
            Self::HardLink => LinkKind::HardLink,
            Self::CopyTree | Self::CopyFile => LinkKind::Copy,
        }
    }

    /// Make one attempt at linking destination to source.
    ///
    /// # Errors
    ///
    /// - Return [`io::Error`] of the underlying filesystem primitive.
    pub fn attempt(
        self,
        fs: &impl Filesystem,
        source: &Path,
        destination: &Path,
    ) -> io::Result<()> {
        match self {
            Self::Junction => fs.junction(source, destination),
            Self::CopyTree => fs.copy_tree(source, destination),
            Self::Symlink => fs.symlink_file(source, destination),
            Self::HardLink => fs.hard_link(source, destination),
            Self::CopyFile => fs.copy_file(source, destination),
        }
    }
}

impl Display for Strategy {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(match self {
            Self::Junction => "junction",
            Self::CopyTree => "recursive copy",
            Self::Symlink => "symlink",
            Self::HardLink => "hard link",
            Self::CopyFile => "file copy",
        })
    }
}
