// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine relevent path information for the files that dotstrap needs to
//! link, install, or read.
//!
//! # Path Context
//!
//! Nothing in dotstrap reads ambient environment paths directly. Every root
//! directory that a link destination or font location is derived from lives
//! inside a [`PathContext`], which is built once per invocation and handed to
//! whatever needs it. Tests build one with [`PathContext::rooted`] to point
//! everything at a synthetic directory tree.

use std::path::{Path, PathBuf};

/// Determine absolute path to user's home directory.
///
/// Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or(NoWayHome)
}

/// Determine default absolute path to bootstrap definition file.
///
/// Uses `<config_dir>/dotstrap/dotstrap.toml`, where `<config_dir>` is the
/// roaming application data directory on Windows, and `$XDG_CONFIG_HOME` on
/// Linux. Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if configuration directory cannot be determined.
pub fn default_definition_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|path| path.join("dotstrap").join("dotstrap.toml"))
        .ok_or(NoWayHome)
}

/// Root directories that link destinations and font locations derive from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathContext {
    home: PathBuf,
    config: PathBuf,
    local_data: PathBuf,
    documents: PathBuf,
    fonts: PathBuf,
    dotfiles: PathBuf,
}

impl PathContext {
    /// Construct path context from the host's platform directories.
    ///
    /// Dotfiles repository defaults to `~/dotfiles` when not given.
    ///
    /// # Errors
    ///
    /// - Return [`NoWayHome`] if home directory path cannot be determined.
    pub fn from_host(dotfiles: Option<PathBuf>) -> Result<Self> {
        let home = home_dir()?;
        let config = dirs::config_dir().unwrap_or_else(|| home.join(".config"));
        let local_data = dirs::data_local_dir().unwrap_or_else(|| home.join(".local/share"));
        let documents = dirs::document_dir().unwrap_or_else(|| home.join("Documents"));
        let fonts = host_fonts_dir(&home, &local_data);
        let dotfiles = dotfiles.unwrap_or_else(|| home.join("dotfiles"));

        Ok(Self {
            home,
            config,
            local_data,
            documents,
            fonts,
            dotfiles,
        })
    }

    /// Construct path context where every root lives under one directory.
    pub fn rooted(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let home = root.join("home");

        Self {
            config: home.join("AppData").join("Roaming"),
            local_data: home.join("AppData").join("Local"),
            documents: home.join("Documents"),
            fonts: home.join("AppData").join("Local").join("Fonts"),
            dotfiles: root.join("dotfiles"),
            home,
        }
    }

    /// Replace dotfiles repository root.
    pub fn with_dotfiles(mut self, dotfiles: impl Into<PathBuf>) -> Self {
        self.dotfiles = dotfiles.into();
        self
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Roaming configuration directory.
    pub fn config(&self) -> &Path {
        &self.config
    }

    /// Machine-local application data directory.
    pub fn local_data(&self) -> &Path {
        &self.local_data
    }

    pub fn documents(&self) -> &Path {
        &self.documents
    }

    /// Per-user font installation directory.
    pub fn fonts(&self) -> &Path {
        &self.fonts
    }

    pub fn dotfiles(&self) -> &Path {
        &self.dotfiles
    }

    /// Resolve link destination.
    ///
    /// Relative destinations are taken relative to home directory.
    pub fn destination(&self, path: impl AsRef<Path>) -> PathBuf {
        absolute_or(&self.home, path)
    }

    /// Resolve link source.
    ///
    /// Relative sources are taken relative to dotfiles repository.
    pub fn source(&self, path: impl AsRef<Path>) -> PathBuf {
        absolute_or(&self.dotfiles, path)
    }
}

fn absolute_or(base: &Path, path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(windows)]
fn host_fonts_dir(_home: &Path, local_data: &Path) -> PathBuf {
    local_data.join("Microsoft").join("Windows").join("Fonts")
}

#[cfg(not(windows))]
fn host_fonts_dir(home: &Path, _local_data: &Path) -> PathBuf {
    dirs::font_dir().unwrap_or_else(|| home.join(".local/share/fonts"))
}

/// No way to determine user's home directory.
///
/// # See Also
///
/// - [`dirs::home_dir`](https://docs.rs/dirs/latest/dirs/fn.home_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's home directory")]
pub struct NoWayHome;

/// Friendly result alias :3
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rooted_context_keeps_everything_under_root() {
        let ctx = PathContext::rooted("/tmp/box");

        assert_eq!(ctx.home(), Path::new("/tmp/box/home"));
        assert_eq!(ctx.dotfiles(), Path::new("/tmp/box/dotfiles"));
        for path in [ctx.config(), ctx.local_data(), ctx.documents(), ctx.fonts()] {
            assert!(path.starts_with(ctx.home()), "{path:?} escapes home");
        }
    }

    #[test]
    fn relative_paths_resolve_against_their_roots() {
        let ctx = PathContext::rooted("/tmp/box").with_dotfiles("/srv/dots");

        assert_eq!(
            ctx.destination(".gitconfig"),
            PathBuf::from("/tmp/box/home/.gitconfig")
        );
        assert_eq!(
            ctx.source("git/gitconfig"),
            PathBuf::from("/srv/dots/git/gitconfig")
        );
        assert_eq!(ctx.source("/etc/hosts"), PathBuf::from("/etc/hosts"));
    }
}
