// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Filesystem boundary.
//!
//! Every primitive operation that link reconciliation issues against the host
//! goes through the [`Filesystem`] trait. Each primitive either succeeds, or
//! fails with an [`std::io::Error`] whose kind classifies the failure. The
//! reconciler decides what a failure means, not the primitive.

use std::{
    fs,
    io,
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

/// Primitive filesystem operations used for link reconciliation.
pub trait Filesystem {
    /// Check if anything exists at path, dangling links included.
    fn exists(&self, path: &Path) -> bool;

    /// Check if path resolves to a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Resolve path to its absolute canonical form.
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;

    /// Remove whatever is at path, recursively and forcibly.
    ///
    /// Links are removed as links, never followed.
    fn remove_all(&self, path: &Path) -> io::Result<()>;

    /// Create directory along with any missing ancestors.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Create symbolic link to file.
    fn symlink_file(&self, source: &Path, destination: &Path) -> io::Result<()>;

    /// Create hard link to file.
    fn hard_link(&self, source: &Path, destination: &Path) -> io::Result<()>;

    /// Create directory junction, or the closest unprivileged equivalent.
    fn junction(&self, source: &Path, destination: &Path) -> io::Result<()>;

    /// Copy file content.
    fn copy_file(&self, source: &Path, destination: &Path) -> io::Result<()>;

    /// Copy directory tree recursively.
    fn copy_tree(&self, source: &Path, destination: &Path) -> io::Result<()>;
}

impl<F> Filesystem for &F
where
    F: Filesystem + ?Sized,
{
    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        (**self).is_dir(path)
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        (**self).canonicalize(path)
    }

    fn remove_all(&self, path: &Path) -> io::Result<()> {
        (**self).remove_all(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        (**self).create_dir_all(path)
    }

    fn symlink_file(&self, source: &Path, destination: &Path) -> io::Result<()> {
        (**self).symlink_file(source, destination)
    }

    fn hard_link(&self, source: &Path, destination: &Path) -> io::Result<()> {
        (**self).hard_link(source, destination)
    }

    fn junction(&self, source: &Path, destination: &Path) -> io::Result<()> {
        (**self).junction(source, destination)
    }

    fn copy_file(&self, source: &Path, destination: &Path) -> io::Result<()> {
        (**self).copy_file(source, destination)
    }

    fn copy_tree(&self, source: &Path, destination: &Path) -> io::Result<()> {
        (**self).copy_tree(source, destination)
    }
}

/// Filesystem of the machine dotstrap runs on.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostFilesystem;

impl HostFilesystem {
    /// Construct new host filesystem.
    pub fn new() -> Self {
        Self
    }
}

impl Filesystem for HostFilesystem {
    fn exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        fs::canonicalize(path).map(strip_verbatim)
    }

    fn remove_all(&self, path: &Path) -> io::Result<()> {
        let metadata = fs::symlink_metadata(path)?;
        let file_type = metadata.file_type();

        if file_type.is_symlink() {
            return remove_link(path);
        }

        if file_type.is_dir() {
            make_tree_writable(path)?;
            return fs::remove_dir_all(path);
        }

        make_writable(path, &metadata)?;
        fs::remove_file(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        mkdirp::mkdirp(path).map(|_| ())
    }

    fn symlink_file(&self, source: &Path, destination: &Path) -> io::Result<()> {
        symlink_file(source, destination)
    }

    fn hard_link(&self, source: &Path, destination: &Path) -> io::Result<()> {
        fs::hard_link(source, destination)
    }

    fn junction(&self, source: &Path, destination: &Path) -> io::Result<()> {
        junction(source, destination)
    }

    fn copy_file(&self, source: &Path, destination: &Path) -> io::Result<()> {
        fs::copy(source, destination).map(|_| ())
    }

    fn copy_tree(&self, source: &Path, destination: &Path) -> io::Result<()> {
        for entry in WalkDir::new(source).follow_links(true) {
            let entry = entry?;
            let relative = entry
                .path()
                .strip_prefix(source)
                .map_err(io::Error::other)?;
            let target = destination.join(relative);

            if entry.file_type().is_dir() {
                fs::create_dir_all(&target)?;
            } else {
                fs::copy(entry.path(), &target)?;
            }
        }

        Ok(())
    }
}

#[cfg(unix)]
fn remove_link(path: &Path) -> io::Result<()> {
    fs::remove_file(path)
}

// Directory symlinks and junctions only go away through remove_dir.
#[cfg(windows)]
fn remove_link(path: &Path) -> io::Result<()> {
    fs::remove_file(path).or_else(|_| fs::remove_dir(path))
}

#[cfg(unix)]
fn make_writable(_path: &Path, _metadata: &fs::Metadata) -> io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn make_tree_writable(_root: &Path) -> io::Result<()> {
    Ok(())
}

// Windows refuses to delete read-only files.
#[cfg(windows)]
fn make_writable(path: &Path, metadata: &fs::Metadata) -> io::Result<()> {
    let mut permissions = metadata.permissions();
    if permissions.readonly() {
        #[allow(clippy::permissions_set_readonly_false)]
        permissions.set_readonly(false);
        fs::set_permissions(path, permissions)?;
    }

    Ok(())
}

#[cfg(windows)]
fn make_tree_writable(root: &Path) -> io::Result<()> {
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if entry.file_type().is_file() {
            make_writable(entry.path(), &entry.metadata()?)?;
        }
    }

    Ok(())
}

#[cfg(unix)]
use std::os::unix::fs::symlink as symlink_file;

#[cfg(windows)]
use std::os::windows::fs::symlink_file;

// INVARIANT: Directory symlinks need no privilege outside of Windows.
#[cfg(unix)]
use std::os::unix::fs::symlink as junction;

#[cfg(windows)]
fn junction(source: &Path, destination: &Path) -> io::Result<()> {
    crate::syscall::syscall_non_interactive(
        "cmd",
        [
            std::ffi::OsStr::new("/C"),
            std::ffi::OsStr::new("mklink"),
            std::ffi::OsStr::new("/J"),
            destination.as_os_str(),
            source.as_os_str(),
        ],
    )
    .map(|_| ())
    .map_err(io::Error::from)
}

#[cfg(not(windows))]
fn strip_verbatim(path: PathBuf) -> PathBuf {
    path
}

// Shell tools like mklink choke on verbatim paths.
#[cfg(windows)]
fn strip_verbatim(path: PathBuf) -> PathBuf {
    let stripped = {
        let raw = path.to_string_lossy();
        if let Some(rest) = raw.strip_prefix(r"\\?\UNC\") {
            Some(PathBuf::from(format!(r"\\{rest}")))
        } else {
            raw.strip_prefix(r"\\?\").map(PathBuf::from)
        }
    };

    stripped.unwrap_or(path)
}
