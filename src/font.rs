// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Font installation.
//!
//! Fonts are installed per user, so no elevation is required. Installing a
//! font boils down to three steps:
//!
//! 1. Make sure the file actually looks like a font by sniffing its magic
//!    number. Deeper validation is left to the operating system.
//! 2. Copy the file into the per-user fonts directory.
//! 3. Register the copy with the operating system, so applications can see
//!    it without a logout.
//!
//! Each font is handled on its own. One broken font file never stops the
//! rest from being installed.

use crate::link::fs::Filesystem;

use std::{
    fs::{self, File},
    io::{self, Read},
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};

/// Font file extensions that are considered for installation.
pub const FONT_EXTENSIONS: &[&str] = &["ttf", "otf", "ttc"];

/// Font container format, as told by its magic number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontFormat {
    TrueType,
    OpenType,
    Collection,
}

impl FontFormat {
    /// Determine font format from first four bytes of a file.
    pub fn sniff(head: &[u8]) -> Option<Self> {
        match head.get(..4)? {
            &[0x00, 0x01, 0x00, 0x00] | b"true" => Some(Self::TrueType),
            b"OTTO" => Some(Self::OpenType),
            b"ttcf" => Some(Self::Collection),
            _ => None,
        }
    }

    /// Suffix Windows expects on a font's registry value name.
    pub fn registry_suffix(self) -> &'static str {
        match self {
            Self::TrueType | Self::Collection => "(TrueType)",
            Self::OpenType => "(OpenType)",
        }
    }
}

/// Ability to make installed fonts visible to the operating system.
pub trait FontRegistry {
    /// Register installed font file under given face name.
    fn register(&self, face: &str, format: FontFormat, file: &Path) -> io::Result<()>;
}

/// Font registry of the machine dotstrap runs on.
///
/// On Windows, fonts are registered under the current user's font registry
/// key. Elsewhere, dropping the file into the fonts directory is enough.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostFontRegistry;

#[cfg(windows)]
impl FontRegistry for HostFontRegistry {
    fn register(&self, face: &str, format: FontFormat, file: &Path) -> io::Result<()> {
        let value = format!("{face} {}", format.registry_suffix());
        crate::syscall::syscall_non_interactive(
            "reg",
            [
                std::ffi::OsStr::new("add"),
                std::ffi::OsStr::new(r"HKCU\Software\Microsoft\Windows NT\CurrentVersion\Fonts"),
                std::ffi::OsStr::new("/v"),
                std::ffi::OsStr::new(&value),
                std::ffi::OsStr::new("/t"),
                std::ffi::OsStr::new("REG_SZ"),
                std::ffi::OsStr::new("/d"),
                file.as_os_str(),
                std::ffi::OsStr::new("/f"),
            ],
        )
        .map(|_| ())
        .map_err(io::Error::from)
    }
}

#[cfg(not(windows))]
impl FontRegistry for HostFontRegistry {
    fn register(&self, face: &str, _format: FontFormat, file: &Path) -> io::Result<()> {
        debug!("{face} needs no registration at {}", file.display());
        Ok(())
    }
}

/// Record of a font installation run.
#[derive(Debug, Default)]
pub struct FontReport {
    /// Fonts copied and registered, or that would be in dry run mode.
    pub installed: Vec<PathBuf>,

    /// Fonts already present with identical size, only re-registered.
    pub unchanged: Vec<PathBuf>,

    /// Fonts that could not be installed.
    pub failed: Vec<FontError>,
}

/// Install font files from a directory into the per-user fonts directory.
#[derive(Debug)]
pub struct FontInstaller<F, R>
where
    F: Filesystem,
    R: FontRegistry,
{
    fs: F,
    registry: R,
    dry_run: bool,
}

impl<F, R> FontInstaller<F, R>
where
    F: Filesystem,
    R: FontRegistry,
{
    /// Construct new font installer.
    pub fn new(fs: F, registry: R) -> Self {
        Self {
            fs,
            registry,
            dry_run: false,
        }
    }

    /// Toggle dry run mode.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Install every font file found under source directory.
    ///
    /// # Errors
    ///
    /// - Return [`FontError::Pattern`] if source directory cannot be turned
    ///   into a search pattern.
    /// - Return [`FontError::CreateFontsDir`] if fonts directory is missing,
    ///   and cannot be created.
    #[instrument(skip(self, source_dir, fonts_dir), level = "debug")]
    pub fn install_dir(&self, source_dir: &Path, fonts_dir: &Path) -> Result<FontReport> {
        let mut report = FontReport::default();
        let fonts = discover(source_dir)?;
        if fonts.is_empty() {
            warn!("no font files found in {}", source_dir.display());
            return Ok(report);
        }

        if !self.fs.exists(fonts_dir) {
            if self.dry_run {
                info!("would create directory {}", fonts_dir.display());
            } else {
                self.fs
                    .create_dir_all(fonts_dir)
                    .map_err(|err| FontError::CreateFontsDir {
                        source: err,
                        path: fonts_dir.to_path_buf(),
                    })?;
            }
        }

        for font in fonts {
            match self.install_one(&font, fonts_dir) {
                Ok(Installed::Fresh) => report.installed.push(font),
                Ok(Installed::Unchanged) => report.unchanged.push(font),
                Err(err) => {
                    warn!("{err}");
                    report.failed.push(err);
                }
            }
        }
        info!(
            "fonts: {} installed, {} unchanged, {} failed",
            report.installed.len(),
            report.unchanged.len(),
            report.failed.len()
        );

        Ok(report)
    }

    fn install_one(&self, font: &Path, fonts_dir: &Path) -> Result<Installed> {
        let format = sniff_file(font)?;
        let (Some(name), Some(face)) = (font.file_name(), font.file_stem()) else {
            return Err(FontError::Invalid {
                path: font.to_path_buf(),
            });
        };
        let face = face.to_string_lossy();
        let target = fonts_dir.join(name);

        let installed = if same_size(font, &target) {
            debug!("{} already installed", target.display());
            Installed::Unchanged
        } else if self.dry_run {
            info!("would copy {} to {}", font.display(), target.display());
            Installed::Fresh
        } else {
            self.fs
                .copy_file(font, &target)
                .map_err(|err| FontError::Copy {
                    source: err,
                    path: font.to_path_buf(),
                })?;
            Installed::Fresh
        };

        if self.dry_run {
            info!("would register {face} {}", format.registry_suffix());
            return Ok(installed);
        }

        self.registry
            .register(&face, format, &target)
            .map_err(|err| FontError::Register {
                source: err,
                face: face.clone().into_owned(),
            })?;
        info!("installed font {face}");

        Ok(installed)
    }
}

enum Installed {
    Fresh,
    Unchanged,
}

/// Find font files under directory, sorted by path.
fn discover(source_dir: &Path) -> Result<Vec<PathBuf>> {
    let root = glob::Pattern::escape(source_dir.to_string_lossy().as_ref());
    let options = glob::MatchOptions {
        case_sensitive: false,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };
    let mut fonts = Vec::new();

    for extension in FONT_EXTENSIONS {
        let pattern = format!("{root}/**/*.{extension}");
        for entry in glob::glob_with(&pattern, options)? {
            match entry {
                Ok(path) => fonts.push(path),
                Err(err) => warn!("cannot read {}: {err}", err.path().display()),
            }
        }
    }
    fonts.sort();

    Ok(fonts)
}

fn sniff_file(path: &Path) -> Result<FontFormat> {
    let mut head = [0u8; 4];
    File::open(path)
        .and_then(|mut file| file.read_exact(&mut head))
        .map_err(|err| FontError::Read {
            source: err,
            path: path.to_path_buf(),
        })?;

    FontFormat::sniff(&head).ok_or_else(|| FontError::Invalid {
        path: path.to_path_buf(),
    })
}

fn same_size(left: &Path, right: &Path) -> bool {
    match (fs::metadata(left), fs::metadata(right)) {
        (Ok(left), Ok(right)) => left.len() == right.len(),
        _ => false,
    }
}

/// Font installation error types.
#[derive(Debug, thiserror::Error)]
pub enum FontError {
    /// Source directory does not form a valid search pattern.
    #[error(transparent)]
    Pattern(#[from] glob::PatternError),

    /// Fonts directory cannot be created.
    #[error("failed to create fonts directory {:?}", .path.display())]
    CreateFontsDir {
        #[source]
        source: io::Error,
        path: PathBuf,
    },

    /// Font file cannot be read.
    #[error("failed to read font file {:?}", .path.display())]
    Read {
        #[source]
        source: io::Error,
        path: PathBuf,
    },

    /// Font file has no recognizable font magic number.
    #[error("{:?} is not a font file", .path.display())]
    Invalid { path: PathBuf },

    /// Font file cannot be copied into fonts directory.
    #[error("failed to copy font file {:?}", .path.display())]
    Copy {
        #[source]
        source: io::Error,
        path: PathBuf,
    },

    /// Font cannot be registered with the operating system.
    #[error("failed to register font {face}")]
    Register {
        #[source]
        source: io::Error,
        face: String,
    },
}

/// Friendly result alias :3
pub type Result<T, E = FontError> = std::result::Result<T, E>;
