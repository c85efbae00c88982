// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout for the bootstrap definition file that dotstrap uses to
//! extend its built-in behaviour, and simplify the process of serialization
//! and deserialization.
//!
//! # General Layout
//!
//! A bootstrap definition is composed of three parts: settings, packages, and
//! links. The settings section points dotstrap at the dotfiles repository and
//! font directory. The packages section lists package identifiers per package
//! manager. Each link entry adds (or overrides) one destination in the link
//! table.
//!
//! The definition file is optional. Without it, dotstrap falls back to
//! [`BootstrapDefinition::default`], i.e., built-in links only, no packages,
//! and no fonts.

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs::read_to_string,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Bootstrap definition layout.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct BootstrapDefinition {
    /// General settings.
    #[serde(default)]
    pub settings: Settings,

    /// Packages to install per package manager.
    #[serde(default)]
    pub packages: PackageListing,

    /// Additional link table entries.
    #[serde(rename = "link", default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<LinkEntry>,
}

impl BootstrapDefinition {
    /// Load bootstrap definition from file.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Read`] if file cannot be read.
    /// - Return [`ConfigError::Deserialize`] if file content is not a valid
    ///   definition.
    /// - Return [`ConfigError::ShellExpansion`] if a path field cannot be
    ///   expanded.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        read_to_string(path)
            .map_err(|err| ConfigError::Read {
                source: err,
                path: path.to_path_buf(),
            })?
            .parse()
    }
}

impl FromStr for BootstrapDefinition {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut definition: BootstrapDefinition =
            toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on every path field.
        if let Some(dotfiles) = definition.settings.dotfiles.take() {
            definition.settings.dotfiles = Some(expand(&dotfiles)?);
        }
        if let Some(fonts) = definition.settings.fonts.take() {
            definition.settings.fonts = Some(expand(&fonts)?);
        }
        for entry in &mut definition.links {
            entry.destination = expand(&entry.destination)?;
            entry.source = expand(&entry.source)?;
        }

        Ok(definition)
    }
}

impl Display for BootstrapDefinition {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// General bootstrap settings.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Path to local clone of dotfiles repository.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dotfiles: Option<PathBuf>,

    /// Directory to install font files from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fonts: Option<PathBuf>,

    /// Drop built-in link table, and only use listed link entries.
    pub replace_default_links: bool,
}

/// Package identifiers per package manager.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PackageListing {
    /// Winget package identifiers, e.g., "Git.Git".
    pub winget: Vec<String>,

    /// Scoop package names, e.g., "neovim".
    pub scoop: Vec<String>,
}

/// Single link table entry.
///
/// Relative destinations resolve against the home directory, and relative
/// sources resolve against the dotfiles repository.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct LinkEntry {
    /// Where the link should appear.
    pub destination: PathBuf,

    /// What the link should reflect.
    pub source: PathBuf,
}

fn expand(path: &Path) -> Result<PathBuf> {
    Ok(PathBuf::from(
        shellexpand::full(path.to_string_lossy().as_ref())
            .map_err(ConfigError::ShellExpansion)?
            .into_owned(),
    ))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read definition file.
    #[error("failed to read bootstrap definition at {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
