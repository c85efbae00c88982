// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Personal machine bootstrap toolkit.
//!
//! Dotstrap brings a fresh machine up to speed in one unattended run: it
//! installs packages through external package managers, links configuration
//! files out of a dotfiles repository into the places applications expect
//! them, and installs fonts.
//!
//! The interesting part is [`link`], a declarative link manager that can be
//! run over and over again. Everything else is glue around external tools.

pub mod bootstrap;
pub mod config;
pub mod font;
pub mod link;
pub mod package;
pub mod path;
pub mod syscall;
