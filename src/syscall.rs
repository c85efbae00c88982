// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! External process invocation.
//!
//! Dotstrap leans on a handful of external programs for things the standard
//! library cannot do portably: package managers, `mklink` for directory
//! junctions, and `reg` for font registration. All of them are run
//! non-interactively, because bootstrapping must be able to run unattended.

use std::{
    ffi::{OsStr, OsString},
    io::ErrorKind,
    process::{Command, Stdio},
};
use tracing::{debug, instrument};

/// Run external command to completion without user interaction.
///
/// Standard input is closed, so a program that tries to prompt fails rather
/// than blocking. Output to stdout and stderr is returned together.
///
/// # Errors
///
/// - Return [`SyscallError::Spawn`] if program cannot be started.
/// - Return [`SyscallError::Failed`] if program exits unsuccessfully.
#[instrument(skip(cmd, args), level = "debug")]
pub fn syscall_non_interactive(
    cmd: impl AsRef<OsStr>,
    args: impl IntoIterator<Item = impl AsRef<OsStr>>,
) -> Result<String> {
    let program = cmd.as_ref().to_os_string();
    let args = args
        .into_iter()
        .map(|arg| arg.as_ref().to_os_string())
        .collect::<Vec<_>>();
    debug!("run {program:?} with {args:?}");

    let output = Command::new(&program)
        .args(&args)
        .stdin(Stdio::null())
        .output()
        .map_err(|err| SyscallError::Spawn {
            source: err,
            program: program.clone(),
        })?;
    let stdout = String::from_utf8_lossy(output.stdout.as_slice()).into_owned();
    let stderr = String::from_utf8_lossy(output.stderr.as_slice()).into_owned();
    let mut message = String::new();

    if !stdout.is_empty() {
        message.push_str(format!("stdout: {stdout}").as_str());
    }

    if !stderr.is_empty() {
        message.push_str(format!("stderr: {stderr}").as_str());
    }

    // INVARIANT: Chomp trailing newlines.
    let message = message
        .strip_suffix("\r\n")
        .or(message.strip_suffix('\n'))
        .map(ToString::to_string)
        .unwrap_or(message);

    if !output.status.success() {
        return Err(SyscallError::Failed { program, message });
    }

    Ok(message)
}

/// External process error types.
#[derive(Debug, thiserror::Error)]
pub enum SyscallError {
    /// Program could not be started at all.
    #[error("failed to start {program:?}")]
    Spawn {
        #[source]
        source: std::io::Error,
        program: OsString,
    },

    /// Program ran, but reported failure.
    #[error("command {program:?} failed:\n{message}")]
    Failed { program: OsString, message: String },
}

impl SyscallError {
    /// Program does not exist on this host.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Spawn { source, .. } if source.kind() == ErrorKind::NotFound)
    }
}

impl From<SyscallError> for std::io::Error {
    fn from(error: SyscallError) -> Self {
        match error {
            SyscallError::Spawn { source, .. } => source,
            failed @ SyscallError::Failed { .. } => std::io::Error::other(failed.to_string()),
        }
    }
}

/// Friendly result alias :3
pub type Result<T, E = SyscallError> = std::result::Result<T, E>;

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn captures_stdout() -> anyhow::Result<()> {
        let output = syscall_non_interactive("echo", ["hello"])?;
        assert_eq!(output, "stdout: hello");

        Ok(())
    }

    #[test]
    fn failing_command_reports_failure() {
        let result = syscall_non_interactive("false", Vec::<&str>::new());
        assert!(matches!(result, Err(SyscallError::Failed { .. })));
    }

    #[test]
    fn missing_program_is_not_found() {
        let error = syscall_non_interactive("dotstrap-no-such-program", ["x"]).unwrap_err();
        assert!(error.is_not_found());
    }
}
