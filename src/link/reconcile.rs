// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Link reconciliation.
//!
//! Reconciliation makes each destination of a link table reflect its source,
//! no matter what currently sits at the destination. The procedure for a
//! single entry goes like so:
//!
//! 1. Canonicalize the source. Missing source? Skip the entry, and leave the
//!    destination alone.
//! 2. Refuse destinations that are the source itself, or one of its
//!    ancestors, since clearing them would destroy the source.
//! 3. Remove whatever exists at the destination.
//! 4. Create the destination's parent directory if it is missing.
//! 5. Walk the fallback chain for the source's type until one strategy works.
//!
//! No step prompts, and no failure is fatal to anything but its own entry.
//! Removal followed by creation is not transactional. Thus, a crash in
//! between can leave no destination at all, which the next run fixes.
//!
//! # Dry Run
//!
//! In dry run mode every mutating step is journaled and logged instead of
//! performed. Read-only steps still run, so a dry run reports what would
//! happen against the real current state of the filesystem. Parent
//! directories that earlier entries would have created count as existing.
//! Since no link is attempted, the first strategy of the fallback chain is
//! reported as the intended one.

use crate::link::{
    fs::{Filesystem, HostFilesystem},
    strategy::{SourceKind, Strategy},
    LinkKind, LinkSpec, LinkTable,
};

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    io,
    path::{Path, PathBuf},
};
use tracing::{debug, error, info, instrument, warn};

/// Reconcile link specifications against a filesystem.
#[derive(Debug, Default)]
pub struct Reconciler<F = HostFilesystem>
where
    F: Filesystem,
{
    fs: F,
    dry_run: bool,
}

impl<F> Reconciler<F>
where
    F: Filesystem,
{
    /// Construct new reconciler.
    pub fn new(fs: F) -> Self {
        Self { fs, dry_run: false }
    }

    /// Toggle dry run mode.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Reconcile every entry of link table in order.
    ///
    /// Every entry is attempted, regardless of how previous entries fared.
    #[instrument(skip(self, table), level = "debug")]
    pub fn reconcile_all(&self, table: &LinkTable) -> Report {
        let mut planned = Vec::new();
        let entries = table
            .iter()
            .map(|spec| self.reconcile_planned(spec, &mut planned))
            .collect::<Vec<_>>();
        let report = Report { entries };
        info!(
            "reconciled {} links: {} linked, {} planned, {} skipped, {} failed",
            report.entries.len(),
            report.linked(),
            report.planned(),
            report.skipped(),
            report.failed(),
        );

        report
    }

    /// Reconcile single link specification.
    pub fn reconcile(&self, spec: &LinkSpec) -> EntryReport {
        self.reconcile_planned(spec, &mut Vec::new())
    }

    // INVARIANT: In dry run mode, planned holds every directory that earlier
    // entries would have created, so existence checks match a real run.
    #[instrument(skip(self, spec, planned), fields(destination = %spec.destination().display()), level = "debug")]
    fn reconcile_planned(&self, spec: &LinkSpec, planned: &mut Vec<PathBuf>) -> EntryReport {
        let mut actions = Vec::new();
        let outcome = match self.try_reconcile(spec, &mut actions, planned) {
            Ok(outcome) => outcome,
            Err(err @ ReconcileError::SourceMissing { .. }) => {
                warn!("skip {}: {err}", spec.destination().display());
                Outcome::Skipped(err)
            }
            Err(err @ ReconcileError::LinkCreationFailed { .. }) => {
                error!("{err}");
                Outcome::Failed(err)
            }
            Err(err) => {
                warn!("abandon {}: {err:?}", spec.destination().display());
                Outcome::Failed(err)
            }
        };

        EntryReport {
            spec: spec.clone(),
            actions,
            outcome,
        }
    }

    fn try_reconcile(
        &self,
        spec: &LinkSpec,
        actions: &mut Vec<Action>,
        planned: &mut Vec<PathBuf>,
    ) -> Result<Outcome> {
        let destination = spec.destination();
        let source =
            self.fs
                .canonicalize(spec.source())
                .map_err(|err| ReconcileError::SourceMissing {
                    source: err,
                    path: spec.source().to_path_buf(),
                })?;
        self.guard_source(&source, destination)?;

        if self.fs.exists(destination) {
            self.mutate(actions, Action::Remove(destination.to_path_buf()), || {
                self.fs.remove_all(destination)
            })
            .map_err(|err| ReconcileError::RemovalFailed {
                source: err,
                path: destination.to_path_buf(),
            })?;
        }

        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            let planned_parent = planned.iter().any(|dir| dir.starts_with(parent));
            if !planned_parent && !self.fs.exists(parent) {
                self.mutate(actions, Action::CreateDir(parent.to_path_buf()), || {
                    self.fs.create_dir_all(parent)
                })
                .map_err(|err| ReconcileError::ParentDirectoryCreationFailed {
                    source: err,
                    path: parent.to_path_buf(),
                })?;

                if self.dry_run {
                    planned.push(parent.to_path_buf());
                }
            }
        }

        let kind = if self.fs.is_dir(&source) {
            SourceKind::Directory
        } else {
            SourceKind::File
        };

        self.link(Strategy::chain(kind), &source, destination, actions)
    }

    fn guard_source(&self, source: &Path, destination: &Path) -> Result<()> {
        let (Some(parent), Some(name)) = (destination.parent(), destination.file_name()) else {
            return Ok(());
        };
        let parent = if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        };

        // INVARIANT: A destination whose parent does not exist cannot contain
        // an existing source.
        let Ok(parent) = self.fs.canonicalize(parent) else {
            return Ok(());
        };

        let resolved = parent.join(name);
        if source.starts_with(&resolved) {
            return Err(ReconcileError::DestinationIsSource {
                destination: destination.to_path_buf(),
                resolved: source.to_path_buf(),
            });
        }

        Ok(())
    }

    fn link(
        &self,
        chain: &[Strategy],
        source: &Path,
        destination: &Path,
        actions: &mut Vec<Action>,
    ) -> Result<Outcome> {
        if self.dry_run {
            if let Some(strategy) = chain.first() {
                let action = Action::Link {
                    kind: strategy.link_kind(),
                    source: source.to_path_buf(),
                    destination: destination.to_path_buf(),
                };
                info!("would {action}");
                actions.push(action);
                return Ok(Outcome::Planned(strategy.link_kind()));
            }
        }

        let mut failures = Vec::new();
        for (index, strategy) in chain.iter().enumerate() {
            match strategy.attempt(&self.fs, source, destination) {
                Ok(()) => {
                    let action = Action::Link {
                        kind: strategy.link_kind(),
                        source: source.to_path_buf(),
                        destination: destination.to_path_buf(),
                    };
                    info!("{action}");
                    actions.push(action);
                    return Ok(Outcome::Linked(strategy.link_kind()));
                }
                Err(err) => {
                    match chain.get(index + 1) {
                        Some(next) => warn!(
                            "{strategy} failed for {}: {err}, trying {next} next",
                            destination.display()
                        ),
                        None => warn!("{strategy} failed for {}: {err}", destination.display()),
                    }
                    failures.push(AttemptFailure {
                        strategy: *strategy,
                        error: err,
                    });
                }
            }
        }

        Err(ReconcileError::LinkCreationFailed {
            destination: destination.to_path_buf(),
            failures,
        })
    }

    fn mutate(
        &self,
        actions: &mut Vec<Action>,
        action: Action,
        operation: impl FnOnce() -> io::Result<()>,
    ) -> io::Result<()> {
        if self.dry_run {
            info!("would {action}");
        } else {
            operation()?;
            debug!("{action}");
        }
        actions.push(action);

        Ok(())
    }
}

/// Mutating step taken, or that would be taken in dry run mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Remove existing destination.
    Remove(PathBuf),

    /// Create missing parent directory.
    CreateDir(PathBuf),

    /// Link destination to source.
    Link {
        kind: LinkKind,
        source: PathBuf,
        destination: PathBuf,
    },
}

impl Display for Action {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Remove(path) => write!(fmt, "remove {}", path.display()),
            Self::CreateDir(path) => write!(fmt, "create directory {}", path.display()),
            Self::Link {
                kind,
                source,
                destination,
            } => write!(
                fmt,
                "link {} to {} via {kind}",
                destination.display(),
                source.display()
            ),
        }
    }
}

/// Result of reconciling a single entry.
#[derive(Debug)]
pub enum Outcome {
    /// Destination now reflects source.
    Linked(LinkKind),

    /// Destination would reflect source outside of dry run mode.
    Planned(LinkKind),

    /// Entry skipped, destination untouched.
    Skipped(ReconcileError),

    /// Entry abandoned.
    Failed(ReconcileError),
}

impl Outcome {
    /// Kind of link that was, or would be, created.
    pub fn link_kind(&self) -> Option<LinkKind> {
        match self {
            Self::Linked(kind) | Self::Planned(kind) => Some(*kind),
            Self::Skipped(_) | Self::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ReconcileError> {
        match self {
            Self::Skipped(err) | Self::Failed(err) => Some(err),
            Self::Linked(_) | Self::Planned(_) => None,
        }
    }
}

/// Reconciliation record of a single link specification.
#[derive(Debug)]
pub struct EntryReport {
    pub spec: LinkSpec,
    pub actions: Vec<Action>,
    pub outcome: Outcome,
}

/// Reconciliation record of an entire link table.
#[derive(Debug, Default)]
pub struct Report {
    entries: Vec<EntryReport>,
}

impl Report {
    pub fn entries(&self) -> &[EntryReport] {
        &self.entries
    }

    /// All actions in order of execution.
    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.entries.iter().flat_map(|entry| entry.actions.iter())
    }

    pub fn linked(&self) -> usize {
        self.count(|outcome| matches!(outcome, Outcome::Linked(_)))
    }

    pub fn planned(&self) -> usize {
        self.count(|outcome| matches!(outcome, Outcome::Planned(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, Outcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, Outcome::Failed(_)))
    }

    fn count(&self, predicate: impl Fn(&Outcome) -> bool) -> usize {
        self.entries
            .iter()
            .filter(|entry| predicate(&entry.outcome))
            .count()
    }
}

/// Failed attempt of a single strategy.
#[derive(Debug)]
pub struct AttemptFailure {
    pub strategy: Strategy,
    pub error: io::Error,
}

impl Display for AttemptFailure {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(fmt, "{}: {}", self.strategy, self.error)
    }
}

fn summarize(failures: &[AttemptFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Link reconciliation error types.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// Source cannot be resolved.
    #[error("source {:?} does not exist", .path.display())]
    SourceMissing {
        #[source]
        source: io::Error,
        path: PathBuf,
    },

    /// Destination is the source, or contains it.
    #[error("destination {:?} would clobber source {:?}", .destination.display(), .resolved.display())]
    DestinationIsSource {
        destination: PathBuf,
        resolved: PathBuf,
    },

    /// Existing destination cannot be removed.
    #[error("failed to remove existing destination {:?}", .path.display())]
    RemovalFailed {
        #[source]
        source: io::Error,
        path: PathBuf,
    },

    /// Parent directory of destination cannot be created.
    #[error("failed to create parent directory {:?}", .path.display())]
    ParentDirectoryCreationFailed {
        #[source]
        source: io::Error,
        path: PathBuf,
    },

    /// Every strategy of the fallback chain failed.
    #[error("failed to link {:?} by any means ({})", .destination.display(), summarize(.failures))]
    LinkCreationFailed {
        destination: PathBuf,
        failures: Vec<AttemptFailure>,
    },
}

/// Friendly result alias :3
type Result<T, E = ReconcileError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;
    use std::{collections::BTreeMap, fs};
    use walkdir::WalkDir;

    /// Host filesystem with selectively denied primitives.
    #[derive(Debug, Default)]
    struct FaultyFilesystem {
        deny_symlink: bool,
        deny_hard_link: bool,
        deny_junction: bool,
        deny_copy_file: bool,
        deny_copy_tree: bool,
        deny_remove: bool,
        deny_create_dir: bool,
    }

    fn denied(deny: bool, op: impl FnOnce() -> io::Result<()>) -> io::Result<()> {
        if deny {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "simulated permission denial",
            ));
        }

        op()
    }

    impl Filesystem for FaultyFilesystem {
        fn exists(&self, path: &Path) -> bool {
            HostFilesystem.exists(path)
        }

        fn is_dir(&self, path: &Path) -> bool {
            HostFilesystem.is_dir(path)
        }

        fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
            HostFilesystem.canonicalize(path)
        }

        fn remove_all(&self, path: &Path) -> io::Result<()> {
            denied(self.deny_remove, || HostFilesystem.remove_all(path))
        }

        fn create_dir_all(&self, path: &Path) -> io::Result<()> {
            denied(self.deny_create_dir, || HostFilesystem.create_dir_all(path))
        }

        fn symlink_file(&self, source: &Path, destination: &Path) -> io::Result<()> {
            denied(self.deny_symlink, || {
                HostFilesystem.symlink_file(source, destination)
            })
        }

        fn hard_link(&self, source: &Path, destination: &Path) -> io::Result<()> {
            denied(self.deny_hard_link, || {
                HostFilesystem.hard_link(source, destination)
            })
        }

        fn junction(&self, source: &Path, destination: &Path) -> io::Result<()> {
            denied(self.deny_junction, || {
                HostFilesystem.junction(source, destination)
            })
        }

        fn copy_file(&self, source: &Path, destination: &Path) -> io::Result<()> {
            denied(self.deny_copy_file, || {
                HostFilesystem.copy_file(source, destination)
            })
        }

        fn copy_tree(&self, source: &Path, destination: &Path) -> io::Result<()> {
            denied(self.deny_copy_tree, || {
                HostFilesystem.copy_tree(source, destination)
            })
        }
    }

    fn root() -> PathBuf {
        std::env::current_dir()
            .and_then(fs::canonicalize)
            .unwrap()
    }

    fn write_file(path: impl AsRef<Path>, contents: &str) {
        let path = path.as_ref();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    /// Listing of every entry under root, with file contents and link targets.
    fn snapshot(root: &Path) -> BTreeMap<PathBuf, String> {
        WalkDir::new(root)
            .into_iter()
            .map(Result::unwrap)
            .map(|entry| {
                let path = entry.path().to_path_buf();
                let state = if entry.path_is_symlink() {
                    format!("link -> {}", fs::read_link(&path).unwrap().display())
                } else if entry.file_type().is_dir() {
                    "dir".to_string()
                } else {
                    format!("file: {}", fs::read_to_string(&path).unwrap())
                };
                (path, state)
            })
            .collect()
    }

    #[cfg(unix)]
    #[sealed_test]
    fn file_source_links_via_symlink() {
        let root = root();
        write_file(root.join("dots/gitconfig"), "[user]");
        let spec = LinkSpec::new(root.join("home/.gitconfig"), root.join("dots/gitconfig"));

        let report = Reconciler::new(HostFilesystem).reconcile(&spec);

        assert_eq!(report.outcome.link_kind(), Some(LinkKind::Symlink));
        assert!(fs::symlink_metadata(root.join("home/.gitconfig"))
            .unwrap()
            .file_type()
            .is_symlink());
        assert_eq!(
            fs::read_to_string(root.join("home/.gitconfig")).unwrap(),
            "[user]"
        );
    }

    #[cfg(unix)]
    #[sealed_test]
    fn directory_source_reports_symlink_outside_windows() {
        let root = root();
        write_file(root.join("dots/nvim/init.lua"), "require('core')");
        let spec = LinkSpec::new(root.join("home/nvim"), root.join("dots/nvim"));

        let report = Reconciler::new(HostFilesystem).reconcile(&spec);

        assert_eq!(report.outcome.link_kind(), Some(LinkKind::Symlink));
        assert!(fs::symlink_metadata(root.join("home/nvim"))
            .unwrap()
            .file_type()
            .is_symlink());
    }

    #[sealed_test]
    fn symlink_denied_falls_back_to_hard_link() {
        let root = root();
        let source = root.join("dots/gitconfig");
        let destination = root.join("home/.gitconfig");
        write_file(&source, "[user]");
        let fs_ = FaultyFilesystem {
            deny_symlink: true,
            ..Default::default()
        };

        let report = Reconciler::new(fs_).reconcile(&LinkSpec::new(&destination, &source));

        assert_eq!(report.outcome.link_kind(), Some(LinkKind::HardLink));
        assert!(!fs::symlink_metadata(&destination)
            .unwrap()
            .file_type()
            .is_symlink());

        // Hard links share content both ways.
        fs::write(&source, "[user]\nname = me").unwrap();
        assert_eq!(
            fs::read_to_string(&destination).unwrap(),
            "[user]\nname = me"
        );
    }

    #[sealed_test]
    fn symlink_and_hard_link_denied_falls_back_to_copy() {
        let root = root();
        let source = root.join("dots/gitconfig");
        let destination = root.join("home/.gitconfig");
        write_file(&source, "[user]");
        let fs_ = FaultyFilesystem {
            deny_symlink: true,
            deny_hard_link: true,
            ..Default::default()
        };

        let report = Reconciler::new(fs_).reconcile(&LinkSpec::new(&destination, &source));

        assert_eq!(report.outcome.link_kind(), Some(LinkKind::Copy));
        assert_eq!(fs::read(&destination).unwrap(), fs::read(&source).unwrap());

        // Copies do not follow later changes.
        fs::write(&source, "changed").unwrap();
        assert_eq!(fs::read_to_string(&destination).unwrap(), "[user]");
    }

    #[sealed_test]
    fn exhausted_file_chain_fails_entry() {
        let root = root();
        let source = root.join("dots/gitconfig");
        let destination = root.join("home/.gitconfig");
        write_file(&source, "[user]");
        let fs_ = FaultyFilesystem {
            deny_symlink: true,
            deny_hard_link: true,
            deny_copy_file: true,
            ..Default::default()
        };

        let report = Reconciler::new(fs_).reconcile(&LinkSpec::new(&destination, &source));

        match report.outcome {
            Outcome::Failed(ReconcileError::LinkCreationFailed { failures, .. }) => {
                let tried = failures.iter().map(|f| f.strategy).collect::<Vec<_>>();
                assert_eq!(
                    tried,
                    vec![Strategy::Symlink, Strategy::HardLink, Strategy::CopyFile]
                );
            }
            outcome => panic!("unexpected outcome {outcome:?}"),
        }
        assert!(!destination.exists());
    }

    #[sealed_test]
    fn junction_denied_copies_directory_tree() {
        let root = root();
        let source = root.join("dots/nvim");
        let destination = root.join("home/AppData/Local/nvim");
        write_file(source.join("init.lua"), "require('core')");
        write_file(source.join("lua/core/init.lua"), "return {}");
        let fs_ = FaultyFilesystem {
            deny_junction: true,
            ..Default::default()
        };

        let report = Reconciler::new(fs_).reconcile(&LinkSpec::new(&destination, &source));

        assert_eq!(report.outcome.link_kind(), Some(LinkKind::Copy));
        assert!(!fs::symlink_metadata(&destination)
            .unwrap()
            .file_type()
            .is_symlink());
        assert_eq!(
            fs::read_to_string(destination.join("init.lua")).unwrap(),
            "require('core')"
        );
        assert_eq!(
            fs::read_to_string(destination.join("lua/core/init.lua")).unwrap(),
            "return {}"
        );
    }

    #[sealed_test]
    fn exhausted_directory_chain_fails_entry() {
        let root = root();
        let source = root.join("dots/nvim");
        let destination = root.join("home/AppData/Local/nvim");
        write_file(source.join("init.lua"), "require('core')");
        let fs_ = FaultyFilesystem {
            deny_junction: true,
            deny_copy_tree: true,
            ..Default::default()
        };

        let report = Reconciler::new(fs_).reconcile(&LinkSpec::new(&destination, &source));

        match report.outcome {
            Outcome::Failed(ReconcileError::LinkCreationFailed { failures, .. }) => {
                let tried = failures.iter().map(|f| f.strategy).collect::<Vec<_>>();
                assert_eq!(tried, vec![Strategy::Junction, Strategy::CopyTree]);
            }
            outcome => panic!("unexpected outcome {outcome:?}"),
        }
        assert!(!destination.exists());
        assert_eq!(
            fs::read_to_string(source.join("init.lua")).unwrap(),
            "require('core')"
        );
    }

    #[sealed_test]
    fn missing_source_leaves_destination_untouched() {
        let root = root();
        let destination = root.join("home/.gitconfig");
        write_file(&destination, "precious");
        let spec = LinkSpec::new(&destination, root.join("dots/missing"));

        let report = Reconciler::new(HostFilesystem).reconcile(&spec);

        assert!(matches!(
            report.outcome,
            Outcome::Skipped(ReconcileError::SourceMissing { .. })
        ));
        assert!(report.actions.is_empty());
        assert_eq!(fs::read_to_string(&destination).unwrap(), "precious");
    }

    #[sealed_test]
    fn reconcile_is_idempotent() {
        let root = root();
        let source = root.join("dots/gitconfig");
        let destination = root.join("home/.gitconfig");
        write_file(&source, "[user]");
        let spec = LinkSpec::new(&destination, &source);
        let reconciler = Reconciler::new(HostFilesystem);

        let first = reconciler.reconcile(&spec);
        let after_first = fs::read(&destination).unwrap();
        let second = reconciler.reconcile(&spec);
        let after_second = fs::read(&destination).unwrap();

        assert!(first.outcome.error().is_none());
        assert!(second.outcome.error().is_none());
        assert_eq!(after_first, after_second);
        assert_eq!(second.actions.first(), Some(&Action::Remove(destination)));
        assert_eq!(fs::read_to_string(&source).unwrap(), "[user]");
    }

    #[sealed_test]
    fn replacing_directory_link_keeps_source_tree() {
        let root = root();
        let source = root.join("dots/nvim");
        let destination = root.join("home/nvim");
        write_file(source.join("init.lua"), "require('core')");
        let spec = LinkSpec::new(&destination, &source);
        let reconciler = Reconciler::new(HostFilesystem);

        reconciler.reconcile(&spec);
        let report = reconciler.reconcile(&spec);

        assert!(report.outcome.error().is_none());
        assert_eq!(
            fs::read_to_string(source.join("init.lua")).unwrap(),
            "require('core')"
        );
        assert_eq!(
            fs::read_to_string(destination.join("init.lua")).unwrap(),
            "require('core')"
        );
    }

    #[sealed_test]
    fn dry_run_changes_nothing_and_journals_real_actions() {
        let root = root();
        write_file(root.join("dots/gitconfig"), "[user]");
        write_file(root.join("dots/nvim/init.lua"), "require('core')");
        write_file(root.join("home/.gitconfig"), "stale");
        let table = [
            LinkSpec::new(root.join("home/.gitconfig"), root.join("dots/gitconfig")),
            LinkSpec::new(root.join("home/AppData/Local/nvim"), root.join("dots/nvim")),
            LinkSpec::new(root.join("home/.missing"), root.join("dots/missing")),
        ]
        .into_iter()
        .collect::<LinkTable>();

        let before = snapshot(&root);
        let dry = Reconciler::new(HostFilesystem)
            .with_dry_run(true)
            .reconcile_all(&table);
        let after = snapshot(&root);
        assert_eq!(before, after);
        assert_eq!(dry.planned(), 2);
        assert_eq!(dry.skipped(), 1);

        let real = Reconciler::new(HostFilesystem).reconcile_all(&table);
        assert_eq!(
            dry.actions().collect::<Vec<_>>(),
            real.actions().collect::<Vec<_>>()
        );
        assert_eq!(
            dry.actions().next(),
            Some(&Action::Remove(root.join("home/.gitconfig")))
        );
    }

    #[sealed_test]
    fn dry_run_counts_directories_planned_by_earlier_entries() {
        let root = root();
        write_file(root.join("dots/a"), "a");
        write_file(root.join("dots/b"), "b");
        write_file(root.join("dots/c"), "c");
        let table = [
            LinkSpec::new(root.join("home/cfg/deep/c"), root.join("dots/c")),
            LinkSpec::new(root.join("home/cfg/a"), root.join("dots/a")),
            LinkSpec::new(root.join("home/cfg/b"), root.join("dots/b")),
        ]
        .into_iter()
        .collect::<LinkTable>();

        let dry = Reconciler::new(HostFilesystem)
            .with_dry_run(true)
            .reconcile_all(&table);
        let real = Reconciler::new(HostFilesystem).reconcile_all(&table);

        assert_eq!(
            dry.actions().collect::<Vec<_>>(),
            real.actions().collect::<Vec<_>>()
        );
        let created = real
            .actions()
            .filter(|action| matches!(action, Action::CreateDir(_)))
            .collect::<Vec<_>>();
        assert_eq!(
            created,
            vec![&Action::CreateDir(root.join("home/cfg/deep"))]
        );
    }

    #[sealed_test]
    fn independent_entries_survive_skips() {
        let root = root();
        write_file(root.join("dots/gitconfig"), "[user]");
        let table = [
            LinkSpec::new(root.join("home/.missing"), root.join("dots/missing")),
            LinkSpec::new(root.join("home/.gitconfig"), root.join("dots/gitconfig")),
        ]
        .into_iter()
        .collect::<LinkTable>();

        let report = Reconciler::new(HostFilesystem).reconcile_all(&table);

        assert_eq!(report.skipped(), 1);
        assert_eq!(report.linked(), 1);
        assert_eq!(
            fs::read_to_string(root.join("home/.gitconfig")).unwrap(),
            "[user]"
        );
    }

    #[sealed_test]
    fn removal_failure_abandons_only_its_entry() {
        let root = root();
        write_file(root.join("dots/a"), "a");
        write_file(root.join("dots/b"), "b");
        write_file(root.join("home/a"), "old a");
        let table = [
            LinkSpec::new(root.join("home/a"), root.join("dots/a")),
            LinkSpec::new(root.join("home/b"), root.join("dots/b")),
        ]
        .into_iter()
        .collect::<LinkTable>();
        let fs_ = FaultyFilesystem {
            deny_remove: true,
            ..Default::default()
        };

        let report = Reconciler::new(fs_).reconcile_all(&table);

        assert!(matches!(
            report.entries()[0].outcome,
            Outcome::Failed(ReconcileError::RemovalFailed { .. })
        ));
        assert_eq!(fs::read_to_string(root.join("home/a")).unwrap(), "old a");
        assert_eq!(fs::read_to_string(root.join("home/b")).unwrap(), "b");
    }

    #[sealed_test]
    fn parent_creation_failure_abandons_entry() {
        let root = root();
        write_file(root.join("dots/a"), "a");
        let fs_ = FaultyFilesystem {
            deny_create_dir: true,
            ..Default::default()
        };

        let report = Reconciler::new(fs_)
            .reconcile(&LinkSpec::new(root.join("home/deep/a"), root.join("dots/a")));

        assert!(matches!(
            report.outcome,
            Outcome::Failed(ReconcileError::ParentDirectoryCreationFailed { .. })
        ));
    }

    #[sealed_test]
    fn destination_containing_source_is_refused() {
        let root = root();
        write_file(root.join("dots/git/gitconfig"), "[user]");

        let report = Reconciler::new(HostFilesystem).reconcile(&LinkSpec::new(
            root.join("dots"),
            root.join("dots/git/gitconfig"),
        ));

        assert!(matches!(
            report.outcome,
            Outcome::Failed(ReconcileError::DestinationIsSource { .. })
        ));
        assert_eq!(
            fs::read_to_string(root.join("dots/git/gitconfig")).unwrap(),
            "[user]"
        );
    }
}
