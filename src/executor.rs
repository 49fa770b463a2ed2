use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::actions::FileAction;
use crate::validate::same_name_ignoring_case;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("source does not exist: {0}")]
    MissingSource(PathBuf),

    #[error("destination already exists: {0}")]
    DestinationExists(PathBuf),

    #[error("{context} {path}: {source}")]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ExecError {
    fn io(context: &'static str, path: &Path) -> impl FnOnce(io::Error) -> Self {
        let path = path.to_path_buf();
        move |source| ExecError::Io {
            context,
            path,
            source,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExecuteOptions {
    pub dry_run: bool,
    pub verbose: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Performed,
    DryRun,
    Failed(String),
}

impl ActionOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ActionOutcome::Performed => "applied",
            ActionOutcome::DryRun => "dry-run",
            ActionOutcome::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Default)]
pub struct ExecutionReport {
    pub outcomes: Vec<(FileAction, ActionOutcome)>,
}

impl ExecutionReport {
    pub fn count(&self, label: &str) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| outcome.label() == label)
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&FileAction, &str)> {
        self.outcomes.iter().filter_map(|(action, outcome)| match outcome {
            ActionOutcome::Failed(message) => Some((action, message.as_str())),
            _ => None,
        })
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    pub fn print(&self) {
        if self.outcomes.is_empty() {
            return;
        }
        println!(
            "summary: applied={}, dry-run={}, failed={}",
            self.count("applied"),
            self.count("dry-run"),
            self.count("failed")
        );
    }
}

pub fn execute(actions: &[FileAction], options: ExecuteOptions) -> ExecutionReport {
    let mut report = ExecutionReport::default();

    for action in actions {
        if options.dry_run {
            println!("{action}");
            report.outcomes.push((action.clone(), ActionOutcome::DryRun));
            continue;
        }

        let outcome = match perform(action) {
            Ok(()) => {
                if options.verbose {
                    println!("{action}");
                }
                ActionOutcome::Performed
            }
            Err(err) => {
                println!("error: {action}: {err}");
                ActionOutcome::Failed(err.to_string())
            }
        };
        report.outcomes.push((action.clone(), outcome));
    }

    report
}

pub fn perform(action: &FileAction) -> Result<(), ExecError> {
    match action {
        FileAction::Rename {
            source,
            destination,
        } => rename(Path::new(source), Path::new(destination)),
        FileAction::Delete { target } => delete(Path::new(target)),
    }
}

fn rename(source: &Path, destination: &Path) -> Result<(), ExecError> {
    if fs::symlink_metadata(source).is_err() {
        return Err(ExecError::MissingSource(source.to_path_buf()));
    }
    if fs::symlink_metadata(destination).is_ok() && !is_case_alias(source, destination) {
        return Err(ExecError::DestinationExists(destination.to_path_buf()));
    }
    if let Some(parent) = destination.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(ExecError::io("creating directory", parent))?;
        }
    }
    fs::rename(source, destination).map_err(ExecError::io("renaming", source))
}

// The destination only resolves because the filesystem ignores case: no entry
// in the directory carries its exact spelling.
fn is_case_alias(source: &Path, destination: &Path) -> bool {
    if !same_name_ignoring_case(source, destination) {
        return false;
    }
    let Some(name) = destination.file_name() else {
        return false;
    };
    let parent = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    match fs::read_dir(parent) {
        Ok(entries) => !entries
            .filter_map(|entry| entry.ok())
            .any(|entry| entry.file_name() == name),
        Err(_) => false,
    }
}

fn delete(target: &Path) -> Result<(), ExecError> {
    let metadata = fs::symlink_metadata(target)
        .map_err(|_| ExecError::MissingSource(target.to_path_buf()))?;
    // only empty directories; contents are never removed implicitly
    if metadata.is_dir() {
        fs::remove_dir(target).map_err(ExecError::io("removing directory", target))
    } else {
        fs::remove_file(target).map_err(ExecError::io("removing", target))
    }
}
