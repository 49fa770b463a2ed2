use similar::{Algorithm, DiffTag, capture_diff_slices};
use thiserror::Error;

use crate::actions::FileAction;

pub const DELETE_SENTINEL: &str = "//";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error(
        "line count changed from {original} to {edited}; lines must not be added or removed \
         (prefix a line with '//' to delete a file)"
    )]
    CountMismatch { original: usize, edited: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Line,
    Diff,
}

impl Mode {
    pub fn reconcile(
        self,
        original: &[String],
        edited: &[String],
    ) -> Result<Vec<FileAction>, ReconcileError> {
        match self {
            Mode::Line => reconcile(original, edited),
            Mode::Diff => Ok(reconcile_diff(original, edited)),
        }
    }
}

pub fn is_delete_marker(line: &str) -> bool {
    line.starts_with(DELETE_SENTINEL)
}

pub fn reconcile(original: &[String], edited: &[String]) -> Result<Vec<FileAction>, ReconcileError> {
    if original.len() != edited.len() {
        return Err(ReconcileError::CountMismatch {
            original: original.len(),
            edited: edited.len(),
        });
    }

    let actions = original
        .iter()
        .zip(edited)
        .filter_map(|(old, new)| {
            if is_delete_marker(new) {
                Some(FileAction::delete(old.as_str()))
            } else if old != new {
                Some(FileAction::rename(old.as_str(), new.as_str()))
            } else {
                None
            }
        })
        .collect();

    Ok(actions)
}

// inserted lines are dropped: this mode never creates files
pub fn reconcile_diff(original: &[String], edited: &[String]) -> Vec<FileAction> {
    let mut actions = Vec::new();

    for op in capture_diff_slices(Algorithm::Myers, original, edited) {
        let (tag, old_range, new_range) = op.as_tag_tuple();
        match tag {
            DiffTag::Replace => {
                // unpaired lines on the longer side are left alone
                for (old, new) in original[old_range].iter().zip(&edited[new_range]) {
                    if old != new {
                        actions.push(FileAction::rename(old.as_str(), new.as_str()));
                    }
                }
            }
            DiffTag::Delete => {
                actions.extend(original[old_range].iter().map(|old| FileAction::delete(old.as_str())));
            }
            DiffTag::Insert | DiffTag::Equal => {}
        }
    }

    actions
}
