use std::collections::HashMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::actions::FileAction;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictKind {
    EmptyDestination,
    DuplicateSource { first: usize },
    DuplicateDestination { first: usize },
    DestinationPending { vacated_by: usize },
    DestinationExists,
    // an enclosing directory was already renamed or deleted
    ParentMoved { by: usize },
    // a later action still works inside the directory being deleted
    ContentsPending { by: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub index: usize,
    pub action: FileAction,
    pub kind: ConflictKind,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}: ", self.index + 1, self.action)?;
        match &self.kind {
            ConflictKind::EmptyDestination => write!(f, "destination is empty"),
            ConflictKind::DuplicateSource { first } => {
                write!(f, "file is already handled by action #{}", first + 1)
            }
            ConflictKind::DuplicateDestination { first } => {
                write!(f, "destination is also the target of action #{}", first + 1)
            }
            ConflictKind::DestinationPending { vacated_by } => write!(
                f,
                "destination is only freed by the later action #{}",
                vacated_by + 1
            ),
            ConflictKind::DestinationExists => write!(f, "destination already exists"),
            ConflictKind::ParentMoved { by } => write!(
                f,
                "a parent directory is moved away by the earlier action #{}",
                by + 1
            ),
            ConflictKind::ContentsPending { by } => write!(
                f,
                "directory still holds a file used by the later action #{}",
                by + 1
            ),
        }
    }
}

pub fn validate<F>(actions: &[FileAction], exists: F) -> Vec<Conflict>
where
    F: Fn(&Path) -> bool,
{
    let mut sources: HashMap<PathBuf, usize> = HashMap::new();
    for (index, action) in actions.iter().enumerate() {
        sources.entry(normalize(action.source())).or_insert(index);
    }

    let mut conflicts = Vec::new();
    let mut seen_sources: HashMap<PathBuf, usize> = HashMap::new();
    let mut seen_destinations: HashMap<PathBuf, usize> = HashMap::new();

    for (index, action) in actions.iter().enumerate() {
        let mut report = |kind| {
            conflicts.push(Conflict {
                index,
                action: action.clone(),
                kind,
            })
        };

        let source = normalize(action.source());
        if let Some(by) = moved_ancestor(&source, &seen_sources) {
            report(ConflictKind::ParentMoved { by });
        }
        if let Some(&first) = seen_sources.get(&source) {
            report(ConflictKind::DuplicateSource { first });
        } else {
            seen_sources.insert(source.clone(), index);
        }

        let FileAction::Rename { destination, .. } = action else {
            if let Some(by) = later_descendant(&source, &actions[index + 1..]) {
                report(ConflictKind::ContentsPending { by: index + 1 + by });
            }
            continue;
        };
        if destination.trim().is_empty() {
            report(ConflictKind::EmptyDestination);
            continue;
        }

        let destination = normalize(Path::new(destination));
        if let Some(&first) = seen_destinations.get(&destination) {
            report(ConflictKind::DuplicateDestination { first });
            continue;
        }
        seen_destinations.insert(destination.clone(), index);

        match sources.get(&destination) {
            Some(&owner) if owner > index => {
                report(ConflictKind::DestinationPending { vacated_by: owner });
            }
            Some(&owner) if owner < index => {}
            // renaming onto itself only differs in spelling, e.g. "./a" -> "a"
            Some(_) => {}
            None => {
                if exists(destination.as_path()) && !same_name_ignoring_case(&source, &destination)
                {
                    report(ConflictKind::DestinationExists);
                }
            }
        }
    }

    conflicts
}

fn moved_ancestor(source: &Path, earlier: &HashMap<PathBuf, usize>) -> Option<usize> {
    source
        .ancestors()
        .skip(1)
        .filter(|ancestor| !ancestor.as_os_str().is_empty())
        .filter_map(|ancestor| earlier.get(ancestor).copied())
        .min()
}

fn later_descendant(dir: &Path, later: &[FileAction]) -> Option<usize> {
    later.iter().position(|action| {
        let source = normalize(action.source());
        source != dir && source.starts_with(dir)
    })
}

// "a.jpg" -> "A.jpg" names the same file on case-insensitive filesystems
pub fn same_name_ignoring_case(source: &Path, destination: &Path) -> bool {
    source != destination
        && source.to_string_lossy().to_lowercase() == destination.to_string_lossy().to_lowercase()
}

// "./a" and "a" compare equal
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn on_disk(paths: &[&str]) -> impl Fn(&Path) -> bool {
        let set: HashSet<PathBuf> = paths.iter().map(PathBuf::from).collect();
        move |path| set.contains(path)
    }

    #[test]
    fn plain_renames_pass() {
        let actions = vec![
            FileAction::rename("a.jpg", "x.jpg"),
            FileAction::delete("b.jpg"),
            FileAction::rename("c.jpg", "new/dir/c.jpg"),
        ];
        assert!(validate(&actions, on_disk(&["a.jpg", "b.jpg", "c.jpg"])).is_empty());
    }

    #[test]
    fn rename_onto_existing_file_is_flagged() {
        let actions = vec![FileAction::rename("a.jpg", "b.jpg")];
        let conflicts = validate(&actions, on_disk(&["a.jpg", "b.jpg"]));
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, ConflictKind::DestinationExists);
    }

    #[test]
    fn chain_in_safe_order_passes() {
        // b moves away before a takes its name
        let actions = vec![
            FileAction::rename("b", "c"),
            FileAction::rename("a", "b"),
        ];
        assert!(validate(&actions, on_disk(&["a", "b"])).is_empty());
    }

    #[test]
    fn chain_in_unsafe_order_is_flagged() {
        let actions = vec![
            FileAction::rename("a", "b"),
            FileAction::rename("b", "c"),
        ];
        let conflicts = validate(&actions, on_disk(&["a", "b"]));
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].index, 0);
        assert_eq!(
            conflicts[0].kind,
            ConflictKind::DestinationPending { vacated_by: 1 }
        );
    }

    #[test]
    fn swap_is_flagged() {
        let actions = vec![
            FileAction::rename("a", "b"),
            FileAction::rename("b", "a"),
        ];
        let conflicts = validate(&actions, on_disk(&["a", "b"]));
        assert_eq!(conflicts.len(), 1);
        assert_eq!(
            conflicts[0].kind,
            ConflictKind::DestinationPending { vacated_by: 1 }
        );
    }

    #[test]
    fn rename_onto_deleted_file_depends_on_order() {
        let delete_first = vec![FileAction::delete("b"), FileAction::rename("a", "b")];
        assert!(validate(&delete_first, on_disk(&["a", "b"])).is_empty());

        let delete_last = vec![FileAction::rename("a", "b"), FileAction::delete("b")];
        assert_eq!(
            validate(&delete_last, on_disk(&["a", "b"]))[0].kind,
            ConflictKind::DestinationPending { vacated_by: 1 }
        );
    }

    #[test]
    fn duplicate_destinations_are_flagged() {
        let actions = vec![
            FileAction::rename("a", "same"),
            FileAction::rename("b", "./same"),
        ];
        let conflicts = validate(&actions, on_disk(&["a", "b"]));
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].index, 1);
        assert_eq!(
            conflicts[0].kind,
            ConflictKind::DuplicateDestination { first: 0 }
        );
    }

    #[test]
    fn duplicate_sources_are_flagged() {
        let actions = vec![FileAction::rename("a", "x"), FileAction::delete("a")];
        let conflicts = validate(&actions, on_disk(&["a"]));
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, ConflictKind::DuplicateSource { first: 0 });
    }

    #[test]
    fn rename_of_parent_before_child_is_flagged() {
        let actions = vec![
            FileAction::rename("sub", "renamed"),
            FileAction::rename("sub/c.jpg", "sub/d.jpg"),
        ];
        let conflicts = validate(&actions, on_disk(&["sub", "sub/c.jpg"]));
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].index, 1);
        assert_eq!(conflicts[0].kind, ConflictKind::ParentMoved { by: 0 });
        assert!(conflicts[0].to_string().contains("action #1"));
    }

    #[test]
    fn rename_of_child_before_parent_passes() {
        let actions = vec![
            FileAction::rename("sub/c.jpg", "sub/d.jpg"),
            FileAction::rename("sub", "renamed"),
        ];
        assert!(validate(&actions, on_disk(&["sub", "sub/c.jpg"])).is_empty());
    }

    #[test]
    fn deleting_directory_before_its_contents_is_flagged() {
        let actions = vec![FileAction::delete("sub"), FileAction::delete("./sub/c.jpg")];
        let conflicts = validate(&actions, on_disk(&["sub", "sub/c.jpg"]));
        assert_eq!(
            conflicts,
            vec![
                Conflict {
                    index: 0,
                    action: actions[0].clone(),
                    kind: ConflictKind::ContentsPending { by: 1 },
                },
                Conflict {
                    index: 1,
                    action: actions[1].clone(),
                    kind: ConflictKind::ParentMoved { by: 0 },
                },
            ]
        );
    }

    #[test]
    fn deleting_contents_before_directory_passes() {
        let actions = vec![FileAction::delete("sub/c.jpg"), FileAction::delete("sub")];
        assert!(validate(&actions, on_disk(&["sub", "sub/c.jpg"])).is_empty());
    }

    #[test]
    fn sibling_with_shared_prefix_is_not_nested() {
        let actions = vec![
            FileAction::delete("sub"),
            FileAction::rename("subway.jpg", "metro.jpg"),
        ];
        assert!(validate(&actions, on_disk(&["sub", "subway.jpg"])).is_empty());
    }

    #[test]
    fn case_only_rename_is_not_a_collision() {
        // a case-insensitive filesystem reports "A.jpg" as present
        let actions = vec![FileAction::rename("a.jpg", "A.jpg")];
        assert!(validate(&actions, on_disk(&["a.jpg", "A.jpg"])).is_empty());
    }

    #[test]
    fn blank_destination_is_flagged() {
        let actions = vec![FileAction::rename("a", "   ")];
        let conflicts = validate(&actions, on_disk(&["a"]));
        assert_eq!(conflicts[0].kind, ConflictKind::EmptyDestination);
        assert!(conflicts[0].to_string().contains("destination is empty"));
    }
}
