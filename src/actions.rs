use std::fmt;
use std::path::Path;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FileAction {
    Rename { source: String, destination: String },
    Delete { target: String },
}

impl FileAction {
    pub fn rename(source: impl Into<String>, destination: impl Into<String>) -> Self {
        FileAction::Rename {
            source: source.into(),
            destination: destination.into(),
        }
    }

    pub fn delete(target: impl Into<String>) -> Self {
        FileAction::Delete {
            target: target.into(),
        }
    }

    pub fn source(&self) -> &Path {
        match self {
            FileAction::Rename { source, .. } => Path::new(source),
            FileAction::Delete { target } => Path::new(target),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FileAction::Rename { .. } => "rename",
            FileAction::Delete { .. } => "delete",
        }
    }
}

impl fmt::Display for FileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileAction::Rename {
                source,
                destination,
            } => write!(f, "Rename: '{source}' -> '{destination}'"),
            FileAction::Delete { target } => write!(f, "Delete: '{target}'"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_preview_format() {
        assert_eq!(
            FileAction::rename("a.jpg", "b.jpg").to_string(),
            "Rename: 'a.jpg' -> 'b.jpg'"
        );
        assert_eq!(FileAction::delete("c.jpg").to_string(), "Delete: 'c.jpg'");
    }

    #[test]
    fn serializes_with_action_tag() {
        let json = serde_json::to_value(FileAction::rename("a", "dir/b")).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({"action": "rename", "source": "a", "destination": "dir/b"})
        );
        let json = serde_json::to_value(FileAction::delete("a")).expect("serialize");
        assert_eq!(json, serde_json::json!({"action": "delete", "target": "a"}));
    }

    #[test]
    fn source_covers_both_variants() {
        assert_eq!(FileAction::rename("a", "b").source(), Path::new("a"));
        assert_eq!(FileAction::delete("x").source(), Path::new("x"));
    }
}
