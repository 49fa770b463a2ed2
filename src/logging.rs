use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::actions::FileAction;
use crate::executor::ActionOutcome;

pub const LOG_DIR: &str = ".massren";
const LOG_FILE: &str = "history.jsonl";
const MAX_ENTRIES: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    pub timestamp: String,
    pub action: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChangeLogEntry {
    pub fn new(action: &FileAction, outcome: &ActionOutcome) -> Self {
        let timestamp = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "unknown".into());
        let (source, destination) = match action {
            FileAction::Rename {
                source,
                destination,
            } => (source.clone(), Some(destination.clone())),
            FileAction::Delete { target } => (target.clone(), None),
        };
        let error = match outcome {
            ActionOutcome::Failed(message) => Some(message.clone()),
            ActionOutcome::Performed | ActionOutcome::DryRun => None,
        };
        Self {
            timestamp,
            action: action.kind().to_string(),
            source,
            destination,
            status: outcome.label().to_string(),
            error,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChangeLog {
    path: PathBuf,
}

impl Default for ChangeLog {
    fn default() -> Self {
        Self::in_dir(Path::new(LOG_DIR))
    }
}

impl ChangeLog {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            path: dir.join(LOG_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self, entries: &[ChangeLogEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        self.ensure_dir()?;
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .with_context(|| format!("opening {}", self.path.display()))?;
        for entry in entries {
            let json = serde_json::to_string(entry)?;
            writeln!(file, "{json}")?;
        }
        self.truncate()
    }

    pub fn read_recent(&self, count: usize) -> Result<Vec<ChangeLogEntry>> {
        let mut entries = self.read_all()?;
        let skip = entries.len().saturating_sub(count);
        Ok(entries.split_off(skip))
    }

    pub fn read_all(&self) -> Result<Vec<ChangeLogEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = OpenOptions::new()
            .read(true)
            .open(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        let mut entries = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(entry) => entries.push(entry),
                Err(err) => println!("warning: skipping malformed log line: {err}"),
            }
        }
        Ok(entries)
    }

    fn ensure_dir(&self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
            }
        }
        Ok(())
    }

    fn truncate(&self) -> Result<()> {
        let file = OpenOptions::new()
            .read(true)
            .open(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        let reader = BufReader::new(file);
        let lines: Vec<_> = reader.lines().collect::<Result<_, _>>()?;
        if lines.len() <= MAX_ENTRIES {
            return Ok(());
        }
        let keep = &lines[lines.len() - MAX_ENTRIES..];
        fs::write(&self.path, keep.join("\n") + "\n")?;
        Ok(())
    }
}
