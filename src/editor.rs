use std::fs;
use std::io::Write;
use std::process::Command;

use anyhow::{Context, Result, anyhow};

/// Something that lets the user edit a block of text.
///
/// `Ok(None)` means the session ended without changes (cancelled, editor
/// failed, or content left untouched).
pub trait EditSession {
    fn edit(&self, text: &str) -> Result<Option<String>>;
}

#[derive(Debug, Clone)]
pub struct ExternalEditor {
    command: Vec<String>,
}

impl ExternalEditor {
    pub fn resolve(explicit: Option<&str>) -> Result<Self> {
        let raw = explicit
            .map(str::to_string)
            .or_else(|| env_editor("VISUAL"))
            .or_else(|| env_editor("EDITOR"))
            .unwrap_or_else(|| default_editor().to_string());
        Self::from_command_line(&raw)
    }

    pub fn from_command_line(raw: &str) -> Result<Self> {
        let command = shlex::split(raw)
            .filter(|parts| !parts.is_empty())
            .ok_or_else(|| anyhow!("invalid editor command '{raw}'"))?;
        Ok(Self { command })
    }

    pub fn describe(&self) -> String {
        self.command.join(" ")
    }
}

impl EditSession for ExternalEditor {
    fn edit(&self, text: &str) -> Result<Option<String>> {
        let mut temp = tempfile::Builder::new()
            .prefix("massren_")
            .suffix(".txt")
            .tempfile()
            .context("creating temporary file for editing")?;
        temp.write_all(text.as_bytes())
            .with_context(|| format!("writing {}", temp.path().display()))?;
        // release our handle so editors that replace the file can do so
        let path = temp.into_temp_path();

        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| anyhow!("empty editor command"))?;
        let status = Command::new(program)
            .args(args)
            .arg(path.as_os_str())
            .status()
            .with_context(|| format!("launching editor '{}'", self.describe()))?;

        if !status.success() {
            println!("editor exited with {status}; leaving files unchanged.");
            return Ok(None);
        }

        let bytes = fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
        let edited = String::from_utf8(bytes).context("edited file list is not valid UTF-8")?;
        path.close()
            .context("removing temporary file after editing")?;

        if edited == text {
            return Ok(None);
        }
        Ok(Some(edited))
    }
}

fn env_editor(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn default_editor() -> &'static str {
    if cfg!(windows) { "notepad" } else { "vi" }
}
