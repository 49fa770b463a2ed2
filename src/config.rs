use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::{ColorChoice, ModeChoice};

pub const DEFAULT_CONFIG_FILE: &str = ".massren.yaml";

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Settings {
    #[serde(default)]
    pub editor: Option<String>,
    #[serde(default)]
    pub header: Option<bool>,
    #[serde(default)]
    pub mode: Option<ModeChoice>,
    #[serde(default)]
    pub include_hidden: Option<bool>,
    #[serde(default)]
    pub exclude: Option<Vec<String>>,
    #[serde(default)]
    pub color: Option<ColorChoice>,
}

pub fn load_settings(explicit: Option<&Path>) -> Result<Settings> {
    match explicit {
        Some(path) => parse_settings(path),
        None => {
            let fallback = Path::new(DEFAULT_CONFIG_FILE);
            if fallback.is_file() {
                parse_settings(fallback)
            } else {
                Ok(Settings::default())
            }
        }
    }
}

fn parse_settings(path: &Path) -> Result<Settings> {
    let data = fs::read(path).with_context(|| format!("reading config {}", path.display()))?;
    if data.iter().all(u8::is_ascii_whitespace) {
        return Ok(Settings::default());
    }
    let settings = if path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
    {
        serde_json::from_slice(&data)
            .with_context(|| format!("parsing config {}", path.display()))?
    } else {
        serde_yaml::from_slice(&data)
            .with_context(|| format!("parsing config {}", path.display()))?
    };
    Ok(settings)
}
