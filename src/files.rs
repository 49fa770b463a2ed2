use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use glob::glob;
use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::{DirEntry, WalkDir};

use crate::config::DEFAULT_CONFIG_FILE;
use crate::logging::LOG_DIR;

#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub recursive: bool,
    pub include_dirs: bool,
    pub include_hidden: bool,
    pub exclude: Vec<String>,
}

pub fn list_files(targets: &[String], options: &ListOptions) -> Result<Vec<String>> {
    let exclude = build_exclude_globs(&options.exclude)?;
    let mut acc = Vec::new();

    if targets.is_empty() {
        list_directory(Path::new("."), options, exclude.as_ref(), &mut acc)?;
    }

    for target in targets {
        let path = Path::new(target);
        if fs::symlink_metadata(path).is_ok() {
            append_target(path, options, exclude.as_ref(), &mut acc)
                .with_context(|| format!("processing target {target}"))?;
            continue;
        }

        let matches =
            glob(target).map_err(|err| anyhow!("invalid glob pattern '{target}': {err}"))?;
        let mut matched = false;
        for entry in matches {
            let path =
                entry.map_err(|err| anyhow!("error reading matches for '{target}': {err}"))?;
            matched = true;
            append_entry(&path, options, exclude.as_ref(), &mut acc, true);
        }
        if !matched {
            bail!("no files matched '{target}'");
        }
    }

    acc.sort();
    Ok(acc)
}

fn append_target(
    path: &Path,
    options: &ListOptions,
    exclude: Option<&GlobSet>,
    acc: &mut Vec<String>,
) -> Result<()> {
    let metadata =
        fs::metadata(path).with_context(|| format!("unable to read metadata for {}", path.display()))?;
    if metadata.is_dir() {
        list_directory(path, options, exclude, acc)
    } else {
        // explicitly named files are taken even when hidden
        append_entry(path, options, exclude, acc, false);
        Ok(())
    }
}

fn list_directory(
    dir: &Path,
    options: &ListOptions,
    exclude: Option<&GlobSet>,
    acc: &mut Vec<String>,
) -> Result<()> {
    let max_depth = if options.recursive { usize::MAX } else { 1 };
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(max_depth)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            !is_own_state(entry.path()) && (options.include_hidden || !is_hidden(entry))
        });

    for entry in walker {
        let entry = entry.with_context(|| format!("walking {}", dir.display()))?;
        let path = strip_current_dir(dir, entry.path());
        // hidden entries were already pruned by the walker
        append_entry(&path, options, exclude, acc, false);
    }

    Ok(())
}

// walking "." yields "./name"; the editor shows "name"
fn strip_current_dir(dir: &Path, path: &Path) -> PathBuf {
    if dir == Path::new(".") {
        path.strip_prefix(dir).map(Path::to_path_buf).unwrap_or_else(|_| path.to_path_buf())
    } else {
        path.to_path_buf()
    }
}

fn append_entry(
    path: &Path,
    options: &ListOptions,
    exclude: Option<&GlobSet>,
    acc: &mut Vec<String>,
    check_hidden: bool,
) {
    let is_dir = fs::symlink_metadata(path)
        .map(|meta| meta.is_dir())
        .unwrap_or(false);
    if is_dir && !options.include_dirs {
        return;
    }
    if is_own_state(path) {
        return;
    }
    if should_skip(path, check_hidden && !options.include_hidden, exclude) {
        return;
    }

    match path.to_str() {
        Some(name) if name.contains('\n') || name.contains('\r') => {
            println!("warning: skipping {} (name contains a line break)", path.display());
        }
        Some(name) => acc.push(name.to_string()),
        None => {
            println!("warning: skipping {} (name is not valid UTF-8)", path.display());
        }
    }
}

fn should_skip(path: &Path, skip_hidden: bool, exclude: Option<&GlobSet>) -> bool {
    if skip_hidden && has_hidden_name(path) {
        return true;
    }

    if let Some(set) = exclude {
        let candidate = normalize_slashes(path);
        return set.is_match(candidate.as_str())
            || path
                .file_name()
                .map(|name| set.is_match(name))
                .unwrap_or(false);
    }

    false
}

// the change log directory and the settings file are never offered for renaming
fn is_own_state(path: &Path) -> bool {
    path.components().any(|component| component.as_os_str() == LOG_DIR)
        || path
            .file_name()
            .map(|name| name == DEFAULT_CONFIG_FILE)
            .unwrap_or(false)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with('.'))
            .unwrap_or(false)
}

fn has_hidden_name(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

fn normalize_slashes(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn build_exclude_globs(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }

    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob =
            Glob::new(pattern).map_err(|err| anyhow!("invalid exclude glob '{pattern}': {err}"))?;
        builder.add(glob);
    }

    builder
        .build()
        .map(Some)
        .map_err(|err| anyhow!("unable to build exclude globs: {err}"))
}
