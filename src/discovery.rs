//! Dataset folder selection.
//!
//! Folders are collected in four groups (day/night under the root, then day/night
//! under the unpublished directory), each sorted by name, then filtered to
//! directories and de-duplicated by canonical path.

use crate::model::Selection;
use anyhow::{Context, Result};
use glob::Pattern;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Compiled name patterns for the two folder kinds.
pub(crate) struct FolderPatterns {
    day: Pattern,
    night: Pattern,
}

impl FolderPatterns {
    pub(crate) fn compile(selection: &Selection) -> Result<Self> {
        let day = Pattern::new(&selection.day_pattern)
            .with_context(|| format!("invalid day pattern {:?}", selection.day_pattern))?;
        let night = Pattern::new(&selection.night_pattern)
            .with_context(|| format!("invalid night pattern {:?}", selection.night_pattern))?;
        Ok(Self { day, night })
    }
}

/// Collect the ordered, de-duplicated set of folders to run.
///
/// An empty result is not an error here; the caller decides what it means.
pub(crate) fn find_folders(root: &Path, selection: &Selection) -> Result<Vec<PathBuf>> {
    let patterns = FolderPatterns::compile(selection)?;
    let mut candidates = Vec::new();

    if selection.sources.published {
        collect_groups(root, &patterns, selection, &mut candidates)?;
    }

    if selection.sources.unpublished {
        let unpublished = root.join(&selection.unpublished_dir);
        if unpublished.is_dir() {
            if let Err(e) = collect_groups(&unpublished, &patterns, selection, &mut candidates) {
                warn!("{e:#}; skipping unpublished folders");
            }
        }
    }

    Ok(dedup_dirs(candidates))
}

fn collect_groups(
    dir: &Path,
    patterns: &FolderPatterns,
    selection: &Selection,
    out: &mut Vec<PathBuf>,
) -> Result<()> {
    if selection.only.wants_day() {
        out.extend(matching_entries(dir, &patterns.day)?);
    }
    if selection.only.wants_night() {
        out.extend(matching_entries(dir, &patterns.night)?);
    }
    Ok(())
}

/// Direct children of `dir` whose name matches `pattern`, sorted by name.
fn matching_entries(dir: &Path, pattern: &Pattern) -> Result<Vec<PathBuf>> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))?;

    let mut names: Vec<_> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name())
        .filter(|name| name.to_str().is_some_and(|n| pattern.matches(n)))
        .collect();
    names.sort();

    Ok(names.into_iter().map(|name| dir.join(name)).collect())
}

/// Keep directories only, first occurrence wins per canonical path.
fn dedup_dirs(candidates: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|path| path.is_dir())
        .filter(|path| {
            let key = std::fs::canonicalize(path).unwrap_or_else(|_| path.clone());
            seen.insert(key)
        })
        .collect()
}
