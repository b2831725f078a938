//! Source file discovery for compilation units.
//!
//! Resolves a unit's include patterns against the project root via glob,
//! then drops anything matched by a `!`-exclusion.

use crate::registry::PatternSet;
use glob::glob;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Error during source discovery.
///
/// Pattern syntax is validated at registry load, so this only surfaces
/// patterns that stop being iterable at discovery time.
#[derive(Debug, thiserror::Error)]
#[error("invalid glob pattern '{pattern}': {source}")]
pub struct DiscoveryError {
    pub pattern: String,
    #[source]
    pub source: glob::PatternError,
}

/// Discover files matching a pattern set, relative to `root`.
///
/// Returns absolute, sorted, deduplicated paths. Unreadable directory
/// entries are skipped with a warning rather than failing the unit.
pub fn discover_files(root: &Path, patterns: &PatternSet) -> Result<Vec<PathBuf>, DiscoveryError> {
    let mut matched = HashSet::new();

    for pattern in patterns.includes() {
        let full_pattern = root.join(pattern);
        let pattern_str = full_pattern.to_string_lossy();

        let paths = glob(&pattern_str)
            .map_err(|e| DiscoveryError { pattern: pattern.clone(), source: e })?;

        for entry in paths {
            match entry {
                Ok(path) => {
                    if path.is_file() {
                        matched.insert(path);
                    }
                }
                Err(e) => {
                    eprintln!("Warning: error reading path: {}", e);
                }
            }
        }
    }

    let mut files: Vec<PathBuf> = matched
        .into_iter()
        .filter(|path| {
            let rel = path.strip_prefix(root).unwrap_or(path);
            patterns.matches(rel)
        })
        .collect();

    files.sort();
    Ok(files)
}

/// Compute the output path for one source file.
///
/// The source's path relative to `base` (the unit's resolved pattern base)
/// is preserved under `destination` with the extension replaced by `.css`,
/// so a recursive pattern maps same-stem files in different subdirectories
/// to distinct outputs.
pub fn output_path(destination: &Path, base: &Path, source: &Path) -> PathBuf {
    let rel = match source.strip_prefix(base) {
        Ok(rel) => rel,
        Err(_) => source.file_name().map(Path::new).unwrap_or(source),
    };
    destination.join(rel).with_extension("css")
}
