//! Compilation-unit registry fed by the external configuration provider.
//!
//! The provider is a subprocess (in the original deployment, a Django
//! management command) that prints a JSON array of records:
//!
//! ```json
//! [{"source": ["static/less/*.less", "!static/less/modules/**"],
//!   "destination": "static/css",
//!   "watch": "static/less/**"}]
//! ```
//!
//! `source` and `watch` accept a single string or a list of strings. The
//! registry never caches: every `load()` re-runs the provider, so a watch
//! session picks up configuration changes at each rebuild.

use glob::Pattern;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

use crate::config::StylebuildConfig;

/// Error making the provider output unusable as a whole.
///
/// Any variant here is fatal for the load attempt; per-record problems are
/// instead reported through [`LoadedUnits::rejected`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RegistryError {
    /// No provider command configured
    #[error("no provider command configured; set provider.command in stylebuild.toml or pass --provider")]
    NoProvider,
    /// Provider process could not be spawned
    #[error("failed to run configuration provider '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    /// Provider exited with a non-zero status
    #[error("configuration provider '{command}' failed ({status}){}", format_stderr(.stderr))]
    ProviderFailed { command: String, status: String, stderr: String },
    /// Provider stdout was not a JSON array of unit records
    #[error("configuration provider returned malformed JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

fn format_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {}", trimmed)
    }
}

/// A set of glob patterns with optional `!`-prefixed exclusions.
#[derive(Debug, Clone)]
pub struct PatternSet {
    includes: Vec<String>,
    excludes: Vec<String>,
    include_patterns: Vec<Pattern>,
    exclude_patterns: Vec<Pattern>,
}

impl PatternSet {
    /// Build a pattern set from raw entries, treating a leading `!` as an
    /// exclusion. Fails on the first malformed glob.
    pub fn from_entries(entries: &[String]) -> Result<Self, String> {
        let mut includes = Vec::new();
        let mut excludes = Vec::new();
        let mut include_patterns = Vec::new();
        let mut exclude_patterns = Vec::new();

        for entry in entries {
            let (negated, raw) = match entry.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, entry.as_str()),
            };

            // Globbed paths come back without a leading `./`, so the
            // compiled pattern must not carry one either
            let raw = raw.strip_prefix("./").unwrap_or(raw);

            if raw.trim().is_empty() {
                return Err(format!("empty pattern entry '{}'", entry));
            }

            let compiled = Pattern::new(raw)
                .map_err(|e| format!("invalid glob pattern '{}': {}", raw, e))?;

            if negated {
                excludes.push(raw.to_string());
                exclude_patterns.push(compiled);
            } else {
                includes.push(raw.to_string());
                include_patterns.push(compiled);
            }
        }

        Ok(Self { includes, excludes, include_patterns, exclude_patterns })
    }

    /// Include patterns as raw strings (for glob-based discovery).
    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    /// Exclude patterns as raw strings.
    pub fn excludes(&self) -> &[String] {
        &self.excludes
    }

    /// Whether the set has no include patterns.
    pub fn is_empty(&self) -> bool {
        self.includes.is_empty()
    }

    /// Check a path (relative to the project root) against the set:
    /// it must match an include pattern and no exclude pattern.
    ///
    /// `*` does not cross directory separators, matching the semantics of
    /// filesystem discovery via `glob::glob`.
    pub fn matches(&self, path: &Path) -> bool {
        let options = glob::MatchOptions {
            require_literal_separator: true,
            ..glob::MatchOptions::default()
        };
        if !self.include_patterns.iter().any(|p| p.matches_path_with(path, options)) {
            return false;
        }
        !self.exclude_patterns.iter().any(|p| p.matches_path_with(path, options))
    }

    /// Common literal (glob-free) directory prefix of the include patterns.
    ///
    /// Output paths preserve each source's path relative to this directory,
    /// so a recursive pattern keeps its subdirectory structure under the
    /// destination and same-stem files never collide.
    pub fn base(&self) -> PathBuf {
        let mut prefixes = self.includes.iter().map(|p| literal_dir_prefix(p));
        let mut base = match prefixes.next() {
            Some(prefix) => prefix,
            None => return PathBuf::new(),
        };
        for prefix in prefixes {
            base = base
                .components()
                .zip(prefix.components())
                .take_while(|(a, b)| a == b)
                .map(|(a, _)| a)
                .collect();
        }
        base
    }
}

/// The directory part of a pattern before any glob metacharacter; a fully
/// literal pattern names a file, so its parent directory is returned.
fn literal_dir_prefix(pattern: &str) -> PathBuf {
    let mut components: Vec<&str> = Vec::new();
    for component in pattern.split('/') {
        if component.contains(['*', '?', '[', '{']) {
            return components.iter().copied().collect();
        }
        components.push(component);
    }
    components.pop();
    components.iter().copied().collect()
}

/// One source/destination/watch configuration triple.
///
/// Immutable for the lifetime of one build cycle.
#[derive(Debug, Clone)]
pub struct CompilationUnit {
    /// Input file patterns
    pub source: PatternSet,
    /// Output directory for transformed files
    pub destination: PathBuf,
    /// Patterns whose changes trigger recompilation; defaults to `source`
    pub watch: PatternSet,
}

impl CompilationUnit {
    /// Short label used in build summaries.
    pub fn label(&self) -> String {
        self.destination.display().to_string()
    }
}

/// Result of one registry load: the accepted units plus a report of any
/// records that were skipped as invalid.
#[derive(Debug)]
pub struct LoadedUnits {
    /// Units that passed validation, in provider order
    pub units: Vec<CompilationUnit>,
    /// One message per skipped record
    pub rejected: Vec<String>,
}

/// A JSON field that is either a single string or a list of strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StringOrSeq {
    One(String),
    Many(Vec<String>),
}

impl StringOrSeq {
    fn into_vec(self) -> Vec<String> {
        match self {
            StringOrSeq::One(s) => vec![s],
            StringOrSeq::Many(v) => v,
        }
    }
}

/// Raw provider record before validation.
#[derive(Debug, Deserialize)]
struct RawUnit {
    source: Option<StringOrSeq>,
    destination: Option<String>,
    watch: Option<StringOrSeq>,
}

/// Loads compilation units by invoking the configured provider command.
#[derive(Debug, Clone)]
pub struct UnitRegistry {
    command: String,
}

impl UnitRegistry {
    /// Create a registry from a provider command string.
    pub fn new(command: impl Into<String>) -> Self {
        Self { command: command.into() }
    }

    /// Create a registry from the tool configuration.
    pub fn from_config(config: &StylebuildConfig) -> Result<Self, RegistryError> {
        match &config.provider.command {
            Some(cmd) => Ok(Self::new(cmd.clone())),
            None => Err(RegistryError::NoProvider),
        }
    }

    /// The provider command this registry invokes.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Run the provider and parse its output into compilation units.
    ///
    /// Invalid records (missing/empty `source` or `destination`, malformed
    /// glob) are skipped and reported via [`LoadedUnits::rejected`]; a
    /// provider-level failure aborts the whole load.
    pub fn load(&self) -> Result<LoadedUnits, RegistryError> {
        let output = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .output()
            .map_err(|e| RegistryError::Spawn { command: self.command.clone(), source: e })?;

        if !output.status.success() {
            return Err(RegistryError::ProviderFailed {
                command: self.command.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let raw: Vec<RawUnit> = serde_json::from_slice(&output.stdout)?;

        let mut units = Vec::new();
        let mut rejected = Vec::new();

        for (index, record) in raw.into_iter().enumerate() {
            match validate_unit(record) {
                Ok(unit) => units.push(unit),
                Err(reason) => rejected.push(format!("unit {}: {}", index, reason)),
            }
        }

        Ok(LoadedUnits { units, rejected })
    }
}

/// Validate one raw record into a compilation unit.
fn validate_unit(raw: RawUnit) -> Result<CompilationUnit, String> {
    let source_entries = raw.source.map(StringOrSeq::into_vec).unwrap_or_default();
    if source_entries.is_empty() {
        return Err("missing or empty 'source'".to_string());
    }

    let destination = match raw.destination {
        Some(d) if !d.trim().is_empty() => PathBuf::from(d),
        _ => return Err("missing or empty 'destination'".to_string()),
    };

    let source = PatternSet::from_entries(&source_entries).map_err(|e| format!("source: {}", e))?;
    if source.is_empty() {
        return Err("'source' has no include patterns".to_string());
    }

    let watch_entries = raw.watch.map(StringOrSeq::into_vec).unwrap_or_default();
    let watch = if watch_entries.is_empty() {
        source.clone()
    } else {
        PatternSet::from_entries(&watch_entries).map_err(|e| format!("watch: {}", e))?
    };

    Ok(CompilationUnit { source, destination, watch })
}
