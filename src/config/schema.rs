//! Configuration schema for `stylebuild.toml`.
//!
//! The tool config covers everything except the compilation-unit list, which
//! always comes from the external provider command at build time.

use serde::{Deserialize, Serialize};

/// Top-level configuration from `stylebuild.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StylebuildConfig {
    /// Configuration provider settings
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Transform chain settings
    #[serde(default)]
    pub transform: TransformConfig,
    /// Watch mode settings
    #[serde(default)]
    pub watch: WatchConfig,
}

/// External configuration provider settings.
///
/// The provider is a subprocess that prints a JSON array of compilation
/// units on stdout, e.g. `python manage.py get_less_compilations`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Shell command invoked to obtain the unit list
    #[serde(default)]
    pub command: Option<String>,
}

/// Transform chain settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransformConfig {
    /// Preprocessor command reading the style language on stdin and writing
    /// plain CSS on stdout (e.g. `lessc -`). When absent, inputs are treated
    /// as plain CSS and passed through unchanged.
    #[serde(default)]
    pub preprocess: Option<String>,
    /// Minimum browser versions for vendor prefixing
    #[serde(default)]
    pub targets: TargetsConfig,
}

/// Minimum browser versions the prefixer must support.
///
/// Versions are `major[.minor[.patch]]` strings. Unset browsers are not
/// considered; an entirely unset table falls back to built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetsConfig {
    pub chrome: Option<String>,
    pub firefox: Option<String>,
    pub safari: Option<String>,
    pub edge: Option<String>,
    pub ios: Option<String>,
    pub android: Option<String>,
    pub samsung: Option<String>,
}

impl TargetsConfig {
    /// Check whether any browser target is set.
    pub fn is_empty(&self) -> bool {
        self.chrome.is_none()
            && self.firefox.is_none()
            && self.safari.is_none()
            && self.edge.is_none()
            && self.ios.is_none()
            && self.android.is_none()
            && self.samsung.is_none()
    }

    /// Validate all set versions, returning one message per invalid entry.
    pub fn validate(&self) -> Vec<String> {
        let entries = [
            ("chrome", &self.chrome),
            ("firefox", &self.firefox),
            ("safari", &self.safari),
            ("edge", &self.edge),
            ("ios", &self.ios),
            ("android", &self.android),
            ("samsung", &self.samsung),
        ];

        let mut errors = Vec::new();
        for (name, version) in entries {
            if let Some(v) = version {
                if parse_version(v).is_none() {
                    errors.push(format!(
                        "transform.targets.{}: invalid version '{}' (expected major[.minor[.patch]])",
                        name, v
                    ));
                }
            }
        }
        errors
    }
}

/// Watch mode settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchConfig {
    /// Debounce window for filesystem events, in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u32,
    /// Clear the terminal before each rebuild
    #[serde(default = "default_clear_screen")]
    pub clear_screen: bool,
}

fn default_debounce_ms() -> u32 {
    100
}

fn default_clear_screen() -> bool {
    true
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: default_debounce_ms(), clear_screen: default_clear_screen() }
    }
}

impl StylebuildConfig {
    /// Validate the configuration, returning all problems found.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if let Some(cmd) = &self.provider.command {
            if cmd.trim().is_empty() {
                errors.push("provider.command must not be empty".to_string());
            }
        }

        if let Some(cmd) = &self.transform.preprocess {
            if cmd.trim().is_empty() {
                errors.push("transform.preprocess must not be empty".to_string());
            }
        }

        errors.extend(self.transform.targets.validate());

        if self.watch.debounce_ms == 0 {
            errors.push("watch.debounce_ms must be at least 1".to_string());
        }

        errors
    }
}

/// Parse a `major[.minor[.patch]]` browser version into the packed form
/// used by the prefixer (`major << 16 | minor << 8 | patch`).
pub fn parse_version(version: &str) -> Option<u32> {
    let mut parts = version.trim().splitn(3, '.');

    let major: u32 = parts.next()?.parse().ok()?;
    let minor: u32 = match parts.next() {
        Some(p) => p.parse().ok()?,
        None => 0,
    };
    let patch: u32 = match parts.next() {
        Some(p) => p.parse().ok()?,
        None => 0,
    };

    if major > 0xFFFF || minor > 0xFF || patch > 0xFF {
        return None;
    }

    Some((major << 16) | (minor << 8) | patch)
}
