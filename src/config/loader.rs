//! Configuration loading and discovery for `stylebuild.toml`
//!
//! Provides functions to find, load, and merge configuration.

use super::schema::StylebuildConfig;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the tool configuration file.
pub const CONFIG_FILE_NAME: &str = "stylebuild.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse stylebuild.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override the provider command
    pub provider: Option<String>,
    /// Override the preprocessor command
    pub preprocess: Option<String>,
    /// Override the watch debounce window
    pub debounce_ms: Option<u32>,
}

/// Find `stylebuild.toml` by walking up from the current working directory.
///
/// # Returns
/// - `Some(path)` if a config file is found
/// - `None` if no config file is found
pub fn find_config() -> Option<PathBuf> {
    let cwd = env::current_dir().ok()?;
    find_config_from(cwd)
}

/// Find `stylebuild.toml` by walking up from a specific directory.
///
/// This is the internal implementation that allows specifying the start
/// directory, useful for testing.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration from a `stylebuild.toml` file.
///
/// If a path is provided, loads from that file. Otherwise, uses
/// `find_config()` to locate one. If no config file is found, returns the
/// default configuration.
///
/// # Returns
/// - `Ok(StylebuildConfig)` on success
/// - `Err(ConfigError)` if the file cannot be read, parsed, or validated
pub fn load_config(path: Option<&Path>) -> Result<StylebuildConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => load_config_file(&p),
        None => Ok(StylebuildConfig::default()),
    }
}

/// Load configuration from a specific file path.
fn load_config_file(path: &Path) -> Result<StylebuildConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: StylebuildConfig = toml::from_str(&contents)?;

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors));
    }

    Ok(config)
}

/// Merge CLI overrides into a configuration.
///
/// CLI arguments take precedence over config file values.
pub fn merge_cli_overrides(config: &mut StylebuildConfig, overrides: &CliOverrides) {
    if let Some(ref provider) = overrides.provider {
        config.provider.command = Some(provider.clone());
    }

    if let Some(ref preprocess) = overrides.preprocess {
        config.transform.preprocess = Some(preprocess.clone());
    }

    if let Some(debounce_ms) = overrides.debounce_ms {
        config.watch.debounce_ms = debounce_ms;
    }
}

/// Get the project root directory from a config file path.
///
/// Returns the parent directory of the stylebuild.toml file.
pub fn project_root(config_path: &Path) -> Option<&Path> {
    config_path.parent()
}

/// Resolve a path relative to the project root.
///
/// If the path is absolute, returns it unchanged.
/// If relative, joins it with the project root.
pub fn resolve_path(project_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_find_config_in_current_dir() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join(CONFIG_FILE_NAME);
        File::create(&config_path)
            .expect("should create config file")
            .write_all(b"[provider]\ncommand = \"true\"")
            .expect("should write config content");

        let found = find_config_from(temp.path().to_path_buf());
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_in_parent_dir() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join(CONFIG_FILE_NAME);
        File::create(&config_path)
            .expect("should create config file")
            .write_all(b"")
            .expect("should write config content");

        let subdir = temp.path().join("static").join("less");
        fs::create_dir_all(&subdir).expect("should create subdirectories");

        let found = find_config_from(subdir);
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_not_found() {
        let temp = TempDir::new().expect("should create temp dir");
        let found = find_config_from(temp.path().to_path_buf());
        assert_eq!(found, None);
    }

    #[test]
    fn test_load_config_from_file() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join(CONFIG_FILE_NAME);
        File::create(&config_path)
            .expect("should create config file")
            .write_all(
                br#"
[provider]
command = "python manage.py get_less_compilations"

[transform]
preprocess = "lessc -"

[watch]
debounce_ms = 200
"#,
            )
            .expect("should write config content");

        let config = load_config(Some(&config_path)).expect("should load valid config");
        assert_eq!(
            config.provider.command.as_deref(),
            Some("python manage.py get_less_compilations")
        );
        assert_eq!(config.transform.preprocess.as_deref(), Some("lessc -"));
        assert_eq!(config.watch.debounce_ms, 200);
    }

    #[test]
    fn test_load_config_missing_file_errors() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join("nonexistent.toml");

        let result = load_config(Some(&config_path));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join(CONFIG_FILE_NAME);
        File::create(&config_path)
            .expect("should create config file")
            .write_all(b"this is not valid toml {{{")
            .expect("should write invalid config");

        let result = load_config(Some(&config_path));
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_validation_error() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join(CONFIG_FILE_NAME);
        File::create(&config_path)
            .expect("should create config file")
            .write_all(b"[watch]\ndebounce_ms = 0")
            .expect("should write invalid config");

        let result = load_config(Some(&config_path));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_merge_cli_overrides_provider() {
        let mut config = StylebuildConfig::default();
        let overrides =
            CliOverrides { provider: Some("cat units.json".to_string()), ..Default::default() };

        merge_cli_overrides(&mut config, &overrides);
        assert_eq!(config.provider.command.as_deref(), Some("cat units.json"));
    }

    #[test]
    fn test_merge_cli_overrides_multiple() {
        let mut config = StylebuildConfig::default();
        let overrides = CliOverrides {
            provider: Some("./provider.sh".to_string()),
            preprocess: Some("sassc --stdin".to_string()),
            debounce_ms: Some(50),
        };

        merge_cli_overrides(&mut config, &overrides);
        assert_eq!(config.provider.command.as_deref(), Some("./provider.sh"));
        assert_eq!(config.transform.preprocess.as_deref(), Some("sassc --stdin"));
        assert_eq!(config.watch.debounce_ms, 50);
    }

    #[test]
    fn test_resolve_path_absolute() {
        let root = Path::new("/project");
        let absolute = Path::new("/other/path");
        assert_eq!(resolve_path(root, absolute), PathBuf::from("/other/path"));
    }

    #[test]
    fn test_resolve_path_relative() {
        let root = Path::new("/project");
        let relative = Path::new("static/less");
        assert_eq!(resolve_path(root, relative), PathBuf::from("/project/static/less"));
    }

    #[test]
    fn test_project_root() {
        let config_path = Path::new("/project/stylebuild.toml");
        assert_eq!(project_root(config_path), Some(Path::new("/project")));
    }
}
