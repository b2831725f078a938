//! Preprocess stage: style language to plain CSS via an external command.
//!
//! The original toolchain preprocesses LESS with less.js; here the
//! preprocessor is any command reading source bytes on stdin and writing
//! CSS on stdout (default expectation: `lessc -`). An unconfigured
//! preprocessor passes input through unchanged, for projects whose units
//! are already plain CSS.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use super::{Stage, StageError};

/// Preprocess stage backed by an external command, or passthrough when no
/// command is configured.
pub struct PreprocessStage {
    command: Option<String>,
}

impl PreprocessStage {
    /// Create a stage for an optional preprocessor command.
    pub fn from_command(command: Option<String>) -> Self {
        Self { command }
    }

    /// Create a passthrough stage.
    pub fn passthrough() -> Self {
        Self { command: None }
    }

    fn run_command(&self, command: &str, input: &[u8], source: &Path) -> Result<Vec<u8>, StageError> {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                StageError::new(format!(
                    "{}: failed to start preprocessor '{}': {}",
                    source.display(),
                    command,
                    e
                ))
            })?;

        // stdin is piped, so take() cannot yield None here
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(input).map_err(|e| {
                StageError::new(format!("{}: failed to feed preprocessor: {}", source.display(), e))
            })?;
        }

        let output = child.wait_with_output().map_err(|e| {
            StageError::new(format!("{}: preprocessor did not complete: {}", source.display(), e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(StageError::new(format!(
                "{}: preprocessor '{}' failed ({}): {}",
                source.display(),
                command,
                output.status,
                stderr.trim()
            )));
        }

        Ok(output.stdout)
    }
}

impl Stage for PreprocessStage {
    fn name(&self) -> &'static str {
        "preprocess"
    }

    fn apply(&self, input: &[u8], source: &Path) -> Result<Vec<u8>, StageError> {
        match &self.command {
            Some(command) => self.run_command(command, input, source),
            None => Ok(input.to_vec()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_passthrough_without_command() {
        let stage = PreprocessStage::passthrough();
        let out = stage.apply(b"body { color: red; }", &PathBuf::from("site.css")).unwrap();
        assert_eq!(out, b"body { color: red; }");
    }

    #[test]
    fn test_command_round_trips_stdin() {
        let stage = PreprocessStage::from_command(Some("cat".to_string()));
        let out = stage.apply(b"@base: #fff;", &PathBuf::from("site.less")).unwrap();
        assert_eq!(out, b"@base: #fff;");
    }

    #[test]
    fn test_command_can_transform() {
        let stage = PreprocessStage::from_command(Some("tr 'a' 'b'".to_string()));
        let out = stage.apply(b"aaa", &PathBuf::from("x.less")).unwrap();
        assert_eq!(out, b"bbb");
    }

    #[test]
    fn test_nonzero_exit_is_stage_error() {
        let stage = PreprocessStage::from_command(Some("false".to_string()));
        let err = stage.apply(b"x", &PathBuf::from("broken.less")).unwrap_err();
        assert!(err.message.contains("broken.less"));
        assert!(err.message.contains("failed"));
    }

    #[test]
    fn test_stderr_included_in_error() {
        let stage = PreprocessStage::from_command(Some("echo 'parse error' >&2; exit 1".to_string()));
        let err = stage.apply(b"x", &PathBuf::from("broken.less")).unwrap_err();
        assert!(err.message.contains("parse error"));
    }

    #[test]
    fn test_stage_name() {
        assert_eq!(PreprocessStage::passthrough().name(), "preprocess");
    }
}
