//! Minify and vendor-prefix stages backed by lightningcss.
//!
//! Both stages parse the stylesheet; minification strips whitespace and
//! collapses values, prefixing emits vendor-prefixed declarations for the
//! configured minimum browser versions.

use std::path::Path;

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::Browsers;

use super::{Stage, StageError};
use crate::config::{parse_version, TargetsConfig};

/// Built-in minimum browser versions, used when the config sets none.
///
/// Roughly the "last 10 versions" support window the original gulp setup
/// asked of autoprefixer.
pub fn default_browsers() -> Browsers {
    Browsers {
        chrome: parse_version("49"),
        firefox: parse_version("52"),
        edge: parse_version("14"),
        safari: parse_version("9.1"),
        ios_saf: parse_version("9.3"),
        opera: parse_version("36"),
        samsung: parse_version("5"),
        ..Browsers::default()
    }
}

/// Convert configured target versions into prefixer browser targets.
///
/// Versions were already validated by the config layer; unparsable values
/// are ignored here. An entirely empty table yields the defaults.
pub fn browsers_from_config(targets: &TargetsConfig) -> Browsers {
    if targets.is_empty() {
        return default_browsers();
    }

    let parse = |v: &Option<String>| v.as_deref().and_then(parse_version);

    Browsers {
        chrome: parse(&targets.chrome),
        firefox: parse(&targets.firefox),
        safari: parse(&targets.safari),
        edge: parse(&targets.edge),
        ios_saf: parse(&targets.ios),
        android: parse(&targets.android),
        samsung: parse(&targets.samsung),
        ..Browsers::default()
    }
}

fn utf8<'a>(input: &'a [u8], source: &Path) -> Result<&'a str, StageError> {
    std::str::from_utf8(input)
        .map_err(|e| StageError::new(format!("{}: not valid UTF-8: {}", source.display(), e)))
}

/// Minification stage: parse and re-print the stylesheet in compact form.
#[derive(Default)]
pub struct MinifyStage;

impl MinifyStage {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for MinifyStage {
    fn name(&self) -> &'static str {
        "minify"
    }

    fn apply(&self, input: &[u8], source: &Path) -> Result<Vec<u8>, StageError> {
        let css = utf8(input, source)?;
        let filename = source.display().to_string();

        let mut sheet = StyleSheet::parse(css, ParserOptions { filename, ..ParserOptions::default() })
            .map_err(|e| StageError::new(format!("{}: {}", source.display(), e)))?;

        sheet
            .minify(MinifyOptions::default())
            .map_err(|e| StageError::new(format!("{}: {}", source.display(), e)))?;

        let output = sheet
            .to_css(PrinterOptions { minify: true, ..PrinterOptions::default() })
            .map_err(|e| StageError::new(format!("{}: {}", source.display(), e)))?;

        Ok(output.code.into_bytes())
    }
}

/// Vendor-prefix stage: re-print the stylesheet with prefixed declarations
/// for the target browsers.
pub struct PrefixStage {
    browsers: Browsers,
}

impl PrefixStage {
    pub fn new(browsers: Browsers) -> Self {
        Self { browsers }
    }
}

impl Stage for PrefixStage {
    fn name(&self) -> &'static str {
        "vendor-prefix"
    }

    fn apply(&self, input: &[u8], source: &Path) -> Result<Vec<u8>, StageError> {
        let css = utf8(input, source)?;
        let filename = source.display().to_string();

        let mut sheet = StyleSheet::parse(css, ParserOptions { filename, ..ParserOptions::default() })
            .map_err(|e| StageError::new(format!("{}: {}", source.display(), e)))?;

        sheet
            .minify(MinifyOptions { targets: self.browsers.into(), ..MinifyOptions::default() })
            .map_err(|e| StageError::new(format!("{}: {}", source.display(), e)))?;

        let output = sheet
            .to_css(PrinterOptions {
                minify: true,
                targets: self.browsers.into(),
                ..PrinterOptions::default()
            })
            .map_err(|e| StageError::new(format!("{}: {}", source.display(), e)))?;

        Ok(output.code.into_bytes())
    }
}
