//! Transform pipeline for a single compilation unit.
//!
//! Reads every file matching the unit's source patterns, applies the
//! ordered transform chain, and writes the results under the unit's
//! destination. All failures are captured in the returned outcome: the
//! pipeline never panics and never returns a process-level error, so one
//! broken unit cannot take down its siblings or a watch session.

use std::fs;
use std::path::Path;
use std::time::Instant;

use crate::build::discovery::{discover_files, output_path};
use crate::build::result::UnitOutcome;
use crate::config::resolve_path;
use crate::registry::CompilationUnit;
use crate::transform::TransformChain;

/// Runs one compilation unit through the transform chain.
pub struct UnitPipeline<'a> {
    chain: &'a TransformChain,
    root: &'a Path,
}

impl<'a> UnitPipeline<'a> {
    /// Create a pipeline over a shared transform chain, rooted at the
    /// project directory that patterns and destinations resolve against.
    pub fn new(chain: &'a TransformChain, root: &'a Path) -> Self {
        Self { chain, root }
    }

    /// Run the unit: discover, transform, write.
    ///
    /// A unit matching zero files succeeds with zero outputs.
    pub fn run(&self, unit: &CompilationUnit) -> UnitOutcome {
        let start = Instant::now();
        let label = unit.label();

        let files = match discover_files(self.root, &unit.source) {
            Ok(files) => files,
            Err(e) => {
                return UnitOutcome::failed(label, "discover", e.to_string(), start.elapsed())
            }
        };

        let destination = resolve_path(self.root, &unit.destination);
        let base = resolve_path(self.root, &unit.source.base());
        let mut outputs = Vec::with_capacity(files.len());

        for file in &files {
            let input = match fs::read(file) {
                Ok(bytes) => bytes,
                Err(e) => {
                    return UnitOutcome::failed(
                        label,
                        "read",
                        format!("{}: {}", file.display(), e),
                        start.elapsed(),
                    )
                }
            };

            let transformed = match self.chain.apply(input, file) {
                Ok(bytes) => bytes,
                Err((stage, e)) => {
                    return UnitOutcome::failed(label, stage, e.to_string(), start.elapsed())
                }
            };

            let out = output_path(&destination, &base, file);
            if let Some(parent) = out.parent() {
                if let Err(e) = fs::create_dir_all(parent) {
                    return UnitOutcome::failed(
                        label,
                        "write",
                        format!("{}: {}", parent.display(), e),
                        start.elapsed(),
                    );
                }
            }

            if let Err(e) = fs::write(&out, &transformed) {
                return UnitOutcome::failed(
                    label,
                    "write",
                    format!("{}: {}", out.display(), e),
                    start.elapsed(),
                );
            }

            outputs.push(out);
        }

        UnitOutcome::success(label, files.len(), outputs, start.elapsed())
    }
}
