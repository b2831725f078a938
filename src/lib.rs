//! Stylebuild - orchestrates stylesheet compilation pipelines
//!
//! This library provides functionality to:
//! - Load compilation units from an external configuration provider
//! - Run each unit through a transform pipeline (preprocess, minify, prefix)
//! - Aggregate per-unit outcomes without letting one failure abort the rest
//! - Watch source trees and rebuild on change with event coalescing

pub mod build;
pub mod cli;
pub mod config;
pub mod registry;
pub mod transform;
pub mod watch;
