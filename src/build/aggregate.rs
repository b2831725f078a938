//! Aggregate build execution.
//!
//! Runs one transform pipeline per compilation unit, all concurrently on
//! scoped worker threads, and joins them into a single result. The
//! aggregate itself never fails: every unit contributes exactly one
//! outcome, so the caller always sees all stylesheet errors at once rather
//! than the build aborting at the first one.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use crate::build::pipeline::UnitPipeline;
use crate::build::result::AggregateResult;
use crate::registry::CompilationUnit;
use crate::transform::TransformChain;

/// Default number of worker threads (available parallelism).
fn default_jobs() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

/// Aggregate build executor.
pub struct AggregateBuild {
    /// Transform chain shared by all unit pipelines
    chain: TransformChain,
    /// Project root that patterns and destinations resolve against
    root: PathBuf,
    /// Number of worker threads
    jobs: usize,
    /// Whether to log per-unit progress
    verbose: bool,
}

impl AggregateBuild {
    /// Create an aggregate build.
    pub fn new(chain: TransformChain, root: PathBuf) -> Self {
        Self { chain, root, jobs: default_jobs(), verbose: false }
    }

    /// Set the number of worker threads.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Set verbose mode.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Get the number of worker threads.
    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// Get the project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run every unit's pipeline and collect all outcomes.
    ///
    /// Returns exactly one outcome per unit, in unit order, for any N >= 0.
    /// Workers are joined before returning, so the caller never observes a
    /// partial result.
    pub fn run(&self, units: &[CompilationUnit]) -> AggregateResult {
        let start = Instant::now();
        let mut result = AggregateResult::new();

        if self.verbose && !units.is_empty() {
            println!("Building {} units ({} workers)", units.len(), self.jobs);
        }

        for outcome in self.run_units(units) {
            if self.verbose {
                println!("  {}: {}", outcome.unit, outcome.status);
            }
            result.add_outcome(outcome);
        }

        result.total_duration = start.elapsed();
        result
    }

    /// Execute unit pipelines across the worker pool.
    fn run_units(&self, units: &[CompilationUnit]) -> Vec<crate::build::result::UnitOutcome> {
        if units.is_empty() {
            return vec![];
        }

        let pipeline = UnitPipeline::new(&self.chain, &self.root);

        // Sequential path when a pool buys nothing
        if self.jobs == 1 || units.len() == 1 {
            return units.iter().map(|u| pipeline.run(u)).collect();
        }

        let results = Mutex::new(Vec::with_capacity(units.len()));
        let next_idx = AtomicUsize::new(0);

        std::thread::scope(|s| {
            let num_workers = self.jobs.min(units.len());

            for _ in 0..num_workers {
                let results = &results;
                let next_idx = &next_idx;
                let pipeline = &pipeline;

                s.spawn(move || loop {
                    let idx = next_idx.fetch_add(1, Ordering::SeqCst);
                    if idx >= units.len() {
                        break;
                    }

                    let outcome = pipeline.run(&units[idx]);
                    results.lock().unwrap().push((idx, outcome));
                });
            }
        });

        // Restore unit order regardless of completion order
        let mut results = results.into_inner().unwrap();
        results.sort_by_key(|(idx, _)| *idx);
        results.into_iter().map(|(_, outcome)| outcome).collect()
    }
}
