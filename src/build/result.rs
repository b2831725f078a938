//! Build outcome types.
//!
//! Contains types for representing per-unit pipeline outcomes and the
//! aggregate result of one build cycle.

use std::path::PathBuf;
use std::time::Duration;

/// Status of a single compilation unit's pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitStatus {
    /// All matched files transformed and written
    Success,
    /// Pipeline aborted; carries the failing stage and a message
    Failed { stage: &'static str, message: String },
}

impl UnitStatus {
    /// Check if the status indicates success.
    pub fn is_success(&self) -> bool {
        matches!(self, UnitStatus::Success)
    }

    /// Check if the status indicates failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, UnitStatus::Failed { .. })
    }
}

impl std::fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnitStatus::Success => write!(f, "success"),
            UnitStatus::Failed { stage, message } => write!(f, "failed [{}]: {}", stage, message),
        }
    }
}

/// Outcome of one unit's transform pipeline.
///
/// Whole-unit granularity: a failure in any file fails the unit.
#[derive(Debug, Clone)]
pub struct UnitOutcome {
    /// Unit label (its destination path)
    pub unit: String,
    /// Pipeline status
    pub status: UnitStatus,
    /// Number of source files matched
    pub files: usize,
    /// Output files written
    pub outputs: Vec<PathBuf>,
    /// Pipeline duration
    pub duration: Duration,
}

impl UnitOutcome {
    /// Create a successful outcome.
    pub fn success(unit: String, files: usize, outputs: Vec<PathBuf>, duration: Duration) -> Self {
        Self { unit, status: UnitStatus::Success, files, outputs, duration }
    }

    /// Create a failed outcome.
    pub fn failed(unit: String, stage: &'static str, message: String, duration: Duration) -> Self {
        Self {
            unit,
            status: UnitStatus::Failed { stage, message },
            files: 0,
            outputs: vec![],
            duration,
        }
    }

    /// Check if this outcome is successful.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Result of one aggregate build cycle: one outcome per registered unit.
///
/// Created at the start of a cycle, reported, then discarded - never
/// persisted between cycles.
#[derive(Debug, Default)]
pub struct AggregateResult {
    /// Outcomes in unit order
    pub outcomes: Vec<UnitOutcome>,
    /// Total cycle duration
    pub total_duration: Duration,
}

impl AggregateResult {
    /// Create a new empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a unit outcome.
    pub fn add_outcome(&mut self, outcome: UnitOutcome) {
        self.outcomes.push(outcome);
    }

    /// Set the total duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.total_duration = duration;
        self
    }

    /// Number of successful units.
    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Number of failed units.
    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status.is_failure()).count()
    }

    /// Whether the whole cycle succeeded (no failed units).
    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }

    /// Total number of output files written.
    pub fn output_count(&self) -> usize {
        self.outcomes.iter().map(|o| o.outputs.len()).sum()
    }

    /// Failed unit outcomes.
    pub fn failures(&self) -> Vec<&UnitOutcome> {
        self.outcomes.iter().filter(|o| o.status.is_failure()).collect()
    }

    /// Format a human-readable summary of the cycle.
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();

        let success = self.success_count();
        let failed = self.failed_count();
        let total = self.outcomes.len();

        if failed > 0 {
            lines.push(format!(
                "Build failed: {} succeeded, {} failed ({} units)",
                success, failed, total
            ));
            for outcome in self.failures() {
                lines.push(format!("  - {}: {}", outcome.unit, outcome.status));
            }
        } else {
            lines.push(format!(
                "Build succeeded: {} units, {} files written in {:?}",
                total,
                self.output_count(),
                self.total_duration
            ));
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_status_display() {
        assert_eq!(UnitStatus::Success.to_string(), "success");
        assert_eq!(
            UnitStatus::Failed { stage: "minify", message: "bad token".to_string() }.to_string(),
            "failed [minify]: bad token"
        );
    }

    #[test]
    fn test_unit_outcome_success() {
        let outcome = UnitOutcome::success(
            "static/css".to_string(),
            2,
            vec![PathBuf::from("static/css/a.css")],
            Duration::from_millis(10),
        );

        assert!(outcome.is_success());
        assert_eq!(outcome.files, 2);
        assert_eq!(outcome.outputs.len(), 1);
    }

    #[test]
    fn test_unit_outcome_failed() {
        let outcome = UnitOutcome::failed(
            "static/css".to_string(),
            "preprocess",
            "b/x.less: parse error".to_string(),
            Duration::from_millis(5),
        );

        assert!(!outcome.is_success());
        assert!(outcome.outputs.is_empty());
    }

    #[test]
    fn test_aggregate_result_counts() {
        let mut result = AggregateResult::new();
        result.add_outcome(UnitOutcome::success("a".to_string(), 1, vec![], Duration::ZERO));
        result.add_outcome(UnitOutcome::failed(
            "b".to_string(),
            "minify",
            "error".to_string(),
            Duration::ZERO,
        ));

        assert_eq!(result.success_count(), 1);
        assert_eq!(result.failed_count(), 1);
        assert!(!result.is_success());
    }

    #[test]
    fn test_aggregate_result_empty_is_success() {
        let result = AggregateResult::new();
        assert!(result.is_success());
        assert_eq!(result.outcomes.len(), 0);
    }

    #[test]
    fn test_aggregate_result_summary_failure_lists_units() {
        let mut result = AggregateResult::new();
        result.add_outcome(UnitOutcome::success("out/a".to_string(), 1, vec![], Duration::ZERO));
        result.add_outcome(UnitOutcome::failed(
            "out/b".to_string(),
            "preprocess",
            "b/x.less: syntax".to_string(),
            Duration::ZERO,
        ));

        let summary = result.summary();
        assert!(summary.contains("Build failed"));
        assert!(summary.contains("out/b"));
        assert!(summary.contains("preprocess"));
    }

    #[test]
    fn test_aggregate_result_summary_success() {
        let mut result = AggregateResult::new();
        result.add_outcome(UnitOutcome::success(
            "out/a".to_string(),
            2,
            vec![PathBuf::from("out/a/x.css"), PathBuf::from("out/a/y.css")],
            Duration::from_millis(30),
        ));

        let summary = result.with_duration(Duration::from_millis(30)).summary();
        assert!(summary.contains("Build succeeded"));
        assert!(summary.contains("1 units"));
        assert!(summary.contains("2 files"));
    }
}
