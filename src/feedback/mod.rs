//! Structured Feedback Module
//!
//! Machine-readable output for tools driving the CLI:
//! - JSON error reports with fix suggestions
//! - Graph statistics before and after optimization

use serde::{Deserialize, Serialize};

use crate::middle::graph::Graph;
use crate::utils::Error;

// ==================== Structured Error Report ====================

/// A structured error report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Error code (e.g., "E0001")
    pub code: String,

    pub severity: Severity,

    /// Human-readable message
    pub message: String,

    /// Input file the error came from
    pub file: String,

    /// Suggested fixes, most likely first
    pub suggestions: Vec<Suggestion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    /// Description of the fix
    pub message: String,

    /// Confidence in this suggestion (0.0 - 1.0)
    pub confidence: f64,
}

impl ErrorReport {
    /// Create an error report from a validation or input error
    pub fn from_error(error: &Error, file_name: &str) -> Self {
        let mut report = Self {
            code: error.code().to_string(),
            severity: Severity::Error,
            message: error.to_string(),
            file: file_name.to_string(),
            suggestions: suggestions_for(error),
        };
        report.sort_suggestions();
        report
    }

    /// Sort suggestions by confidence (highest first)
    pub fn sort_suggestions(&mut self) {
        self.suggestions.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }
}

fn suggestion(message: String, confidence: f64) -> Suggestion {
    Suggestion { message, confidence }
}

fn suggestions_for(error: &Error) -> Vec<Suggestion> {
    match error {
        Error::QuantifierBounds { min, max } => vec![
            suggestion(format!("Swap the bounds: from {} to {}", max, min), 0.8),
            suggestion("Omit max for an unbounded quantifier".to_string(), 0.4),
        ],
        Error::RangeOrder { start, end } => vec![suggestion(
            format!("Write the range as {}-{}", end, start),
            0.9,
        )],
        Error::InvalidClassMember(kind) => vec![suggestion(
            format!(
                "Move the {} out of the character class; classes hold text, char flags and ranges",
                kind
            ),
            0.7,
        )],
        Error::InvalidCondition(kind) => vec![
            suggestion(
                "Use a subexpression call or a lookaround as the condition".to_string(),
                0.8,
            ),
            suggestion(format!("Wrap the {} in a lookahead", kind), 0.5),
        ],
        Error::DuplicatePartId(id) => vec![
            suggestion(format!("Give one of the parts with id {} a fresh id", id), 0.8),
            suggestion("Drop explicit ids and let the compiler assign them".to_string(), 0.6),
        ],
        Error::Io(_) => vec![suggestion("Check the file path and permissions".to_string(), 0.5)],
        Error::Json(_) => vec![suggestion(
            "Every part needs a snake_case \"type\" tag; bounds must be non-negative".to_string(),
            0.5,
        )],
    }
}

// ==================== Compilation Feedback ====================

/// Size of an explaining graph
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    pub clusters: usize,
}

impl GraphStats {
    pub fn of(graph: &Graph) -> Self {
        Self {
            nodes: graph.node_count(),
            edges: graph.edge_count(),
            clusters: graph.cluster_count(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompilationStats {
    /// Graph straight out of lowering
    pub lowered: GraphStats,

    /// Graph after the optimizer, if it ran
    pub optimized: Option<GraphStats>,

    /// Next free id after compilation
    pub next_id: u64,

    /// Total time
    pub total_time_ms: u64,
}

/// Complete compilation feedback
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilationFeedback {
    pub success: bool,

    /// Source file
    pub source_file: String,

    /// All errors
    pub diagnostics: Vec<ErrorReport>,

    pub stats: CompilationStats,
}

impl CompilationFeedback {
    pub fn success(source_file: String, stats: CompilationStats) -> Self {
        Self {
            success: true,
            source_file,
            diagnostics: vec![],
            stats,
        }
    }

    pub fn failure(source_file: String, errors: Vec<ErrorReport>, stats: CompilationStats) -> Self {
        Self {
            success: false,
            source_file,
            diagnostics: errors,
            stats,
        }
    }

    /// Output as JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Output as compact JSON (for programmatic use)
    pub fn to_json_compact(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_report_from_error() {
        let report = ErrorReport::from_error(&Error::QuantifierBounds { min: 5, max: 2 }, "p.json");
        assert_eq!(report.code, "E0001");
        assert_eq!(report.severity, Severity::Error);
        assert_eq!(report.file, "p.json");
        assert_eq!(report.suggestions[0].message, "Swap the bounds: from 2 to 5");
    }

    #[test]
    fn test_condition_suggestion_names_allowed_kinds() {
        let report = ErrorReport::from_error(&Error::InvalidCondition("Text".to_string()), "p.json");
        assert_eq!(report.code, "E0004");
        assert_eq!(
            report.suggestions[0].message,
            "Use a subexpression call or a lookaround as the condition"
        );
        assert!(report.suggestions.iter().all(|s| !s.message.contains("backreference")));
    }

    #[test]
    fn test_suggestions_sorted() {
        let report = ErrorReport::from_error(&Error::DuplicatePartId(3), "p.json");
        let confidences: Vec<f64> = report.suggestions.iter().map(|s| s.confidence).collect();
        assert_eq!(confidences, vec![0.8, 0.6]);
    }

    #[test]
    fn test_feedback_json() {
        let stats = CompilationStats {
            lowered: GraphStats { nodes: 4, edges: 3, clusters: 0 },
            optimized: Some(GraphStats { nodes: 3, edges: 2, clusters: 0 }),
            next_id: 8,
            total_time_ms: 0,
        };
        let json = CompilationFeedback::success("p.json".to_string(), stats).to_json_compact();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["stats"]["lowered"]["nodes"], 4);
        assert_eq!(value["stats"]["optimized"]["edges"], 2);
        assert_eq!(value["diagnostics"].as_array().map(Vec::len), Some(0));
    }

    #[test]
    fn test_failure_carries_diagnostics() {
        let report = ErrorReport::from_error(&Error::Json("missing field `type`".to_string()), "p.json");
        let feedback =
            CompilationFeedback::failure("p.json".to_string(), vec![report], CompilationStats::default());
        assert!(!feedback.success);
        assert_eq!(feedback.diagnostics[0].code, "E0101");
        assert!(feedback.to_json().contains("\"E0101\""));
    }
}
