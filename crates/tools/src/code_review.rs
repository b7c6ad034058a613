//! Code-review tools.
//!
//! Four tools that score a snippet of source code held in the `code` state key.
//! They share one running `quality_score`: each tool reads the previous value
//! (default `0.0`) and writes an updated one. [`SuggestImprovements`] closes the
//! loop by sending the run back to the issue-detection node until the score
//! reaches the configured threshold.
//!
//! | Tool | Reads | Writes |
//! |------|-------|--------|
//! | `extract_functions` | `code` | `functions`, `num_functions`, `quality_score` |
//! | `check_complexity` | `code` | `complexity_score`, `quality_score` |
//! | `detect_basic_issues` | `code` | `issues`, `issue_count`, `quality_score` |
//! | `suggest_improvements` | `quality_score`, `complexity_score`, `issue_count` | `suggestions`, `quality_score`, `next_node` |

use serde_json::{json, Value};
use workflow::{NodeConfig, Output, State, Tool, ToolError, NEXT_NODE_KEY};

use crate::input;

/// Lines longer than this are reported as an issue.
const MAX_LINE_LENGTH: usize = 120;

/// Complexity above which one quality point is deducted.
const MODERATE_COMPLEXITY: usize = 20;

/// Complexity above which two quality points are deducted.
const HIGH_COMPLEXITY: usize = 50;

/// Quality threshold used when the node config does not set one.
pub const DEFAULT_THRESHOLD: f64 = 6.0;

/// Node the suggestion step loops back to when the config does not name one.
pub const DEFAULT_RETRY_NODE: &str = "detect_issues";

fn code(state: &State) -> Result<&str, ToolError> {
    Ok(input::string(state.as_map(), "code")?.unwrap_or_default())
}

fn quality(state: &State) -> Result<f64, ToolError> {
    Ok(input::number(state.as_map(), "quality_score")?.unwrap_or(0.0))
}

/// Splits on `\n`, `\r\n` and a bare `\r`.
fn source_lines(code: &str) -> impl Iterator<Item = &str> {
    code.lines().flat_map(|line| line.split('\r'))
}

fn into_output(value: Value) -> Output {
    match value {
        Value::Object(map) => map,
        _ => Output::new(),
    }
}

// ---------------------------------------------------------------------------

/// Lists the `def` lines of the snippet.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractFunctions;

impl Tool for ExtractFunctions {
    fn execute(&self, state: &State, _config: &NodeConfig) -> Result<Option<Output>, ToolError> {
        let functions: Vec<&str> = source_lines(code(state)?)
            .map(str::trim)
            .filter(|line| line.starts_with("def "))
            .collect();
        tracing::debug!(count = functions.len(), "Extracted functions");

        Ok(Some(into_output(json!({
            "num_functions": functions.len(),
            "functions": functions,
            "quality_score": quality(state)? + 1.0,
        }))))
    }
}

// ---------------------------------------------------------------------------

/// Scores complexity as non-blank lines plus two per loop line.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckComplexity;

impl Tool for CheckComplexity {
    fn execute(&self, state: &State, _config: &NodeConfig) -> Result<Option<Output>, ToolError> {
        let lines: Vec<&str> = source_lines(code(state)?)
            .filter(|line| !line.trim().is_empty())
            .collect();
        let loops = lines
            .iter()
            .filter(|line| line.contains("for ") || line.contains("while "))
            .count();

        let score = lines.len() + 2 * loops;
        let penalty = if score > HIGH_COMPLEXITY {
            2.0
        } else if score > MODERATE_COMPLEXITY {
            1.0
        } else {
            0.0
        };
        tracing::debug!(score, penalty, "Checked complexity");

        Ok(Some(into_output(json!({
            "complexity_score": score,
            "quality_score": quality(state)? + 1.0 - penalty,
        }))))
    }
}

// ---------------------------------------------------------------------------

/// Flags TODO comments and overlong lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetectBasicIssues;

impl Tool for DetectBasicIssues {
    fn execute(&self, state: &State, _config: &NodeConfig) -> Result<Option<Output>, ToolError> {
        let code = code(state)?;
        let todos = source_lines(code).filter(|line| line.contains("TODO")).count();
        let long_lines = source_lines(code)
            .filter(|line| line.chars().count() > MAX_LINE_LENGTH)
            .count();

        let mut issues = Vec::new();
        if todos > 0 {
            issues.push(format!("{todos} TODO comments"));
        }
        if long_lines > 0 {
            issues.push(format!("{long_lines} long lines"));
        }
        tracing::debug!(todos, long_lines, "Detected basic issues");

        let score = (quality(state)? + 1.2 - 0.3 * issues.len() as f64).max(0.0);
        Ok(Some(into_output(json!({
            "issue_count": issues.len(),
            "issues": issues,
            "quality_score": score,
        }))))
    }
}

// ---------------------------------------------------------------------------

/// Produces suggestions and decides whether another review pass is needed.
///
/// Config:
/// - `threshold` (number, default [`DEFAULT_THRESHOLD`]): quality at which the
///   run stops.
/// - `retry_node` (string, default [`DEFAULT_RETRY_NODE`]): node to loop back to
///   while the quality is below the threshold.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuggestImprovements;

impl Tool for SuggestImprovements {
    fn execute(&self, state: &State, config: &NodeConfig) -> Result<Option<Output>, ToolError> {
        let threshold = input::number(config, "threshold")?.unwrap_or(DEFAULT_THRESHOLD);
        let retry_node = input::string(config, "retry_node")?.unwrap_or(DEFAULT_RETRY_NODE);
        let quality = quality(state)?;
        let complexity = input::number(state.as_map(), "complexity_score")?.unwrap_or(0.0);
        let issue_count = input::number(state.as_map(), "issue_count")?.unwrap_or(0.0);

        let mut suggestions = Vec::new();
        if complexity > HIGH_COMPLEXITY as f64 {
            suggestions.push("Reduce complexity.");
        }
        if issue_count > 0.0 {
            suggestions.push("Fix style & TODO issues.");
        }
        if suggestions.is_empty() {
            suggestions.push("Add type hints & docstrings.");
        }

        let next = if quality >= threshold {
            Value::Null
        } else {
            Value::from(retry_node)
        };
        tracing::debug!(quality, threshold, next = %next, "Suggested improvements");

        let mut output = into_output(json!({
            "suggestions": suggestions,
            "quality_score": quality + 1.0,
        }));
        output.insert(NEXT_NODE_KEY.to_owned(), next);
        Ok(Some(output))
    }
}
