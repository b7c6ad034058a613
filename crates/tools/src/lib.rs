//! Reference tool implementations for the workflow engine.
//!
//! This crate provides the code-review tools (function extraction, complexity
//! check, basic issue detection, improvement suggestions) and the example graph
//! that wires them into a review loop.
//!
//! ## Architectural Layer
//!
//! **Plugins.** Every tool here implements [`workflow::Tool`] and is bound into a
//! [`workflow::ToolRegistry`] at start-up by [`register_code_review_tools`]. The
//! engine knows nothing about them.

pub mod code_review;
mod input;
pub mod workflows;

use workflow::{EmptyIdentifier, Tool, ToolName, ToolRegistry};

pub use code_review::{CheckComplexity, DetectBasicIssues, ExtractFunctions, SuggestImprovements};
pub use workflows::code_review_graph;

/// Registry names of the code-review tools.
pub mod names {
    /// [`crate::ExtractFunctions`]
    pub const EXTRACT_FUNCTIONS: &str = "extract_functions";
    /// [`crate::CheckComplexity`]
    pub const CHECK_COMPLEXITY: &str = "check_complexity";
    /// [`crate::DetectBasicIssues`]
    pub const DETECT_BASIC_ISSUES: &str = "detect_basic_issues";
    /// [`crate::SuggestImprovements`]
    pub const SUGGEST_IMPROVEMENTS: &str = "suggest_improvements";
}

/// Registers the four code-review tools under their [`names`].
///
/// Existing bindings with the same names are replaced.
///
/// # Errors
///
/// [`EmptyIdentifier`] if a tool name is empty; nothing after it is registered.
pub fn register_code_review_tools(
    registry: &mut ToolRegistry,
) -> Result<&mut ToolRegistry, EmptyIdentifier> {
    bind(registry, names::EXTRACT_FUNCTIONS, ExtractFunctions)?;
    bind(registry, names::CHECK_COMPLEXITY, CheckComplexity)?;
    bind(registry, names::DETECT_BASIC_ISSUES, DetectBasicIssues)?;
    bind(registry, names::SUGGEST_IMPROVEMENTS, SuggestImprovements)?;

    tracing::info!(tools = ?registry.names(), "Registered code-review tools");
    Ok(registry)
}

fn bind(
    registry: &mut ToolRegistry,
    name: &str,
    tool: impl Tool + 'static,
) -> Result<(), EmptyIdentifier> {
    registry.register(ToolName::try_from(name)?, tool);
    Ok(())
}
