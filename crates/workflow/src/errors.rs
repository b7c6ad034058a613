//! Error types for the workflow domain.
//!
//! [`GraphError`] covers problems found while building a [`crate::Graph`];
//! those never reach the engine. [`EngineError`] covers conditions that abort a
//! run. [`ToolError`] is what a [`crate::Tool`] reports from its own boundary;
//! the engine wraps it in [`EngineError::ToolFailed`] without interpreting it.
//!
//! None of these are retried by the engine. A run either completes or fails
//! with one of these errors, and the step that failed is never logged.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::{EmptyIdentifier, NodeName, ToolName};

// ---------------------------------------------------------------------------
// Error classification
// ---------------------------------------------------------------------------

/// Coarse classification of an [`EngineError`].
///
/// Lets transport collaborators map engine failures to a response class
/// ("not found", "bad configuration") without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The graph refers to a node or tool that does not exist.
    NotFound,
    /// The graph or a tool produced control information the engine cannot follow.
    BadConfiguration,
    /// A tool raised its own error.
    ToolFailure,
}

// ---------------------------------------------------------------------------
// Graph construction errors
// ---------------------------------------------------------------------------

/// Errors raised while building a graph from its definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// Two node definitions share a name.
    #[error("Duplicate node name '{name}'")]
    DuplicateNode {
        /// The repeated name.
        name: NodeName,
    },

    /// The designated start node is not among the declared nodes.
    #[error("Start node '{name}' is not declared in the graph")]
    UnknownStartNode {
        /// The start node that was requested.
        name: NodeName,
    },

    /// An edge refers to a node that is not declared.
    #[error("Edge '{source_node}' -> '{target_node}' refers to undeclared node '{missing}'")]
    UnknownEdgeEndpoint {
        /// Source of the offending edge.
        source_node: NodeName,
        /// Target of the offending edge.
        target_node: NodeName,
        /// Whichever endpoint is missing.
        missing: NodeName,
    },

    /// A name or identifier was empty.
    #[error(transparent)]
    InvalidName(#[from] EmptyIdentifier),
}

// ---------------------------------------------------------------------------
// Run errors
// ---------------------------------------------------------------------------

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The run transitioned to a node absent from the graph.
    ///
    /// Only reachable through a tool's next-node override; static edges are
    /// checked when the graph is built.
    #[error("Unknown node '{name}'")]
    UnknownNode {
        /// The node that was requested.
        name: NodeName,
    },

    /// A node references a tool with no registry binding.
    #[error("Tool '{name}' not found in registry. Registered: [{}]", .registered.join(", "))]
    ToolNotFound {
        /// The tool that was requested.
        name: ToolName,
        /// Names bound in the registry at the time of the lookup, sorted.
        registered: Vec<String>,
    },

    /// A tool returned a next-node override that is neither a node name nor a stop signal.
    #[error("Node '{node}' returned an invalid next node: {value}")]
    InvalidNextNode {
        /// Node whose tool produced the value.
        node: NodeName,
        /// The offending value.
        value: Value,
    },

    /// A tool returned an error.
    #[error("Tool '{tool}' failed at node '{node}'")]
    ToolFailed {
        /// Node being executed.
        node: NodeName,
        /// Tool bound to that node.
        tool: ToolName,
        /// The tool's own error.
        #[source]
        source: ToolError,
    },
}

impl EngineError {
    /// Classifies this error for callers that map failures to responses.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownNode { .. } | Self::ToolNotFound { .. } => ErrorKind::NotFound,
            Self::InvalidNextNode { .. } => ErrorKind::BadConfiguration,
            Self::ToolFailed { .. } => ErrorKind::ToolFailure,
        }
    }
}

// ---------------------------------------------------------------------------
// Tool errors
// ---------------------------------------------------------------------------

/// Errors a tool reports from its own input/output boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ToolError {
    /// A state or config key holds a value of the wrong shape.
    #[error("Invalid input '{key}': expected {expected}")]
    InvalidInput {
        /// The key that was read.
        key: String,
        /// Human-readable description of the accepted shape (e.g. `"a number"`).
        expected: &'static str,
    },

    /// Any other tool failure.
    #[error("{message}")]
    Failed {
        /// Description of the failure.
        message: String,
    },
}

impl ToolError {
    /// Shorthand for [`ToolError::Failed`].
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}
