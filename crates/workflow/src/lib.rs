//! Graph workflow domain: model, tool registry and step-loop engine.
//!
//! A workflow is a directed graph of named nodes. Each node runs a [`Tool`]
//! looked up by name in a [`ToolRegistry`]. The [`GraphEngine`] threads a
//! schema-less [`State`] through the nodes one at a time, merging each tool's
//! output into it and recording an [`ExecutionStep`] per node executed. Tools
//! steer the run by returning the reserved [`NEXT_NODE_KEY`]; otherwise the
//! first matching edge of the graph decides what runs next.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate performs no I/O. Storage
//! and transport collaborators consume [`RunRecord`]s and drive [`Execution`]s;
//! they never reimplement the loop.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`NodeName`, `ToolName`, `GraphId`, `RunId`) |
//! | [`state`] | Run state and step log entries |
//! | [`graph`] | Graph definitions and the validated [`Graph`] |
//! | [`registry`] | The [`Tool`] port and [`ToolRegistry`] |
//! | [`engine`] | [`GraphEngine`], [`Execution`] and run outcomes |
//! | [`record`] | [`RunRecord`] audit records |
//! | [`errors`] | Graph, engine and tool error types |
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use serde_json::json;
//! use workflow::{from_fn, Graph, GraphEngine, State, ToolName, ToolRegistry};
//!
//! let mut registry = ToolRegistry::new();
//! registry.register(
//!     ToolName::new("increment").unwrap(),
//!     from_fn(|state, _config| {
//!         let count = state.get("count").and_then(|v| v.as_i64()).unwrap_or(0);
//!         let mut out = workflow::Output::new();
//!         out.insert("count".into(), json!(count + 1));
//!         Ok(Some(out))
//!     }),
//! );
//!
//! let graph: Graph = serde_json::from_value(json!({
//!     "nodes": [
//!         { "name": "a", "tool": "increment" },
//!         { "name": "b", "tool": "increment" }
//!     ],
//!     "edges": [{ "source": "a", "target": "b" }],
//!     "start_node": "a"
//! }))
//! .unwrap();
//!
//! let engine = GraphEngine::new(Arc::new(registry));
//! let outcome = engine.run(&graph, State::new()).unwrap();
//! assert_eq!(outcome.final_state.get("count"), Some(&json!(2)));
//! assert_eq!(outcome.log.len(), 2);
//! ```

pub mod engine;
pub mod errors;
pub mod graph;
pub mod identifiers;
pub mod record;
pub mod registry;
pub mod state;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use engine::{
    EngineConfig, Execution, ExecutionStatus, GraphEngine, HaltReason, RunOutcome,
    DEFAULT_MAX_STEPS, NEXT_NODE_KEY,
};
pub use errors::{EngineError, ErrorKind, GraphError, ToolError};
pub use graph::{Edge, Graph, GraphDefinition, Node};
pub use identifiers::{EmptyIdentifier, GraphId, NodeName, RunId, ToolName};
pub use record::{RunRecord, Timestamp};
pub use registry::{from_fn, Tool, ToolRegistry};
pub use state::{ExecutionStep, NodeConfig, Output, State};
