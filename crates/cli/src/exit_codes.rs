//! Stable exit codes for graphrun commands.

use workflow::{EngineError, ErrorKind};

/// Command succeeded.
pub const OK: i32 = 0;
/// Invalid input, configuration or graph, or any other failure.
pub const INVALID: i32 = 1;
/// A node or tool named by the graph does not exist.
pub const NOT_FOUND: i32 = 2;
/// A tool raised an error during execution.
pub const TOOL_FAILURE: i32 = 3;

/// Maps a command failure to its exit code.
///
/// Engine errors anywhere in the context chain are classified by their
/// [`ErrorKind`]; everything else is [`INVALID`].
pub fn for_error(err: &anyhow::Error) -> i32 {
    match err.chain().find_map(|cause| cause.downcast_ref::<EngineError>()) {
        Some(engine) => match engine.kind() {
            ErrorKind::NotFound => NOT_FOUND,
            ErrorKind::ToolFailure => TOOL_FAILURE,
            ErrorKind::BadConfiguration => INVALID,
        },
        None => INVALID,
    }
}

/// Maps a command-line parsing failure to its exit code.
///
/// `--help` and `--version` surface as errors that belong on stdout; those
/// are [`OK`]. Every other usage error is [`INVALID`].
pub fn for_usage_error(err: &clap::Error) -> i32 {
    if err.use_stderr() {
        INVALID
    } else {
        OK
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use serde_json::json;
    use workflow::{NodeName, ToolError, ToolName};

    fn node(name: &str) -> NodeName {
        NodeName::new(name).unwrap()
    }

    #[test]
    fn engine_errors_map_by_kind() {
        let not_found = anyhow::Error::new(EngineError::UnknownNode { name: node("ghost") });
        assert_eq!(for_error(&not_found), NOT_FOUND);

        let failed = anyhow::Error::new(EngineError::ToolFailed {
            node: node("a"),
            tool: ToolName::new("t").unwrap(),
            source: ToolError::failed("boom"),
        });
        assert_eq!(for_error(&failed), TOOL_FAILURE);

        let bad = anyhow::Error::new(EngineError::InvalidNextNode {
            node: node("a"),
            value: json!(42),
        });
        assert_eq!(for_error(&bad), INVALID);
    }

    #[test]
    fn context_does_not_hide_the_engine_error() {
        let err = Err::<(), _>(EngineError::UnknownNode { name: node("ghost") })
            .context("run graph")
            .unwrap_err();
        assert_eq!(for_error(&err), NOT_FOUND);
    }

    #[test]
    fn other_errors_are_invalid() {
        assert_eq!(for_error(&anyhow::anyhow!("bad json")), INVALID);
    }
}
