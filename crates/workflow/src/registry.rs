//! The [`Tool`] port and the registry that binds tool names to implementations.
//!
//! Nodes refer to tools by [`ToolName`]; the engine resolves the name through a
//! [`ToolRegistry`] each time the node runs. Registries are plain values, so
//! tests build isolated ones instead of mutating shared process state.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::{EngineError, NodeConfig, Output, State, ToolError, ToolName};

/// A step handler executed at a node.
///
/// ## Contract
///
/// - Read only from `state` and `config`; never assume keys are present.
/// - Return fresh output. The engine owns merge semantics; a tool has no way to
///   mutate the state it is given.
/// - Returning `Ok(None)` is the same as returning an empty mapping.
/// - To take part in branching or looping, put the reserved `next_node` key in
///   the output: a node name to jump to, or `null` to stop. The engine strips
///   it before merging.
/// - Validate inputs here and report problems as [`ToolError`].
///
/// Any `Fn(&State, &NodeConfig) -> Result<Option<Output>, ToolError>` closure
/// that is `Send + Sync` implements this trait; wrap it in [`from_fn`] to get
/// the closure's signature inferred.
pub trait Tool: Send + Sync {
    /// Runs the tool against the current state and the node's configuration.
    fn execute(&self, state: &State, config: &NodeConfig) -> Result<Option<Output>, ToolError>;
}

impl<F> Tool for F
where
    F: Fn(&State, &NodeConfig) -> Result<Option<Output>, ToolError> + Send + Sync,
{
    fn execute(&self, state: &State, config: &NodeConfig) -> Result<Option<Output>, ToolError> {
        self(state, config)
    }
}

/// Turns a closure into a [`Tool`].
///
/// Only an identity function, but its `Fn` bound lets the compiler infer the
/// closure's argument and return types.
///
/// ```
/// use workflow::{from_fn, Output, ToolRegistry, ToolName};
///
/// let mut registry = ToolRegistry::new();
/// registry.register(
///     ToolName::new("noop").unwrap(),
///     from_fn(|_state, _config| Ok(None::<Output>)),
/// );
/// assert!(registry.contains("noop"));
/// ```
pub fn from_fn<F>(f: F) -> F
where
    F: Fn(&State, &NodeConfig) -> Result<Option<Output>, ToolError> + Send + Sync,
{
    f
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Mapping from tool name to implementation.
///
/// Registration takes `&mut self`, so it has to finish before the registry is
/// shared (typically behind an `Arc`) with running engines.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<ToolName, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name` to `tool`.
    ///
    /// Registering an already-bound name replaces the earlier binding: the last
    /// registration wins. Tests rely on this to shadow real tools with fakes.
    pub fn register(&mut self, name: ToolName, tool: impl Tool + 'static) -> &mut Self {
        if self.tools.insert(name.clone(), Arc::new(tool)).is_some() {
            tracing::debug!(tool = %name, "Replaced existing tool binding");
        } else {
            tracing::debug!(tool = %name, "Registered tool");
        }
        self
    }

    /// Looks up the tool bound to `name`.
    ///
    /// # Errors
    ///
    /// [`EngineError::ToolNotFound`] carrying the requested name and the names
    /// currently registered.
    pub fn resolve(&self, name: &ToolName) -> Result<Arc<dyn Tool>, EngineError> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::ToolNotFound {
                name: name.clone(),
                registered: self.names(),
            })
    }

    /// Returns `true` if `name` has a binding.
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Registered tool names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().map(|n| n.to_string()).collect();
        names.sort();
        names
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns `true` if no tool is registered.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn name(value: &str) -> ToolName {
        ToolName::new(value).unwrap()
    }

    fn constant(value: i64) -> impl Tool {
        from_fn(move |_, _| {
            let mut out = Output::new();
            out.insert("value".into(), json!(value));
            Ok(Some(out))
        })
    }

    #[test]
    fn resolve_returns_registered_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(name("one"), constant(1));

        let tool = registry.resolve(&name("one")).unwrap();
        let out = tool.execute(&State::new(), &NodeConfig::new()).unwrap().unwrap();
        assert_eq!(out.get("value"), Some(&json!(1)));
    }

    #[test]
    fn last_registration_wins() {
        let mut registry = ToolRegistry::new();
        registry
            .register(name("shadowed"), constant(1))
            .register(name("shadowed"), constant(2));

        assert_eq!(registry.len(), 1);
        let out = registry
            .resolve(&name("shadowed"))
            .unwrap()
            .execute(&State::new(), &NodeConfig::new())
            .unwrap()
            .unwrap();
        assert_eq!(out.get("value"), Some(&json!(2)));
    }

    #[test]
    fn missing_tool_reports_registered_names() {
        let mut registry = ToolRegistry::new();
        registry.register(name("zeta"), constant(0));
        registry.register(name("alpha"), constant(0));

        match registry.resolve(&name("missing")) {
            Err(EngineError::ToolNotFound { name, registered }) => {
                assert_eq!(name.as_str(), "missing");
                assert_eq!(registered, vec!["alpha", "zeta"]);
            }
            other => panic!("expected ToolNotFound, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn registries_are_isolated() {
        let mut first = ToolRegistry::new();
        first.register(name("only_here"), constant(0));
        let second = ToolRegistry::new();

        assert!(first.contains("only_here"));
        assert!(!second.contains("only_here"));
        assert!(second.is_empty());
    }
}
