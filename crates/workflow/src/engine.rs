//! The step loop: the only place run-time control flow is decided.
//!
//! [`GraphEngine::run`] executes a graph to completion. Callers that need to
//! observe each step as it happens (e.g. a streaming transport) use
//! [`GraphEngine::start`] and drive the returned [`Execution`] one step at a
//! time; `run` is built on the same [`Execution`], so successor resolution and
//! control-key stripping cannot drift between the two.
//!
//! ## One step
//!
//! 1. Resolve the current node in the graph and its tool in the registry.
//! 2. Execute the tool against the current state and the node's config.
//! 3. Remove the reserved [`NEXT_NODE_KEY`] from the output.
//! 4. Merge the rest into state and append an [`ExecutionStep`].
//! 5. Pick the next node: the tool's override if it gave one (a `null` override
//!    means stop), otherwise the graph's default successor.
//!
//! The run halts when there is no next node ([`HaltReason::Completed`]) or when
//! the step counter reaches `max_steps` ([`HaltReason::StepLimit`]). Any error
//! aborts the run before the failing step is logged.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{EngineError, ExecutionStep, Graph, NodeName, Output, State, ToolRegistry};

/// Reserved output key a tool uses to choose the next node.
pub const NEXT_NODE_KEY: &str = "next_node";

/// Step ceiling applied when the configuration does not set one.
pub const DEFAULT_MAX_STEPS: u32 = 100;

// ---------------------------------------------------------------------------
// Configuration and results
// ---------------------------------------------------------------------------

/// Engine settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Maximum number of steps a single run may execute.
    ///
    /// Bounds runs whose tools keep looping. `0` halts every run before its
    /// first step.
    pub max_steps: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HaltReason {
    /// The last step produced no next node.
    Completed,
    /// The step counter reached `max_steps`.
    StepLimit,
}

/// Where an [`Execution`] currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    /// More steps will run.
    Running,
    /// No further steps will run.
    Halted(HaltReason),
}

/// Result of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    /// State after the last step.
    pub final_state: State,

    /// One entry per executed step, in order.
    pub log: Vec<ExecutionStep>,

    /// Why the run stopped.
    pub halt: HaltReason,

    /// How many times each node ran.
    pub visits: BTreeMap<NodeName, u32>,
}

/// What the tool asked for via [`NEXT_NODE_KEY`].
#[derive(Debug, Clone, PartialEq, Eq)]
enum Transition {
    /// No override; follow the graph's default edge.
    Default,
    /// Jump to the named node.
    Goto(NodeName),
    /// Stop after this step.
    Stop,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Executes graphs against a shared tool registry.
///
/// Holds no per-run state; one engine can serve any number of concurrent runs.
#[derive(Debug, Clone)]
pub struct GraphEngine {
    registry: Arc<ToolRegistry>,
    config: EngineConfig,
}

impl GraphEngine {
    /// Creates an engine with the default configuration.
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self::with_config(registry, EngineConfig::default())
    }

    /// Creates an engine with an explicit configuration.
    pub fn with_config(registry: Arc<ToolRegistry>, config: EngineConfig) -> Self {
        Self { registry, config }
    }

    /// The registry tools are resolved from.
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// The engine's configuration.
    pub fn config(&self) -> EngineConfig {
        self.config
    }

    /// Begins a run without executing any step.
    pub fn start<'a>(&'a self, graph: &'a Graph, initial_state: State) -> Execution<'a> {
        let status = if self.config.max_steps == 0 {
            ExecutionStatus::Halted(HaltReason::StepLimit)
        } else {
            ExecutionStatus::Running
        };

        Execution {
            span: tracing::info_span!(
                "graph_run",
                graph_id = %graph.id(),
                max_steps = self.config.max_steps
            ),
            graph,
            registry: &self.registry,
            max_steps: self.config.max_steps,
            state: initial_state,
            log: Vec::new(),
            current: Some(graph.start_node().clone()),
            steps: 0,
            visits: BTreeMap::new(),
            status,
        }
    }

    /// Runs `graph` from its start node until it halts.
    ///
    /// # Errors
    ///
    /// Any [`EngineError`]; the run is abandoned and no partial outcome is returned.
    pub fn run(&self, graph: &Graph, initial_state: State) -> Result<RunOutcome, EngineError> {
        self.start(graph, initial_state).finish()
    }
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// One in-flight run.
///
/// Owns the run's state and log exclusively; borrows the graph and registry.
#[derive(Debug)]
pub struct Execution<'a> {
    span: tracing::Span,
    graph: &'a Graph,
    registry: &'a ToolRegistry,
    max_steps: u32,
    state: State,
    log: Vec<ExecutionStep>,
    current: Option<NodeName>,
    steps: u32,
    visits: BTreeMap<NodeName, u32>,
    status: ExecutionStatus,
}

impl<'a> Execution<'a> {
    /// Executes the next step.
    ///
    /// Returns the logged step, or `None` once the run has halted.
    ///
    /// # Errors
    ///
    /// - [`EngineError::UnknownNode`] if the current node is not in the graph.
    /// - [`EngineError::ToolNotFound`] if the node's tool is not registered.
    /// - [`EngineError::ToolFailed`] if the tool returns an error.
    /// - [`EngineError::InvalidNextNode`] if the override is not a string or `null`.
    ///
    /// After an error the execution must be discarded; nothing was logged for
    /// the failed step.
    pub fn step(&mut self) -> Result<Option<&ExecutionStep>, EngineError> {
        if self.status != ExecutionStatus::Running {
            return Ok(None);
        }
        let Some(current) = self.current.clone() else {
            return Ok(None);
        };
        let span = self.span.clone();
        let _entered = span.enter();
        let graph = self.graph;

        let node = graph
            .node(current.as_str())
            .ok_or_else(|| EngineError::UnknownNode {
                name: current.clone(),
            })?;
        let tool = self.registry.resolve(&node.tool)?;

        let mut output = tool
            .execute(&self.state, &node.config)
            .map_err(|source| EngineError::ToolFailed {
                node: current.clone(),
                tool: node.tool.clone(),
                source,
            })?
            .unwrap_or_default();
        let transition = take_transition(&mut output, &current)?;

        self.state.merge(output.clone());
        self.steps += 1;
        *self.visits.entry(current.clone()).or_insert(0) += 1;

        let next = match transition {
            Transition::Goto(target) => Some(target),
            Transition::Stop => None,
            Transition::Default => graph.default_successor(current.as_str()).cloned(),
        };

        tracing::info!(
            step = self.steps,
            node = %current,
            tool = %node.tool,
            next = next.as_ref().map(NodeName::as_str).unwrap_or("<end>"),
            "Executed step"
        );

        self.log.push(ExecutionStep {
            step: self.steps,
            node: current,
            output,
            state: self.state.clone(),
        });

        if next.is_none() {
            self.halt(HaltReason::Completed);
        } else if self.steps >= self.max_steps {
            self.halt(HaltReason::StepLimit);
        }
        self.current = next;

        Ok(self.log.last())
    }

    /// Executes the remaining steps and returns the outcome.
    ///
    /// # Errors
    ///
    /// The first error returned by [`Execution::step`].
    pub fn finish(mut self) -> Result<RunOutcome, EngineError> {
        while self.step()?.is_some() {}

        let halt = match self.status {
            ExecutionStatus::Halted(reason) => reason,
            // step() only returns None once halted
            ExecutionStatus::Running => HaltReason::Completed,
        };

        Ok(RunOutcome {
            final_state: self.state,
            log: self.log,
            halt,
            visits: self.visits,
        })
    }

    /// Current run status.
    pub fn status(&self) -> ExecutionStatus {
        self.status
    }

    /// State after the most recent step.
    pub fn state(&self) -> &State {
        &self.state
    }

    /// Steps logged so far.
    pub fn log(&self) -> &[ExecutionStep] {
        &self.log
    }

    /// Node the next step will execute, if the run is still going.
    pub fn current_node(&self) -> Option<&NodeName> {
        match self.status {
            ExecutionStatus::Running => self.current.as_ref(),
            ExecutionStatus::Halted(_) => None,
        }
    }

    /// Number of times each node has run so far.
    ///
    /// Telemetry only; the engine never consults it.
    pub fn visits(&self) -> &BTreeMap<NodeName, u32> {
        &self.visits
    }

    fn halt(&mut self, reason: HaltReason) {
        match reason {
            HaltReason::Completed => {
                tracing::info!(
                    reason = ?reason,
                    steps = self.steps,
                    graph_id = %self.graph.id(),
                    "Run completed"
                );
            }
            HaltReason::StepLimit => {
                tracing::warn!(
                    reason = ?reason,
                    steps = self.steps,
                    max_steps = self.max_steps,
                    graph_id = %self.graph.id(),
                    "Run halted at step limit"
                );
            }
        }
        self.status = ExecutionStatus::Halted(reason);
    }
}

/// Removes [`NEXT_NODE_KEY`] from `output` and interprets it.
fn take_transition(output: &mut Output, node: &NodeName) -> Result<Transition, EngineError> {
    match output.remove(NEXT_NODE_KEY) {
        None => Ok(Transition::Default),
        Some(Value::Null) => Ok(Transition::Stop),
        // an empty name is the same stop signal as null
        Some(Value::String(target)) => {
            Ok(NodeName::new(target).map_or(Transition::Stop, Transition::Goto))
        }
        Some(value) => Err(EngineError::InvalidNextNode {
            node: node.clone(),
            value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{from_fn, Edge, GraphDefinition, Node, ToolError, ToolName};
    use serde_json::json;

    fn n(name: &str) -> NodeName {
        NodeName::new(name).unwrap()
    }

    fn t(name: &str) -> ToolName {
        ToolName::new(name).unwrap()
    }

    fn output(value: Value) -> Output {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected a JSON object"),
        }
    }

    fn graph(nodes: &[(&str, &str)], edges: &[(&str, &str)], start: &str) -> Graph {
        Graph::from_definition(GraphDefinition {
            graph_id: None,
            nodes: nodes.iter().map(|(name, tool)| Node::new(n(name), t(tool))).collect(),
            edges: edges.iter().map(|(s, t)| Edge::new(n(s), n(t))).collect(),
            start_node: n(start),
        })
        .unwrap()
    }

    fn registry_with(
        name: &str,
        body: impl Fn(&State) -> Output + Send + Sync + 'static,
    ) -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry.register(t(name), from_fn(move |state, _| Ok(Some(body(state)))));
        Arc::new(registry)
    }

    #[test]
    fn take_transition_interprets_override() {
        let node = n("x");
        let mut out = output(json!({ "a": 1 }));
        assert_eq!(take_transition(&mut out, &node).unwrap(), Transition::Default);

        let mut out = output(json!({ "next_node": "y", "a": 1 }));
        assert_eq!(take_transition(&mut out, &node).unwrap(), Transition::Goto(n("y")));
        assert!(!out.contains_key(NEXT_NODE_KEY));

        let mut out = output(json!({ "next_node": null }));
        assert_eq!(take_transition(&mut out, &node).unwrap(), Transition::Stop);

        let mut out = output(json!({ "next_node": "" }));
        assert_eq!(take_transition(&mut out, &node).unwrap(), Transition::Stop);

        let mut out = output(json!({ "next_node": 7 }));
        assert!(matches!(
            take_transition(&mut out, &node),
            Err(EngineError::InvalidNextNode { value, .. }) if value == json!(7)
        ));
    }

    #[test]
    fn stepping_exposes_each_step() {
        let graph = graph(&[("a", "mark"), ("b", "mark")], &[("a", "b")], "a");
        let registry = registry_with("mark", |_| output(json!({ "seen": true })));
        let engine = GraphEngine::new(registry);

        let mut execution = engine.start(&graph, State::new());
        assert_eq!(execution.current_node(), Some(&n("a")));

        let first = execution.step().unwrap().unwrap().clone();
        assert_eq!((first.step, first.node.as_str()), (1, "a"));
        assert_eq!(execution.status(), ExecutionStatus::Running);

        let second = execution.step().unwrap().unwrap().clone();
        assert_eq!((second.step, second.node.as_str()), (2, "b"));
        assert_eq!(execution.status(), ExecutionStatus::Halted(HaltReason::Completed));
        assert!(execution.current_node().is_none());

        assert!(execution.step().unwrap().is_none());
        let outcome = execution.finish().unwrap();
        assert_eq!(outcome.log.len(), 2);
    }

    #[test]
    fn none_output_counts_as_empty() {
        let graph = graph(&[("a", "quiet")], &[], "a");
        let mut registry = ToolRegistry::new();
        registry.register(t("quiet"), from_fn(|_, _| Ok(None)));
        let engine = GraphEngine::new(Arc::new(registry));

        let initial: State = [("k".to_string(), json!(1))].into_iter().collect();
        let outcome = engine.run(&graph, initial.clone()).unwrap();

        assert_eq!(outcome.final_state, initial);
        assert!(outcome.log[0].output.is_empty());
    }

    #[test]
    fn tool_errors_abort_without_logging() {
        let graph = graph(&[("a", "ok"), ("b", "boom")], &[("a", "b")], "a");
        let mut registry = ToolRegistry::new();
        registry.register(t("ok"), from_fn(|_, _| Ok(None)));
        registry.register(t("boom"), from_fn(|_, _| Err(ToolError::failed("exploded"))));
        let engine = GraphEngine::new(Arc::new(registry));

        let mut execution = engine.start(&graph, State::new());
        execution.step().unwrap();
        let err = execution.step().unwrap_err();

        assert!(matches!(
            &err,
            EngineError::ToolFailed { node, tool, source }
                if node.as_str() == "b" && tool.as_str() == "boom" && *source == ToolError::failed("exploded")
        ));
        assert_eq!(execution.log().len(), 1);
    }

    #[test]
    fn override_to_unknown_node_fails_on_next_step() {
        let graph = graph(&[("a", "jump")], &[], "a");
        let registry = registry_with("jump", |_| output(json!({ "next_node": "ghost" })));
        let engine = GraphEngine::new(registry);

        let err = engine.run(&graph, State::new()).unwrap_err();
        assert!(matches!(err, EngineError::UnknownNode { ref name } if name.as_str() == "ghost"));
    }

    #[test]
    fn zero_max_steps_runs_nothing() {
        let graph = graph(&[("a", "missing")], &[], "a");
        let engine =
            GraphEngine::with_config(Arc::new(ToolRegistry::new()), EngineConfig { max_steps: 0 });

        let outcome = engine.run(&graph, State::new()).unwrap();
        assert!(outcome.log.is_empty());
        assert_eq!(outcome.halt, HaltReason::StepLimit);
    }

    #[test]
    fn visits_are_counted_per_node() {
        let graph = graph(&[("a", "tick"), ("b", "tick")], &[("a", "b"), ("b", "a")], "a");
        let registry = registry_with("tick", |_| Output::new());
        let engine = GraphEngine::with_config(registry, EngineConfig { max_steps: 5 });

        let outcome = engine.run(&graph, State::new()).unwrap();
        assert_eq!(outcome.visits.get("a"), Some(&3));
        assert_eq!(outcome.visits.get("b"), Some(&2));
    }

    #[test]
    fn config_defaults_from_empty_input() {
        let config: EngineConfig = serde_json::from_value(json!({})).unwrap();
        assert_eq!(config.max_steps, DEFAULT_MAX_STEPS);
    }

    #[test]
    fn config_rejects_unknown_keys() {
        assert!(serde_json::from_value::<EngineConfig>(json!({ "max_step": 5 })).is_err());

        let config: EngineConfig = serde_json::from_value(json!({ "max_steps": 5 })).unwrap();
        assert_eq!(config.max_steps, 5);
    }
}
