//! Command implementations.
//!
//! Each command writes its result to the supplied writer; `main` passes
//! stdout, tests pass a buffer.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use workflow::{EngineError, Graph, GraphDefinition, GraphEngine, RunRecord, State, ToolRegistry};

/// Where the initial state of a run comes from.
#[derive(Debug, Clone)]
pub enum StateSource<'a> {
    /// Start from an empty state.
    Empty,
    /// A JSON file holding an object.
    File(&'a Path),
    /// An inline JSON object.
    Inline(&'a str),
}

impl StateSource<'_> {
    fn load(&self) -> Result<State> {
        let value: Value = match self {
            StateSource::Empty => return Ok(State::new()),
            StateSource::File(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("read state {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("parse state {}", path.display()))?
            }
            StateSource::Inline(raw) => serde_json::from_str(raw).context("parse inline state")?,
        };

        State::try_from(value).map_err(|rejected| {
            anyhow::anyhow!("initial state must be a JSON object, got {rejected}")
        })
    }
}

/// Reads a graph definition file and validates its structure.
pub fn load_graph(path: &Path) -> Result<Graph> {
    let raw =
        std::fs::read_to_string(path).with_context(|| format!("read graph {}", path.display()))?;
    let definition: GraphDefinition =
        serde_json::from_str(&raw).with_context(|| format!("parse graph {}", path.display()))?;
    Graph::from_definition(definition).with_context(|| format!("invalid graph {}", path.display()))
}

/// Runs `graph` and writes the [`RunRecord`] as pretty JSON.
///
/// With `stream`, every step is written as one JSON line as soon as it
/// completes, before the record.
pub fn run(
    engine: &GraphEngine,
    graph: &Graph,
    state: StateSource<'_>,
    stream: bool,
    out: &mut impl Write,
) -> Result<RunRecord> {
    let initial_state = state.load()?;

    let outcome = if stream {
        let mut execution = engine.start(graph, initial_state.clone());
        while let Some(step) = execution.step()? {
            serde_json::to_writer(&mut *out, step).context("serialize step")?;
            writeln!(out)?;
            out.flush()?;
        }
        execution.finish()?
    } else {
        engine.run(graph, initial_state.clone())?
    };

    let record = RunRecord::new(graph.id().clone(), initial_state, outcome);
    write_pretty(out, &record)?;
    Ok(record)
}

/// Checks that every node of `graph` names a registered tool.
///
/// Writes one line per unbound node; the first one is returned as
/// [`EngineError::ToolNotFound`].
pub fn validate(graph: &Graph, registry: &ToolRegistry, out: &mut impl Write) -> Result<()> {
    let unbound = graph.unbound_nodes(registry);
    for node in &unbound {
        writeln!(out, "node '{}': tool '{}' is not registered", node.name, node.tool)?;
    }

    if let Some(first) = unbound.first() {
        return Err(EngineError::ToolNotFound {
            name: first.tool.clone(),
            registered: registry.names(),
        }
        .into());
    }

    writeln!(
        out,
        "graph '{}' is valid: {} nodes, {} edges, start '{}'",
        graph.id(),
        graph.nodes().len(),
        graph.edges().len(),
        graph.start_node()
    )?;
    Ok(())
}

/// Writes the registered tool names, one per line.
pub fn list_tools(registry: &ToolRegistry, out: &mut impl Write) -> Result<()> {
    for name in registry.names() {
        writeln!(out, "{name}")?;
    }
    Ok(())
}

/// Writes the code-review graph definition as pretty JSON.
pub fn example(threshold: Option<f64>, out: &mut impl Write) -> Result<()> {
    let graph = tools::code_review_graph(threshold)?;
    write_pretty(out, &graph)
}

fn write_pretty<T: Serialize>(out: &mut impl Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value).context("serialize json")?;
    writeln!(out)?;
    Ok(())
}
