//! Immutable workflow topology: nodes, edges and the start node.
//!
//! A [`Graph`] is only ever produced from a [`GraphDefinition`] through
//! [`Graph::from_definition`] (deserialization goes through the same path), so
//! every `Graph` value satisfies:
//!
//! - node names are unique,
//! - the start node is declared,
//! - every edge endpoint is declared.
//!
//! The engine borrows a graph read-only; many runs may share one graph.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{GraphError, GraphId, NodeConfig, NodeName, ToolName, ToolRegistry};

// ---------------------------------------------------------------------------
// Definition (the "create request")
// ---------------------------------------------------------------------------

/// A node as declared in a graph definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique name within the graph.
    pub name: NodeName,

    /// Name of the tool that runs at this node.
    pub tool: ToolName,

    /// Configuration handed verbatim to the tool.
    #[serde(default)]
    pub config: NodeConfig,
}

impl Node {
    /// Creates a node with an empty configuration.
    pub fn new(name: NodeName, tool: ToolName) -> Self {
        Self {
            name,
            tool,
            config: NodeConfig::new(),
        }
    }

    /// Replaces the node's configuration.
    pub fn with_config(mut self, config: NodeConfig) -> Self {
        self.config = config;
        self
    }
}

/// A static default transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Node the edge leaves.
    pub source: NodeName,
    /// Node the edge enters.
    pub target: NodeName,
}

impl Edge {
    /// Creates an edge from `source` to `target`.
    pub fn new(source: NodeName, target: NodeName) -> Self {
        Self { source, target }
    }
}

/// Unvalidated description of a graph, as received from a caller.
///
/// Order matters: node order is preserved in the built graph, and edge order
/// decides which edge supplies a node's default successor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDefinition {
    /// Identifier to keep; a random one is generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_id: Option<GraphId>,

    /// Node declarations, in order.
    pub nodes: Vec<Node>,

    /// Edge declarations, in order.
    #[serde(default)]
    pub edges: Vec<Edge>,

    /// Node the run starts at.
    pub start_node: NodeName,
}

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

/// A validated, immutable workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GraphDefinition", into = "GraphDefinition")]
pub struct Graph {
    id: GraphId,
    nodes: Vec<Node>,
    index: HashMap<NodeName, usize>,
    edges: Vec<Edge>,
    start_node: NodeName,
}

impl Graph {
    /// Validates `definition` and builds a graph from it.
    ///
    /// # Errors
    ///
    /// - [`GraphError::DuplicateNode`] when two nodes share a name.
    /// - [`GraphError::UnknownStartNode`] when the start node is not declared.
    /// - [`GraphError::UnknownEdgeEndpoint`] when an edge refers to an undeclared node.
    pub fn from_definition(definition: GraphDefinition) -> Result<Self, GraphError> {
        let GraphDefinition {
            graph_id,
            nodes,
            edges,
            start_node,
        } = definition;

        let mut index = HashMap::with_capacity(nodes.len());
        for (position, node) in nodes.iter().enumerate() {
            if index.insert(node.name.clone(), position).is_some() {
                return Err(GraphError::DuplicateNode {
                    name: node.name.clone(),
                });
            }
        }

        if !index.contains_key(&start_node) {
            return Err(GraphError::UnknownStartNode { name: start_node });
        }

        for edge in &edges {
            for endpoint in [&edge.source, &edge.target] {
                if !index.contains_key(endpoint) {
                    return Err(GraphError::UnknownEdgeEndpoint {
                        source_node: edge.source.clone(),
                        target_node: edge.target.clone(),
                        missing: endpoint.clone(),
                    });
                }
            }
        }

        Ok(Self {
            id: graph_id.unwrap_or_else(GraphId::new_random),
            nodes,
            index,
            edges,
            start_node,
        })
    }

    /// The graph's identifier.
    pub fn id(&self) -> &GraphId {
        &self.id
    }

    /// Node the run starts at.
    pub fn start_node(&self) -> &NodeName {
        &self.start_node
    }

    /// Looks up a node by name.
    pub fn node(&self, name: &str) -> Option<&Node> {
        self.index.get(name).map(|&position| &self.nodes[position])
    }

    /// Nodes in declaration order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Edges in declaration order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Returns the target of the first edge leaving `name`, if any.
    ///
    /// Later edges with the same source are never used as defaults; only a
    /// tool override can reach them at run time.
    pub fn default_successor(&self, name: &str) -> Option<&NodeName> {
        self.edges
            .iter()
            .find(|edge| edge.source.as_str() == name)
            .map(|edge| &edge.target)
    }

    /// Lists the nodes whose tool has no binding in `registry`.
    ///
    /// An empty result means every node can be resolved before the run starts.
    pub fn unbound_nodes<'a>(&'a self, registry: &ToolRegistry) -> Vec<&'a Node> {
        self.nodes
            .iter()
            .filter(|node| !registry.contains(node.tool.as_str()))
            .collect()
    }
}

impl TryFrom<GraphDefinition> for Graph {
    type Error = GraphError;

    fn try_from(definition: GraphDefinition) -> Result<Self, Self::Error> {
        Self::from_definition(definition)
    }
}

impl From<Graph> for GraphDefinition {
    fn from(graph: Graph) -> Self {
        Self {
            graph_id: Some(graph.id),
            nodes: graph.nodes,
            edges: graph.edges,
            start_node: graph.start_node,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn n(name: &str) -> NodeName {
        NodeName::new(name).unwrap()
    }

    fn node(name: &str) -> Node {
        Node::new(n(name), ToolName::new("noop").unwrap())
    }

    fn definition(nodes: &[&str], edges: &[(&str, &str)], start: &str) -> GraphDefinition {
        GraphDefinition {
            graph_id: None,
            nodes: nodes.iter().map(|name| node(name)).collect(),
            edges: edges.iter().map(|(s, t)| Edge::new(n(s), n(t))).collect(),
            start_node: n(start),
        }
    }

    #[test]
    fn first_matching_edge_is_the_default_successor() {
        let graph = Graph::from_definition(definition(
            &["a", "b", "c"],
            &[("a", "b"), ("a", "c"), ("b", "c")],
            "a",
        ))
        .unwrap();

        assert_eq!(graph.default_successor("a"), Some(&n("b")));
        assert_eq!(graph.default_successor("b"), Some(&n("c")));
        assert_eq!(graph.default_successor("c"), None);
        assert_eq!(graph.default_successor("nowhere"), None);
    }

    #[test]
    fn duplicate_nodes_are_rejected() {
        let err = Graph::from_definition(definition(&["a", "b", "a"], &[], "a")).unwrap_err();
        assert_eq!(err, GraphError::DuplicateNode { name: n("a") });
    }

    #[test]
    fn start_node_must_be_declared() {
        let err = Graph::from_definition(definition(&["a"], &[], "b")).unwrap_err();
        assert_eq!(err, GraphError::UnknownStartNode { name: n("b") });
    }

    #[test]
    fn edge_endpoints_must_be_declared() {
        let err = Graph::from_definition(definition(&["a"], &[("a", "ghost")], "a")).unwrap_err();
        assert_eq!(
            err,
            GraphError::UnknownEdgeEndpoint {
                source_node: n("a"),
                target_node: n("ghost"),
                missing: n("ghost"),
            }
        );
    }

    #[test]
    fn supplied_graph_id_is_kept() {
        let mut def = definition(&["a"], &[], "a");
        def.graph_id = GraphId::new("review-v1");

        let graph = Graph::from_definition(def).unwrap();
        assert_eq!(graph.id().as_str(), "review-v1");
    }

    #[test]
    fn node_order_is_preserved() {
        let graph = Graph::from_definition(definition(&["z", "a", "m"], &[], "a")).unwrap();
        let names: Vec<&str> = graph.nodes().iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, ["z", "a", "m"]);
    }

    #[test]
    fn deserialization_validates() {
        let raw = json!({
            "nodes": [
                { "name": "a", "tool": "noop" },
                { "name": "a", "tool": "noop" }
            ],
            "edges": [],
            "start_node": "a"
        });
        let err = serde_json::from_value::<Graph>(raw).unwrap_err();
        assert!(err.to_string().contains("Duplicate node name 'a'"));
    }

    #[test]
    fn serializes_back_to_definition_shape() {
        let graph = Graph::from_definition(definition(&["a", "b"], &[("a", "b")], "a")).unwrap();
        let value = serde_json::to_value(&graph).unwrap();

        assert_eq!(value["graph_id"], json!(graph.id().as_str()));
        assert_eq!(value["start_node"], json!("a"));
        assert_eq!(value["nodes"][1], json!({ "name": "b", "tool": "noop", "config": {} }));

        let back: Graph = serde_json::from_value(value).unwrap();
        assert_eq!(back, graph);
    }

    #[test]
    fn unbound_nodes_are_reported() {
        let mut registry = ToolRegistry::new();
        registry.register(
            ToolName::new("noop").unwrap(),
            crate::from_fn(|_, _| Ok(None)),
        );

        let mut def = definition(&["a", "b"], &[], "a");
        def.nodes[1].tool = ToolName::new("missing").unwrap();
        let graph = Graph::from_definition(def).unwrap();

        let unbound: Vec<&str> = graph
            .unbound_nodes(&registry)
            .iter()
            .map(|node| node.name.as_str())
            .collect();
        assert_eq!(unbound, ["b"]);
    }
}
