//! Ready-made graph definitions built from this crate's tools.

use serde_json::json;
use workflow::{Edge, Graph, GraphDefinition, GraphError, Node, NodeConfig, NodeName, ToolName};

use crate::code_review::DEFAULT_RETRY_NODE;
use crate::names;

/// Node names of the code-review graph, in execution order.
pub const CODE_REVIEW_NODES: [&str; 4] = ["extract", "complexity", DEFAULT_RETRY_NODE, "suggest"];

/// The code-review workflow:
///
/// ```text
/// extract -> complexity -> detect_issues -> suggest
///                               ^              |
///                               +-- quality < threshold
/// ```
///
/// The loop back from `suggest` is not an edge; the suggestion tool requests it
/// through its next-node override. `threshold` is stored in the `suggest` node's
/// config; `None` leaves the tool's default in place.
pub fn code_review_graph(threshold: Option<f64>) -> Result<Graph, GraphError> {
    let [extract, complexity, detect, suggest] = CODE_REVIEW_NODES;

    let mut suggest_config = NodeConfig::new();
    if let Some(threshold) = threshold {
        suggest_config.insert("threshold".to_owned(), json!(threshold));
    }

    Graph::from_definition(GraphDefinition {
        graph_id: None,
        nodes: vec![
            node(extract, names::EXTRACT_FUNCTIONS)?,
            node(complexity, names::CHECK_COMPLEXITY)?,
            node(detect, names::DETECT_BASIC_ISSUES)?,
            node(suggest, names::SUGGEST_IMPROVEMENTS)?.with_config(suggest_config),
        ],
        edges: vec![
            edge(extract, complexity)?,
            edge(complexity, detect)?,
            edge(detect, suggest)?,
        ],
        start_node: NodeName::try_from(extract)?,
    })
}

fn node(name: &str, tool: &str) -> Result<Node, GraphError> {
    Ok(Node::new(NodeName::try_from(name)?, ToolName::try_from(tool)?))
}

fn edge(source: &str, target: &str) -> Result<Edge, GraphError> {
    Ok(Edge::new(NodeName::try_from(source)?, NodeName::try_from(target)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_follows_the_review_order() {
        let graph = code_review_graph(None).unwrap();

        assert_eq!(graph.start_node().as_str(), "extract");
        assert_eq!(graph.default_successor("extract").unwrap().as_str(), "complexity");
        assert_eq!(graph.default_successor("complexity").unwrap().as_str(), "detect_issues");
        assert_eq!(graph.default_successor("detect_issues").unwrap().as_str(), "suggest");
        assert!(graph.default_successor("suggest").is_none());
    }

    #[test]
    fn threshold_lands_in_suggest_config() {
        let graph = code_review_graph(Some(3.5)).unwrap();
        let suggest = graph.node("suggest").unwrap();
        assert_eq!(suggest.config.get("threshold"), Some(&json!(3.5)));

        let graph = code_review_graph(None).unwrap();
        assert!(graph.node("suggest").unwrap().config.is_empty());
    }
}
