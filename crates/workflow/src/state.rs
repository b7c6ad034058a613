//! Run-time state threaded through a graph execution, and the per-step log entry.
//!
//! [`State`] is deliberately schema-less: the engine only ever merges tool
//! output into it. Which keys mean what is a contract between the tools of one
//! workflow (e.g. a suggestion tool reading the `complexity_score` written by an
//! earlier complexity tool).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::NodeName;

/// A JSON object: the shape of tool output and node configuration.
pub type Output = Map<String, Value>;

/// Opaque per-node configuration, passed verbatim to the node's tool.
pub type NodeConfig = Map<String, Value>;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Mutable key-value state of one in-flight run.
///
/// Owned by exactly one run. Cloning produces an independent value copy, which
/// is how step snapshots are taken.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct State(Map<String, Value>);

impl State {
    /// Creates an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns `true` if `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of keys in the state.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the state holds no keys.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Shallow-merges `output` into the state.
    ///
    /// Keys in `output` overwrite keys of the same name; keys absent from
    /// `output` are preserved. Nested objects are replaced, not merged.
    pub fn merge(&mut self, output: Output) {
        self.0.extend(output);
    }

    /// Inserts a single key, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Iterates over the entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Borrows the underlying map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes the state, returning the underlying map.
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for State {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for State {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl TryFrom<Value> for State {
    type Error = Value;

    /// Accepts a JSON object; any other value is handed back unchanged.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(other),
        }
    }
}

// ---------------------------------------------------------------------------
// Step log
// ---------------------------------------------------------------------------

/// One entry of a run's step log.
///
/// Entries are appended once and never changed. `state` is a value snapshot
/// taken after this step's merge; later steps cannot alter it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStep {
    /// 1-based position of this step in the run.
    pub step: u32,

    /// Node that was executed.
    pub node: NodeName,

    /// Tool output as merged into state (control keys already removed).
    pub output: Output,

    /// Full state after the merge.
    pub state: State,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Output {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected a JSON object"),
        }
    }

    #[test]
    fn merge_overwrites_and_preserves() {
        let mut state = State::from(object(json!({ "a": 1, "b": 2 })));
        state.merge(object(json!({ "b": 20, "c": 30 })));

        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            json!({ "a": 1, "b": 20, "c": 30 })
        );
    }

    #[test]
    fn merge_is_shallow() {
        let mut state = State::from(object(json!({ "nested": { "x": 1, "y": 2 } })));
        state.merge(object(json!({ "nested": { "x": 5 } })));

        assert_eq!(state.get("nested"), Some(&json!({ "x": 5 })));
    }

    #[test]
    fn clones_are_independent_snapshots() {
        let mut state = State::new();
        state.insert("count", json!(1));
        let snapshot = state.clone();

        state.insert("count", json!(2));

        assert_eq!(snapshot.get("count"), Some(&json!(1)));
        assert_eq!(state.get("count"), Some(&json!(2)));
    }

    #[test]
    fn only_objects_convert_into_state() {
        assert!(State::try_from(json!({ "code": "" })).is_ok());
        assert_eq!(State::try_from(json!([1, 2])).unwrap_err(), json!([1, 2]));
    }
}
