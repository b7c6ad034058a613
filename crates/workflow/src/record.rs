//! Immutable audit record of one engine run.
//!
//! The engine itself never stores anything. A caller that wants to keep a run
//! wraps the [`RunOutcome`] in a [`RunRecord`] and hands it to whatever storage
//! it uses; the record serializes to JSON with serde.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ExecutionStep, GraphId, HaltReason, NodeName, RunId, RunOutcome, State};

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a [`Timestamp`] from a [`DateTime<Utc>`].
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

// ---------------------------------------------------------------------------
// Run record
// ---------------------------------------------------------------------------

/// Everything known about one finished run.
///
/// Fields are read-only once built; there is no way to amend a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    run_id: RunId,
    graph_id: GraphId,
    created_at: Timestamp,
    initial_state: State,
    final_state: State,
    halt: HaltReason,
    visits: BTreeMap<NodeName, u32>,
    log: Vec<ExecutionStep>,
}

impl RunRecord {
    /// Builds a record for `outcome` under a freshly generated [`RunId`].
    pub fn new(graph_id: GraphId, initial_state: State, outcome: RunOutcome) -> Self {
        let RunOutcome {
            final_state,
            log,
            halt,
            visits,
        } = outcome;

        Self {
            run_id: RunId::new_random(),
            graph_id,
            created_at: Timestamp::now(),
            initial_state,
            final_state,
            halt,
            visits,
            log,
        }
    }

    /// Identifier of this run.
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Graph the run executed.
    pub fn graph_id(&self) -> &GraphId {
        &self.graph_id
    }

    /// When the record was created.
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// State the caller supplied.
    pub fn initial_state(&self) -> &State {
        &self.initial_state
    }

    /// State after the last step.
    pub fn final_state(&self) -> &State {
        &self.final_state
    }

    /// Why the run stopped.
    pub fn halt(&self) -> HaltReason {
        self.halt
    }

    /// Per-node visit counts.
    pub fn visits(&self) -> &BTreeMap<NodeName, u32> {
        &self.visits
    }

    /// The complete step log.
    pub fn log(&self) -> &[ExecutionStep] {
        &self.log
    }
}
