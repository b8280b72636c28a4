// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protocol entity and state machine.

use crate::params::ParamValue;
use crate::pointer::{ObjId, Pointer};
use crate::status::{RunMode, Status};
use crate::step::StepRecord;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Sentinel returned by launchers that could not produce a job id.
pub const UNKNOWN_JOBID: &str = "UNKNOWN";

/// Open/closed flag carried by set-valued (streaming) outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamState {
    Open,
    Closed,
}

/// One produced output: the stored object it names, plus the stream flag
/// for set-valued outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRef {
    pub id: ObjId,
    pub class_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_state: Option<StreamState>,
}

impl OutputRef {
    pub fn new(id: ObjId, class_name: impl Into<String>) -> Self {
        Self { id, class_name: class_name.into(), stream_state: None }
    }

    pub fn open_set(id: ObjId, class_name: impl Into<String>) -> Self {
        Self {
            id,
            class_name: class_name.into(),
            stream_state: Some(StreamState::Open),
        }
    }

    /// True for set-valued outputs, open or closed.
    pub fn is_set_output(&self) -> bool {
        self.stream_state.is_some()
    }
}

/// Configuration for creating a new protocol instance
#[derive(Debug, Clone)]
pub struct ProtocolConfig {
    pub class_name: String,
    pub label: String,
    pub comment: String,
    pub host_name: String,
    pub interactive: bool,
    pub streaming: bool,
    pub inputs: IndexMap<String, ParamValue>,
}

impl ProtocolConfig {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            label: String::new(),
            comment: String::new(),
            host_name: "localhost".to_string(),
            interactive: false,
            streaming: false,
            inputs: IndexMap::new(),
        }
    }
}

/// A persistent, user-defined computational unit with declared inputs and
/// outputs.
///
/// Mutated only by the project scheduler and by its own execution context;
/// all cross-protocol references go through [`Pointer`]s, never shared
/// objects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Protocol {
    pub id: ObjId,
    pub class_name: String,
    pub label: String,
    #[serde(default)]
    pub comment: String,
    pub host_name: String,
    #[serde(default)]
    pub use_queue: bool,
    #[serde(default)]
    pub queue_params: HashMap<String, String>,
    /// Ids of protocols that must finish before this one launches
    #[serde(default)]
    pub prerequisites: Vec<ObjId>,
    pub run_mode: RunMode,
    pub status: Status,
    #[serde(default)]
    pub interactive: bool,
    /// Whether this kind can grow its outputs while running
    #[serde(default)]
    pub streaming: bool,
    #[serde(default)]
    pub force_schedule: bool,
    /// Working directory, relative to the project root
    #[serde(default)]
    pub working_dir: PathBuf,
    /// Opaque id assigned by the launcher (pid or queue job id)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    /// Process id of the local runner; 0 means unknown
    #[serde(default)]
    pub pid: u32,
    /// Parent protocol for sub-runs; None for top-level runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ObjId>,
    pub inputs: IndexMap<String, ParamValue>,
    #[serde(default)]
    pub outputs: IndexMap<String, OutputRef>,
    #[serde(default)]
    pub steps: Vec<StepRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended: Option<DateTime<Utc>>,
}

impl Protocol {
    pub fn new(config: ProtocolConfig) -> Self {
        Self {
            id: ObjId::UNSET,
            class_name: config.class_name,
            label: config.label,
            comment: config.comment,
            host_name: config.host_name,
            use_queue: false,
            queue_params: HashMap::new(),
            prerequisites: Vec::new(),
            run_mode: RunMode::Resume,
            status: Status::New,
            interactive: config.interactive,
            streaming: config.streaming,
            force_schedule: false,
            working_dir: PathBuf::new(),
            job_id: None,
            pid: 0,
            parent_id: None,
            inputs: config.inputs,
            outputs: IndexMap::new(),
            steps: Vec::new(),
            error: None,
            created: None,
            updated: None,
            ended: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// A child protocol is a sub-run owned by another protocol and does not
    /// appear in the runs graph.
    pub fn is_child(&self) -> bool {
        self.parent_id.is_some()
    }

    pub fn works_in_streaming(&self) -> bool {
        self.streaming
    }

    /// True while any set-valued output is still open.
    pub fn is_streaming_open(&self) -> bool {
        self.outputs
            .values()
            .any(|o| o.stream_state == Some(StreamState::Open))
    }

    /// Display name used in graphs and error messages.
    pub fn run_name(&self) -> String {
        if self.label.is_empty() {
            format!("{} ({})", self.class_name, self.id)
        } else {
            self.label.clone()
        }
    }

    /// All input pointers that point at something.
    pub fn input_pointers(&self) -> Vec<(&str, &Pointer)> {
        let mut out = Vec::new();
        for (name, value) in &self.inputs {
            for pointer in value.pointers() {
                out.push((name.as_str(), pointer));
            }
        }
        out
    }

    /// Path of this run's own store, relative to the project root.
    pub fn local_db_path(&self) -> PathBuf {
        self.working_dir.join("run.db")
    }

    /// Path of this run's log directory, relative to the project root.
    pub fn logs_path(&self) -> PathBuf {
        self.working_dir.join("logs")
    }

    pub fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    pub fn set_failed(&mut self, error: impl Into<String>) {
        self.status = Status::Failed;
        self.error = Some(error.into());
    }

    /// Leave the interactive wait point so the run can be launched again.
    pub fn continue_from_interactive(&mut self) {
        if self.status == Status::Interactive {
            self.status = Status::Launched;
        }
    }

    /// Mark every step with the given status (used when rescheduling a
    /// streaming run).
    pub fn set_steps_status(&mut self, status: Status) {
        for step in &mut self.steps {
            step.status = status;
        }
    }

    /// Close every open set output.
    pub fn close_output_sets(&mut self) {
        for output in self.outputs.values_mut() {
            if output.stream_state == Some(StreamState::Open) {
                output.stream_state = Some(StreamState::Closed);
            }
        }
    }
}

crate::builder! {
    pub struct ProtocolBuilder => Protocol {
        into {
            class_name: String = "ProtAlign",
            label: String = "",
            comment: String = "",
            host_name: String = "localhost",
            working_dir: PathBuf = "",
        }
        set {
            id: ObjId = ObjId::UNSET,
            use_queue: bool = false,
            queue_params: HashMap<String, String> = HashMap::new(),
            prerequisites: Vec<ObjId> = Vec::new(),
            run_mode: RunMode = RunMode::Resume,
            status: Status = Status::New,
            interactive: bool = false,
            streaming: bool = false,
            force_schedule: bool = false,
            pid: u32 = 0,
            inputs: IndexMap<String, ParamValue> = IndexMap::new(),
            outputs: IndexMap<String, OutputRef> = IndexMap::new(),
            steps: Vec<StepRecord> = Vec::new(),
        }
        option {
            job_id: String = None,
            parent_id: ObjId = None,
            error: String = None,
            created: DateTime<Utc> = None,
            updated: DateTime<Utc> = None,
            ended: DateTime<Utc> = None,
        }
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
