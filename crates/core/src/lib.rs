// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lw-core: Domain types for the labwork orchestration engine

pub mod macros;

pub mod clock;
pub mod graph;
pub mod params;
pub mod pointer;
pub mod protocol;
pub mod relation;
pub mod status;
pub mod step;

pub use clock::{Clock, FakeClock, SystemClock};
pub use graph::{Graph, Node};
pub use params::{ParamDecl, ParamKind, ParamValue};
pub use pointer::{ObjId, Pointer, PointerParseError};
#[cfg(any(test, feature = "test-support"))]
pub use protocol::ProtocolBuilder;
pub use protocol::{OutputRef, Protocol, ProtocolConfig, StreamState, UNKNOWN_JOBID};
pub use relation::{Relation, RELATION_SOURCE, RELATION_TRANSFORM};
pub use status::{RunMode, Status};
pub use step::StepRecord;
