// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Object identifiers and cross-protocol pointers.
//!
//! A [`Pointer`] is the only reference mechanism between protocols: a stable
//! object id plus an *extended path*, a dotted attribute suffix applied after
//! the base object is resolved. `"12.outputImages"` points at the
//! `outputImages` attribute of object 12.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable integer id assigned by the object store. `0` means unset.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ObjId(pub u64);

impl ObjId {
    pub const UNSET: ObjId = ObjId(0);

    pub fn is_set(self) -> bool {
        self.0 != 0
    }
}

impl std::fmt::Display for ObjId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ObjId {
    fn from(v: u64) -> Self {
        ObjId(v)
    }
}

/// Errors from [`Pointer::parse`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PointerParseError {
    #[error("empty pointer string")]
    Empty,
    #[error("invalid object id in pointer: {0:?}")]
    InvalidId(String),
}

/// Reference to (part of) another protocol's output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pointer {
    pub target: ObjId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extended: Vec<String>,
}

impl Pointer {
    /// Pointer to a whole object.
    pub fn to(target: ObjId) -> Self {
        Self { target, extended: Vec::new() }
    }

    /// Pointer to a named attribute of an object.
    pub fn with_extended(target: ObjId, extended: impl Into<String>) -> Self {
        Self { target, extended: vec![extended.into()] }
    }

    /// A pointer that points at nothing.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn points_none(&self) -> bool {
        !self.target.is_set()
    }

    pub fn has_extended(&self) -> bool {
        !self.extended.is_empty()
    }

    /// Drop the last extended segment, returning it. Used when resolving
    /// relation parents by progressively trimming the path.
    pub fn pop_extended(&mut self) -> Option<String> {
        self.extended.pop()
    }

    /// The last extended segment, if any.
    pub fn last_name(&self) -> Option<&str> {
        self.extended.last().map(String::as_str)
    }

    pub fn set_extended_parts(&mut self, parts: impl IntoIterator<Item = String>) {
        self.extended = parts.into_iter().filter(|p| !p.is_empty()).collect();
    }

    /// Render as `"<id>"` or `"<id>.<ext>[.<ext>...]"`, the workflow-JSON
    /// and relation-graph key form.
    pub fn unique_id(&self) -> String {
        let mut s = self.target.to_string();
        for part in &self.extended {
            s.push('.');
            s.push_str(part);
        }
        s
    }

    /// Parse the `unique_id` form back into a pointer.
    pub fn parse(s: &str) -> Result<Self, PointerParseError> {
        let mut parts = s.split('.');
        let head = parts.next().ok_or(PointerParseError::Empty)?;
        if head.is_empty() {
            return Err(PointerParseError::Empty);
        }
        let id: u64 = head
            .parse()
            .map_err(|_| PointerParseError::InvalidId(head.to_string()))?;
        let mut pointer = Pointer::to(ObjId(id));
        pointer.set_extended_parts(parts.map(str::to_string));
        Ok(pointer)
    }
}

impl std::fmt::Display for Pointer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.unique_id())
    }
}

#[cfg(test)]
#[path = "pointer_tests.rs"]
mod tests;
