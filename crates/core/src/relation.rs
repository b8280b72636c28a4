// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Provenance relations between stored objects.

use crate::pointer::{ObjId, Pointer};
use serde::{Deserialize, Serialize};

/// Data provenance: the child was derived from the parent's data.
pub const RELATION_SOURCE: &str = "relation_source";

/// Identity-preserving transformation: the child is the parent, transformed.
pub const RELATION_TRANSFORM: &str = "relation_transform";

/// A named provenance edge between two (object, extended-path) pairs.
///
/// Written by protocols when they derive or transform data; projected into
/// relation graphs by the project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub name: String,
    /// Protocol that created the relation (owner of the edge)
    pub creator_id: ObjId,
    pub parent_id: ObjId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parent_extended: Vec<String>,
    pub child_id: ObjId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub child_extended: Vec<String>,
}

impl Relation {
    pub fn parent_pointer(&self) -> Pointer {
        Pointer {
            target: self.parent_id,
            extended: self.parent_extended.clone(),
        }
    }

    pub fn child_pointer(&self) -> Pointer {
        Pointer {
            target: self.child_id,
            extended: self.child_extended.clone(),
        }
    }
}
