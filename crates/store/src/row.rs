// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stored object rows.

use chrono::{DateTime, Utc};
use lw_core::ObjId;
use serde::{Deserialize, Serialize};

/// One row of the object table.
///
/// `payload` carries the serialized domain object; `class_name` drives
/// class-based selection; `parent_id` preserves the parent/child relation
/// (a protocol's outputs are its children); `name` is a lookup key for
/// singleton metadata rows (e.g. the project creation time).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredObject {
    pub id: ObjId,
    pub class_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ObjId>,
    pub payload: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
}

impl StoredObject {
    pub fn new(class_name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: ObjId::UNSET,
            class_name: class_name.into(),
            name: None,
            label: String::new(),
            parent_id: None,
            payload,
            created: None,
            updated: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn child_of(mut self, parent: ObjId) -> Self {
        self.parent_id = Some(parent);
        self
    }
}
