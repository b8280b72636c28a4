// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protocol parameter model.
//!
//! Parameters are tagged values rather than a class hierarchy: a plain
//! scalar, a pointer into another protocol's outputs, a list of pointers,
//! or a scalar whose value is backed by a pointer (a numeric parameter fed
//! from an upstream result).

use crate::pointer::Pointer;
use serde::{Deserialize, Serialize};

/// Declared shape of a parameter in a protocol-kind definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    Scalar,
    Pointer,
    PointerList,
    ScalarPointer,
}

/// One parameter declaration: name plus shape plus optional scalar default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDecl {
    pub name: String,
    pub kind: ParamKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl ParamDecl {
    pub fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        Self { name: name.into(), kind, default: None }
    }

    pub fn with_default(name: impl Into<String>, kind: ParamKind, default: impl Into<String>) -> Self {
        Self { name: name.into(), kind, default: Some(default.into()) }
    }

    /// The initial value a freshly instantiated protocol carries for this
    /// parameter.
    pub fn initial_value(&self) -> ParamValue {
        match self.kind {
            ParamKind::Scalar => ParamValue::Scalar {
                value: self.default.clone().unwrap_or_default(),
            },
            ParamKind::Pointer => ParamValue::Pointer { pointer: Pointer::none() },
            ParamKind::PointerList => ParamValue::PointerList { pointers: Vec::new() },
            ParamKind::ScalarPointer => ParamValue::ScalarPointer {
                value: self.default.clone().unwrap_or_default(),
                pointer: Pointer::none(),
            },
        }
    }
}

/// A concrete parameter value on a protocol instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParamValue {
    Scalar { value: String },
    Pointer { pointer: Pointer },
    PointerList { pointers: Vec<Pointer> },
    /// Scalar parameter whose value is a reference into another run
    ScalarPointer { value: String, pointer: Pointer },
}

impl ParamValue {
    pub fn scalar(value: impl Into<String>) -> Self {
        ParamValue::Scalar { value: value.into() }
    }

    pub fn pointer(pointer: Pointer) -> Self {
        ParamValue::Pointer { pointer }
    }

    pub fn kind(&self) -> ParamKind {
        match self {
            ParamValue::Scalar { .. } => ParamKind::Scalar,
            ParamValue::Pointer { .. } => ParamKind::Pointer,
            ParamValue::PointerList { .. } => ParamKind::PointerList,
            ParamValue::ScalarPointer { .. } => ParamKind::ScalarPointer,
        }
    }

    /// All pointers carried by this value that point at something.
    pub fn pointers(&self) -> Vec<&Pointer> {
        match self {
            ParamValue::Scalar { .. } => Vec::new(),
            ParamValue::Pointer { pointer } | ParamValue::ScalarPointer { pointer, .. } => {
                if pointer.points_none() {
                    Vec::new()
                } else {
                    vec![pointer]
                }
            }
            ParamValue::PointerList { pointers } => {
                pointers.iter().filter(|p| !p.points_none()).collect()
            }
        }
    }

    /// Mutable view of the carried pointers, including unset ones.
    pub fn pointers_mut(&mut self) -> Vec<&mut Pointer> {
        match self {
            ParamValue::Scalar { .. } => Vec::new(),
            ParamValue::Pointer { pointer } | ParamValue::ScalarPointer { pointer, .. } => {
                vec![pointer]
            }
            ParamValue::PointerList { pointers } => pointers.iter_mut().collect(),
        }
    }

    pub fn is_pointer_like(&self) -> bool {
        !matches!(self, ParamValue::Scalar { .. })
    }
}

#[cfg(test)]
#[path = "params_tests.rs"]
mod tests;
