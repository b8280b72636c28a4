// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protocol-kind registry.
//!
//! The engine never interprets a protocol's semantics; plugins register a
//! definition per class name (parameter schema plus flags) and the project
//! instantiates protocols from it. This replaces class-based polymorphism
//! with a plain lookup.

use crate::error::ProjectError;
use indexmap::IndexMap;
use lw_core::{ParamDecl, ParamKind, Protocol, ProtocolConfig};

/// Definition of one protocol kind.
#[derive(Debug, Clone)]
pub struct KindDef {
    pub class_name: String,
    /// Default human label for new instances
    pub label: String,
    pub interactive: bool,
    /// Whether instances can grow outputs while running
    pub streaming: bool,
    pub params: Vec<ParamDecl>,
}

impl KindDef {
    pub fn new(class_name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            label: label.into(),
            interactive: false,
            streaming: false,
            params: Vec::new(),
        }
    }

    pub fn interactive(mut self) -> Self {
        self.interactive = true;
        self
    }

    pub fn streaming(mut self) -> Self {
        self.streaming = true;
        self
    }

    pub fn param(mut self, name: impl Into<String>, kind: ParamKind) -> Self {
        self.params.push(ParamDecl::new(name, kind));
        self
    }

    pub fn param_default(
        mut self,
        name: impl Into<String>,
        kind: ParamKind,
        default: impl Into<String>,
    ) -> Self {
        self.params.push(ParamDecl::with_default(name, kind, default));
        self
    }
}

/// Map from class name to kind definition.
#[derive(Debug, Default)]
pub struct Registry {
    kinds: IndexMap<String, KindDef>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, def: KindDef) {
        self.kinds.insert(def.class_name.clone(), def);
    }

    pub fn get(&self, class_name: &str) -> Option<&KindDef> {
        self.kinds.get(class_name)
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.kinds.keys().map(String::as_str)
    }

    /// Build a fresh protocol of the given class with declared defaults.
    pub fn instantiate(&self, class_name: &str) -> Result<Protocol, ProjectError> {
        let def = self
            .get(class_name)
            .ok_or_else(|| ProjectError::UnknownClass(class_name.to_string()))?;

        let mut config = ProtocolConfig::new(&def.class_name);
        config.interactive = def.interactive;
        config.streaming = def.streaming;
        config.inputs = def
            .params
            .iter()
            .map(|p| (p.name.clone(), p.initial_value()))
            .collect();
        Ok(Protocol::new(config))
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
