// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow export and import.
//!
//! An exported workflow is a JSON array of protocol entries: identity
//! keys, queue/prerequisite settings, and every definition parameter.
//! Pointer parameters serialize as `"<srcId>.<outKey>"`. Import runs in
//! two passes: instantiate everything first (old id → new protocol), then
//! resolve pointer strings against the new ids.

use crate::error::ProjectError;
use crate::project::Project;
use indexmap::IndexMap;
use lw_core::{ObjId, ParamKind, ParamValue, Pointer, Protocol};
use serde_json::Value;
use std::path::Path;

type ExportEntry = IndexMap<String, Value>;

impl Project {
    /// Serialize protocols into the workflow-JSON entry list.
    pub fn protocols_dict(&mut self, protocols: &[Protocol]) -> Vec<ExportEntry> {
        protocols.iter().map(|prot| self.export_entry(prot)).collect()
    }

    /// Workflow JSON text (pretty-printed array).
    pub fn protocols_json(&mut self, protocols: &[Protocol]) -> Result<String, ProjectError> {
        let entries = self.protocols_dict(protocols);
        Ok(serde_json::to_string_pretty(&entries)?)
    }

    /// Write the workflow JSON for later import into another project.
    pub fn export_protocols(
        &mut self,
        protocols: &[Protocol],
        filename: &Path,
    ) -> Result<(), ProjectError> {
        let json = self.protocols_json(protocols)?;
        std::fs::write(filename, json)?;
        Ok(())
    }

    fn export_entry(&self, prot: &Protocol) -> ExportEntry {
        let mut entry = ExportEntry::new();
        entry.insert("object.className".to_string(), Value::from(prot.class_name.clone()));
        entry.insert("object.id".to_string(), Value::from(prot.id.0));
        entry.insert("object.label".to_string(), Value::from(prot.label.clone()));
        entry.insert("object.comment".to_string(), Value::from(prot.comment.clone()));
        entry.insert("_useQueue".to_string(), Value::from(prot.use_queue));
        entry.insert(
            "_queueParams".to_string(),
            serde_json::to_value(&prot.queue_params).unwrap_or(Value::Null),
        );
        entry.insert(
            "_prerequisites".to_string(),
            Value::from(prot.prerequisites.iter().map(|p| p.0).collect::<Vec<u64>>()),
        );
        entry.insert("forceSchedule".to_string(), Value::from(prot.force_schedule));

        for (name, value) in &prot.inputs {
            entry.insert(name.clone(), self.export_param(value));
        }
        entry
    }

    fn export_param(&self, value: &ParamValue) -> Value {
        match value {
            ParamValue::Scalar { value } => Value::from(value.clone()),
            ParamValue::Pointer { pointer } => self.export_pointer(pointer),
            ParamValue::ScalarPointer { value, pointer } => {
                // The reference wins when set; otherwise the plain value
                if pointer.points_none() {
                    Value::from(value.clone())
                } else {
                    self.export_pointer(pointer)
                }
            }
            ParamValue::PointerList { pointers } => Value::from(
                pointers
                    .iter()
                    .filter(|p| !p.points_none())
                    .map(|p| self.export_pointer(p))
                    .collect::<Vec<Value>>(),
            ),
        }
    }

    /// Render a pointer as `"<srcRunId>.<outKey>"`. A pointer at an output
    /// object directly is normalized to its producing run.
    fn export_pointer(&self, pointer: &Pointer) -> Value {
        if pointer.points_none() {
            return Value::Null;
        }
        // Already the canonical run-id + output-key form?
        if pointer.has_extended() {
            return Value::from(pointer.unique_id());
        }
        // Legacy form: the pointer names the output object itself
        if let Some(parent) = self.store.parent_of(pointer.target) {
            if let Some(run) = crate::project::protocol_from_row(parent) {
                for (out_key, output) in &run.outputs {
                    if output.id == pointer.target {
                        return Value::from(format!("{}.{}", run.id, out_key));
                    }
                }
            }
        }
        Value::from(pointer.unique_id())
    }

    /// Import a workflow JSON file. Returns old-id → new protocol.
    pub fn load_protocols_file(
        &mut self,
        filename: &Path,
    ) -> Result<IndexMap<u64, Protocol>, ProjectError> {
        let text = std::fs::read_to_string(filename)?;
        self.load_protocols_json(&text)
    }

    /// Import a workflow from JSON text, remapping ids and pointers.
    pub fn load_protocols_json(
        &mut self,
        json: &str,
    ) -> Result<IndexMap<u64, Protocol>, ProjectError> {
        let entries: Vec<ExportEntry> = serde_json::from_str(json)?;
        let mut imported: IndexMap<u64, Protocol> = IndexMap::new();

        // Pass 1: instantiate every known class and persist to get ids
        for entry in &entries {
            let Some(class_name) = entry.get("object.className").and_then(Value::as_str) else {
                continue;
            };
            let Some(old_id) = entry.get("object.id").and_then(Value::as_u64) else {
                continue;
            };
            let mut prot = match self.registry.instantiate(class_name) {
                Ok(prot) => prot,
                Err(_) => {
                    tracing::error!(
                        class = class_name,
                        "protocol class not found, are you missing its plugin?"
                    );
                    continue;
                }
            };
            if let Some(label) = entry.get("object.label").and_then(Value::as_str) {
                prot.label = label.to_string();
            }
            if let Some(comment) = entry.get("object.comment").and_then(Value::as_str) {
                prot.comment = comment.to_string();
            }
            prot.use_queue = entry
                .get("_useQueue")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if let Some(params) = entry.get("_queueParams") {
                prot.queue_params = serde_json::from_value(params.clone()).unwrap_or_default();
            }
            prot.force_schedule = entry
                .get("forceSchedule")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            // Keep the old ids until the second pass can remap them
            prot.prerequisites = entry
                .get("_prerequisites")
                .and_then(|v| serde_json::from_value::<Vec<u64>>(v.clone()).ok())
                .unwrap_or_default()
                .into_iter()
                .map(ObjId)
                .collect();
            self.save_protocol(&mut prot)?;
            imported.insert(old_id, prot);
        }

        // Pass 2: remap prerequisites and pointer parameters
        for entry in &entries {
            let Some(old_id) = entry.get("object.id").and_then(Value::as_u64) else {
                continue;
            };
            let Some(prot) = imported.get(&old_id) else { continue };
            let mut prot = prot.clone();

            prot.prerequisites = prot
                .prerequisites
                .iter()
                .filter_map(|old| match imported.get(&old.0) {
                    Some(new) => Some(new.id),
                    None => {
                        tracing::info!(id = old.0, "\"wait for\" id missing, ignored");
                        None
                    }
                })
                .collect();

            let param_names: Vec<String> = prot.inputs.keys().cloned().collect();
            for name in param_names {
                let Some(raw) = entry.get(&name) else { continue };
                let Some(value) = prot.inputs.get_mut(&name) else { continue };
                import_param(value, raw, &imported);
            }

            self.store_protocol(&mut prot)?;
            imported.insert(old_id, prot);
        }

        self.store.commit()?;
        self.invalidate_runs();
        Ok(imported)
    }
}

/// Resolve one imported parameter value in place.
fn import_param(value: &mut ParamValue, raw: &Value, imported: &IndexMap<u64, Protocol>) {
    match value.kind() {
        ParamKind::Scalar => {
            if let Some(s) = raw.as_str() {
                *value = ParamValue::scalar(s);
            } else if !raw.is_null() {
                *value = ParamValue::scalar(raw.to_string());
            }
        }
        ParamKind::Pointer => {
            if let Some(pointer) = import_pointer(raw, imported) {
                *value = ParamValue::Pointer { pointer };
            }
        }
        ParamKind::PointerList => {
            let Some(items) = raw.as_array() else { return };
            let pointers: Vec<Pointer> = items
                .iter()
                .filter_map(|item| import_pointer(item, imported))
                .collect();
            *value = ParamValue::PointerList { pointers };
        }
        ParamKind::ScalarPointer => {
            // A plain value stays scalar; a pointer-shaped string rebinds
            // the backing pointer
            if let Some(pointer) = import_pointer(raw, imported) {
                if let ParamValue::ScalarPointer { pointer: p, .. } = value {
                    *p = pointer;
                }
            } else if let Some(s) = raw.as_str() {
                if let ParamValue::ScalarPointer { value: v, .. } = value {
                    *v = s.to_string();
                }
            }
        }
    }
}

/// Parse `"<oldId>.<ext>..."` and remap the id to the imported protocol.
///
/// Extended segments must look like attribute names; this keeps plain
/// decimals like `"1.5"` from being mistaken for pointers.
fn import_pointer(raw: &Value, imported: &IndexMap<u64, Protocol>) -> Option<Pointer> {
    let text = raw.as_str()?;
    let mut pointer = Pointer::parse(text).ok()?;
    if !pointer
        .extended
        .iter()
        .all(|part| part.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_'))
    {
        return None;
    }
    let target = imported.get(&pointer.target.0)?;
    pointer.target = target.id;
    Some(pointer)
}

#[cfg(test)]
#[path = "export_tests.rs"]
mod tests;
