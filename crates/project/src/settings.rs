// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project settings (`settings.toml`).

use crate::error::ProjectError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// User-facing project settings, persisted next to the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectSettings {
    /// Which runs view the browser shows for this project
    pub runs_view: u32,
    pub read_only: bool,
    /// Project lifetime in hours; None means unlimited
    pub lifetime_hours: Option<u64>,
    pub created: DateTime<Utc>,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            runs_view: 1,
            read_only: false,
            lifetime_hours: None,
            created: Utc::now(),
        }
    }
}

impl ProjectSettings {
    pub fn load(path: &Path) -> Result<Self, ProjectError> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text)
            .map_err(|e| ProjectError::Settings(format!("{}: {e}", path.display())))
    }

    pub fn save(&self, path: &Path) -> Result<(), ProjectError> {
        let text = toml::to_string_pretty(self)
            .map_err(|e| ProjectError::Settings(e.to_string()))?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
