// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The project: store handle, settings, hosts, and run cache.

use crate::error::ProjectError;
use crate::registry::Registry;
use crate::relations::RelationGraph;
use crate::runs_graph::RunsGraph;
use crate::settings::ProjectSettings;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use lw_core::{ObjId, OutputRef, Protocol};
use lw_exec::{HostConfig, Launcher};
use lw_store::{Store, StoreError, StoredObject};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const PROJECT_DB: &str = "project.db";
pub const PROJECT_SETTINGS: &str = "settings.toml";
pub const PROJECT_LOGS: &str = "Logs";
pub const PROJECT_RUNS: &str = "Runs";
pub const PROJECT_TMP: &str = "Tmp";
pub const PROJECT_UPLOAD: &str = "Uploads";
pub const PROJECT_CONFIG: &str = ".config";
pub const HOSTS_FILE: &str = "hosts.conf";
/// Lookup name of the store row holding the project creation time
pub const CREATION_TIME: &str = "CreationTime";

/// How a project is opened or created.
pub struct ProjectOptions {
    pub runs_view: u32,
    pub read_only: bool,
    /// Explicit hosts file; copied into `.config/hosts.conf`
    pub hosts_file: Option<PathBuf>,
    pub launcher: Arc<dyn Launcher>,
}

impl ProjectOptions {
    pub fn new(launcher: Arc<dyn Launcher>) -> Self {
        Self {
            runs_view: 1,
            read_only: false,
            hosts_file: None,
            launcher,
        }
    }

    pub fn read_only(mut self, value: bool) -> Self {
        self.read_only = value;
        self
    }

    pub fn hosts_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.hosts_file = Some(path.into());
        self
    }
}

/// Process-wide state for one project directory.
///
/// Created once per directory and closed explicitly; all paths are
/// resolved against the project root and threaded through per operation.
pub struct Project {
    pub(crate) path: PathBuf,
    pub(crate) store: Store,
    pub(crate) settings: ProjectSettings,
    pub(crate) hosts: HashMap<String, HostConfig>,
    pub(crate) registry: Registry,
    pub(crate) launcher: Arc<dyn Launcher>,
    pub(crate) runs: Option<Vec<Protocol>>,
    pub(crate) runs_graph: Option<RunsGraph>,
    pub(crate) transform_graph: Option<RelationGraph>,
    pub(crate) source_graph: Option<RelationGraph>,
    pub(crate) read_only_folder: bool,
    pub(crate) creation_time: Option<DateTime<Utc>>,
    pub(crate) last_run_time: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for Project {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Project").field("path", &self.path).finish_non_exhaustive()
    }
}

impl Project {
    /// Prepare all required paths and files for a new project.
    pub fn create(
        path: impl Into<PathBuf>,
        registry: Registry,
        options: ProjectOptions,
    ) -> Result<Self, ProjectError> {
        let path = std::path::absolute(path.into())?;
        std::fs::create_dir_all(&path)?;
        for sub in [PROJECT_LOGS, PROJECT_RUNS, PROJECT_TMP, PROJECT_UPLOAD, PROJECT_CONFIG] {
            std::fs::create_dir_all(path.join(sub))?;
        }
        tracing::info!(path = %path.display(), "creating project");

        let mut store = Store::create(path.join(PROJECT_DB))?;
        let creation_time = Utc::now();
        store.insert(
            StoredObject::new("String", serde_json::json!(creation_time)).named(CREATION_TIME),
        )?;
        store.commit()?;

        let mut settings = ProjectSettings::default();
        settings.runs_view = options.runs_view;
        settings.read_only = options.read_only;
        settings.created = creation_time;
        settings.save(&path.join(PROJECT_SETTINGS))?;

        let hosts = load_hosts(&path, options.hosts_file.as_deref())?;

        Ok(Self {
            path,
            store,
            settings,
            hosts,
            registry,
            launcher: options.launcher,
            runs: None,
            runs_graph: None,
            transform_graph: None,
            source_graph: None,
            read_only_folder: false,
            creation_time: Some(creation_time),
            last_run_time: None,
        })
    }

    /// Load an existing project directory.
    pub fn load(
        path: impl Into<PathBuf>,
        registry: Registry,
        options: ProjectOptions,
    ) -> Result<Self, ProjectError> {
        let path = std::path::absolute(path.into())?;
        if !path.exists() {
            return Err(ProjectError::MissingProjectDb(path.join(PROJECT_DB)));
        }

        let read_only_folder = !dir_writable(&path);
        if read_only_folder {
            tracing::warn!(
                path = %path.display(),
                "no write permission for project folder, loading as read-only"
            );
        }

        let store = match Store::open(path.join(PROJECT_DB)) {
            Ok(store) => store,
            Err(StoreError::MissingDb(db)) => return Err(ProjectError::MissingProjectDb(db)),
            Err(e) => return Err(e.into()),
        };

        let settings_path = path.join(PROJECT_SETTINGS);
        let settings = if settings_path.exists() {
            ProjectSettings::load(&settings_path)?
        } else {
            tracing::info!("project has no settings file, using defaults");
            ProjectSettings::default()
        };

        let hosts = load_hosts(&path, options.hosts_file.as_deref())?;

        let mut project = Self {
            path,
            store,
            settings,
            hosts,
            registry,
            launcher: options.launcher,
            runs: None,
            runs_graph: None,
            transform_graph: None,
            source_graph: None,
            read_only_folder,
            creation_time: None,
            last_run_time: None,
        };
        project.load_creation_time()?;
        Ok(project)
    }

    /// Commit and drop the store handle.
    pub fn close(self) -> Result<(), ProjectError> {
        self.store.close()?;
        Ok(())
    }

    fn load_creation_time(&mut self) -> Result<(), ProjectError> {
        if let Some(row) = self.store.select_by_name(CREATION_TIME) {
            self.creation_time = serde_json::from_value(row.payload.clone()).ok();
        }
        if self.creation_time.is_none() {
            // Older projects only recorded it in the settings; write it back
            let created = self.settings.created;
            self.creation_time = Some(created);
            if !self.opened_read_only() {
                self.store.insert(
                    StoredObject::new("String", serde_json::json!(created)).named(CREATION_TIME),
                )?;
                self.store.commit()?;
            }
        }
        Ok(())
    }

    // --- paths ---

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn db_path(&self) -> PathBuf {
        self.path.join(PROJECT_DB)
    }

    pub fn runs_path(&self) -> PathBuf {
        self.path.join(PROJECT_RUNS)
    }

    pub fn logs_path(&self) -> PathBuf {
        self.path.join(PROJECT_LOGS)
    }

    pub fn tmp_path(&self) -> PathBuf {
        self.path.join(PROJECT_TMP)
    }

    // --- settings / read-only ---

    pub fn settings(&self) -> &ProjectSettings {
        &self.settings
    }

    pub fn set_read_only(&mut self, value: bool) {
        self.settings.read_only = value;
    }

    pub fn save_settings(&self) -> Result<(), ProjectError> {
        if !self.opened_read_only() {
            self.settings.save(&self.path.join(PROJECT_SETTINGS))?;
        }
        Ok(())
    }

    pub fn is_read_only(&self) -> bool {
        self.settings.read_only
    }

    /// Read-only settings flag or unwritable project folder.
    pub fn opened_read_only(&self) -> bool {
        self.settings.read_only || self.read_only_folder
    }

    // --- time ---

    pub fn creation_time(&self) -> Option<DateTime<Utc>> {
        self.creation_time
    }

    pub fn last_run_time(&self) -> Option<DateTime<Utc>> {
        self.last_run_time
    }

    /// Time from creation to the last run update.
    pub fn elapsed_time(&self) -> Option<ChronoDuration> {
        Some(self.last_run_time? - self.creation_time?)
    }

    /// Remaining lifetime against the settings limit.
    pub fn left_time(&self) -> Option<ChronoDuration> {
        let lifetime = ChronoDuration::hours(self.settings.lifetime_hours? as i64);
        Some(lifetime - self.elapsed_time().unwrap_or_else(ChronoDuration::zero))
    }

    pub(crate) fn annotate_last_run_time(&mut self, ended: Option<DateTime<Utc>>) {
        let Some(ended) = ended else { return };
        if self.last_run_time.is_none_or(|t| t < ended) {
            self.last_run_time = Some(ended);
        }
    }

    // --- hosts ---

    pub fn host_names(&self) -> Vec<&str> {
        self.hosts.keys().map(String::as_str).collect()
    }

    /// Host configuration for a protocol's host name, falling back to the
    /// default host with a warning when unknown.
    pub fn host_config(&self, host_name: &str) -> HostConfig {
        if let Some(host) = self.hosts.get(host_name) {
            return host.clone();
        }
        let fallback = self
            .hosts
            .get("localhost")
            .cloned()
            .or_else(|| self.hosts.values().next().cloned())
            .unwrap_or_default();
        tracing::warn!(
            host = host_name,
            using = %fallback.name,
            "protocol host not found, using fallback"
        );
        fallback
    }

    // --- store access ---

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn get_object(&self, id: ObjId) -> Option<&StoredObject> {
        self.store.select_by_id(id)
    }

    pub fn has_object(&self, id: ObjId) -> bool {
        self.store.exists(id)
    }

    /// Retrieve one protocol from the store by id.
    pub fn get_protocol(&self, id: ObjId) -> Result<Protocol, ProjectError> {
        let row = self
            .store
            .select_by_id(id)
            .ok_or(ProjectError::ProtocolNotFound(id))?;
        protocol_from_row(row).ok_or(ProjectError::ProtocolNotFound(id))
    }

    /// All stored protocols of one class.
    pub fn protocols_by_class(&self, class_name: &str) -> Vec<Protocol> {
        self.store
            .select_by_class(class_name)
            .into_iter()
            .filter_map(protocol_from_row)
            .collect()
    }

    /// Objects of any of the comma-separated classes, with an optional
    /// filter.
    pub fn iter_classes<'a>(
        &'a self,
        classes: &str,
        filter: impl Fn(&StoredObject) -> bool + 'a,
    ) -> Vec<&'a StoredObject> {
        let names: Vec<String> = classes.split(',').map(|c| c.trim().to_string()).collect();
        self.store
            .select_all(move |row| names.iter().any(|n| *n == row.class_name) && filter(row))
    }

    // --- runs cache ---

    /// The existing protocol runs, refreshing from the store (and the
    /// update cycle) when asked or not yet loaded.
    pub fn runs(&mut self, refresh: bool) -> Result<&[Protocol], ProjectError> {
        if self.runs.is_none() || refresh {
            self.refresh_runs(false)?;
        }
        Ok(self.runs.as_deref().unwrap_or_default())
    }

    /// Reload every run from the store; active non-child runs go through
    /// the update cycle (their own store is the source of truth while they
    /// execute).
    pub(crate) fn refresh_runs(&mut self, check_pids: bool) -> Result<(), ProjectError> {
        let is_protocol = |row: &StoredObject| self.registry.get(&row.class_name).is_some();
        let mut runs: Vec<Protocol> = self
            .store
            .select_all(is_protocol)
            .into_iter()
            .filter_map(protocol_from_row)
            .collect();

        // Structure may have changed; rebuild lazily
        self.runs_graph = None;

        for run in &mut runs {
            if run.is_active() && !run.is_child() {
                self.update_protocol(run, check_pids, true);
            }
        }
        for run in &runs {
            self.annotate_last_run_time(run.ended);
        }
        self.store.commit()?;
        self.runs = Some(runs);
        Ok(())
    }

    pub(crate) fn invalidate_runs(&mut self) {
        self.runs = None;
        self.runs_graph = None;
    }

    /// True when an active run's own store is newer than the in-memory
    /// copy.
    pub fn need_refresh(&self) -> bool {
        let Some(runs) = &self.runs else { return true };
        runs.iter().any(|run| {
            run.is_active()
                && match Store::last_modified(&self.path.join(run.local_db_path())) {
                    Some(mtime) => run.updated.is_none_or(|u| u < mtime),
                    None => false,
                }
        })
    }

    // --- persistence helpers ---

    /// Write a protocol into the project store (insert when new), commit.
    /// Silently does nothing in read-only mode. Execution contexts use
    /// this to push status changes back into the project.
    pub fn store_protocol(&mut self, prot: &mut Protocol) -> Result<(), ProjectError> {
        if self.opened_read_only() {
            return Ok(());
        }
        prot.updated = Some(Utc::now());
        if prot.id.is_set() {
            self.store.update(protocol_row(prot))?;
        } else {
            prot.created = Some(Utc::now());
            let id = self.store.insert(protocol_row(prot))?;
            prot.id = id;
            // The payload serialized before the id existed; rewrite it
            self.store.update(protocol_row(prot))?;
        }
        self.store.commit()?;
        Ok(())
    }

    /// First store of a new protocol: persist to get an id, then assign
    /// the working directory from it and persist again.
    pub(crate) fn setup_protocol(&mut self, prot: &mut Protocol) -> Result<(), ProjectError> {
        if self.opened_read_only() {
            return Ok(());
        }
        self.store_protocol(prot)?;
        prot.working_dir =
            PathBuf::from(PROJECT_RUNS).join(format!("{:06}_{}", prot.id.0, prot.class_name));
        self.store_protocol(prot)?;
        Ok(())
    }

    /// Best-effort write of the protocol into its own run store.
    pub(crate) fn write_local_store(&self, prot: &Protocol) {
        let db = self.path.join(prot.local_db_path());
        if !db.exists() {
            return;
        }
        let result = (|| -> Result<(), StoreError> {
            let mut local = Store::open(&db)?;
            if local.exists(prot.id) {
                local.update(protocol_row(prot))?;
            }
            local.close()
        })();
        if let Err(e) = result {
            tracing::warn!(protocol = %prot.id, error = %e, "cannot write run store");
        }
    }

    /// Record an output produced by a protocol: the output object gets its
    /// own row (as a child of the run) and the protocol's output map and
    /// row are updated.
    pub fn register_output(
        &mut self,
        prot: &mut Protocol,
        key: impl Into<String>,
        class_name: impl Into<String>,
        streaming: bool,
    ) -> Result<ObjId, ProjectError> {
        let key = key.into();
        let class_name = class_name.into();
        let id = self.store.insert(
            StoredObject::new(&class_name, serde_json::json!({}))
                .labeled(&key)
                .child_of(prot.id),
        )?;
        let output = if streaming {
            OutputRef::open_set(id, class_name)
        } else {
            OutputRef::new(id, class_name)
        };
        prot.outputs.insert(key, output);
        self.store_protocol(prot)?;
        self.invalidate_runs();
        Ok(id)
    }
}

/// Serialize a protocol into its store row.
pub(crate) fn protocol_row(prot: &Protocol) -> StoredObject {
    StoredObject {
        id: prot.id,
        class_name: prot.class_name.clone(),
        name: None,
        label: prot.label.clone(),
        parent_id: prot.parent_id,
        payload: serde_json::to_value(prot).unwrap_or(serde_json::Value::Null),
        created: prot.created,
        updated: prot.updated,
    }
}

/// Deserialize a protocol from its store row; None when the row is not a
/// protocol payload.
pub(crate) fn protocol_from_row(row: &StoredObject) -> Option<Protocol> {
    let mut prot: Protocol = serde_json::from_value(row.payload.clone()).ok()?;
    prot.id = row.id;
    Some(prot)
}

fn load_hosts(
    path: &Path,
    explicit: Option<&Path>,
) -> Result<HashMap<String, HostConfig>, ProjectError> {
    let project_hosts = path.join(PROJECT_CONFIG).join(HOSTS_FILE);

    let file = if let Some(explicit) = explicit {
        // Adopt the explicit file as the project's own configuration
        if explicit != project_hosts {
            if let Some(parent) = project_hosts.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(explicit, &project_hosts)?;
        }
        Some(project_hosts)
    } else if project_hosts.exists() {
        Some(project_hosts)
    } else {
        dirs::config_dir()
            .map(|d| d.join("labwork").join(HOSTS_FILE))
            .filter(|p| p.exists())
    };

    match file {
        Some(file) => Ok(HostConfig::load_file(&file)?),
        None => Ok(HostConfig::default_hosts()),
    }
}

/// Probe whether the directory accepts writes.
fn dir_writable(path: &Path) -> bool {
    let probe = path.join(".lw_write_probe");
    match std::fs::OpenOptions::new().write(true).create_new(true).open(&probe) {
        Ok(file) => {
            drop(file);
            let _ = std::fs::remove_file(&probe);
            true
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => true,
        Err(_) => false,
    }
}

#[cfg(test)]
#[path = "project_tests.rs"]
mod tests;
