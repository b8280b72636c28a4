// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The object store: a materialized table over the journal.

use crate::journal::{Journal, Op};
use crate::row::StoredObject;
use crate::snapshot::{Snapshot, SnapshotError, CURRENT_SNAPSHOT_VERSION};
use chrono::{DateTime, Utc};
use lw_core::{ObjId, Relation};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store file not found at {0}")]
    MissingDb(PathBuf),
    #[error("object {0} not found")]
    NotFound(ObjId),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
}

/// Journal-backed object store with a relation table.
///
/// Single writer per file: every process owns its store file exclusively.
/// Reads are served from the materialized table (read-your-writes within a
/// process); other processes observe changes after `commit` once they
/// reopen or copy the file.
#[derive(Debug)]
pub struct Store {
    path: PathBuf,
    journal: Journal,
    rows: BTreeMap<u64, StoredObject>,
    relations: Vec<Relation>,
    next_id: u64,
}

impl Store {
    /// Create a fresh store at `path`, truncating any previous content.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let snap = Snapshot::path_for(&path);
        if snap.exists() {
            std::fs::remove_file(&snap)?;
        }
        std::fs::write(&path, b"")?;
        let journal = Journal::open(&path)?;
        Ok(Self {
            path,
            journal,
            rows: BTreeMap::new(),
            relations: Vec::new(),
            next_id: 1,
        })
    }

    /// Open an existing store, replaying snapshot + journal.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if !path.exists() {
            return Err(StoreError::MissingDb(path));
        }

        let (mut rows, mut relations, mut next_id) = match Snapshot::read(&path)? {
            Some(snap) => (snap.rows, snap.relations, snap.next_id),
            None => (BTreeMap::new(), Vec::new(), 1),
        };

        for op in Journal::replay(&path)? {
            match op {
                Op::Insert { row } | Op::Update { row } => {
                    next_id = next_id.max(row.id.0 + 1);
                    rows.insert(row.id.0, row);
                }
                Op::Delete { id } => {
                    rows.remove(&id.0);
                }
                Op::Relation { relation } => relations.push(relation),
                Op::DeleteRelations { owner } => {
                    relations.retain(|r| r.creator_id != owner);
                }
            }
        }

        let journal = Journal::open(&path)?;
        Ok(Self { path, journal, rows, relations, next_id })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File modification time of the backing journal; used by the update
    /// cycle to decide whether a rehydrate is necessary.
    pub fn last_modified(path: &Path) -> Option<DateTime<Utc>> {
        let mtime = std::fs::metadata(path).ok()?.modified().ok()?;
        Some(DateTime::<Utc>::from(mtime))
    }

    /// Insert a row, assigning the next stable id.
    pub fn insert(&mut self, mut row: StoredObject) -> Result<ObjId, StoreError> {
        let id = ObjId(self.next_id);
        self.next_id += 1;
        row.id = id;
        if row.created.is_none() {
            row.created = Some(Utc::now());
        }
        row.updated = Some(Utc::now());
        self.journal.append(&Op::Insert { row: row.clone() })?;
        self.rows.insert(id.0, row);
        Ok(id)
    }

    /// Update a row in place; the row keeps its id.
    pub fn update(&mut self, mut row: StoredObject) -> Result<(), StoreError> {
        if !self.rows.contains_key(&row.id.0) {
            return Err(StoreError::NotFound(row.id));
        }
        row.updated = Some(Utc::now());
        self.journal.append(&Op::Update { row: row.clone() })?;
        self.rows.insert(row.id.0, row);
        Ok(())
    }

    pub fn delete(&mut self, id: ObjId) -> Result<(), StoreError> {
        if self.rows.remove(&id.0).is_none() {
            return Err(StoreError::NotFound(id));
        }
        self.journal.append(&Op::Delete { id })?;
        Ok(())
    }

    pub fn exists(&self, id: ObjId) -> bool {
        self.rows.contains_key(&id.0)
    }

    pub fn select_by_id(&self, id: ObjId) -> Option<&StoredObject> {
        self.rows.get(&id.0)
    }

    /// All rows of one class, in id order.
    pub fn select_by_class(&self, class_name: &str) -> Vec<&StoredObject> {
        self.rows
            .values()
            .filter(|r| r.class_name == class_name)
            .collect()
    }

    /// All rows matching a filter, in id order.
    pub fn select_all<F>(&self, filter: F) -> Vec<&StoredObject>
    where
        F: Fn(&StoredObject) -> bool,
    {
        self.rows.values().filter(|r| filter(r)).collect()
    }

    /// First row carrying the given lookup name.
    pub fn select_by_name(&self, name: &str) -> Option<&StoredObject> {
        self.rows.values().find(|r| r.name.as_deref() == Some(name))
    }

    /// The parent row of an object, if it has one.
    pub fn parent_of(&self, id: ObjId) -> Option<&StoredObject> {
        let row = self.rows.get(&id.0)?;
        self.rows.get(&row.parent_id?.0)
    }

    // --- relations ---

    pub fn insert_relation(&mut self, relation: Relation) -> Result<(), StoreError> {
        self.journal.append(&Op::Relation { relation: relation.clone() })?;
        self.relations.push(relation);
        Ok(())
    }

    pub fn relations_by_name(&self, name: &str) -> Vec<&Relation> {
        self.relations.iter().filter(|r| r.name == name).collect()
    }

    /// Objects that are children of `id` through the named relation.
    pub fn relation_children(&self, name: &str, id: ObjId) -> Vec<&StoredObject> {
        self.relations
            .iter()
            .filter(|r| r.name == name && r.parent_id == id)
            .filter_map(|r| self.rows.get(&r.child_id.0))
            .collect()
    }

    /// Objects that are parents of `id` through the named relation.
    pub fn relation_parents(&self, name: &str, id: ObjId) -> Vec<&StoredObject> {
        self.relations
            .iter()
            .filter(|r| r.name == name && r.child_id == id)
            .filter_map(|r| self.rows.get(&r.parent_id.0))
            .collect()
    }

    /// Drop every relation created by the given protocol.
    pub fn delete_relations(&mut self, owner: ObjId) -> Result<(), StoreError> {
        self.journal.append(&Op::DeleteRelations { owner })?;
        self.relations.retain(|r| r.creator_id != owner);
        Ok(())
    }

    // --- durability ---

    /// Make everything appended so far durable.
    pub fn commit(&mut self) -> Result<(), StoreError> {
        self.journal.flush()?;
        Ok(())
    }

    /// Fold the journal into a compressed snapshot and truncate it.
    pub fn compact(&mut self) -> Result<(), StoreError> {
        self.journal.flush()?;
        let snapshot = Snapshot {
            version: CURRENT_SNAPSHOT_VERSION,
            next_id: self.next_id,
            rows: self.rows.clone(),
            relations: self.relations.clone(),
        };
        snapshot.write(&self.path)?;
        self.journal.truncate()?;
        Ok(())
    }

    /// Commit and drop the store handle.
    pub fn close(mut self) -> Result<(), StoreError> {
        self.commit()
    }

    /// Whole-file copy of a store (journal + snapshot twin) to a new path.
    ///
    /// This intentionally copies the entire project store into a run's
    /// working directory; a filtered view would be the finer alternative.
    pub fn copy_file(src: &Path, dst: &Path) -> Result<(), StoreError> {
        if !src.exists() {
            return Err(StoreError::MissingDb(src.to_path_buf()));
        }
        if let Some(parent) = dst.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::copy(src, dst)?;
        let src_snap = Snapshot::path_for(src);
        let dst_snap = Snapshot::path_for(dst);
        if src_snap.exists() {
            std::fs::copy(&src_snap, &dst_snap)?;
        } else if dst_snap.exists() {
            std::fs::remove_file(&dst_snap)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
