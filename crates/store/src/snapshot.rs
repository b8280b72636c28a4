// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot persistence for store compaction.
//!
//! A snapshot is the complete object and relation table at a point in time,
//! serialized as JSON and zstd-compressed. Recovery loads the snapshot and
//! replays the journal written after it.

use crate::row::StoredObject;
use lw_core::Relation;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Current snapshot schema version
pub const CURRENT_SNAPSHOT_VERSION: u32 = 1;

const ZSTD_LEVEL: i32 = 3;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported snapshot version {0}")]
    Version(u32),
}

/// Complete store state at compaction time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Schema version for migrations
    #[serde(rename = "v")]
    pub version: u32,
    pub next_id: u64,
    pub rows: BTreeMap<u64, StoredObject>,
    pub relations: Vec<Relation>,
}

impl Snapshot {
    /// Path of the snapshot twin of a store file (`project.db` →
    /// `project.db.snap`).
    pub fn path_for(db_path: &Path) -> PathBuf {
        let mut p = db_path.as_os_str().to_owned();
        p.push(".snap");
        PathBuf::from(p)
    }

    pub fn write(&self, db_path: &Path) -> Result<(), SnapshotError> {
        let path = Self::path_for(db_path);
        let tmp = path.with_extension("snap.tmp");
        {
            let file = BufWriter::new(File::create(&tmp)?);
            let encoder = zstd::stream::Encoder::new(file, ZSTD_LEVEL)?.auto_finish();
            serde_json::to_writer(encoder, self)?;
        }
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Load the snapshot twin of `db_path`, if one exists.
    pub fn read(db_path: &Path) -> Result<Option<Self>, SnapshotError> {
        let path = Self::path_for(db_path);
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let decoder = zstd::stream::Decoder::new(BufReader::new(file))?;
        let snapshot: Snapshot = serde_json::from_reader(decoder)?;
        if snapshot.version != CURRENT_SNAPSHOT_VERSION {
            return Err(SnapshotError::Version(snapshot.version));
        }
        Ok(Some(snapshot))
    }
}
