// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only operation journal.
//!
//! One JSON op per line. Buffered appends become durable at `flush`;
//! `replay` streams every op back for store recovery.

use crate::row::StoredObject;
use lw_core::{ObjId, Relation};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// One journal entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    Insert { row: StoredObject },
    Update { row: StoredObject },
    Delete { id: ObjId },
    Relation { relation: Relation },
    DeleteRelations { owner: ObjId },
}

/// Append-only journal of [`Op`]s backing one store file.
#[derive(Debug)]
pub struct Journal {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl Journal {
    /// Open (creating if missing) the journal at `path`.
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Buffer one op. Not durable until [`Journal::flush`].
    pub fn append(&mut self, op: &Op) -> Result<(), serde_json::Error> {
        // serde_json::to_writer never emits newlines for our op types,
        // so one op is exactly one line.
        serde_json::to_writer(&mut self.writer, op)?;
        self.writer
            .write_all(b"\n")
            .map_err(<serde_json::Error as serde::ser::Error>::custom)?;
        Ok(())
    }

    /// Flush buffered ops and fsync the file.
    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()
    }

    /// Read every op currently in the journal, oldest first. Truncated or
    /// corrupt trailing lines are tolerated with a warning (a crash between
    /// write and flush can leave one).
    pub fn replay(path: &Path) -> std::io::Result<Vec<Op>> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let reader = BufReader::new(file);
        let mut ops = Vec::new();
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Op>(&line) {
                Ok(op) => ops.push(op),
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        line = lineno + 1,
                        error = %e,
                        "skipping unreadable journal line"
                    );
                }
            }
        }
        Ok(ops)
    }

    /// Drop every op, leaving an empty journal. Used after compaction.
    pub fn truncate(&mut self) -> std::io::Result<()> {
        self.writer.flush()?;
        let file = OpenOptions::new().write(true).truncate(true).open(&self.path)?;
        self.writer = BufWriter::new(file);
        self.flush()
    }
}

#[cfg(test)]
#[path = "journal_tests.rs"]
mod tests;
