// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The update cycle.
//!
//! While a protocol executes, its own run store is the source of truth;
//! the scheduler rehydrates the in-memory copy from it, preserving the
//! fields only the project side owns (job id, label, comment) and merging
//! outputs that were added locally. Transient read failures are retried
//! before the protocol is marked failed.

use crate::error::ProjectError;
use crate::project::{protocol_from_row, Project};
use lw_core::Protocol;
use lw_exec::pid_alive;
use lw_store::Store;
use std::time::Duration;

/// Outcome of one update-cycle pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateResult {
    Updated,
    NotUpdatedReadOnly,
    NotUpdatedUnnecessary,
    NotUpdatedError,
}

const UPDATE_TRIES: u32 = 3;
const RETRY_SLEEP: Duration = Duration::from_millis(500);

impl Project {
    /// Rehydrate an active protocol from its own run store.
    ///
    /// Retries transient failures up to 3 times with a 0.5 s sleep, then
    /// marks the protocol failed with the error text. The final attempt's
    /// result is what the caller sees.
    pub fn update_protocol(
        &mut self,
        prot: &mut Protocol,
        check_pid: bool,
        skip_up_to_date: bool,
    ) -> UpdateResult {
        if self.opened_read_only() {
            return UpdateResult::NotUpdatedReadOnly;
        }

        let mut tries = 0;
        loop {
            match self.try_update(prot, check_pid, skip_up_to_date) {
                Ok(result) => return result,
                Err(e) if tries >= UPDATE_TRIES => {
                    tracing::error!(
                        protocol = %prot.id,
                        job_id = prot.job_id.as_deref().unwrap_or(""),
                        error = %e,
                        "update cycle failed, marking protocol failed"
                    );
                    prot.set_failed(e.to_string());
                    if let Err(e) = self.store_protocol(prot) {
                        tracing::warn!(protocol = %prot.id, error = %e, "cannot persist failure");
                    }
                    return UpdateResult::NotUpdatedError;
                }
                Err(e) => {
                    tries += 1;
                    tracing::warn!(
                        protocol = %prot.id,
                        error = %e,
                        attempt = tries,
                        "couldn't update protocol from its own store, retrying"
                    );
                    std::thread::sleep(RETRY_SLEEP);
                }
            }
        }
    }

    fn try_update(
        &mut self,
        prot: &mut Protocol,
        check_pid: bool,
        skip_up_to_date: bool,
    ) -> Result<UpdateResult, ProjectError> {
        let db = self.path.join(prot.local_db_path());

        // Project-owned fields survive the rehydrate
        let job_id = prot.job_id.clone();
        let pid = prot.pid;
        let label = prot.label.clone();
        let comment = prot.comment.clone();

        let mtime = Store::last_modified(&db);
        if skip_up_to_date {
            if let (Some(updated), Some(mtime)) = (prot.updated, mtime) {
                if updated >= mtime {
                    return Ok(UpdateResult::NotUpdatedUnnecessary);
                }
            }
        }

        let run_store = Store::open(&db)?;
        let fresh = run_store
            .select_by_id(prot.id)
            .and_then(protocol_from_row)
            .ok_or(ProjectError::ProtocolNotFound(prot.id))?;

        // Keep outputs the project side added meanwhile (e.g. from the
        // result browser) that the run does not know about
        let local_outputs = prot.outputs.clone();
        *prot = fresh;
        for (key, output) in local_outputs {
            prot.outputs.entry(key).or_insert(output);
        }

        prot.job_id = job_id;
        if prot.pid == 0 {
            prot.pid = pid;
        }
        prot.label = label;
        prot.comment = comment;
        // Stamp with the run store's mtime, not the wall clock, so the
        // skip check stays consistent across processes
        prot.updated = mtime;

        if check_pid {
            self.check_pid(prot);
        }

        if self.opened_read_only() {
            return Ok(UpdateResult::NotUpdatedReadOnly);
        }
        self.store.update(crate::project::protocol_row(prot))?;
        Ok(UpdateResult::Updated)
    }

    /// Fail protocols whose local runner process has silently died.
    ///
    /// Applies to active, non-interactive, locally running, non-queued
    /// protocols with a known pid.
    pub fn check_pid(&self, prot: &mut Protocol) {
        if prot.pid == 0 {
            return;
        }
        let runs_locally = prot.host_name == "localhost";
        if prot.is_active()
            && prot.status != lw_core::Status::Interactive
            && runs_locally
            && !prot.use_queue
            && !pid_alive(prot.pid)
        {
            prot.set_failed(format!(
                "Process {} not found running on the machine. It probably has \
                 died or been killed without reporting the status back. The run \
                 logs might have information about what happened.",
                prot.pid
            ));
        }
    }
}

#[cfg(test)]
#[path = "update_tests.rs"]
mod tests;
