// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process liveness.

use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;

/// True when a process with this pid exists (signal 0 probe).
///
/// Pid 0 means "unknown" and is reported as not alive; callers decide
/// whether to skip the check in that case.
pub fn pid_alive(pid: u32) -> bool {
    if pid == 0 {
        return false;
    }
    let Ok(pid) = i32::try_from(pid) else {
        return false;
    };
    match kill(Pid::from_raw(pid), None) {
        Ok(()) => true,
        // Not permitted to signal it, but it exists
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}
