// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Non-owning handle to a supervised child process. The client
//! owns the process's stdio pipes and lifecycle; this handle only
//! supports `kill()`, for supervisor-driven forced termination when a
//! graceful close hangs.

use std::sync::Arc;

use tokio::process::Child;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct ProcessHandle {
    child: Arc<Mutex<Option<Child>>>,
}

impl ProcessHandle {
    pub(crate) fn new(child: Arc<Mutex<Option<Child>>>) -> Self {
        Self { child }
    }

    /// Sends an immediate kill signal if the process is still present.
    /// A no-op once the process has already exited and been reaped.
    pub async fn kill(&self) {
        let mut guard = self.child.lock().await;
        if let Some(child) = guard.as_mut() {
            let _ = child.start_kill();
        }
    }

    pub async fn pid(&self) -> Option<u32> {
        self.child.lock().await.as_ref().and_then(Child::id)
    }
}

#[cfg(test)]
#[path = "process_handle_tests.rs"]
mod tests;
