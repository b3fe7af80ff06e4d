// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Re-exports the per-server log ring buffer. The buffer itself
//! lives in `conductor-core` since `LogEntry` does too; this module is
//! just the name this crate's callers (`Supervisor`, `Registry`) reach
//! for when they mean "a server's captured log lines".

pub use conductor_core::log_entry::{LogEntry, LogSource};
pub use conductor_core::RingBuffer;
