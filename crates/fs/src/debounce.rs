// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-key debouncing with batch or last-wins coalescing.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use conductor_core::error::{ConductorError, ErrorKind};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceMode {
    Batch,
    LastWins,
}

struct KeyState<T> {
    pending: Vec<T>,
    timer: JoinHandle<()>,
}

struct Inner<K, T> {
    mode: DebounceMode,
    window: Duration,
    stopped: bool,
    keys: HashMap<K, KeyState<T>>,
}

/// Debounces events per key. `on_flush` runs with the internal lock
/// released so it may re-enter via [`Debouncer::add`].
pub struct Debouncer<K, T> {
    inner: Arc<Mutex<Inner<K, T>>>,
    on_flush: Arc<dyn Fn(K, Vec<T>) + Send + Sync>,
    idle: Arc<Notify>,
}

impl<K, T> Debouncer<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Send + 'static,
{
    pub fn new(
        mode: DebounceMode,
        window: Duration,
        on_flush: impl Fn(K, Vec<T>) + Send + Sync + 'static,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                mode,
                window,
                stopped: false,
                keys: HashMap::new(),
            })),
            on_flush: Arc::new(on_flush),
            idle: Arc::new(Notify::new()),
        }
    }

    /// Adds `event` under `key`. If a timer exists for the key it is
    /// stopped first; in batch mode the event is appended, in
    /// last-wins mode it replaces the pending list. A fresh timer for
    /// `window` is then started.
    pub fn add(&self, key: K, event: T) -> Result<(), ConductorError> {
        let mut guard = self.inner.lock();
        if guard.stopped {
            return Err(ConductorError::new(ErrorKind::Validation, "debouncer is stopped").retryable(false));
        }

        let mode = guard.mode;
        let mut pending = match guard.keys.remove(&key) {
            Some(existing) => {
                existing.timer.abort();
                existing.pending
            }
            None => Vec::new(),
        };
        match mode {
            DebounceMode::Batch => pending.push(event),
            DebounceMode::LastWins => pending = vec![event],
        }

        let window = guard.window;
        let inner = self.inner.clone();
        let on_flush = self.on_flush.clone();
        let idle = self.idle.clone();
        let timer_key = key.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            flush_key(&inner, &on_flush, &timer_key);
            idle.notify_waiters();
        });

        guard.keys.insert(key, KeyState { pending, timer });
        Ok(())
    }

    /// Idempotent: cancels all timers, flushes remaining entries once
    /// (batch: all events; last-wins: the last event per key), then
    /// refuses further `add`.
    pub fn stop(&self) {
        let mut guard = self.inner.lock();
        if guard.stopped {
            return;
        }
        guard.stopped = true;
        let drained: Vec<(K, Vec<T>)> = guard
            .keys
            .drain()
            .map(|(key, state)| {
                state.timer.abort();
                (key, state.pending)
            })
            .collect();
        drop(guard);
        for (key, pending) in drained {
            (self.on_flush)(key, pending);
        }
        self.idle.notify_waiters();
    }

    /// Blocks until no keys have a pending timer. Intended for tests
    /// and graceful-shutdown callers; polls rather than relying on a
    /// single notification since multiple keys may flush independently.
    pub async fn wait_idle(&self) {
        loop {
            {
                let guard = self.inner.lock();
                if guard.stopped || guard.keys.is_empty() {
                    return;
                }
            }
            tokio::select! {
                _ = self.idle.notified() => {}
                _ = tokio::time::sleep(Duration::from_millis(10)) => {}
            }
        }
    }
}

fn flush_key<K, T>(inner: &Arc<Mutex<Inner<K, T>>>, on_flush: &Arc<dyn Fn(K, Vec<T>) + Send + Sync>, key: &K)
where
    K: Eq + Hash + Clone,
{
    let drained = {
        let mut guard = inner.lock();
        guard.keys.remove(key).map(|state| state.pending)
    };
    if let Some(pending) = drained {
        on_flush(key.clone(), pending);
    }
}

#[cfg(test)]
#[path = "debounce_tests.rs"]
mod tests;
