// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The file-event pipeline: `Service` owns watchers keyed by name, maps
//! raw notifier events into [`FileContext`], and submits debounced
//! batches to a [`Runner`].

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use conductor_core::error::{ConductorError, ErrorKind};
use conductor_core::file_context::{FileContext, FileEvent};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::debounce::{DebounceMode, Debouncer};
use crate::pattern::PatternMatcher;
use crate::rate_limit;
use crate::sandbox::PathSandbox;

const DEFAULT_MAX_DEPTH: usize = 10;

/// Executes a workflow with the given file bytes and inputs. Runner
/// errors are logged and counted by the pipeline, never propagated
/// back to the notifier.
#[async_trait]
pub trait Runner: Send + Sync {
    async fn run(&self, workflow: &[u8], inputs: Value) -> Result<(), ConductorError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTypeFilter {
    Created,
    Modified,
    Deleted,
    Renamed,
}

fn matches_filter(event: FileEvent, filters: &HashSet<EventTypeFilter>) -> bool {
    if filters.is_empty() {
        return true;
    }
    let filter = match event {
        FileEvent::Created => EventTypeFilter::Created,
        FileEvent::Modified => EventTypeFilter::Modified,
        FileEvent::Deleted => EventTypeFilter::Deleted,
        FileEvent::Renamed => EventTypeFilter::Renamed,
    };
    filters.contains(&filter)
}

#[derive(Debug, Clone)]
pub struct WatcherConfig {
    pub name: String,
    pub workflow: String,
    pub path: String,
    pub recursive: bool,
    pub max_depth: usize,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub event_types: HashSet<EventTypeFilter>,
    pub debounce_window: Option<std::time::Duration>,
    pub debounce_mode: DebounceMode,
    pub max_triggers_per_minute: u32,
    pub static_inputs: HashMap<String, Value>,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            workflow: String::new(),
            path: String::new(),
            recursive: false,
            max_depth: DEFAULT_MAX_DEPTH,
            include: Vec::new(),
            exclude: Vec::new(),
            event_types: HashSet::new(),
            debounce_window: None,
            debounce_mode: DebounceMode::Batch,
            max_triggers_per_minute: 0,
            static_inputs: HashMap::new(),
        }
    }
}

#[derive(Default)]
struct Counters(Mutex<HashMap<String, u64>>);

impl Counters {
    fn incr(&self, key: impl Into<String>) {
        *self.0.lock().entry(key.into()).or_insert(0) += 1;
    }

    fn get(&self, key: &str) -> u64 {
        *self.0.lock().get(key).unwrap_or(&0)
    }
}

/// In-process counters mirroring the pipeline's labeled metrics,
/// exposed as plain snapshots rather than a Prometheus registry.
#[derive(Default)]
pub struct Metrics {
    events_total: Counters,
    triggers_total: Counters,
    errors_total: Counters,
    rate_limited_total: Counters,
    pattern_excluded_total: Counters,
    active_watchers: std::sync::atomic::AtomicI64,
}

impl Metrics {
    pub fn active_watchers(&self) -> i64 {
        self.active_watchers.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub fn events_total(&self, watcher: &str, event_type: &str) -> u64 {
        self.events_total.get(&format!("{watcher}:{event_type}"))
    }

    pub fn triggers_total(&self, watcher: &str) -> u64 {
        self.triggers_total.get(watcher)
    }

    pub fn errors_total(&self, watcher: &str, error_type: &str) -> u64 {
        self.errors_total.get(&format!("{watcher}:{error_type}"))
    }

    pub fn rate_limited_total(&self, watcher: &str) -> u64 {
        self.rate_limited_total.get(watcher)
    }

    pub fn pattern_excluded_total(&self, watcher: &str) -> u64 {
        self.pattern_excluded_total.get(watcher)
    }
}

struct ActiveWatcher {
    _notifier: RecommendedWatcher,
    cancel: CancellationToken,
    task: JoinHandle<()>,
    debouncer: Option<Arc<Debouncer<String, FileContext>>>,
}

pub struct Service {
    workflows_dir: PathBuf,
    watchers: Mutex<HashMap<String, ActiveWatcher>>,
    runner: Arc<dyn Runner>,
    pub metrics: Arc<Metrics>,
}

impl Service {
    pub fn new(workflows_dir: impl Into<PathBuf>, runner: Arc<dyn Runner>) -> Self {
        Self {
            workflows_dir: workflows_dir.into(),
            watchers: Mutex::new(HashMap::new()),
            runner,
            metrics: Arc::new(Metrics::default()),
        }
    }

    /// Registers and starts a watcher: validates the config, resolves and
    /// sandboxes the path, installs the notifier, and builds the matcher
    /// and rate limiter.
    pub async fn add_watcher(&self, config: WatcherConfig) -> Result<(), ConductorError> {
        if config.name.is_empty() || config.workflow.is_empty() || config.path.is_empty() {
            return Err(ConductorError::new(
                ErrorKind::Validation,
                "watcher requires a non-empty name, workflow, and path",
            )
            .retryable(false));
        }
        {
            let watchers = self.watchers.lock();
            if watchers.contains_key(&config.name) {
                return Err(ConductorError::new(
                    ErrorKind::AlreadyExists,
                    format!("watcher '{}' already registered", config.name),
                )
                .retryable(false));
            }
        }

        let root = PathSandbox::normalize(&config.path)?;

        let (tx, mut rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
        let mut notifier = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let _ = tx.send(res);
            },
            notify::Config::default(),
        )
        .map_err(|e| ConductorError::new(ErrorKind::Config, format!("failed to start notifier: {e}")))?;

        notifier
            .watch(&root, RecursiveMode::NonRecursive)
            .map_err(|e| ConductorError::new(ErrorKind::Config, format!("failed to watch {}: {e}", root.display())))?;

        if config.recursive {
            for dir in PathSandbox::walk_directory(&root, config.max_depth)?.into_iter().skip(1) {
                notifier
                    .watch(&dir, RecursiveMode::NonRecursive)
                    .map_err(|e| ConductorError::new(ErrorKind::Config, format!("failed to watch {}: {e}", dir.display())))?;
            }
        }

        let matcher = Some(Arc::new(PatternMatcher::new(&config.include, &config.exclude, true)?));

        let limiter = if config.max_triggers_per_minute > 0 {
            Some(Arc::new(rate_limit::build(config.max_triggers_per_minute)))
        } else {
            None
        };

        let cancel = CancellationToken::new();
        let runner = self.runner.clone();
        let metrics = self.metrics.clone();
        let workflows_dir = self.workflows_dir.clone();
        let watcher_name = config.name.clone();
        let workflow = config.workflow.clone();
        let event_types = config.event_types.clone();
        let static_inputs = config.static_inputs.clone();

        let debouncer = config.debounce_window.map(|window| {
            let runner = runner.clone();
            let metrics = metrics.clone();
            let workflows_dir = workflows_dir.clone();
            let watcher_name = watcher_name.clone();
            let workflow = workflow.clone();
            let static_inputs = static_inputs.clone();
            let limiter = limiter.clone();
            Arc::new(Debouncer::new(config.debounce_mode, window, move |_key, events: Vec<FileContext>| {
                let runner = runner.clone();
                let metrics = metrics.clone();
                let workflows_dir = workflows_dir.clone();
                let watcher_name = watcher_name.clone();
                let workflow = workflow.clone();
                let static_inputs = static_inputs.clone();
                let limiter = limiter.clone();
                tokio::spawn(async move {
                    deliver(&runner, &metrics, &workflows_dir, &watcher_name, &workflow, &static_inputs, events, limiter.as_deref()).await;
                });
            }))
        });

        let loop_matcher = matcher.clone();
        let loop_debouncer = debouncer.clone();
        let loop_limiter = limiter.clone();
        let loop_cancel = cancel.clone();
        let loop_metrics = metrics.clone();
        let loop_workflows_dir = workflows_dir.clone();
        let loop_watcher_name = watcher_name.clone();
        let loop_workflow = workflow.clone();
        let loop_static_inputs = static_inputs.clone();

        let bundle = DeliveryBundle {
            runner,
            metrics: loop_metrics.clone(),
            workflows_dir: loop_workflows_dir,
            watcher_name: loop_watcher_name.clone(),
            workflow: loop_workflow,
            static_inputs: loop_static_inputs,
        };

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = loop_cancel.cancelled() => break,
                    event = rx.recv() => {
                        let Some(event) = event else { break };
                        match event {
                            Ok(event) => {
                                process_raw_event(
                                    event,
                                    &event_types,
                                    loop_matcher.as_deref(),
                                    loop_debouncer.as_deref(),
                                    &bundle,
                                    loop_limiter.as_deref(),
                                )
                                .await;
                            }
                            Err(e) => {
                                loop_metrics.errors_total.incr(format!("{loop_watcher_name}:notify"));
                                tracing::warn!(watcher = %loop_watcher_name, error = %e, "file watcher notify error");
                            }
                        }
                    }
                }
            }
        });

        self.metrics.active_watchers.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.watchers.lock().insert(
            config.name.clone(),
            ActiveWatcher {
                _notifier: notifier,
                cancel,
                task,
                debouncer,
            },
        );
        Ok(())
    }

    pub fn remove_watcher(&self, name: &str) {
        if let Some(watcher) = self.watchers.lock().remove(name) {
            watcher.cancel.cancel();
            watcher.task.abort();
            if let Some(debouncer) = &watcher.debouncer {
                debouncer.stop();
            }
            self.metrics.active_watchers.fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
        }
    }

    pub fn watcher_names(&self) -> Vec<String> {
        self.watchers.lock().keys().cloned().collect()
    }
}

struct DeliveryBundle {
    runner: Arc<dyn Runner>,
    metrics: Arc<Metrics>,
    workflows_dir: PathBuf,
    watcher_name: String,
    workflow: String,
    static_inputs: HashMap<String, Value>,
}

/// Maps a raw notifier event, filters by configured type/pattern, and
/// either hands it to the debouncer or delivers it immediately as a
/// one-element batch.
async fn process_raw_event(
    event: Event,
    event_types: &HashSet<EventTypeFilter>,
    matcher: Option<&PatternMatcher>,
    debouncer: Option<&Arc<Debouncer<String, FileContext>>>,
    bundle: &DeliveryBundle,
    limiter: Option<&conductor_transport::rate_limiter::TokenBucket>,
) {
    for path in &event.paths {
        let Some(file_event) = map_event_kind(&event.kind) else { continue };
        if !matches_filter(file_event, event_types) {
            continue;
        }

        let context = build_context(path, file_event);

        let Ok(resolved) = PathSandbox::recheck(path) else { continue };
        let context = FileContext { path: resolved.to_string_lossy().into_owned(), ..context };

        if let Some(matcher) = matcher {
            if !matcher.matches(Path::new(&context.path)) {
                bundle.metrics.pattern_excluded_total.incr(bundle.watcher_name.clone());
                continue;
            }
        }

        bundle
            .metrics
            .events_total
            .incr(format!("{}:{:?}", bundle.watcher_name, file_event));

        if let Some(debouncer) = debouncer {
            let _ = debouncer.add(context.path.clone(), context);
        } else {
            deliver(
                &bundle.runner,
                &bundle.metrics,
                &bundle.workflows_dir,
                &bundle.watcher_name,
                &bundle.workflow,
                &bundle.static_inputs,
                vec![context],
                limiter,
            )
            .await;
        }
    }
}

fn map_event_kind(kind: &EventKind) -> Option<FileEvent> {
    match kind {
        EventKind::Create(_) => Some(FileEvent::Created),
        EventKind::Modify(notify::event::ModifyKind::Name(_)) => Some(FileEvent::Renamed),
        EventKind::Modify(notify::event::ModifyKind::Metadata(_)) => None,
        EventKind::Modify(_) => Some(FileEvent::Modified),
        EventKind::Remove(_) => Some(FileEvent::Deleted),
        _ => None,
    }
}

fn build_context(path: &Path, event: FileEvent) -> FileContext {
    if event == FileEvent::Deleted {
        return FileContext::deleted(path);
    }
    let metadata = std::fs::metadata(path).ok();
    let size = metadata.as_ref().map(|m| m.len()).unwrap_or(0);
    let is_dir = metadata.as_ref().map(|m| m.is_dir()).unwrap_or(false);
    let mtime = metadata
        .and_then(|m| m.modified().ok())
        .map(DateTime::<Utc>::from)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    FileContext::from_parts(path, event, None, size, mtime, is_dir)
}

/// Delivers a batch: acquires a rate-limit token, reads the workflow
/// bytes, builds inputs, and submits to the runner.
async fn deliver(
    runner: &Arc<dyn Runner>,
    metrics: &Arc<Metrics>,
    workflows_dir: &Path,
    watcher_name: &str,
    workflow: &str,
    static_inputs: &HashMap<String, Value>,
    events: Vec<FileContext>,
    limiter: Option<&conductor_transport::rate_limiter::TokenBucket>,
) {
    if events.is_empty() {
        return;
    }

    if let Some(limiter) = limiter {
        if !limiter.try_acquire() {
            metrics.rate_limited_total.incr(watcher_name.to_string());
            return;
        }
    }

    let workflow_path = if Path::new(workflow).is_absolute() {
        PathBuf::from(workflow)
    } else {
        workflows_dir.join(workflow)
    };
    let bytes = match tokio::fs::read(&workflow_path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            metrics.errors_total.incr(format!("{watcher_name}:read_workflow"));
            tracing::warn!(watcher = %watcher_name, error = %e, "failed to read workflow file");
            return;
        }
    };

    let mut inputs = static_inputs.clone();
    let trigger = if events.len() > 1 {
        serde_json::json!({
            "file": events[0],
            "files": events,
            "count": events.len(),
        })
    } else {
        serde_json::json!({ "file": events[0] })
    };
    inputs.insert("trigger".to_string(), trigger);

    metrics.triggers_total.incr(watcher_name.to_string());

    if let Err(e) = runner.run(&bytes, Value::Object(inputs.into_iter().collect())).await {
        metrics.errors_total.incr(format!("{watcher_name}:runner"));
        tracing::warn!(watcher = %watcher_name, error = %e, "workflow run failed");
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
