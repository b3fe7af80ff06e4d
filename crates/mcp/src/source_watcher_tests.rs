use super::*;
use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};

use conductor_core::server_config::ServerConfig;
use serde_json::Value;
use tempfile::tempdir;

use crate::connection::{Connector, McpConnection, ServerCapabilities};
use crate::events::LoggingEmitter;
use crate::process_handle::ProcessHandle;

struct StubConnection;

#[async_trait::async_trait]
impl McpConnection for StubConnection {
    async fn ping(&self) -> Result<(), ConductorError> {
        Ok(())
    }

    async fn list_tools(&self) -> Result<Vec<conductor_core::tool::ToolDefinition>, ConductorError> {
        Ok(Vec::new())
    }

    async fn call_tool(&self, _name: &str, _args: Value) -> Result<crate::client::ToolCallResponse, ConductorError> {
        unimplemented!()
    }

    async fn list_resources(&self) -> Result<Vec<Value>, ConductorError> {
        Ok(Vec::new())
    }

    async fn read_resource(&self, _uri: &str) -> Result<Value, ConductorError> {
        unimplemented!()
    }

    async fn close(&self) {}

    fn process_handle(&self) -> ProcessHandle {
        ProcessHandle::new(Arc::new(tokio::sync::Mutex::new(None)))
    }

    fn capabilities(&self) -> ServerCapabilities {
        ServerCapabilities::default()
    }
}

#[derive(Default)]
struct CountingConnector {
    connects: AtomicU32,
}

#[async_trait::async_trait]
impl Connector for CountingConnector {
    async fn connect(
        &self,
        _config: &ServerConfig,
        _logs: Arc<conductor_core::RingBuffer>,
    ) -> Result<Arc<dyn McpConnection>, ConductorError> {
        self.connects.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(Arc::new(StubConnection))
    }
}

async fn wait_until<F: Fn() -> bool>(predicate: F) -> bool {
    for _ in 0..200 {
        if predicate() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test]
async fn a_write_to_a_watched_path_restarts_its_server() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("server-binary");
    std::fs::write(&path, b"v1").unwrap();

    let connector = Arc::new(CountingConnector::default());
    let supervisor = Arc::new(Supervisor::new(connector.clone(), Arc::new(LoggingEmitter)));
    supervisor.start(ServerConfig::new("svc", "stub")).unwrap();
    assert!(wait_until(|| connector.connects.load(AtomicOrdering::SeqCst) >= 1).await);

    let watcher = SourceWatcher::with_debounce(supervisor.clone(), Duration::from_millis(50));
    watcher.watch("svc", path.to_str().unwrap()).unwrap();

    std::fs::write(&path, b"v2").unwrap();

    assert!(wait_until(|| connector.connects.load(AtomicOrdering::SeqCst) >= 2).await);

    watcher.close();
    supervisor.stop("svc").await.unwrap();
}

#[tokio::test]
async fn unwatch_drops_the_last_servers_interest_and_removes_the_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("shared-config");
    std::fs::write(&path, b"v1").unwrap();

    let connector = Arc::new(CountingConnector::default());
    let supervisor = Arc::new(Supervisor::new(connector, Arc::new(LoggingEmitter)));
    let watcher = SourceWatcher::new(supervisor);

    watcher.watch("a", path.to_str().unwrap()).unwrap();
    watcher.watch("b", path.to_str().unwrap()).unwrap();
    assert_eq!(watcher.watched_paths().len(), 1);

    watcher.unwatch("a", path.to_str().unwrap());
    assert_eq!(watcher.watched_paths().len(), 1);

    watcher.unwatch("b", path.to_str().unwrap());
    assert!(watcher.watched_paths().is_empty());
}

#[tokio::test]
async fn rapid_writes_within_the_debounce_window_trigger_a_single_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("server-binary");
    std::fs::write(&path, b"v1").unwrap();

    let connector = Arc::new(CountingConnector::default());
    let supervisor = Arc::new(Supervisor::new(connector.clone(), Arc::new(LoggingEmitter)));
    supervisor.start(ServerConfig::new("svc", "stub")).unwrap();
    assert!(wait_until(|| connector.connects.load(AtomicOrdering::SeqCst) >= 1).await);

    let watcher = SourceWatcher::with_debounce(supervisor.clone(), Duration::from_millis(200));
    watcher.watch("svc", path.to_str().unwrap()).unwrap();

    for i in 0..5u8 {
        std::fs::write(&path, [i]).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert!(wait_until(|| connector.connects.load(AtomicOrdering::SeqCst) >= 2).await);
    assert_eq!(connector.connects.load(AtomicOrdering::SeqCst), 2);

    watcher.close();
    supervisor.stop("svc").await.unwrap();
}
