use super::*;
use conductor_core::server_config::RestartPolicy;
use serde_json::Value;

use crate::connection::ServerCapabilities;
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
        unimplemented!("not exercised by supervisor tests")
    }

    async fn list_resources(&self) -> Result<Vec<Value>, ConductorError> {
        Ok(Vec::new())
    }

    async fn read_resource(&self, _uri: &str) -> Result<Value, ConductorError> {
        unimplemented!("not exercised by supervisor tests")
    }

    async fn close(&self) {}

    fn process_handle(&self) -> ProcessHandle {
        ProcessHandle::new(Arc::new(tokio::sync::Mutex::new(None)))
    }

    fn capabilities(&self) -> ServerCapabilities {
        ServerCapabilities { tools: true, resources: false, prompts: false }
    }
}

/// A connection whose `close()` never returns, modeling a child that
/// ignores its shutdown signal so `stop_all` must fall back to `Kill()`.
struct HangingCloseConnection;

#[async_trait::async_trait]
impl McpConnection for HangingCloseConnection {
    async fn ping(&self) -> Result<(), ConductorError> {
        Ok(())
    }

    async fn list_tools(&self) -> Result<Vec<conductor_core::tool::ToolDefinition>, ConductorError> {
        Ok(Vec::new())
    }

    async fn call_tool(&self, _name: &str, _args: Value) -> Result<crate::client::ToolCallResponse, ConductorError> {
        unimplemented!("not exercised by supervisor tests")
    }

    async fn list_resources(&self) -> Result<Vec<Value>, ConductorError> {
        Ok(Vec::new())
    }

    async fn read_resource(&self, _uri: &str) -> Result<Value, ConductorError> {
        unimplemented!("not exercised by supervisor tests")
    }

    async fn close(&self) {
        std::future::pending::<()>().await;
    }

    fn process_handle(&self) -> ProcessHandle {
        ProcessHandle::new(Arc::new(tokio::sync::Mutex::new(None)))
    }

    fn capabilities(&self) -> ServerCapabilities {
        ServerCapabilities { tools: true, resources: false, prompts: false }
    }
}

struct AlwaysHangsOnClose;

#[async_trait::async_trait]
impl Connector for AlwaysHangsOnClose {
    async fn connect(
        &self,
        _config: &ServerConfig,
        _logs: Arc<conductor_core::RingBuffer>,
    ) -> Result<Arc<dyn McpConnection>, ConductorError> {
        Ok(Arc::new(HangingCloseConnection))
    }
}

struct AlwaysConnects;

#[async_trait::async_trait]
impl Connector for AlwaysConnects {
    async fn connect(
        &self,
        _config: &ServerConfig,
        _logs: Arc<conductor_core::RingBuffer>,
    ) -> Result<Arc<dyn McpConnection>, ConductorError> {
        Ok(Arc::new(StubConnection))
    }
}

struct NeverConnects;

#[async_trait::async_trait]
impl Connector for NeverConnects {
    async fn connect(
        &self,
        _config: &ServerConfig,
        _logs: Arc<conductor_core::RingBuffer>,
    ) -> Result<Arc<dyn McpConnection>, ConductorError> {
        Err(ConductorError::new(ErrorKind::StartFailed, "never connects"))
    }
}

fn supervisor_with(connector: Arc<dyn Connector>) -> Supervisor {
    Supervisor::new(connector, Arc::new(LoggingEmitter))
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
async fn start_rejects_a_duplicate_name() {
    let supervisor = supervisor_with(Arc::new(AlwaysConnects));
    supervisor.start(ServerConfig::new("alpha", "stub")).unwrap();
    let err = supervisor.start(ServerConfig::new("alpha", "stub")).unwrap_err();
    assert_eq!(err.kind, ErrorKind::AlreadyExists);
    supervisor.stop("alpha").await.unwrap();
}

#[tokio::test]
async fn start_reaches_running_and_get_client_returns_a_connection() {
    let supervisor = supervisor_with(Arc::new(AlwaysConnects));
    supervisor.start(ServerConfig::new("beta", "stub")).unwrap();

    assert!(
        wait_until(|| supervisor
            .get_status("beta")
            .map(|s| s.state == conductor_core::server_state::SupervisorState::Running)
            .unwrap_or(false))
        .await
    );
    assert!(supervisor.get_client("beta").is_some());

    supervisor.stop("beta").await.unwrap();
    assert!(supervisor.get_status("beta").is_none());
}

#[tokio::test]
async fn restart_fails_when_a_restart_is_already_pending() {
    let supervisor = supervisor_with(Arc::new(AlwaysConnects));
    supervisor.start(ServerConfig::new("gamma", "stub")).unwrap();
    assert!(
        wait_until(|| supervisor
            .get_status("gamma")
            .map(|s| s.state == conductor_core::server_state::SupervisorState::Running)
            .unwrap_or(false))
        .await
    );

    supervisor.restart("gamma").unwrap();
    let err = supervisor.restart("gamma").unwrap_err();
    assert!(err.message.contains("already pending"));

    supervisor.stop("gamma").await.unwrap();
}

#[tokio::test]
async fn stop_all_reports_no_force_kills_when_monitors_exit_promptly() {
    let supervisor = supervisor_with(Arc::new(AlwaysConnects));
    supervisor.start(ServerConfig::new("delta", "stub")).unwrap();
    supervisor.start(ServerConfig::new("epsilon", "stub")).unwrap();

    assert!(wait_until(|| supervisor.list_all_status().len() == 2).await);
    supervisor.stop_all().await.unwrap();
    assert!(supervisor.list_all_status().is_empty());
}

#[tokio::test]
async fn stop_all_force_kills_stragglers_within_the_stop_timeout() {
    let supervisor =
        Supervisor::with_stop_timeout(Arc::new(AlwaysHangsOnClose), Arc::new(LoggingEmitter), Duration::from_millis(100));
    let names = ["eta", "theta", "iota", "kappa", "lambda"];
    for name in names {
        supervisor.start(ServerConfig::new(name, "stub")).unwrap();
    }
    assert!(wait_until(|| supervisor.list_all_status().len() == names.len()).await);

    // All servers hang on close, so a per-server timeout would take
    // names.len() * 100ms sequentially; waited on concurrently it should
    // land close to the single 100ms stop timeout.
    let started = tokio::time::Instant::now();
    let err = supervisor.stop_all().await.unwrap_err();
    assert!(started.elapsed() < Duration::from_millis(300), "stop_all took {:?}", started.elapsed());
    for name in names {
        assert!(err.message.contains(name), "expected '{name}' in: {}", err.message);
    }
}

#[tokio::test]
async fn get_logs_is_empty_for_a_running_server_and_none_for_an_unknown_one() {
    let supervisor = supervisor_with(Arc::new(AlwaysConnects));
    supervisor.start(ServerConfig::new("kappa", "stub")).unwrap();
    assert!(
        wait_until(|| supervisor
            .get_status("kappa")
            .map(|s| s.state == conductor_core::server_state::SupervisorState::Running)
            .unwrap_or(false))
        .await
    );

    assert_eq!(supervisor.get_logs("kappa", 10), Some(Vec::new()));
    assert_eq!(supervisor.get_logs("no-such-server", 10), None);

    supervisor.stop("kappa").await.unwrap();
}

#[tokio::test]
async fn a_server_that_never_connects_settles_into_stopped_without_being_removed() {
    let supervisor = supervisor_with(Arc::new(NeverConnects));
    supervisor
        .start(ServerConfig {
            restart_policy: RestartPolicy::Never,
            ..ServerConfig::new("zeta", "stub")
        })
        .unwrap();

    assert!(
        wait_until(|| supervisor
            .get_status("zeta")
            .map(|s| s.state == conductor_core::server_state::SupervisorState::Stopped)
            .unwrap_or(false))
        .await
    );
    let _ = supervisor.stop("zeta").await;
}
