use super::*;
use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};

use conductor_core::server_state::SupervisorState;

struct StubConnection {
    fail_ping: bool,
    closed: Arc<Mutex<bool>>,
}

#[async_trait::async_trait]
impl McpConnection for StubConnection {
    async fn ping(&self) -> Result<(), ConductorError> {
        if self.fail_ping {
            Err(ConductorError::new(conductor_core::error::ErrorKind::Network, "stub ping failed"))
        } else {
            Ok(())
        }
    }

    async fn list_tools(&self) -> Result<Vec<conductor_core::tool::ToolDefinition>, ConductorError> {
        Ok(vec![conductor_core::tool::ToolDefinition::new("echo", "echoes input", Value::Null)])
    }

    async fn call_tool(&self, _name: &str, _args: Value) -> Result<crate::client::ToolCallResponse, ConductorError> {
        unimplemented!("not exercised by monitor tests")
    }

    async fn list_resources(&self) -> Result<Vec<Value>, ConductorError> {
        Ok(Vec::new())
    }

    async fn read_resource(&self, _uri: &str) -> Result<Value, ConductorError> {
        unimplemented!("not exercised by monitor tests")
    }

    async fn close(&self) {
        *self.closed.lock() = true;
    }

    fn process_handle(&self) -> ProcessHandle {
        ProcessHandle::new(Arc::new(tokio::sync::Mutex::new(None)))
    }

    fn capabilities(&self) -> crate::connection::ServerCapabilities {
        crate::connection::ServerCapabilities { tools: true, resources: false, prompts: false }
    }
}

/// Connects successfully a fixed number of times before failing forever,
/// so tests can exercise both startup success and exhaustion paths.
struct StubConnector {
    connect_attempts: AtomicU32,
    fail_after: u32,
    fail_ping: bool,
}

impl StubConnector {
    fn always_succeeds() -> Self {
        Self { connect_attempts: AtomicU32::new(0), fail_after: u32::MAX, fail_ping: false }
    }

    fn always_fails() -> Self {
        Self { connect_attempts: AtomicU32::new(0), fail_after: 0, fail_ping: false }
    }

    fn ping_always_fails() -> Self {
        Self { connect_attempts: AtomicU32::new(0), fail_after: u32::MAX, fail_ping: true }
    }
}

#[async_trait::async_trait]
impl Connector for StubConnector {
    async fn connect(
        &self,
        _config: &ServerConfig,
        _logs: Arc<conductor_core::RingBuffer>,
    ) -> Result<Arc<dyn McpConnection>, ConductorError> {
        let attempt = self.connect_attempts.fetch_add(1, AtomicOrdering::SeqCst);
        if attempt >= self.fail_after {
            return Err(ConductorError::new(conductor_core::error::ErrorKind::StartFailed, "stub connect failed"));
        }
        Ok(Arc::new(StubConnection { fail_ping: self.fail_ping, closed: Arc::new(Mutex::new(false)) }))
    }
}

fn test_config(name: &str, policy: RestartPolicy, max_restart_attempts: u32) -> ServerConfig {
    ServerConfig {
        name: name.to_string(),
        command: "stub".to_string(),
        restart_policy: policy,
        max_restart_attempts,
        ..ServerConfig::new(name, "stub")
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
async fn successful_connect_reaches_running_and_populates_tool_count() {
    let config = test_config("alpha", RestartPolicy::Always, 3);
    let state = Arc::new(Mutex::new(ServerState::new(config.clone())));
    let handles = Arc::new(Mutex::new(MonitorHandles::default()));
    let connector: Arc<dyn Connector> = Arc::new(StubConnector::always_succeeds());
    let emitter: Arc<dyn EventEmitter> = Arc::new(crate::events::LoggingEmitter);
    let (_restart_tx, restart_rx) = mpsc::channel(1);
    let cancel = CancellationToken::new();

    let join_state = state.clone();
    let join_cancel = cancel.clone();
    let task = tokio::spawn(run(config, state.clone(), handles.clone(), Arc::new(conductor_core::RingBuffer::default()), connector, emitter, restart_rx, cancel));

    assert!(wait_until(|| join_state.lock().state == SupervisorState::Running).await);
    assert_eq!(join_state.lock().tool_count, Some(1));

    join_cancel.cancel();
    task.await.unwrap();
    assert_eq!(state.lock().state, SupervisorState::Stopped);
}

#[tokio::test]
async fn never_policy_terminates_after_a_single_connect_failure() {
    let config = test_config("beta", RestartPolicy::Never, 5);
    let state = Arc::new(Mutex::new(ServerState::new(config.clone())));
    let handles = Arc::new(Mutex::new(MonitorHandles::default()));
    let connector: Arc<dyn Connector> = Arc::new(StubConnector::always_fails());
    let emitter: Arc<dyn EventEmitter> = Arc::new(crate::events::LoggingEmitter);
    let (_restart_tx, restart_rx) = mpsc::channel(1);
    let cancel = CancellationToken::new();

    let task = tokio::spawn(run(config, state.clone(), handles.clone(), Arc::new(conductor_core::RingBuffer::default()), connector, emitter, restart_rx, cancel));
    task.await.unwrap();

    let guard = state.lock();
    assert_eq!(guard.state, SupervisorState::Stopped);
    assert_eq!(guard.failure_count, 1);
}

#[tokio::test]
async fn restart_attempts_are_exhausted_and_the_monitor_terminates() {
    let config = test_config("gamma", RestartPolicy::Always, 2);
    let state = Arc::new(Mutex::new(ServerState::new(config.clone())));
    let handles = Arc::new(Mutex::new(MonitorHandles::default()));
    let connector: Arc<dyn Connector> = Arc::new(StubConnector::always_fails());
    let emitter: Arc<dyn EventEmitter> = Arc::new(crate::events::LoggingEmitter);
    let (_restart_tx, restart_rx) = mpsc::channel(1);
    let cancel = CancellationToken::new();

    let task = tokio::spawn(run(config, state.clone(), handles.clone(), Arc::new(conductor_core::RingBuffer::default()), connector, emitter, restart_rx, cancel));
    task.await.unwrap();

    let guard = state.lock();
    assert_eq!(guard.state, SupervisorState::Stopped);
    assert_eq!(guard.failure_count, 2);
}

#[tokio::test]
async fn ping_failure_is_treated_as_a_startup_failure() {
    let config = test_config("delta", RestartPolicy::Never, 5);
    let state = Arc::new(Mutex::new(ServerState::new(config.clone())));
    let handles = Arc::new(Mutex::new(MonitorHandles::default()));
    let connector: Arc<dyn Connector> = Arc::new(StubConnector::ping_always_fails());
    let emitter: Arc<dyn EventEmitter> = Arc::new(crate::events::LoggingEmitter);
    let (_restart_tx, restart_rx) = mpsc::channel(1);
    let cancel = CancellationToken::new();

    let task = tokio::spawn(run(config, state.clone(), handles.clone(), Arc::new(conductor_core::RingBuffer::default()), connector, emitter, restart_rx, cancel));
    task.await.unwrap();

    assert_eq!(state.lock().state, SupervisorState::Stopped);
}

#[tokio::test]
async fn restart_signal_cycles_through_restarting_back_to_running() {
    let config = test_config("epsilon", RestartPolicy::Always, 5);
    let state = Arc::new(Mutex::new(ServerState::new(config.clone())));
    let handles = Arc::new(Mutex::new(MonitorHandles::default()));
    let connector: Arc<dyn Connector> = Arc::new(StubConnector::always_succeeds());
    let emitter: Arc<dyn EventEmitter> = Arc::new(crate::events::LoggingEmitter);
    let (restart_tx, restart_rx) = mpsc::channel(1);
    let cancel = CancellationToken::new();

    let join_state = state.clone();
    let task = tokio::spawn(run(config, state.clone(), handles.clone(), Arc::new(conductor_core::RingBuffer::default()), connector, emitter, restart_rx, cancel.clone()));

    assert!(wait_until(|| join_state.lock().state == SupervisorState::Running).await);
    restart_tx.send(()).await.unwrap();
    assert!(wait_until(|| join_state.lock().state == SupervisorState::Running).await);

    cancel.cancel();
    task.await.unwrap();
}

#[test]
fn backoff_doubles_up_to_the_thirty_second_cap() {
    assert_eq!(backoff_for(0), Duration::ZERO);
    assert_eq!(backoff_for(1), Duration::from_secs(1));
    assert_eq!(backoff_for(2), Duration::from_secs(2));
    assert_eq!(backoff_for(5), Duration::from_secs(16));
    assert_eq!(backoff_for(6), Duration::from_secs(30));
    assert_eq!(backoff_for(20), Duration::from_secs(30));
}
