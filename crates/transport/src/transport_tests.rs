use super::*;
use async_trait::async_trait;

struct StubConfig {
    transport_type: String,
    valid: bool,
}

impl TransportConfig for StubConfig {
    fn validate(&self) -> Result<(), ConductorError> {
        if self.valid {
            Ok(())
        } else {
            Err(ConductorError::new(ErrorKind::Validation, "invalid config"))
        }
    }

    fn transport_type(&self) -> &str {
        &self.transport_type
    }
}

struct StubTransport;

#[async_trait]
impl Transport for StubTransport {
    async fn execute(&self, _cancel: &CancellationToken, _request: &Request) -> Result<Response, ConductorError> {
        Ok(Response {
            status: 200,
            headers: HashMap::new(),
            body: Vec::new(),
            metadata: HashMap::new(),
        })
    }

    fn name(&self) -> &str {
        "stub"
    }

    fn set_rate_limiter(&self, _limiter: Arc<dyn RateLimiter>) {}
}

#[test]
fn rejects_empty_name() {
    let registry = TransportRegistry::new();
    let config = StubConfig { transport_type: "stub".into(), valid: true };
    assert!(registry.create("", &config).is_err());
}

#[test]
fn rejects_invalid_config() {
    let registry = TransportRegistry::new();
    let config = StubConfig { transport_type: "stub".into(), valid: false };
    assert!(registry.create("stub", &config).is_err());
}

#[test]
fn rejects_mismatched_transport_type() {
    let registry = TransportRegistry::new();
    registry.register("stub", |_cfg| Ok(Box::new(StubTransport) as Box<dyn Transport>)).unwrap();
    let config = StubConfig { transport_type: "other".into(), valid: true };
    assert!(registry.create("stub", &config).is_err());
}

#[test]
fn rejects_unregistered_transport() {
    let registry = TransportRegistry::new();
    let config = StubConfig { transport_type: "stub".into(), valid: true };
    assert!(registry.create("stub", &config).is_err());
}

#[test]
fn double_registration_fails() {
    let registry = TransportRegistry::new();
    registry.register("stub", |_cfg| Ok(Box::new(StubTransport) as Box<dyn Transport>)).unwrap();
    let result = registry.register("stub", |_cfg| Ok(Box::new(StubTransport) as Box<dyn Transport>));
    assert!(result.is_err());
}

#[test]
fn creates_transport_when_everything_matches() {
    let registry = TransportRegistry::new();
    registry.register("stub", |_cfg| Ok(Box::new(StubTransport) as Box<dyn Transport>)).unwrap();
    let config = StubConfig { transport_type: "stub".into(), valid: true };
    let transport = registry.create("stub", &config).unwrap();
    assert_eq!(transport.name(), "stub");
}
