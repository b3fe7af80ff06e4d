use super::*;

#[test]
fn accepts_minimal_valid_config() {
    let cfg = ServerConfig::new("fs-server", "npx");
    assert!(cfg.validate().is_ok());
}

#[test]
fn rejects_invalid_names() {
    for bad in ["", "1abc", "abc def", "a".repeat(65).as_str(), "abc!"] {
        let cfg = ServerConfig::new(bad, "npx");
        assert!(cfg.validate().is_err(), "expected {bad:?} to be rejected");
    }
}

#[test]
fn accepts_boundary_length_name() {
    let name = format!("a{}", "b".repeat(63));
    let cfg = ServerConfig::new(name, "npx");
    assert!(cfg.validate().is_ok());
}

#[test]
fn rejects_empty_command() {
    let cfg = ServerConfig::new("fs-server", "   ");
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_args_with_shell_metacharacters() {
    for bad_arg in ["a; rm -rf /", "a && b", "a || b", "a | b", "`id`", "$(id)", "${HOME}", "a\nb"] {
        let mut cfg = ServerConfig::new("fs-server", "npx");
        cfg.args = vec![bad_arg.to_string()];
        assert!(cfg.validate().is_err(), "expected arg {bad_arg:?} to be rejected");
    }
}

#[test]
fn accepts_args_without_metacharacters() {
    let mut cfg = ServerConfig::new("fs-server", "npx");
    cfg.args = vec!["--port".to_string(), "8080".to_string()];
    assert!(cfg.validate().is_ok());
}

#[test]
fn env_values_may_contain_variable_substitution_syntax() {
    let mut cfg = ServerConfig::new("fs-server", "npx");
    cfg.env = vec!["TOKEN=${GITHUB_TOKEN}".to_string()];
    assert!(cfg.validate().is_ok());
}

#[test]
fn env_values_still_reject_other_shell_metacharacters() {
    let mut cfg = ServerConfig::new("fs-server", "npx");
    cfg.env = vec!["CMD=a; rm -rf /".to_string()];
    assert!(cfg.validate().is_err());
}

#[test]
fn defaults_match_spec() {
    let cfg = ServerConfig::default();
    assert_eq!(cfg.timeout_secs, std::time::Duration::from_secs(30));
    assert_eq!(cfg.restart_policy, RestartPolicy::Always);
    assert_eq!(cfg.max_restart_attempts, 5);
    assert!(!cfg.auto_start);
}
