use super::*;
use serial_test::serial;

#[tokio::test]
async fn explicit_credentials_bypass_environment() {
    let provider = CredentialProvider::explicit(AwsCredentials {
        access_key_id: "AKIAEXPLICIT0000000".to_string(),
        secret_access_key: "secret".to_string(),
        session_token: None,
    });
    let creds = provider.get().await.unwrap();
    assert_eq!(creds.access_key_id, "AKIAEXPLICIT0000000");
}

#[tokio::test]
#[serial]
async fn environment_discovery_reads_standard_vars() {
    unsafe {
        std::env::set_var("AWS_ACCESS_KEY_ID", "AKIAFROMENV000000000");
        std::env::set_var("AWS_SECRET_ACCESS_KEY", "envsecret");
        std::env::remove_var("AWS_SESSION_TOKEN");
    }
    let provider = CredentialProvider::from_environment();
    let creds = provider.get().await.unwrap();
    assert_eq!(creds.access_key_id, "AKIAFROMENV000000000");
    assert_eq!(creds.secret_access_key, "envsecret");
    assert!(creds.session_token.is_none());
    unsafe {
        std::env::remove_var("AWS_ACCESS_KEY_ID");
        std::env::remove_var("AWS_SECRET_ACCESS_KEY");
    }
}

#[tokio::test]
#[serial]
async fn missing_environment_vars_fail_with_auth_error() {
    unsafe {
        std::env::remove_var("AWS_ACCESS_KEY_ID");
        std::env::remove_var("AWS_SECRET_ACCESS_KEY");
    }
    let provider = CredentialProvider::from_environment();
    let result = provider.get().await;
    assert_eq!(result.unwrap_err().kind, ErrorKind::Auth);
}

#[tokio::test]
#[serial]
async fn cached_credentials_are_reused_within_ttl() {
    unsafe {
        std::env::set_var("AWS_ACCESS_KEY_ID", "AKIACACHED000000000");
        std::env::set_var("AWS_SECRET_ACCESS_KEY", "cachedsecret");
    }
    let provider = CredentialProvider::from_environment();
    let first = provider.get().await.unwrap();
    unsafe {
        std::env::set_var("AWS_ACCESS_KEY_ID", "AKIACHANGED000000000");
    }
    let second = provider.get().await.unwrap();
    assert_eq!(first.access_key_id, second.access_key_id);
    unsafe {
        std::env::remove_var("AWS_ACCESS_KEY_ID");
        std::env::remove_var("AWS_SECRET_ACCESS_KEY");
    }
}
