use super::*;
use tempfile::tempdir;

#[test]
fn writes_and_reads_back_contents() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("mcp.yaml");
    write_atomic(&path, b"servers: {}\n").unwrap();
    let contents = fs::read_to_string(&path).unwrap();
    assert_eq!(contents, "servers: {}\n");
}

#[test]
fn no_leftover_tmp_file_after_success() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mcp.yaml");
    write_atomic(&path, b"ok").unwrap();
    assert!(!path.with_extension("tmp").exists());
}

#[test]
fn read_tolerant_treats_missing_file_as_none() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing.yaml");
    let result: Option<String> = read_tolerant(&path, |s| Ok(s.to_string()));
    assert!(result.is_none());
}

#[test]
fn read_tolerant_treats_corrupt_content_as_none() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("corrupt.yaml");
    fs::write(&path, b"not: [valid yaml").unwrap();
    let result: Option<serde_yaml::Value> = read_tolerant(&path, |s| serde_yaml::from_str(s));
    assert!(result.is_none());
}

#[cfg(unix)]
#[test]
fn written_file_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;
    let dir = tempdir().unwrap();
    let path = dir.path().join("mcp.yaml");
    write_atomic(&path, b"ok").unwrap();
    let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o600);
}
