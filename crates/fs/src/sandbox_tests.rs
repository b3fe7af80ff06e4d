use super::*;
use tempfile::tempdir;

#[test]
fn rejects_empty_path() {
    assert!(PathSandbox::normalize("").is_err());
}

#[test]
fn normalizes_relative_path_to_absolute() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("watched");
    std::fs::create_dir_all(&file).unwrap();
    let normalized = PathSandbox::normalize(file.to_str().unwrap()).unwrap();
    assert!(normalized.is_absolute());
}

#[test]
fn rejects_blocked_system_directories() {
    assert!(PathSandbox::normalize("/etc/passwd").is_err());
    assert!(PathSandbox::normalize("/etc").is_err());
    assert!(PathSandbox::normalize("/root/.bashrc").is_err());
}

#[test]
fn allows_sibling_paths_that_merely_share_a_prefix() {
    // "/etcetera" shares a textual prefix with "/etc" but is not inside
    // it, and must not be blocked.
    let result = check_blocklist(Path::new("/etcetera/file"));
    assert!(result.is_ok());
}

#[test]
fn rejects_dot_ssh_paths() {
    assert!(PathSandbox::normalize("/home/user/.ssh/id_rsa").is_err());
    assert!(PathSandbox::normalize("/home/user/.ssh").is_err());
}

#[test]
fn cleans_dot_dot_components() {
    let dir = tempdir().unwrap();
    let nested = dir.path().join("a").join("b");
    std::fs::create_dir_all(&nested).unwrap();
    let with_dotdot = nested.join("..").join("b");
    let normalized = PathSandbox::normalize(with_dotdot.to_str().unwrap()).unwrap();
    assert_eq!(normalized, nested.canonicalize().unwrap());
}

#[test]
fn walk_directory_respects_max_depth() {
    let dir = tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("a/b/c")).unwrap();
    let dirs = PathSandbox::walk_directory(dir.path(), 1).unwrap();
    let depth_2_present = dirs.iter().any(|p| p.ends_with("a/b"));
    let depth_3_present = dirs.iter().any(|p| p.ends_with("a/b/c"));
    assert!(depth_2_present);
    assert!(!depth_3_present);
}

#[test]
fn walk_directory_only_returns_directories() {
    let dir = tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("sub")).unwrap();
    std::fs::write(dir.path().join("file.txt"), b"x").unwrap();
    let dirs = PathSandbox::walk_directory(dir.path(), 5).unwrap();
    assert!(dirs.iter().all(|p| p.is_dir()));
}
