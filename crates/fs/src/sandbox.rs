// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Path normalization, a system-directory blocklist, and TOCTOU-safe
//! symlink re-resolution.

use std::path::{Component, Path, PathBuf};

use conductor_core::error::{ConductorError, ErrorKind};

/// Prefixes that are always blocked, plus any path containing or
/// ending in `/.ssh`.
const BLOCKED_PREFIXES: &[&str] = &[
    "/etc",
    "/private/etc",
    "/sys",
    "/proc",
    "/dev",
    "/boot",
    "/root",
    "/var/log",
    "/private/var/log",
    "/var/run",
    "/private/var/run",
    "/tmp/systemd-private",
];

pub struct PathSandbox;

impl PathSandbox {
    /// Expands `~`/`${VAR}`/`$VAR`, makes the path absolute, cleans
    /// `.`/`..` components, resolves symlinks (tolerating a
    /// not-yet-existing target), and enforces the blocklist.
    pub fn normalize(path: &str) -> Result<PathBuf, ConductorError> {
        if path.is_empty() {
            return Err(ConductorError::new(ErrorKind::Validation, "path must not be empty").retryable(false));
        }

        let expanded = expand_vars(&expand_home(path)?);
        let absolute = to_absolute(&expanded)?;
        let cleaned = clean(&absolute);
        let resolved = resolve_symlink_best_effort(&cleaned);

        check_blocklist(&resolved)?;
        Ok(resolved)
    }

    /// Re-resolves symlinks on an already-normalized path to defeat
    /// swap-and-redirect attacks between watch registration and event
    /// delivery; returns an error if the re-resolved path is now
    /// blocked.
    pub fn recheck(path: &Path) -> Result<PathBuf, ConductorError> {
        let resolved = resolve_symlink_best_effort(path);
        check_blocklist(&resolved)?;
        Ok(resolved)
    }

    /// Returns directories (not files) under `root` up to `max_depth`
    /// (root itself is depth 0).
    pub fn walk_directory(root: &Path, max_depth: usize) -> Result<Vec<PathBuf>, ConductorError> {
        let mut out = Vec::new();
        walk_inner(root, 0, max_depth, &mut out)?;
        Ok(out)
    }
}

fn walk_inner(dir: &Path, depth: usize, max_depth: usize, out: &mut Vec<PathBuf>) -> Result<(), ConductorError> {
    out.push(dir.to_path_buf());
    if depth >= max_depth {
        return Ok(());
    }
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return Ok(()),
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            walk_inner(&path, depth + 1, max_depth, out)?;
        }
    }
    Ok(())
}

fn expand_home(path: &str) -> Result<String, ConductorError> {
    if let Some(rest) = path.strip_prefix('~') {
        let home = dirs_home()?;
        let rest = rest.strip_prefix('/').unwrap_or(rest);
        if rest.is_empty() {
            return Ok(home);
        }
        return Ok(format!("{home}/{rest}"));
    }
    Ok(path.to_string())
}

fn dirs_home() -> Result<String, ConductorError> {
    std::env::var("HOME").map_err(|_| {
        ConductorError::new(ErrorKind::Config, "cannot expand ~: HOME is not set").retryable(false)
    })
}

fn expand_vars(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut chars = path.char_indices().peekable();
    while let Some((_, c)) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        if chars.peek().map(|(_, c)| *c) == Some('{') {
            chars.next();
            let mut name = String::new();
            for (_, c) in chars.by_ref() {
                if c == '}' {
                    break;
                }
                name.push(c);
            }
            out.push_str(&std::env::var(&name).unwrap_or_default());
        } else {
            let mut name = String::new();
            while let Some((_, c)) = chars.peek() {
                if c.is_ascii_alphanumeric() || *c == '_' {
                    name.push(*c);
                    chars.next();
                } else {
                    break;
                }
            }
            out.push_str(&std::env::var(&name).unwrap_or_default());
        }
    }
    out
}

fn to_absolute(path: &str) -> Result<PathBuf, ConductorError> {
    let p = Path::new(path);
    if p.is_absolute() {
        Ok(p.to_path_buf())
    } else {
        let cwd = std::env::current_dir()
            .map_err(|e| ConductorError::new(ErrorKind::Config, format!("cannot resolve cwd: {e}")))?;
        Ok(cwd.join(p))
    }
}

fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other),
        }
    }
    out
}

fn resolve_symlink_best_effort(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn check_blocklist(path: &Path) -> Result<(), ConductorError> {
    let s = path.to_string_lossy();
    for prefix in BLOCKED_PREFIXES {
        if s.as_ref() == *prefix || s.starts_with(&format!("{prefix}/")) {
            return Err(blocked_error(&s));
        }
    }
    if s.contains("/.ssh/") || s.ends_with("/.ssh") {
        return Err(blocked_error(&s));
    }
    Ok(())
}

fn blocked_error(path: &str) -> ConductorError {
    ConductorError::new(ErrorKind::Validation, format!("path is in a blocked location: {path}")).retryable(false)
}

#[cfg(test)]
#[path = "sandbox_tests.rs"]
mod tests;
