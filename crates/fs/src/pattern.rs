// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Extended-glob include/exclude pattern matching.

use std::path::Path;

use conductor_core::error::{ConductorError, ErrorKind};
use globset::{Glob, GlobSet, GlobSetBuilder};

/// Patterns that are always excluded unless the caller overrides them;
/// editor swap files and common VCS/IDE noise.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "*.swp",
    "*.swo",
    "*.swn",
    ".*.sw?",
    "*~",
    "#*#",
    ".#*",
    ".DS_Store",
    "Thumbs.db",
    "**/.idea/**",
    "**/.vscode/**",
    "*.tmp",
    "*.temp",
];

pub struct PatternMatcher {
    include: Option<GlobSet>,
    exclude: GlobSet,
}

impl PatternMatcher {
    /// An empty `include` list matches everything. `exclude` is merged
    /// with [`DEFAULT_EXCLUDES`] unless `include_defaults` is false.
    pub fn new(include: &[String], exclude: &[String], include_defaults: bool) -> Result<Self, ConductorError> {
        let include = if include.is_empty() {
            None
        } else {
            Some(build_glob_set(include)?)
        };

        let mut exclude_patterns: Vec<&str> = exclude.iter().map(String::as_str).collect();
        if include_defaults {
            exclude_patterns.extend(DEFAULT_EXCLUDES);
        }
        let exclude = build_glob_set_str(&exclude_patterns)?;

        Ok(Self { include, exclude })
    }

    /// A path matches if it (a) matches any include pattern or include
    /// is empty, and (b) matches no exclude pattern. Each pattern is
    /// tried against the full path first, then the basename.
    pub fn matches(&self, path: &Path) -> bool {
        let basename = path.file_name().and_then(|n| n.to_str());

        let included = match &self.include {
            None => true,
            Some(set) => set_matches(set, path, basename),
        };
        if !included {
            return false;
        }

        !set_matches(&self.exclude, path, basename)
    }
}

fn set_matches(set: &GlobSet, path: &Path, basename: Option<&str>) -> bool {
    if set.is_match(path) {
        return true;
    }
    if let Some(basename) = basename {
        if set.is_match(basename) {
            return true;
        }
    }
    false
}

fn build_glob_set(patterns: &[String]) -> Result<GlobSet, ConductorError> {
    let refs: Vec<&str> = patterns.iter().map(String::as_str).collect();
    build_glob_set_str(&refs)
}

fn build_glob_set_str(patterns: &[&str]) -> Result<GlobSet, ConductorError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| {
            ConductorError::new(ErrorKind::Validation, format!("invalid glob pattern {pattern:?}: {e}"))
                .retryable(false)
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| ConductorError::new(ErrorKind::Validation, format!("failed to compile glob set: {e}")).retryable(false))
}

#[cfg(test)]
#[path = "pattern_tests.rs"]
mod tests;
