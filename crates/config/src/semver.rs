// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Semver constraint grammar: `<op>? <version>`, comma-AND,
//! `^`/`~` range operators, and the `latest` sentinel.

use conductor_core::error::{ConductorError, ErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    Caret,
    Tilde,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    pub fn parse(s: &str) -> Result<Self, ConductorError> {
        let mut parts = s.trim().splitn(3, '.');
        let invalid = || {
            ConductorError::new(ErrorKind::Validation, format!("invalid version: {s:?}")).retryable(false)
        };
        let major = parts.next().ok_or_else(invalid)?.parse().map_err(|_| invalid())?;
        let minor = parts.next().unwrap_or("0").parse().map_err(|_| invalid())?;
        let patch = parts.next().unwrap_or("0").parse().map_err(|_| invalid())?;
        Ok(Self { major, minor, patch })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Clause {
    op: Op,
    version: Version,
}

/// A parsed constraint: a comma-AND-ed list of clauses, all of which
/// must match for a version to satisfy the constraint.
#[derive(Debug, Clone)]
pub struct Constraint {
    clauses: Vec<Clause>,
}

impl Constraint {
    pub fn parse(raw: &str) -> Result<Self, ConductorError> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("latest") {
            return Ok(Self {
                clauses: vec![Clause { op: Op::Gte, version: Version { major: 0, minor: 0, patch: 0 } }],
            });
        }
        let mut clauses = Vec::new();
        for part in raw.split(',') {
            clauses.push(parse_clause(part.trim())?);
        }
        if clauses.is_empty() {
            return Err(ConductorError::new(ErrorKind::Validation, "empty version constraint").retryable(false));
        }
        Ok(Self { clauses })
    }

    pub fn matches(&self, version: &Version) -> bool {
        self.clauses.iter().all(|clause| clause_matches(clause, version))
    }
}

fn parse_clause(part: &str) -> Result<Clause, ConductorError> {
    const OPS: &[(&str, Op)] = &[
        ("==", Op::Eq),
        (">=", Op::Gte),
        ("<=", Op::Lte),
        ("=", Op::Eq),
        (">", Op::Gt),
        ("<", Op::Lt),
        ("^", Op::Caret),
        ("~", Op::Tilde),
    ];
    for (prefix, op) in OPS {
        if let Some(rest) = part.strip_prefix(prefix) {
            let version = Version::parse(rest.trim())?;
            return Ok(Clause { op: *op, version });
        }
    }
    // Default op is `=` when no operator is present.
    let version = Version::parse(part)?;
    Ok(Clause { op: Op::Eq, version })
}

fn clause_matches(clause: &Clause, version: &Version) -> bool {
    match clause.op {
        Op::Eq => *version == clause.version,
        Op::Gt => *version > clause.version,
        Op::Gte => *version >= clause.version,
        Op::Lt => *version < clause.version,
        Op::Lte => *version <= clause.version,
        Op::Caret => version.major == clause.version.major && *version >= clause.version,
        Op::Tilde => {
            version.major == clause.version.major
                && version.minor == clause.version.minor
                && *version >= clause.version
        }
    }
}

#[cfg(test)]
#[path = "semver_tests.rs"]
mod tests;
