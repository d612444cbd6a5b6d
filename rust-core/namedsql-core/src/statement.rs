// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Parsed statements.
//!
//! A [`ParsedStatement`] is the immutable result of translating one raw SQL
//! text. It exposes the positional (`?`) rewrite, the ordered parameter names
//! and the placeholder count. The Couchbase (`$1`, `$2`, ...) rewrite is
//! computed on first request and kept in a compute-once cell, so the primary
//! fields never change after construction.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::couchbase::{translate_for_couchbase, CouchbaseView};
use crate::error::Result;
use crate::params::{bind_named, bind_positional, ParamValue};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Leading keyword of a statement eligible for parameter rewriting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementKind {
    Insert,
    Select,
    Update,
    Delete,
    With,
}

impl StatementKind {
    /// Match a keyword case-insensitively.
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word.to_uppercase().as_str() {
            "INSERT" => Some(StatementKind::Insert),
            "SELECT" => Some(StatementKind::Select),
            "UPDATE" => Some(StatementKind::Update),
            "DELETE" => Some(StatementKind::Delete),
            "WITH" => Some(StatementKind::With),
            _ => None,
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementKind::Insert => write!(f, "INSERT"),
            StatementKind::Select => write!(f, "SELECT"),
            StatementKind::Update => write!(f, "UPDATE"),
            StatementKind::Delete => write!(f, "DELETE"),
            StatementKind::With => write!(f, "WITH"),
        }
    }
}

/// Which placeholder style a statement was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterStyle {
    /// No placeholders (or not a rewritable statement).
    None,
    /// `?` placeholders.
    Positional,
    /// `:name` / `#{name}` (or `$name` in the Couchbase view).
    Named,
}

/// Identifier derived from a SHA-256 fingerprint of the trimmed SQL text.
///
/// Used to correlate log lines; the cache itself is keyed by the raw text.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct StatementId(String);

impl StatementId {
    /// Fingerprint `sql`.
    pub fn of(sql: &str) -> Self {
        let digest = Sha256::digest(sql.as_bytes());
        Self(
            digest
                .iter()
                .map(|byte| format!("{:02x}", byte))
                .collect::<String>(),
        )
    }

    /// Full hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StatementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stmt_{}", &self.0[..12.min(self.0.len())])
    }
}

/// The translation of one SQL text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedStatement {
    id: StatementId,
    original_text: String,
    positional_text: String,
    parameter_names: Vec<String>,
    parameter_count: usize,
    kind: Option<StatementKind>,
    style: ParameterStyle,
    #[serde(skip)]
    couchbase: OnceLock<Result<CouchbaseView>>,
}

impl ParsedStatement {
    pub(crate) fn new(
        original_text: &str,
        positional_text: String,
        parameter_names: Vec<String>,
        parameter_count: usize,
        kind: Option<StatementKind>,
        style: ParameterStyle,
    ) -> Self {
        Self {
            id: StatementId::of(original_text),
            original_text: original_text.to_string(),
            positional_text,
            parameter_names,
            parameter_count,
            kind,
            style,
            couchbase: OnceLock::new(),
        }
    }

    /// A statement that is not rewritten: text kept as-is, no parameters.
    pub(crate) fn passthrough(original_text: &str) -> Self {
        Self::new(
            original_text,
            original_text.to_string(),
            Vec::new(),
            0,
            None,
            ParameterStyle::None,
        )
    }

    pub fn id(&self) -> &StatementId {
        &self.id
    }

    /// The SQL as supplied, trimmed of surrounding whitespace.
    pub fn original_text(&self) -> &str {
        &self.original_text
    }

    /// The SQL with every named placeholder replaced by `?`.
    pub fn positional_text(&self) -> &str {
        &self.positional_text
    }

    /// Named parameters in placeholder order. Empty for `?`-style and
    /// pass-through statements.
    pub fn parameter_names(&self) -> &[String] {
        &self.parameter_names
    }

    pub fn parameter_count(&self) -> usize {
        self.parameter_count
    }

    /// Leading keyword, or `None` when the statement was passed through.
    pub fn kind(&self) -> Option<StatementKind> {
        self.kind
    }

    pub fn style(&self) -> ParameterStyle {
        self.style
    }

    /// Whether the statement was recognized and rewritten.
    pub fn is_rewritable(&self) -> bool {
        self.kind.is_some()
    }

    /// The Couchbase (`$n`) flavour, computed on first call.
    ///
    /// Fails if the Couchbase pass finds mixed styles the standard pass does
    /// not see (`$name` next to `?`). The outcome, error included, is kept.
    pub fn couchbase(&self) -> Result<&CouchbaseView> {
        self.couchbase
            .get_or_init(|| translate_for_couchbase(self))
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Whether [`couchbase`](Self::couchbase) has already been computed.
    pub fn couchbase_computed(&self) -> bool {
        self.couchbase.get().is_some()
    }

    /// Arrange named arguments in placeholder order.
    pub fn bind(&self, args: &HashMap<String, ParamValue>) -> Result<Vec<ParamValue>> {
        bind_named(&self.parameter_names, self.parameter_count, args)
    }

    /// Validate a positional argument list against the placeholder count.
    pub fn bind_positional(&self, args: Vec<ParamValue>) -> Result<Vec<ParamValue>> {
        bind_positional(self.parameter_count, args)
    }
}

impl PartialEq for ParsedStatement {
    fn eq(&self, other: &Self) -> bool {
        self.original_text == other.original_text
            && self.positional_text == other.positional_text
            && self.parameter_names == other.parameter_names
            && self.parameter_count == other.parameter_count
            && self.kind == other.kind
            && self.style == other.style
    }
}

impl Eq for ParsedStatement {}

impl fmt::Display for ParsedStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.positional_text)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
