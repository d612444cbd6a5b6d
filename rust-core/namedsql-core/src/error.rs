// SPDX-License-Identifier: PMPL-1.0-or-later
//! NamedSQL error types.

use namedsql_lexer::PlaceholderKind;
use thiserror::Error;

/// Errors raised while translating statements, binding arguments or
/// configuring the template cache.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NamedSqlError {
    /// `?` and named placeholders appear in the same statement.
    #[error("can't mix '{first}' and '{conflicting}' parameters in the same statement: {sql}")]
    MixedParameterStyle {
        /// The offending statement (trimmed).
        sql: String,
        /// Style of the first placeholder in the statement.
        first: PlaceholderKind,
        /// Style of the placeholder that conflicted with it.
        conflicting: PlaceholderKind,
    },

    #[error("no value supplied for named parameter: {0}")]
    MissingParameter(String),

    #[error("statement uses positional parameters and cannot be bound by name")]
    NotNamed,

    #[error("parameter count mismatch: expected {expected}, provided {provided}")]
    ParameterCountMismatch { expected: usize, provided: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, NamedSqlError>;
