// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Named-parameter translation.
//!
//! Rewrites `:name` and `#{name}` placeholders into `?`, collecting the names
//! in order of appearance. Only statements whose first significant word is
//! `INSERT`, `SELECT`, `UPDATE`, `DELETE` or `WITH` are rewritten; anything
//! else (DDL, fragments, comment-only text) passes through untouched.
//!
//! The same token walk, with a different [`Dialect`], produces the Couchbase
//! `$n` rewrite in [`crate::couchbase`].

use namedsql_lexer::{first_significant, tokenize, PlaceholderKind, Token, TokenKind};
use tracing::{debug, warn};

use crate::error::{NamedSqlError, Result};
use crate::statement::{ParameterStyle, ParsedStatement, StatementKind};

/// Target placeholder syntax of a rewrite pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dialect {
    /// `?` placeholders; `$name` tokens are copied verbatim.
    Standard,
    /// `$1`, `$2`, ... placeholders; `$name` tokens are parameters too.
    Couchbase,
}

impl Dialect {
    fn recognizes(self, kind: PlaceholderKind) -> bool {
        match kind {
            PlaceholderKind::Dollar => self == Dialect::Couchbase,
            _ => true,
        }
    }

    fn emit(self, out: &mut String, position: usize) {
        match self {
            Dialect::Standard => out.push('?'),
            Dialect::Couchbase => {
                out.push('$');
                out.push_str(&position.to_string());
            }
        }
    }
}

/// Output of a rewrite pass over an eligible statement.
#[derive(Debug)]
pub(crate) struct Rewrite {
    pub text: String,
    pub names: Vec<String>,
    pub count: usize,
    pub style: ParameterStyle,
}

/// Rejects statements that mix `?` with named placeholders, in either order.
struct StyleGuard<'s> {
    sql: &'s str,
    first: Option<PlaceholderKind>,
}

impl<'s> StyleGuard<'s> {
    fn new(sql: &'s str) -> Self {
        Self { sql, first: None }
    }

    fn admit(&mut self, kind: PlaceholderKind) -> Result<()> {
        match self.first {
            None => {
                self.first = Some(kind);
                Ok(())
            }
            Some(first) if first.is_named() != kind.is_named() => {
                warn!(
                    first = %first,
                    conflicting = %kind,
                    "Rejected statement mixing positional and named parameters"
                );
                Err(NamedSqlError::MixedParameterStyle {
                    sql: self.sql.to_string(),
                    first,
                    conflicting: kind,
                })
            }
            Some(_) => Ok(()),
        }
    }

    fn style(&self) -> ParameterStyle {
        match self.first {
            None => ParameterStyle::None,
            Some(kind) if kind.is_named() => ParameterStyle::Named,
            Some(_) => ParameterStyle::Positional,
        }
    }
}

/// Classify a token stream by its first significant word.
pub(crate) fn statement_kind(tokens: &[Token<'_>]) -> Option<StatementKind> {
    first_significant(tokens)
        .filter(|t| t.kind == TokenKind::Word)
        .and_then(|t| StatementKind::from_keyword(t.text))
}

/// Rewrite every recognized placeholder of `tokens` for `dialect`.
pub(crate) fn rewrite(sql: &str, tokens: &[Token<'_>], dialect: Dialect) -> Result<Rewrite> {
    let mut guard = StyleGuard::new(sql);
    let mut text = String::with_capacity(sql.len() + 8);
    let mut names = Vec::new();
    let mut count = 0;

    for token in tokens {
        let kind = match token.placeholder() {
            Some(kind) if dialect.recognizes(kind) => kind,
            _ => {
                text.push_str(token.text);
                continue;
            }
        };

        guard.admit(kind)?;
        if let Some(name) = token.placeholder_name() {
            names.push(name.to_string());
        }
        count += 1;
        dialect.emit(&mut text, count);
    }

    Ok(Rewrite {
        text,
        names,
        count,
        style: guard.style(),
    })
}

/// Translate raw SQL into its positional form.
///
/// Leading and trailing whitespace is trimmed first. Fails only with
/// [`NamedSqlError::MixedParameterStyle`].
pub fn translate(sql: &str) -> Result<ParsedStatement> {
    let original = sql.trim();
    let tokens = tokenize(original);

    let Some(kind) = statement_kind(&tokens) else {
        debug!(len = original.len(), "Statement passed through without rewriting");
        return Ok(ParsedStatement::passthrough(original));
    };

    let rewrite = rewrite(original, &tokens, Dialect::Standard)?;
    let statement = ParsedStatement::new(
        original,
        rewrite.text,
        rewrite.names,
        rewrite.count,
        Some(kind),
        rewrite.style,
    );

    debug!(
        id = %statement.id(),
        kind = %kind,
        parameters = statement.parameter_count(),
        "Translated statement"
    );

    Ok(statement)
}
