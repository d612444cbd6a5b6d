// SPDX-License-Identifier: PMPL-1.0-or-later
//! Couchbase (N1QL) flavour of a parsed statement.
//!
//! Every placeholder, including pre-existing `$name` / `$n` markers, is
//! renumbered to `$1`, `$2`, ... in order. When the collected names are just
//! `1..n` in sequence there is nothing to bind by name, so the name list is
//! dropped.

use std::collections::HashMap;

use namedsql_lexer::tokenize;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::params::{bind_named, bind_positional, ParamValue};
use crate::statement::ParsedStatement;
use crate::translator::{rewrite, statement_kind, Dialect};

/// The `$n`-placeholder rewrite of a statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouchbaseView {
    positional_text: String,
    parameter_names: Vec<String>,
    parameter_count: usize,
}

impl CouchbaseView {
    /// The SQL with placeholders rewritten to `$1`, `$2`, ...
    pub fn positional_text(&self) -> &str {
        &self.positional_text
    }

    /// Names to bind by, in placeholder order. Empty when the statement was
    /// positional or its names were already the sequence `1..n`.
    pub fn parameter_names(&self) -> &[String] {
        &self.parameter_names
    }

    pub fn parameter_count(&self) -> usize {
        self.parameter_count
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

/// Derive the Couchbase view from the statement's original text.
///
/// This is an independent pass over the source; it does not reuse the
/// standard rewrite. Prefer [`ParsedStatement::couchbase`], which caches
/// the outcome.
pub fn translate_for_couchbase(parsed: &ParsedStatement) -> Result<CouchbaseView> {
    let original = parsed.original_text();
    let tokens = tokenize(original);

    if statement_kind(&tokens).is_none() {
        return Ok(CouchbaseView {
            positional_text: original.to_string(),
            parameter_names: Vec::new(),
            parameter_count: 0,
        });
    }

    let mut rewrite = rewrite(original, &tokens, Dialect::Couchbase)?;
    if is_sequential(&rewrite.names) {
        rewrite.names.clear();
    }

    debug!(
        id = %parsed.id(),
        parameters = rewrite.count,
        named = !rewrite.names.is_empty(),
        "Derived Couchbase view"
    );

    Ok(CouchbaseView {
        positional_text: rewrite.text,
        parameter_names: rewrite.names,
        parameter_count: rewrite.count,
    })
}

/// True when every name parses as the integer of its 1-based position.
fn is_sequential(names: &[String]) -> bool {
    names
        .iter()
        .enumerate()
        .all(|(i, name)| name.trim().parse::<i64>().ok() == Some(i as i64 + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NamedSqlError;
    use crate::translator::translate;

    fn view(sql: &str) -> CouchbaseView {
        let stmt = translate(sql).unwrap();
        stmt.couchbase().unwrap().clone()
    }

    #[test]
    fn test_positional_renumbered() {
        let v = view("SELECT * FROM t WHERE a = ? AND b = ?");
        assert_eq!(v.positional_text(), "SELECT * FROM t WHERE a = $1 AND b = $2");
        assert!(v.parameter_names().is_empty());
        assert_eq!(v.parameter_count(), 2);
    }

    #[test]
    fn test_named_preserved() {
        let v = view("SELECT * FROM t WHERE a = :x AND b = :y");
        assert_eq!(v.positional_text(), "SELECT * FROM t WHERE a = $1 AND b = $2");
        assert_eq!(v.parameter_names(), ["x".to_string(), "y".to_string()]);
        assert_eq!(v.parameter_count(), 2);
    }

    #[test]
    fn test_ibatis_renumbered() {
        let v = view("UPDATE t SET v = #{val} WHERE id = #{id}");
        assert_eq!(v.positional_text(), "UPDATE t SET v = $1 WHERE id = $2");
        assert_eq!(v.parameter_names(), ["val".to_string(), "id".to_string()]);
    }

    #[test]
    fn test_dollar_names_preserved() {
        let v = view("SELECT * FROM b WHERE type = $type AND age > $age");
        assert_eq!(v.positional_text(), "SELECT * FROM b WHERE type = $1 AND age > $2");
        assert_eq!(v.parameter_names(), ["type".to_string(), "age".to_string()]);
    }

    #[test]
    fn test_sequential_numbers_dropped() {
        let v = view("SELECT * FROM b WHERE a = $1 AND c = $2");
        assert_eq!(v.positional_text(), "SELECT * FROM b WHERE a = $1 AND c = $2");
        assert!(v.parameter_names().is_empty());
        assert_eq!(v.parameter_count(), 2);

        let numbered = view("SELECT * FROM b WHERE a = :1 AND c = #{2}");
        assert!(numbered.parameter_names().is_empty());
    }

    #[test]
    fn test_out_of_order_numbers_kept() {
        let v = view("SELECT * FROM b WHERE a = $2 AND c = $1");
        assert_eq!(v.positional_text(), "SELECT * FROM b WHERE a = $1 AND c = $2");
        assert_eq!(v.parameter_names(), ["2".to_string(), "1".to_string()]);
    }

    #[test]
    fn test_mixed_dollar_and_positional_rejected() {
        let stmt = translate("SELECT * FROM b WHERE a = $a AND c = ?").unwrap();
        assert_eq!(stmt.parameter_count(), 1);

        let err = stmt.couchbase().unwrap_err();
        assert!(matches!(err, NamedSqlError::MixedParameterStyle { .. }));
        // The failure is kept, not recomputed.
        assert!(stmt.couchbase_computed());
        assert!(stmt.couchbase().is_err());
    }

    #[test]
    fn test_passthrough_view() {
        let v = view("CREATE INDEX i ON t (a)");
        assert_eq!(v.positional_text(), "CREATE INDEX i ON t (a)");
        assert_eq!(v.parameter_count(), 0);
    }

    #[test]
    fn test_view_is_lazy_and_computed_once() {
        let stmt = translate("SELECT * FROM t WHERE a = :a").unwrap();
        assert!(!stmt.couchbase_computed());

        let first = stmt.couchbase().unwrap() as *const CouchbaseView;
        assert!(stmt.couchbase_computed());
        let second = stmt.couchbase().unwrap() as *const CouchbaseView;
        assert_eq!(first, second);
    }

    #[test]
    fn test_direct_translation_matches_cached() {
        let stmt = translate("SELECT * FROM t WHERE a = :a AND b = :b").unwrap();
        let direct = translate_for_couchbase(&stmt).unwrap();
        assert_eq!(&direct, stmt.couchbase().unwrap());
    }

    #[test]
    fn test_couchbase_bind() {
        let v = view("SELECT * FROM t WHERE a = :x AND b = :y");
        let mut args = HashMap::new();
        args.insert("x".to_string(), ParamValue::from(1i64));
        args.insert("y".to_string(), ParamValue::from("two"));
        assert_eq!(
            v.bind(&args).unwrap(),
            vec![ParamValue::Int(1), ParamValue::String("two".to_string())]
        );

        let positional = view("SELECT * FROM t WHERE a = ?");
        assert_eq!(positional.bind(&args).unwrap_err(), NamedSqlError::NotNamed);
        assert_eq!(positional.bind_positional(vec![ParamValue::Null]).unwrap().len(), 1);
    }
}
