//! SQL statement validation for read-only enforcement.
//!
//! Two separate gates guard two injection surfaces:
//!
//! - [`validate`] checks free-form SQL from the `query` tool: an allow-list of
//!   statement prefixes, a length cap and a fixed blacklist of dangerous
//!   patterns. It is a syntactic filter, not a parser. It over-rejects some
//!   harmless text (a `--` inside a string literal) and under-rejects some
//!   stacked statements. The rule set is a compatibility contract for
//!   existing callers and must stay exactly as it is.
//! - [`validate_identifier`] checks table names that are interpolated into
//!   introspection templates. Only `[A-Za-z0-9_]` is accepted.

use crate::config::SecurityPolicy;
use crate::error::{DbError, DbResult};
use regex::Regex;
use std::sync::LazyLock;

/// A blacklist entry: the compiled pattern plus a short label for errors and logs.
struct DangerousPattern {
    label: &'static str,
    regex: Regex,
}

static DANGEROUS_PATTERNS: LazyLock<Vec<DangerousPattern>> = LazyLock::new(|| {
    [
        (
            "statement separator followed by a write keyword",
            r"(?i);\s*(drop|delete|update|insert|create|alter|truncate)",
        ),
        ("UNION SELECT", r"(?i)union\s+select"),
        ("line comment", r"--"),
        ("block comment", r"/\*"),
    ]
    .into_iter()
    .map(|(label, pattern)| DangerousPattern {
        label,
        regex: Regex::new(pattern).expect("Invalid dangerous-pattern regex"),
    })
    .collect()
});

static IDENTIFIER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("Invalid identifier regex"));

/// Check whether `sql` may run under `policy`.
///
/// Rules apply in order and the first failure wins:
/// 1. the trimmed, upper-cased text must start with an allowed prefix
/// 2. the raw text must not exceed `max_query_length` characters
/// 3. the raw text must not match any dangerous pattern
///
/// The caller executes the original string; the upper-cased copy is only
/// used for the prefix comparison.
pub fn validate(sql: &str, policy: &SecurityPolicy) -> DbResult<()> {
    let normalized = sql.trim().to_uppercase();

    let allowed = policy
        .allowed_prefixes
        .iter()
        .any(|prefix| normalized.starts_with(prefix.as_str()));
    if !allowed {
        return Err(DbError::disallowed_operation(&policy.allowed_prefixes));
    }

    let length = sql.chars().count();
    if length > policy.max_query_length {
        return Err(DbError::query_too_long(length, policy.max_query_length));
    }

    if let Some(pattern) = matching_dangerous_pattern(sql) {
        return Err(DbError::dangerous_pattern(pattern));
    }

    Ok(())
}

/// Label of the first blacklist entry that matches, if any.
pub fn matching_dangerous_pattern(sql: &str) -> Option<&'static str> {
    DANGEROUS_PATTERNS
        .iter()
        .find(|p| p.regex.is_match(sql))
        .map(|p| p.label)
}

/// Check a table name before it is spliced into introspection SQL.
pub fn validate_identifier(name: &str) -> DbResult<()> {
    if IDENTIFIER_REGEX.is_match(name) {
        Ok(())
    } else {
        Err(DbError::invalid_identifier(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> SecurityPolicy {
        SecurityPolicy::default()
    }

    #[test]
    fn test_select_accepted() {
        assert!(validate("SELECT * FROM customers", &policy()).is_ok());
    }

    #[test]
    fn test_all_allowed_prefixes_accepted() {
        for sql in [
            "select 1",
            "  SHOW TABLES",
            "describe customers",
            "EXPLAIN SELECT * FROM customers",
            "desc customers",
        ] {
            assert!(validate(sql, &policy()).is_ok(), "rejected: {sql}");
        }
    }

    #[test]
    fn test_update_disallowed() {
        let err = validate("UPDATE customers SET x=1", &policy()).unwrap_err();
        assert!(matches!(err, DbError::DisallowedOperation { .. }));
        assert_eq!(
            err.to_string(),
            "Query not allowed. Only SELECT, SHOW, DESCRIBE, EXPLAIN, DESC operations are permitted."
        );
    }

    #[test]
    fn test_prefix_match_is_textual() {
        // "DESC" also admits anything starting with those letters
        assert!(validate("DESCRIBEX", &policy()).is_ok());
        assert!(validate("SELECTED", &policy()).is_ok());
    }

    #[test]
    fn test_stacked_drop_is_dangerous() {
        let err = validate("select * from customers; DROP TABLE customers", &policy()).unwrap_err();
        assert!(matches!(err, DbError::DangerousPattern { .. }));
    }

    #[test]
    fn test_separator_with_whitespace_is_dangerous() {
        let err = validate("SELECT 1;\n\t delete from t", &policy()).unwrap_err();
        assert!(matches!(err, DbError::DangerousPattern { .. }));
    }

    #[test]
    fn test_stacked_select_is_not_blacklisted() {
        assert!(validate("SELECT 1; SELECT 2", &policy()).is_ok());
    }

    #[test]
    fn test_union_select_and_comments_are_dangerous() {
        for sql in [
            "SELECT a FROM t UNION SELECT password FROM users",
            "SELECT a FROM t union   select b FROM u",
            "SELECT * FROM t -- trailing",
            "SELECT * FROM t /* hidden */",
            "SELECT '--' AS literal",
        ] {
            let err = validate(sql, &policy()).unwrap_err();
            assert!(matches!(err, DbError::DangerousPattern { .. }), "{sql}");
        }
    }

    #[test]
    fn test_union_all_select_is_not_blacklisted() {
        assert!(validate("SELECT a FROM t UNION ALL SELECT b FROM u", &policy()).is_ok());
    }

    #[test]
    fn test_too_long() {
        let sql = format!("SELECT {}", "x".repeat(20_000));
        let err = validate(&sql, &policy()).unwrap_err();
        assert!(matches!(
            err,
            DbError::QueryTooLong {
                length: 20_007,
                max: 10_000
            }
        ));
    }

    #[test]
    fn test_length_boundary() {
        let policy = SecurityPolicy::new(["SELECT"], 10);
        assert!(validate("SELECT 123", &policy).is_ok());
        assert!(validate("SELECT 1234", &policy).is_err());
    }

    #[test]
    fn test_prefix_checked_before_length() {
        let sql = format!("UPDATE {}", "x".repeat(20_000));
        let err = validate(&sql, &policy()).unwrap_err();
        assert!(matches!(err, DbError::DisallowedOperation { .. }));
    }

    #[test]
    fn test_length_checked_before_patterns() {
        let policy = SecurityPolicy::new(["SELECT"], 20);
        let err = validate("SELECT 1 -- a long trailing comment", &policy).unwrap_err();
        assert!(matches!(err, DbError::QueryTooLong { .. }));
    }

    #[test]
    fn test_identifier_accepts_word_characters() {
        assert!(validate_identifier("customers").is_ok());
        assert!(validate_identifier("Invoice_Lines_2024").is_ok());
        assert!(validate_identifier("_").is_ok());
    }

    #[test]
    fn test_identifier_rejections() {
        for name in [
            "",
            "customers; DROP",
            "my table",
            "users'",
            "users\"",
            "`users`",
            "db.users",
            "tablé",
        ] {
            let err = validate_identifier(name).unwrap_err();
            assert!(matches!(err, DbError::InvalidIdentifier { .. }), "{name:?}");
        }
    }
}
