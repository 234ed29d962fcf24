//! Input hardening for identifiers and user-supplied patterns.
//!
//! Table and column names from rule parameters end up in SQL sent to a
//! reference source, and custom regexes are compiled from configuration.
//! Both pass through [`SqlSecurity`] first.

use crate::prelude::*;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

const MAX_IDENTIFIER_LENGTH: usize = 128;
const MAX_PATTERN_LENGTH: usize = 1000;
const REGEX_SIZE_LIMIT: usize = 1 << 20;

#[allow(clippy::expect_used)]
static IDENTIFIER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\p{L}_][\p{L}\p{N}_]*(\.[\p{L}_][\p{L}\p{N}_]*)*$")
        .expect("hard-coded identifier pattern is valid")
});

/// SQL identifier and regex validation.
pub struct SqlSecurity;

impl SqlSecurity {
    /// Validates an identifier and quotes it for SQL.
    ///
    /// Qualified names (`schema.table`) are quoted part by part.
    ///
    /// ```rust
    /// use dq_guard::security::SqlSecurity;
    ///
    /// assert_eq!(SqlSecurity::escape_identifier("clientes").unwrap(), "\"clientes\"");
    /// assert_eq!(
    ///     SqlSecurity::escape_identifier("vendas.pedidos").unwrap(),
    ///     "\"vendas\".\"pedidos\""
    /// );
    /// assert!(SqlSecurity::escape_identifier("id; DROP TABLE clientes--").is_err());
    /// ```
    pub fn escape_identifier(identifier: &str) -> Result<String> {
        Self::validate_identifier(identifier)?;
        let quoted: Vec<String> = identifier
            .split('.')
            .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
            .collect();
        Ok(quoted.join("."))
    }

    /// Checks that an identifier is a plain, possibly qualified, name.
    pub fn validate_identifier(identifier: &str) -> Result<()> {
        if identifier.trim().is_empty() {
            return Err(DqError::SecurityError(
                "SQL identifier cannot be empty or whitespace-only".to_string(),
            ));
        }

        if identifier.chars().count() > MAX_IDENTIFIER_LENGTH {
            return Err(DqError::SecurityError(format!(
                "SQL identifier too long (max {MAX_IDENTIFIER_LENGTH} characters)"
            )));
        }

        if identifier.contains('\0') {
            return Err(DqError::SecurityError(
                "SQL identifier cannot contain null bytes".to_string(),
            ));
        }

        for token in [";", "--", "/*", "*/", "'"] {
            if identifier.contains(token) {
                return Err(DqError::SecurityError(format!(
                    "SQL identifier contains dangerous pattern: '{token}'"
                )));
            }
        }

        if !IDENTIFIER_REGEX.is_match(identifier) {
            return Err(DqError::SecurityError(format!(
                "Invalid SQL identifier format: '{identifier}'. Identifiers must start with a letter or underscore and contain only letters, digits, underscores and dots"
            )));
        }

        Ok(())
    }

    /// Compiles a user-supplied regex within length and size bounds.
    pub fn validate_regex_pattern(pattern: &str) -> Result<Regex> {
        if pattern.is_empty() {
            return Err(DqError::SecurityError(
                "Regex pattern cannot be empty".to_string(),
            ));
        }

        if pattern.len() > MAX_PATTERN_LENGTH {
            return Err(DqError::SecurityError(format!(
                "Regex pattern too long (max {MAX_PATTERN_LENGTH} characters)"
            )));
        }

        if pattern.contains('\0') {
            return Err(DqError::SecurityError(
                "Regex pattern cannot contain null bytes".to_string(),
            ));
        }

        RegexBuilder::new(pattern)
            .size_limit(REGEX_SIZE_LIMIT)
            .build()
            .map_err(|e| DqError::SecurityError(format!("Invalid regex pattern: {e}")))
    }
}
