//! Validation severity levels.

use crate::error::DqError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The severity assigned to a failed validation result.
///
/// Severities are ordered `Info < Warning < Error < Critical`. Reports sort by
/// this order and pass/fail escalation compares against it.
///
/// - **Info**: observations such as auto-detected pattern checks
/// - **Warning**: quality below an expected threshold, e.g. completeness
/// - **Error**: integrity problems such as duplicate keys or orphaned rows
/// - **Critical**: the validation itself could not be carried out
///
/// # Examples
///
/// ```rust
/// use dq_guard::core::Severity;
///
/// assert!(Severity::Critical > Severity::Error);
/// assert!(Severity::Warning.is_at_least(Severity::Info));
/// assert_eq!("error".parse::<Severity>().unwrap(), Severity::Error);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Informational observations
    Info = 0,
    /// Potential issues that should be reviewed
    #[default]
    Warning = 1,
    /// Data quality issues that must be addressed
    Error = 2,
    /// The validation run itself is compromised
    Critical = 3,
}

impl Severity {
    /// All severities in ascending order.
    pub const ALL: [Severity; 4] = [
        Severity::Info,
        Severity::Warning,
        Severity::Error,
        Severity::Critical,
    ];

    /// Returns the canonical upper-case name of the severity.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }

    /// Checks if this severity is at least as severe as another one.
    pub fn is_at_least(&self, other: Severity) -> bool {
        *self >= other
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = DqError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INFO" => Ok(Severity::Info),
            "WARNING" | "WARN" => Ok(Severity::Warning),
            "ERROR" => Ok(Severity::Error),
            "CRITICAL" => Ok(Severity::Critical),
            other => Err(DqError::Configuration(format!(
                "Unknown severity '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::Error);
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);

        let mut levels = vec![
            Severity::Error,
            Severity::Info,
            Severity::Critical,
            Severity::Warning,
        ];
        levels.sort();
        assert_eq!(levels, Severity::ALL.to_vec());
    }

    #[test]
    fn test_severity_is_at_least() {
        assert!(Severity::Critical.is_at_least(Severity::Critical));
        assert!(Severity::Error.is_at_least(Severity::Warning));
        assert!(!Severity::Info.is_at_least(Severity::Warning));
    }

    #[test]
    fn test_severity_display_and_parse() {
        for level in Severity::ALL {
            assert_eq!(level.to_string().parse::<Severity>().unwrap(), level);
        }
        assert_eq!("warn".parse::<Severity>().unwrap(), Severity::Warning);
        assert!("fatal".parse::<Severity>().is_err());
    }

    #[test]
    fn test_severity_serde() {
        let json = serde_json::to_string(&Severity::Critical).unwrap();
        assert_eq!(json, "\"CRITICAL\"");

        let level: Severity = serde_json::from_str("\"INFO\"").unwrap();
        assert_eq!(level, Severity::Info);
    }
}
