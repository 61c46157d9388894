//! Logical record fields and the column names accepted for each of them.
//!
//! Webhook responses and uploaded sheets do not agree on column names, so
//! every logical field carries an ordered list of synonyms. Lookups try the
//! synonyms in order and take the first non-empty value.

use std::fmt;

/// Placeholder used for a missing module or type when grouping and filtering
pub const UNKNOWN: &str = "<Unknown>";

/// A logical field of a test case record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    Module,
    CaseType,
    Status,
    Summary,
    AcceptanceCriteria,
    TicketId,
}

impl Field {
    /// Accepted column names, in lookup order
    pub fn synonyms(&self) -> &'static [&'static str] {
        match self {
            Field::Id => &["Test Case ID", "TestCaseID", "ID", "Test Case"],
            Field::Module => &["Module", "module"],
            Field::CaseType => &["Test Case Type", "TestCaseType", "Type", "type"],
            Field::Status => &["Status", "Result", "Test Result", "Outcome", "status"],
            Field::Summary => &["Summary", "Test Description", "summary"],
            Field::AcceptanceCriteria => &["Acceptance Criteria", "acceptanceCriteria", "ac"],
            Field::TicketId => &["Ticket ID", "ticketId", "TicketID"],
        }
    }

    /// The column name written when the field is set by this crate
    pub fn canonical_key(&self) -> &'static str {
        self.synonyms()[0]
    }

    /// Returns true if `column` (ignoring surrounding whitespace) names this field
    pub fn matches(&self, column: &str) -> bool {
        let column = column.trim();
        self.synonyms().iter().any(|s| *s == column)
    }

    /// Resolves the field through `lookup`, which maps a column name to its
    /// raw value. Returns the first trimmed, non-empty value.
    pub fn resolve<F>(&self, lookup: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.synonyms()
            .iter()
            .filter_map(|key| lookup(key))
            .map(|v| v.trim().to_string())
            .find(|v| !v.is_empty())
    }

    /// Parse a field name as typed on the command line
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "id" | "test case id" => Some(Field::Id),
            "module" => Some(Field::Module),
            "type" | "test case type" => Some(Field::CaseType),
            "status" | "result" => Some(Field::Status),
            "summary" => Some(Field::Summary),
            "ac" | "acceptance criteria" => Some(Field::AcceptanceCriteria),
            "ticket" | "ticketid" | "ticket id" => Some(Field::TicketId),
            _ => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Id => write!(f, "id"),
            Field::Module => write!(f, "module"),
            Field::CaseType => write!(f, "type"),
            Field::Status => write!(f, "status"),
            Field::Summary => write!(f, "summary"),
            Field::AcceptanceCriteria => write!(f, "acceptance criteria"),
            Field::TicketId => write!(f, "ticket"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_resolve_prefers_first_non_empty_synonym() {
        let mut row = HashMap::new();
        row.insert("Status", "  ");
        row.insert("Result", "Passed");
        row.insert("Outcome", "Fail");

        let value = Field::Status.resolve(|k| row.get(k).map(|v| v.to_string()));
        assert_eq!(value.as_deref(), Some("Passed"));
    }

    #[test]
    fn test_resolve_missing() {
        let row: HashMap<&str, &str> = HashMap::new();
        assert_eq!(Field::Module.resolve(|k| row.get(k).map(|v| v.to_string())), None);
    }

    #[test]
    fn test_matches_ignores_padding() {
        assert!(Field::CaseType.matches("Test Case Type "));
        assert!(Field::Id.matches("TestCaseID"));
        assert!(!Field::Id.matches("Module"));
    }

    #[test]
    fn test_from_str() {
        assert_eq!(Field::from_str("Status"), Some(Field::Status));
        assert_eq!(Field::from_str("type"), Some(Field::CaseType));
        assert_eq!(Field::from_str("colour"), None);
    }
}
