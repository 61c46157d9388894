use serde::{Deserialize, Serialize};
use std::fmt;

/// What the webhook should generate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionKind {
    #[default]
    #[serde(rename = "tc")]
    TestCase,
    #[serde(rename = "ts")]
    TestScenario,
}

impl SubmissionKind {
    pub fn all() -> &'static [SubmissionKind] {
        &[SubmissionKind::TestCase, SubmissionKind::TestScenario]
    }

    /// Discriminator value sent on the wire
    pub fn code(&self) -> &'static str {
        match self {
            SubmissionKind::TestCase => "tc",
            SubmissionKind::TestScenario => "ts",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SubmissionKind::TestCase => "Test Case",
            SubmissionKind::TestScenario => "Test Scenario",
        }
    }

    /// Accepts the wire code or the label, case-insensitively
    pub fn from_str(s: &str) -> Option<Self> {
        let lower = s.trim().to_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|k| lower == k.code() || lower == k.label().to_lowercase())
    }
}

impl fmt::Display for SubmissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Body of the generation request. Every text field is sent, empty or not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRequest {
    pub os: String,
    pub sheet: String,
    #[serde(rename = "ticketId")]
    pub ticket_id: String,
    pub module: String,
    pub summary: String,
    /// Acceptance criteria or user story text
    pub ac: String,
    pub desc: String,
    #[serde(rename = "dropdown")]
    pub kind: SubmissionKind,
}

impl SubmissionRequest {
    /// True when no text field has been filled in
    pub fn is_blank(&self) -> bool {
        [
            &self.os,
            &self.sheet,
            &self.ticket_id,
            &self.module,
            &self.summary,
            &self.ac,
            &self.desc,
        ]
        .iter()
        .all(|s| s.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_format() {
        let request = SubmissionRequest {
            os: "Android".to_string(),
            ticket_id: "GAME-7".to_string(),
            module: "Login".to_string(),
            ac: "User can log in".to_string(),
            kind: SubmissionKind::TestScenario,
            ..Default::default()
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "os": "Android",
                "sheet": "",
                "ticketId": "GAME-7",
                "module": "Login",
                "summary": "",
                "ac": "User can log in",
                "desc": "",
                "dropdown": "ts"
            })
        );
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!(SubmissionKind::from_str("tc"), Some(SubmissionKind::TestCase));
        assert_eq!(
            SubmissionKind::from_str("Test Scenario"),
            Some(SubmissionKind::TestScenario)
        );
        assert_eq!(SubmissionKind::from_str("suite"), None);
    }

    #[test]
    fn test_is_blank() {
        let mut request = SubmissionRequest::default();
        assert!(request.is_blank());
        request.summary = "  ".to_string();
        assert!(request.is_blank());
        request.module = "Shop".to_string();
        assert!(!request.is_blank());
    }
}
