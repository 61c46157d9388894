use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

use crate::fields::{Field, UNKNOWN};

/// One stored test case or test scenario.
///
/// Records keep every column the webhook sent, in the order it was sent, so a
/// load/persist cycle never loses data. Logical fields are read through
/// [`Field`] synonyms.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builder-style insert, mostly useful in tests
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Column names in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Renders a column as text. Scalars are rendered plainly, nested values
    /// as compact JSON, and null as absent.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            other => Some(other.to_string()),
        }
    }

    /// Resolves a logical field through its synonyms
    pub fn field(&self, field: Field) -> Option<String> {
        field.resolve(|key| self.text(key))
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// One element of the stored document.
///
/// Objects are records. Any other JSON value is kept verbatim so that a
/// load/append/persist cycle never drops it; raw entries take no part in
/// numbering, deduplication or reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StoredEntry {
    Record(Record),
    Raw(Value),
}

impl StoredEntry {
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => StoredEntry::Record(Record::from(map)),
            other => StoredEntry::Raw(other),
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            StoredEntry::Record(record) => Some(record),
            StoredEntry::Raw(_) => None,
        }
    }

    pub fn into_record(self) -> Option<Record> {
        match self {
            StoredEntry::Record(record) => Some(record),
            StoredEntry::Raw(_) => None,
        }
    }
}

impl From<Record> for StoredEntry {
    fn from(record: Record) -> Self {
        StoredEntry::Record(record)
    }
}

/// Normalized test outcome
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Status {
    Pass,
    Fail,
    NotTested,
    /// Unrecognized value, trimmed but otherwise verbatim
    Other(String),
}

impl Status {
    /// Case-insensitive normalization of a raw status cell.
    ///
    /// Anything starting with "pass" is a pass, anything containing "fail"
    /// is a failure, and blank or "not tested" spellings are not tested.
    pub fn normalize(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Status::NotTested;
        }

        let lower = trimmed.to_lowercase();
        if lower.starts_with("pass") {
            Status::Pass
        } else if lower.contains("fail") {
            Status::Fail
        } else if matches!(lower.as_str(), "not tested" | "not-tested" | "nottested") {
            Status::NotTested
        } else {
            Status::Other(trimmed.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Status::Pass => "Pass",
            Status::Fail => "Fail",
            Status::NotTested => "Not Tested",
            Status::Other(s) => s,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Fixed-schema view of a record, resolved once from whichever column
/// names the source used.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestCase {
    pub id: Option<String>,
    /// Defaults to `<Unknown>`
    pub module: String,
    pub case_type: Option<String>,
    pub status: Status,
    pub summary: Option<String>,
    pub acceptance_criteria: Option<String>,
    pub ticket_id: Option<String>,
}

impl TestCase {
    pub fn from_record(record: &Record) -> Self {
        Self {
            id: record.field(Field::Id),
            module: record
                .field(Field::Module)
                .unwrap_or_else(|| UNKNOWN.to_string()),
            case_type: record.field(Field::CaseType),
            status: Status::normalize(&record.field(Field::Status).unwrap_or_default()),
            summary: record.field(Field::Summary),
            acceptance_criteria: record.field(Field::AcceptanceCriteria),
            ticket_id: record.field(Field::TicketId),
        }
    }

    /// Type used for grouping and filtering
    pub fn type_key(&self) -> &str {
        self.case_type.as_deref().unwrap_or(UNKNOWN)
    }

    /// Value of `field` for grouping, with `<Unknown>` standing in for
    /// anything missing
    pub fn value(&self, field: Field) -> String {
        let optional = |v: &Option<String>| v.clone().unwrap_or_else(|| UNKNOWN.to_string());
        match field {
            Field::Id => optional(&self.id),
            Field::Module => self.module.clone(),
            Field::CaseType => self.type_key().to_string(),
            Field::Status => self.status.to_string(),
            Field::Summary => optional(&self.summary),
            Field::AcceptanceCriteria => optional(&self.acceptance_criteria),
            Field::TicketId => optional(&self.ticket_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_status_spellings() {
        assert_eq!(Status::normalize("PASSED"), Status::Pass);
        assert_eq!(Status::normalize(" pass "), Status::Pass);
        assert_eq!(Status::normalize("Failed"), Status::Fail);
        assert_eq!(Status::normalize("soft-fail"), Status::Fail);
        assert_eq!(Status::normalize(""), Status::NotTested);
        assert_eq!(Status::normalize("   "), Status::NotTested);
        assert_eq!(Status::normalize("Not-Tested"), Status::NotTested);
        assert_eq!(Status::normalize("nottested"), Status::NotTested);
        assert_eq!(
            Status::normalize("  Blocked "),
            Status::Other("Blocked".to_string())
        );
    }

    #[test]
    fn test_normalize_status_idempotent() {
        let inputs = [
            "pass", "PASSED", "fail", "Failure", "", "  ", "not tested", "Blocked",
            "  In Progress  ", "bypass", "N/A",
        ];
        for raw in inputs {
            let once = Status::normalize(raw);
            let twice = Status::normalize(once.as_str());
            assert_eq!(once, twice, "not idempotent for {:?}", raw);
        }
    }

    #[test]
    fn test_record_text_renders_scalars() {
        let record: Record = serde_json::from_value(json!({
            "Test Case ID": 7,
            "Automated": true,
            "Notes": null,
            "Steps": ["a", "b"]
        }))
        .unwrap();

        assert_eq!(record.text("Test Case ID").as_deref(), Some("7"));
        assert_eq!(record.text("Automated").as_deref(), Some("true"));
        assert_eq!(record.text("Notes"), None);
        assert_eq!(record.text("Steps").as_deref(), Some(r#"["a","b"]"#));
        assert_eq!(record.text("Missing"), None);
    }

    #[test]
    fn test_case_from_record_uses_synonyms() {
        let record = Record::new()
            .with("TestCaseID", "SG_2")
            .with("Test Case Type", "Negative")
            .with("Result", "failed")
            .with("ticketId", "GAME-12");

        let case = TestCase::from_record(&record);
        assert_eq!(case.id.as_deref(), Some("SG_2"));
        assert_eq!(case.module, UNKNOWN);
        assert_eq!(case.type_key(), "Negative");
        assert_eq!(case.status, Status::Fail);
        assert_eq!(case.ticket_id.as_deref(), Some("GAME-12"));
    }

    #[test]
    fn test_stored_entry_from_value() {
        let entry = StoredEntry::from_value(json!({"Module": "Login"}));
        assert_eq!(
            entry.as_record().and_then(|r| r.text("Module")).as_deref(),
            Some("Login")
        );

        let raw = StoredEntry::from_value(json!("note"));
        assert_eq!(raw, StoredEntry::Raw(json!("note")));
        assert!(raw.into_record().is_none());
        assert_eq!(
            serde_json::to_value(StoredEntry::from(Record::new().with("a", 1))).unwrap(),
            json!({"a": 1})
        );
    }

    #[test]
    fn test_case_defaults() {
        let case = TestCase::from_record(&Record::new());
        assert_eq!(case.id, None);
        assert_eq!(case.module, UNKNOWN);
        assert_eq!(case.type_key(), UNKNOWN);
        assert_eq!(case.status, Status::NotTested);
        assert_eq!(case.value(Field::Status), "Not Tested");
        assert_eq!(case.value(Field::TicketId), UNKNOWN);
    }
}
