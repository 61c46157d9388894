//! Turning webhook responses into stored records: shape normalization,
//! identifier assignment and appending to the existing list.

use log::{debug, warn};
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::fields::Field;
use crate::models::{Record, StoredEntry};
use crate::store::StoreError;

/// Prefix used when no existing identifier can be parsed
pub const DEFAULT_PREFIX: &str = "TC";
/// Marker prefix recognised in unparseable identifiers
pub const SCENARIO_PREFIX: &str = "SG";

/// Normalizes a webhook response into records.
///
/// An object becomes a single record and an array yields its object
/// elements. Any other shape yields nothing; use [`normalize_entries`] when
/// the caller needs every element or needs to know about a bad shape.
pub fn normalize(raw: Value) -> Vec<Record> {
    match raw {
        Value::Object(map) => vec![Record::from(map)],
        Value::Array(items) => {
            let total = items.len();
            let records: Vec<Record> = items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(map) => Some(Record::from(map)),
                    _ => None,
                })
                .collect();
            if records.len() < total {
                warn!(
                    "Dropped {} non-object entries from response array",
                    total - records.len()
                );
            }
            records
        }
        other => {
            debug!("Ignoring response of unexpected shape: {}", shape_name(&other));
            Vec::new()
        }
    }
}

/// Normalizes a stored document into entries, keeping every element.
///
/// An object becomes a single record. Array elements that are not objects
/// are carried as raw entries so they survive the next persist. Any other
/// top-level shape is reported as [`StoreError::UnexpectedShape`].
pub fn normalize_entries(raw: Value) -> Result<Vec<StoredEntry>, StoreError> {
    match raw {
        Value::Object(map) => Ok(vec![StoredEntry::Record(Record::from(map))]),
        Value::Array(items) => Ok(items.into_iter().map(StoredEntry::from_value).collect()),
        other => Err(StoreError::UnexpectedShape(shape_name(&other).to_string())),
    }
}

fn shape_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(.*?)(?:[_\-\s])?(\d+)\s*$").expect("identifier pattern is valid")
    })
}

/// Keys read when numbering and deduplicating stored records.
///
/// Narrower than [`Field::Id`]: a column named `ID` or `Test Case` in a
/// generated record is ordinary content and does not block assignment.
pub const STORED_ID_KEYS: [&str; 2] = ["Test Case ID", "TestCaseID"];

/// The identifier a record is stored under, if any
pub fn stored_id(record: &Record) -> Option<String> {
    STORED_ID_KEYS.iter().find_map(|key| {
        record
            .text(key)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

/// Splits an identifier such as `SG_12` into its prefix and number.
///
/// Trailing separators are stripped from the prefix; an identifier with a
/// number but no prefix is attributed to `SG`.
pub fn parse_id(id: &str) -> Option<(String, u64)> {
    let caps = id_pattern().captures(id.trim())?;
    let number: u64 = caps.get(2)?.as_str().parse().ok()?;
    let prefix = caps
        .get(1)
        .map(|m| m.as_str())
        .unwrap_or("")
        .trim_end_matches([' ', '_', '-'])
        .trim();
    let prefix = if prefix.is_empty() {
        SCENARIO_PREFIX
    } else {
        prefix
    };
    Some((prefix.to_string(), number))
}

/// Prefix and next number for newly assigned identifiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdScheme {
    pub prefix: String,
    pub next: u64,
}

impl IdScheme {
    /// Derives the scheme from the identifiers already in the store.
    ///
    /// The most frequent prefix wins (the first one to reach the maximum count
    /// on ties) and numbering continues after the highest number seen for
    /// that prefix.
    ///
    /// A maximum that cannot be incremented falls back to the scheme used when
    /// no identifier parses, starting again at 1.
    pub fn from_existing<'a>(existing: impl IntoIterator<Item = &'a Record>) -> Self {
        let ids: Vec<String> = existing.into_iter().filter_map(stored_id).collect();

        // (prefix, occurrences, highest number), in first-seen order
        let mut tally: Vec<(String, usize, u64)> = Vec::new();
        for (prefix, number) in ids.iter().filter_map(|id| parse_id(id)) {
            match tally.iter_mut().find(|(p, _, _)| *p == prefix) {
                Some(entry) => {
                    entry.1 += 1;
                    entry.2 = entry.2.max(number);
                }
                None => tally.push((prefix, 1, number)),
            }
        }

        let mut winner: Option<&(String, usize, u64)> = None;
        for entry in &tally {
            if winner.map_or(true, |w| entry.1 > w.1) {
                winner = Some(entry);
            }
        }

        let continued = winner.and_then(|(prefix, _, max)| {
            max.checked_add(1).map(|next| Self {
                prefix: prefix.clone(),
                next,
            })
        });
        match continued {
            Some(scheme) => scheme,
            None => {
                if winner.is_some() {
                    warn!("Identifier numbering exhausted, restarting from 1");
                }
                let prefix = if ids.iter().any(|id| id.contains(SCENARIO_PREFIX)) {
                    SCENARIO_PREFIX
                } else {
                    DEFAULT_PREFIX
                };
                Self {
                    prefix: prefix.to_string(),
                    next: 1,
                }
            }
        }
    }

    /// Returns the next identifier and advances the counter
    pub fn next_id(&mut self) -> String {
        let id = format!("{}_{}", self.prefix, self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

/// Gives every incoming record without an identifier a new `<prefix>_<n>`
/// identifier, in input order. Records that already carry one are left
/// untouched, even if it collides with an existing identifier.
pub fn assign_ids(existing: &[Record], incoming: Vec<Record>) -> Vec<Record> {
    let mut scheme = IdScheme::from_existing(existing);
    incoming
        .into_iter()
        .map(|record| with_assigned_id(&mut scheme, record))
        .collect()
}

/// [`assign_ids`] over stored entries; raw entries pass through unchanged
pub fn assign_entry_ids(existing: &[StoredEntry], incoming: Vec<StoredEntry>) -> Vec<StoredEntry> {
    let mut scheme = IdScheme::from_existing(existing.iter().filter_map(StoredEntry::as_record));
    incoming
        .into_iter()
        .map(|entry| match entry {
            StoredEntry::Record(record) => StoredEntry::Record(with_assigned_id(&mut scheme, record)),
            raw => raw,
        })
        .collect()
}

fn with_assigned_id(scheme: &mut IdScheme, mut record: Record) -> Record {
    if stored_id(&record).is_none() {
        let id = scheme.next_id();
        debug!("Assigned identifier {}", id);
        record.insert(Field::Id.canonical_key(), id);
    }
    record
}

/// Whether appended records are deduplicated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dedupe {
    /// Keep every record
    #[default]
    None,
    /// Drop a record whose ticket reference or identifier repeats one seen
    /// earlier in the combined list
    ByKey,
}

/// Concatenates `existing` and `incoming`, optionally deduplicating
pub fn append(
    existing: Vec<StoredEntry>,
    incoming: Vec<StoredEntry>,
    dedupe: Dedupe,
) -> Vec<StoredEntry> {
    let combined: Vec<StoredEntry> = existing.into_iter().chain(incoming).collect();
    let keep = dedupe_mask(&combined, dedupe);
    combined
        .into_iter()
        .zip(keep)
        .filter_map(|(entry, kept)| kept.then_some(entry))
        .collect()
}

/// Marks which entries of a combined list survive deduplication.
///
/// Raw entries are always kept. With [`Dedupe::ByKey`] a record is dropped
/// when its ticket reference or its stored identifier repeats one seen
/// earlier in the list.
pub fn dedupe_mask(entries: &[StoredEntry], dedupe: Dedupe) -> Vec<bool> {
    if dedupe == Dedupe::None {
        return vec![true; entries.len()];
    }

    let mut seen_tickets: HashSet<String> = HashSet::new();
    let mut seen_ids: HashSet<String> = HashSet::new();
    entries
        .iter()
        .map(|entry| {
            let Some(record) = entry.as_record() else {
                return true;
            };
            let ticket = record.field(Field::TicketId);
            let id = stored_id(record);

            let collides = ticket.as_ref().is_some_and(|t| seen_tickets.contains(t))
                || id.as_ref().is_some_and(|i| seen_ids.contains(i));
            if collides {
                debug!("Dropping duplicate record {:?} / {:?}", id, ticket);
                return false;
            }

            if let Some(t) = ticket {
                seen_tickets.insert(t);
            }
            if let Some(i) = id {
                seen_ids.insert(i);
            }
            true
        })
        .collect()
}
