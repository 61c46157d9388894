//! Tabular view of report sources.
//!
//! Uploaded CSV sheets are parsed into a [`CsvTable`]; stored JSON records can
//! be flattened into the same shape so reporting, time series and export all
//! work off one representation.

use csv::{ReaderBuilder, Terminator, WriterBuilder};
use std::collections::HashSet;

use crate::fields::{Field, UNKNOWN};
use crate::models::{Record, Status, TestCase};

/// Header row plus data rows. Every row has exactly `headers.len()` cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    /// Parses comma-separated bytes whose first row is the header.
    ///
    /// Invalid UTF-8 is replaced rather than rejected. Short rows are padded
    /// with empty cells and cells beyond the header are ignored.
    pub fn parse(bytes: &[u8]) -> Result<Self, csv::Error> {
        let text = String::from_utf8_lossy(bytes);
        let text = text.trim_start_matches('\u{feff}');

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let mut row: Vec<String> = record
                .iter()
                .take(headers.len())
                .map(str::to_string)
                .collect();
            row.resize(headers.len(), String::new());
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    /// Flattens records into a table. Headers are the union of all keys in
    /// first-seen order; missing cells are empty.
    pub fn from_records(records: &[Record]) -> Self {
        let mut seen = HashSet::new();
        let mut headers = Vec::new();
        for record in records {
            for key in record.keys() {
                if seen.insert(key.as_str()) {
                    headers.push(key.clone());
                }
            }
        }

        let rows = records
            .iter()
            .map(|record| {
                headers
                    .iter()
                    .map(|h| record.text(h).unwrap_or_default())
                    .collect()
            })
            .collect();

        Self { headers, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the first column whose trimmed header equals `name`
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    fn lookup(&self, row: &[String], key: &str) -> Option<String> {
        self.column(key).and_then(|c| row.get(c).cloned())
    }

    /// Resolves one row into a test case.
    ///
    /// When no status column has a value, the last non-empty cell of the row
    /// is taken as the outcome, which matches sheets that record results in
    /// trailing per-run columns.
    pub fn case_at(&self, index: usize) -> Option<TestCase> {
        let row = self.rows.get(index)?;
        let resolve = |field: Field| field.resolve(|key| self.lookup(row, key));

        let raw_status = resolve(Field::Status).unwrap_or_else(|| {
            row.iter()
                .rev()
                .map(|c| c.trim())
                .find(|c| !c.is_empty())
                .unwrap_or("")
                .to_string()
        });

        Some(TestCase {
            id: resolve(Field::Id),
            module: resolve(Field::Module).unwrap_or_else(|| UNKNOWN.to_string()),
            case_type: resolve(Field::CaseType),
            status: Status::normalize(&raw_status),
            summary: resolve(Field::Summary),
            acceptance_criteria: resolve(Field::AcceptanceCriteria),
            ticket_id: resolve(Field::TicketId),
        })
    }

    /// All rows as test cases, index-aligned with `rows`
    pub fn cases(&self) -> Vec<TestCase> {
        (0..self.rows.len()).filter_map(|i| self.case_at(i)).collect()
    }

    /// Serializes the table with RFC 4180 quoting and CRLF line endings
    pub fn to_csv(&self) -> Result<Vec<u8>, csv::Error> {
        let mut writer = WriterBuilder::new()
            .terminator(Terminator::CRLF)
            .from_writer(Vec::new());

        if !self.headers.is_empty() {
            writer.write_record(&self.headers)?;
            for row in &self.rows {
                writer.write_record(row)?;
            }
        }

        writer
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))
    }
}
