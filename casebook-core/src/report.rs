//! Report aggregation
//!
//! Turns a record list (or an uploaded sheet) plus a filter selection into
//! the counts, groupings and series shown in the reports view.

use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::fields::{Field, UNKNOWN};
use crate::models::{Record, Status, TestCase};
use crate::store::{CaseStore, StoreError};
use crate::timeline::{build_timeline, TimelinePoint};
use crate::upload::CsvTable;

/// Number of modules shown in the module bar chart by default
pub const DEFAULT_TOP_MODULES: usize = 12;

/// Errors that abort building a report
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Key used to count unique test cases.
///
/// Identifiers are reused across modules (`SG_1` for Login and for SignUp),
/// so the module is part of the key. Cases without an identifier get a
/// positional key and are never merged.
pub fn dedupe_key(index: usize, case: &TestCase) -> String {
    match &case.id {
        Some(id) => format!("{}||{}", id, case.module),
        None => format!("__noid__{}||{}", index, case.module),
    }
}

/// One grouped value and how often it occurs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountEntry {
    pub value: String,
    pub count: usize,
}

/// Grouped counts, kept in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Counts {
    entries: Vec<CountEntry>,
}

impl Counts {
    pub fn add(&mut self, value: &str) {
        match self.entries.iter_mut().find(|e| e.value == value) {
            Some(entry) => entry.count += 1,
            None => self.entries.push(CountEntry {
                value: value.to_string(),
                count: 1,
            }),
        }
    }

    pub fn get(&self, value: &str) -> usize {
        self.entries
            .iter()
            .find(|e| e.value == value)
            .map_or(0, |e| e.count)
    }

    /// Entries in first-seen order
    pub fn entries(&self) -> &[CountEntry] {
        &self.entries
    }

    /// Entries by descending count; equal counts keep first-seen order
    pub fn most_common(&self) -> Vec<CountEntry> {
        let mut sorted = self.entries.clone();
        sorted.sort_by(|a, b| b.count.cmp(&a.count));
        sorted
    }

    pub fn total(&self) -> usize {
        self.entries.iter().map(|e| e.count).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Counts cases by the value of `field`
pub fn count_by_field<'a, I>(cases: I, field: Field) -> Counts
where
    I: IntoIterator<Item = &'a TestCase>,
{
    let mut counts = Counts::default();
    for case in cases {
        counts.add(&case.value(field));
    }
    counts
}

/// Positive/negative bucket of a test case type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Positive,
    Negative,
    Other,
}

impl Polarity {
    /// Classifies by case-insensitive prefix: "pos..." or "neg..."
    pub fn of(case_type: &str) -> Self {
        let lower = case_type.trim().to_lowercase();
        if lower.starts_with("pos") {
            Polarity::Positive
        } else if lower.starts_with("neg") {
            Polarity::Negative
        } else {
            Polarity::Other
        }
    }
}

/// Positive/negative/other split of a set of cases
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PolarityBreakdown {
    pub positive: usize,
    pub negative: usize,
    pub other: usize,
}

pub fn classify_positive_negative<'a, I>(cases: I) -> PolarityBreakdown
where
    I: IntoIterator<Item = &'a TestCase>,
{
    let mut breakdown = PolarityBreakdown::default();
    for case in cases {
        match Polarity::of(case.case_type.as_deref().unwrap_or("")) {
            Polarity::Positive => breakdown.positive += 1,
            Polarity::Negative => breakdown.negative += 1,
            Polarity::Other => breakdown.other += 1,
        }
    }
    breakdown
}

/// Filter selection. `None` for a dimension means every value is selected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub modules: Option<BTreeSet<String>>,
    pub statuses: Option<BTreeSet<String>>,
    pub types: Option<BTreeSet<String>>,
}

impl Selection {
    /// Selects everything
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_modules<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.modules = Some(modules.into_iter().map(Into::into).collect());
        self
    }

    /// Status values are normalized, so "passed" selects `Pass`
    pub fn with_statuses<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.statuses = Some(
            statuses
                .into_iter()
                .map(|s| Status::normalize(s.as_ref()).to_string())
                .collect(),
        );
        self
    }

    pub fn with_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    /// Set membership on module, normalized status and type. Missing values
    /// are tested as `<Unknown>`.
    pub fn accepts(&self, case: &TestCase) -> bool {
        fn member(set: &Option<BTreeSet<String>>, value: &str) -> bool {
            set.as_ref().map_or(true, |s| s.contains(value))
        }

        let module = if case.module.is_empty() {
            UNKNOWN
        } else {
            case.module.as_str()
        };
        member(&self.modules, module)
            && member(&self.statuses, case.status.as_str())
            && member(&self.types, case.type_key())
    }

    pub fn is_all(&self) -> bool {
        self.modules.is_none() && self.statuses.is_none() && self.types.is_none()
    }
}

/// Cases that pass the selection, in input order
pub fn filter(cases: &[TestCase], selection: &Selection) -> Vec<TestCase> {
    cases
        .iter()
        .filter(|c| selection.accepts(c))
        .cloned()
        .collect()
}

/// One module/status cell of the heat map
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeatCell {
    pub module: String,
    pub status: String,
    pub count: usize,
}

/// Module x status counts. Modules are ordered by frequency and statuses by
/// first appearance; empty cells are omitted.
pub fn module_status_heatmap(cases: &[&TestCase]) -> Vec<HeatCell> {
    let modules = count_by_field(cases.iter().copied(), Field::Module).most_common();
    let statuses = count_by_field(cases.iter().copied(), Field::Status);

    let mut cells = Vec::new();
    for module in &modules {
        for status in statuses.entries() {
            let count = cases
                .iter()
                .filter(|c| c.module == module.value && c.status.as_str() == status.value)
                .count();
            if count > 0 {
                cells.push(HeatCell {
                    module: module.value.clone(),
                    status: status.value.clone(),
                    count,
                });
            }
        }
    }
    cells
}

/// Where report data came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "location", rename_all = "lowercase")]
pub enum ReportSource {
    Store(String),
    Upload(String),
}

/// Cases to report on, index-aligned with the rows of `table`
#[derive(Debug, Clone)]
pub struct ReportInput {
    pub source: ReportSource,
    pub table: CsvTable,
    pub cases: Vec<TestCase>,
}

impl ReportInput {
    pub fn from_records(location: impl Into<String>, records: &[Record]) -> Self {
        Self {
            source: ReportSource::Store(location.into()),
            table: CsvTable::from_records(records),
            cases: records.iter().map(TestCase::from_record).collect(),
        }
    }

    pub fn from_csv(location: impl Into<String>, bytes: &[u8]) -> Result<Self, ReportError> {
        let table = CsvTable::parse(bytes)?;
        let cases = table.cases();
        Ok(Self {
            source: ReportSource::Upload(location.into()),
            table,
            cases,
        })
    }

    /// Loads report input from an uploaded sheet if given, else from the
    /// store. `Ok(None)` means there is nothing to report on yet.
    pub fn load(store: &dyn CaseStore, upload: Option<&Path>) -> Result<Option<Self>, ReportError> {
        if let Some(path) = upload {
            let bytes = fs::read(path).map_err(|source| ReportError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            return Self::from_csv(path.display().to_string(), &bytes).map(Some);
        }

        match store.try_load()? {
            Some(records) => Ok(Some(Self::from_records(store.location(), &records))),
            None => Ok(None),
        }
    }
}

/// Report settings
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub selection: Selection,
    pub top_modules: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            selection: Selection::all(),
            top_modules: DEFAULT_TOP_MODULES,
        }
    }
}

/// Aggregated report data
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub source: ReportSource,
    /// Rows passing the selection, duplicates included
    pub matched_rows: usize,
    pub unique_cases: usize,
    pub modules: Counts,
    pub statuses: Counts,
    pub types: Counts,
    pub polarity: PolarityBreakdown,
    pub top_modules: Vec<CountEntry>,
    pub heatmap: Vec<HeatCell>,
    pub timeline: Vec<TimelinePoint>,
}

impl Report {
    pub fn build(input: &ReportInput, options: &ReportOptions) -> Self {
        let matched: Vec<usize> = input
            .cases
            .iter()
            .enumerate()
            .filter(|(_, c)| options.selection.accepts(c))
            .map(|(i, _)| i)
            .collect();

        let mut seen = HashSet::new();
        let unique: Vec<&TestCase> = matched
            .iter()
            .map(|&i| (i, &input.cases[i]))
            .filter(|(i, c)| seen.insert(dedupe_key(*i, c)))
            .map(|(_, c)| c)
            .collect();

        let modules = count_by_field(unique.iter().copied(), Field::Module);
        let mut top_modules = modules.most_common();
        top_modules.truncate(options.top_modules);

        Self {
            source: input.source.clone(),
            matched_rows: matched.len(),
            unique_cases: unique.len(),
            statuses: count_by_field(unique.iter().copied(), Field::Status),
            types: count_by_field(unique.iter().copied(), Field::CaseType),
            polarity: classify_positive_negative(unique.iter().copied()),
            top_modules,
            heatmap: module_status_heatmap(&unique),
            timeline: build_timeline(&input.table, &matched),
            modules,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.unique_cases == 0
    }
}
