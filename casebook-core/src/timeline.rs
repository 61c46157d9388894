//! Pass/fail time series from date-named columns.
//!
//! Some sheets record one column per test run, headed by the run date, with
//! each cell holding that row's outcome on that day.

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::models::Status;
use crate::upload::CsvTable;

fn numeric_date() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\d{1,4}[-/]\d{1,2}[-/]\d{1,4}$").expect("date pattern is valid")
    })
}

/// Parses a column header as a date.
///
/// Accepted forms, tried in order: `M/D/YYYY`, `YYYY-MM-DD`, `D/M/YYYY`,
/// `M/D/YY`, `D/M/YY`. Month-first wins when both readings are valid.
pub fn parse_date_header(header: &str) -> Option<NaiveDate> {
    let header = header.trim();
    if !numeric_date().is_match(header) {
        return None;
    }

    let year_digits = header
        .rsplit(['/', '-'])
        .next()
        .map(str::len)
        .unwrap_or(0);
    let formats: &[&str] = if header.contains('-') {
        &["%Y-%m-%d"]
    } else if year_digits == 4 {
        &["%m/%d/%Y", "%d/%m/%Y"]
    } else if year_digits == 2 {
        &["%m/%d/%y", "%d/%m/%y"]
    } else {
        &[]
    };

    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(header, fmt).ok())
}

/// Returns `(column index, date)` for every header that parses as a date
pub fn detect_date_columns<S: AsRef<str>>(headers: &[S]) -> Vec<(usize, NaiveDate)> {
    headers
        .iter()
        .enumerate()
        .filter_map(|(i, h)| parse_date_header(h.as_ref()).map(|d| (i, d)))
        .collect()
}

/// Outcome counts for one date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimelinePoint {
    pub date: NaiveDate,
    pub pass: usize,
    pub fail: usize,
    pub other: usize,
}

impl TimelinePoint {
    pub fn total(&self) -> usize {
        self.pass + self.fail + self.other
    }
}

/// Aggregates outcomes per date across the given rows.
///
/// Columns that parse to the same date are summed. Empty cells are not
/// counted; any non-empty cell that is neither a pass nor a fail counts as
/// other. Points are ordered by date.
pub fn build_timeline(table: &CsvTable, rows: &[usize]) -> Vec<TimelinePoint> {
    let mut by_date: BTreeMap<NaiveDate, TimelinePoint> = BTreeMap::new();

    for (col, date) in detect_date_columns(&table.headers) {
        let point = by_date.entry(date).or_insert(TimelinePoint {
            date,
            pass: 0,
            fail: 0,
            other: 0,
        });

        for &r in rows {
            let cell = match table.rows.get(r).and_then(|row| row.get(col)) {
                Some(cell) if !cell.trim().is_empty() => cell,
                _ => continue,
            };
            match Status::normalize(cell) {
                Status::Pass => point.pass += 1,
                Status::Fail => point.fail += 1,
                _ => point.other += 1,
            }
        }
    }

    by_date.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_date_header_formats() {
        assert_eq!(parse_date_header("6/1/2025"), Some(date(2025, 6, 1)));
        assert_eq!(parse_date_header("2025-06-01"), Some(date(2025, 6, 1)));
        // not a valid month first, so read day first
        assert_eq!(parse_date_header("25/6/2025"), Some(date(2025, 6, 25)));
        assert_eq!(parse_date_header("6/1/25"), Some(date(2025, 6, 1)));
        assert_eq!(parse_date_header("31/12/99"), Some(date(1999, 12, 31)));
    }

    #[test]
    fn test_parse_date_header_rejects() {
        assert_eq!(parse_date_header("Status"), None);
        assert_eq!(parse_date_header("13/13/2025"), None);
        assert_eq!(parse_date_header("6/1/202"), None);
        assert_eq!(parse_date_header("2025/06/01 run"), None);
    }

    #[test]
    fn test_detect_date_columns() {
        let headers = ["Test Case ID", "6/1/2025", "Module", "2025-06-02"];
        assert_eq!(
            detect_date_columns(&headers),
            vec![(1, date(2025, 6, 1)), (3, date(2025, 6, 2))]
        );
    }

    #[test]
    fn test_build_timeline_sums_same_date() {
        let table = CsvTable::parse(
            b"ID,6/2/2025,6/1/2025,2025-06-01\n\
              TC_1,Pass,Fail,Pass\n\
              TC_2,Blocked,,Failed\n\
              TC_3,pass,Pass,\n",
        )
        .unwrap();

        let points = build_timeline(&table, &[0, 1, 2]);
        assert_eq!(
            points,
            vec![
                TimelinePoint {
                    date: date(2025, 6, 1),
                    pass: 2,
                    fail: 2,
                    other: 0
                },
                TimelinePoint {
                    date: date(2025, 6, 2),
                    pass: 2,
                    fail: 0,
                    other: 1
                },
            ]
        );
    }

    #[test]
    fn test_build_timeline_respects_row_selection() {
        let table = CsvTable::parse(b"ID,6/1/2025\nTC_1,Pass\nTC_2,Fail\n").unwrap();
        let points = build_timeline(&table, &[1]);
        assert_eq!(points[0].pass, 0);
        assert_eq!(points[0].fail, 1);
        assert_eq!(points[0].total(), 1);
    }

    #[test]
    fn test_no_date_columns() {
        let table = CsvTable::parse(b"ID,Status\nTC_1,Pass\n").unwrap();
        assert!(build_timeline(&table, &[0]).is_empty());
    }
}
