use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::models::Record;
use crate::upload::CsvTable;

/// Serializes records to CSV.
///
/// The header row is the union of every key seen across the records, in
/// first-seen order. Missing fields are written as empty cells.
pub fn export_csv(records: &[Record]) -> Result<Vec<u8>, csv::Error> {
    CsvTable::from_records(records).to_csv()
}

/// Export records to a CSV file
pub fn export_csv_file(records: &[Record], output_path: &Path) -> Result<()> {
    let bytes = export_csv(records).context("Failed to serialize records as CSV")?;

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(output_path, bytes)
        .with_context(|| format!("Failed to write CSV to {:?}", output_path))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_export_header_union_and_blanks() -> Result<()> {
        let records = vec![
            Record::new().with("Test Case ID", "SG_1").with("Module", "Login"),
            Record::new()
                .with("Module", "SignUp")
                .with("Steps", json!(["open", "submit"])),
        ];

        let csv = String::from_utf8(export_csv(&records)?)?;
        assert_eq!(
            csv,
            "Test Case ID,Module,Steps\r\nSG_1,Login,\r\n,SignUp,\"[\"\"open\"\",\"\"submit\"\"]\"\r\n"
        );
        Ok(())
    }

    #[test]
    fn test_export_empty() -> Result<()> {
        assert!(export_csv(&[])?.is_empty());
        Ok(())
    }

    #[test]
    fn test_export_csv_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("out").join("test_cases.csv");

        export_csv_file(&[Record::new().with("Module", "Niveau é")], &path)?;

        let content = fs::read_to_string(&path)?;
        assert_eq!(content, "Module\r\nNiveau é\r\n");
        Ok(())
    }
}
