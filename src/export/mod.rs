// Copyright 2026 qc-capture developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! CSV export
//!
//! Renders the captured record list as CSV and writes it next to wherever
//! the operator wants it. Every field is double-quoted with internal quotes
//! doubled, so embedded commas, quotes and newlines survive a spreadsheet
//! round trip. The filename carries the export date:
//! `qc_scan_export_YYYY-MM-DD.csv`.

use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::core::types::Record;

/// Column order of the export, matching the record field names.
pub const CSV_HEADERS: [&str; 9] = [
    "Timestamp",
    "Operator",
    "CaseID",
    "SlideID",
    "BlockID",
    "ContainerID",
    "IssueType",
    "Notes",
    "Raw",
];

/// Errors that can occur during export.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Output directory does not exist.
    #[error("Export directory not found: {0}")]
    DirNotFound(PathBuf),

    /// Generic I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Quotes one CSV field: wraps in double quotes, doubling internal quotes.
pub fn quote_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Renders the full CSV document, header row first, one record per row.
pub fn render_csv(records: &[Record]) -> String {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(CSV_HEADERS.join(","));

    for record in records {
        let fields = [
            &record.timestamp,
            &record.operator,
            &record.case_id,
            &record.slide_id,
            &record.block_id,
            &record.container_id,
            &record.issue_type,
            &record.notes,
            &record.raw,
        ];
        let row: Vec<String> = fields.iter().map(|f| quote_field(f)).collect();
        lines.push(row.join(","));
    }

    lines.join("\n")
}

/// Export filename for the given date: `qc_scan_export_YYYY-MM-DD.csv`.
pub fn export_filename(date: NaiveDate) -> String {
    format!("qc_scan_export_{}.csv", date.format("%Y-%m-%d"))
}

/// Writes the CSV for today's date into `out_dir`, returning the path.
///
/// # Errors
///
/// Returns `ExportError::DirNotFound` if `out_dir` does not exist, or an
/// I/O error if the file cannot be written.
pub fn write_export(records: &[Record], out_dir: &Path) -> Result<PathBuf, ExportError> {
    if !out_dir.is_dir() {
        return Err(ExportError::DirNotFound(out_dir.to_path_buf()));
    }

    let path = out_dir.join(export_filename(chrono::Local::now().date_naive()));
    fs::write(&path, render_csv(records))?;

    info!(records = records.len(), "exported CSV to {}", path.display());
    Ok(path)
}

/// Splits one CSV row produced by [`render_csv`] back into field values.
///
/// Understands quoted fields with doubled internal quotes. Exists for the
/// export round-trip tests and for spot-checking exports in `parse`-style
/// diagnostics; this is not a general CSV reader.
pub fn split_csv_row(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                // Doubled quote inside a quoted field is a literal quote.
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    fields.push(current);

    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parser::parse_payload;
    use tempfile::TempDir;

    fn record(raw: &str, notes: &str) -> Record {
        let mut r = Record::from_payload(&parse_payload(raw), "EJ", "2026-01-05T09:00:00".to_string());
        r.notes = notes.to_string();
        r
    }

    #[test]
    fn test_quote_field_doubles_internal_quotes() {
        assert_eq!(quote_field("plain"), "\"plain\"");
        assert_eq!(quote_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(quote_field(""), "\"\"");
    }

    #[test]
    fn test_header_row() {
        let csv = render_csv(&[]);
        assert_eq!(
            csv,
            "Timestamp,Operator,CaseID,SlideID,BlockID,ContainerID,IssueType,Notes,Raw"
        );
    }

    #[test]
    fn test_one_record_per_row() {
        let csv = render_csv(&[record("XYZ999", ""), record("ABC123", "")]);
        assert_eq!(csv.lines().count(), 3);
    }

    #[test]
    fn test_export_filename_carries_date() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        assert_eq!(export_filename(date), "qc_scan_export_2026-01-05.csv");
    }

    #[test]
    fn test_write_export_creates_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_export(&[record("XYZ999", "")], temp_dir.path()).unwrap();

        assert!(path.exists());
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Timestamp,"));
        assert!(content.contains("\"XYZ999\""));
    }

    #[test]
    fn test_write_export_missing_dir_errors() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");

        let result = write_export(&[], &missing);
        assert!(matches!(result, Err(ExportError::DirNotFound(_))));
    }

    #[test]
    fn test_round_trip_with_commas_and_quotes() {
        let records = vec![
            record("case=25-12345&slide=A1", "left, then \"right\""),
            record("XYZ999", "line with ,,, commas"),
        ];

        let csv = render_csv(&records);
        let rows: Vec<&str> = csv.lines().collect();
        assert_eq!(rows.len(), 3);

        for (row, original) in rows[1..].iter().zip(&records) {
            let fields = split_csv_row(row);
            assert_eq!(fields.len(), CSV_HEADERS.len());
            assert_eq!(fields[0], original.timestamp);
            assert_eq!(fields[1], original.operator);
            assert_eq!(fields[2], original.case_id);
            assert_eq!(fields[3], original.slide_id);
            assert_eq!(fields[7], original.notes);
            assert_eq!(fields[8], original.raw);
        }
    }
}
