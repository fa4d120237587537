// 💾 CSV I/O - Tabular boundary with the file-loading/export collaborators
// Loads the two input tables, writes the three output tables

use crate::engine::ReconciliationReport;
use crate::records::{SubmissionRow, SubmissionTable, SystemRow};
use crate::schema::validate_system_headers;
use crate::upload::UploadProjector;
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

// Header rows written even when a table is empty, so every run produces
// three well-formed files
const MATCHED_HEADERS: [&str; 7] = [
    "Account Number",
    "Address Type",
    "Address Line 1",
    "Address Line 2",
    "Address Line 3",
    "Matched System Address",
    "Match Score",
];

const UNMATCHED_HEADERS: [&str; 2] = ["Account Number", "Reason"];

const UPLOAD_HEADERS: [&str; 12] = [
    "Account Number",
    "Address Type",
    "Invoice Option",
    "Name",
    "Address Line 1",
    "Address Line 2",
    "City",
    "Postal Code",
    "Country Code",
    "Attention Name",
    "Address 3",
    "Country/Territory Code",
];

// ============================================================================
// LOADING
// ============================================================================

/// Load the submission-form export. Rows stay header-addressed because the
/// form's exact column names are schema-driven, not fixed.
pub fn load_submissions(path: &Path) -> Result<SubmissionTable> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open submission file {}", path.display()))?;

    let headers: Vec<String> = reader
        .headers()
        .context("failed to read submission headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record =
            record.with_context(|| format!("failed to read submission row {}", i + 2))?;
        let fields: HashMap<String, String> = headers
            .iter()
            .cloned()
            .zip(record.iter().map(|v| v.to_string()))
            .collect();
        rows.push(SubmissionRow::new(fields));
    }

    Ok(SubmissionTable { headers, rows })
}

/// Load the system-of-record export, failing fast on missing required
/// columns before any row is deserialized.
pub fn load_system_rows(path: &Path) -> Result<Vec<SystemRow>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open system file {}", path.display()))?;

    let headers: Vec<String> = reader
        .headers()
        .context("failed to read system headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    validate_system_headers(&headers)?;

    let mut rows = Vec::new();
    for (i, row) in reader.deserialize::<SystemRow>().enumerate() {
        rows.push(row.with_context(|| format!("failed to read system row {}", i + 2))?);
    }
    Ok(rows)
}

// ============================================================================
// WRITING
// ============================================================================

/// Write the three output tables into `dir`: matched.csv, unmatched.csv and
/// upload_template.csv. Empty tables still get their header row.
pub fn write_outputs(dir: &Path, report: &ReconciliationReport) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;

    write_table(
        &dir.join("matched.csv"),
        &report.matched_rows(),
        &MATCHED_HEADERS,
    )?;
    write_table(
        &dir.join("unmatched.csv"),
        &report.unmatched_rows(),
        &UNMATCHED_HEADERS,
    )?;
    write_table(
        &dir.join("upload_template.csv"),
        &UploadProjector::project_all(&report.outcomes),
        &UPLOAD_HEADERS,
    )?;

    Ok(())
}

fn write_table<T: Serialize>(path: &Path, rows: &[T], headers: &[&str]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;

    if rows.is_empty() {
        writer
            .write_record(headers)
            .with_context(|| format!("failed to write headers to {}", path.display()))?;
    } else {
        for row in rows {
            writer
                .serialize(row)
                .with_context(|| format!("failed to write row to {}", path.display()))?;
        }
    }

    writer
        .flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ReconciliationEngine;
    use crate::index::RecordIndex;
    use crate::schema::{SchemaError, SubmissionSchema};
    use std::env;
    use std::fs;

    fn temp_dir(name: &str) -> std::path::PathBuf {
        let dir = env::temp_dir().join(format!("addr_recon_io_{}_{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_file(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn forms_csv() -> String {
        let s = SubmissionSchema::default();
        let mut headers = vec![
            "Account Number".to_string(),
            "Is your new billing address the same as your pick up and delivery address?"
                .to_string(),
            "How many new Pick Up Addresses do you have?".to_string(),
        ];
        for block in [&s.unified, &s.billing, &s.delivery] {
            headers.extend([block.line1.clone(), block.line2.clone(), block.line3.clone()]);
        }
        for block in &s.pickups {
            headers.extend([block.line1.clone(), block.line2.clone(), block.line3.clone()]);
        }
        let header_line = headers
            .iter()
            .map(|h| format!("\"{}\"", h))
            .collect::<Vec<_>>()
            .join(",");

        let mut row = vec![String::new(); headers.len()];
        row[0] = "A100".to_string();
        row[1] = "yes".to_string();
        row[3] = "123 Le Loi".to_string(); // unified line 1
        format!("{}\n{}\n", header_line, row.join(","))
    }

    #[test]
    fn test_load_submissions_roundtrip() {
        let dir = temp_dir("load_subs");
        let path = write_file(&dir, "forms.csv", &forms_csv());

        let table = load_submissions(&path).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0].get("Account Number"), "A100");

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_system_rows() {
        let dir = temp_dir("load_sys");
        let path = write_file(
            &dir,
            "system.csv",
            "Account Number,Address Type,Address Line 1,Name,Postal Code,Country Code\n\
             a100,01,123 LE LOI,ACME,700000,VN\n",
        );

        let rows = load_system_rows(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].account_number, "a100");
        assert_eq!(rows[0].address_type, "01");
        assert_eq!(rows[0].name, "ACME");
        // Column absent from the file deserializes as empty
        assert_eq!(rows[0].city, "");

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_system_rows_missing_column_fails_fast() {
        let dir = temp_dir("load_sys_bad");
        let path = write_file(
            &dir,
            "system.csv",
            "Account Number,Address Line 1\nA100,123 LE LOI\n",
        );

        let err = load_system_rows(&path).unwrap_err();
        assert!(err.downcast_ref::<SchemaError>().is_some());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_write_outputs_produces_three_tables() {
        let dir = temp_dir("write_out");
        let forms_path = write_file(&dir, "forms.csv", &forms_csv());
        let system_path = write_file(
            &dir,
            "system.csv",
            "Account Number,Address Type,Address Line 1,Name,Postal Code,Country Code\n\
             a100,01,123 LE LOI,ACME,700000,VN\n",
        );

        let table = load_submissions(&forms_path).unwrap();
        let index = RecordIndex::build(&load_system_rows(&system_path).unwrap());
        let report = ReconciliationEngine::new()
            .reconcile(&table, &SubmissionSchema::default(), &index)
            .unwrap();

        let out = dir.join("out");
        write_outputs(&out, &report).unwrap();

        let matched = fs::read_to_string(out.join("matched.csv")).unwrap();
        assert!(matched.contains("Match Score"));
        assert!(matched.contains("A100"));

        let unmatched = fs::read_to_string(out.join("unmatched.csv")).unwrap();
        // Empty table still carries its header row
        assert!(unmatched.contains("Account Number"));

        let upload = fs::read_to_string(out.join("upload_template.csv")).unwrap();
        assert!(upload.contains("Country/Territory Code"));
        // Unified address fans out into three invoice-option rows
        assert_eq!(upload.lines().count(), 4);

        fs::remove_dir_all(&dir).ok();
    }
}
