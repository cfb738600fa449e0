// Persistence: writes the extracted text and (on request) the structured
// record next to each other in the configured output directory. Names are
// stamped to the second so repeated runs on one document do not collide.

use crate::flatten::FlatRecord;
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

const FILE_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("could not write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not serialize analysis record: {0}")]
    Json(#[from] serde_json::Error),
}

/// Base name of `original` without directory or extension.
fn stem(original: &str) -> String {
    Path::new(original)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| original.to_string())
}

/// `extracted_{stem}_{YYYYMMDD_HHMMSS}.txt`
pub fn text_file_name(original: &str, now: DateTime<Local>) -> String {
    format!("extracted_{}_{}.txt", stem(original), now.format(FILE_STAMP_FORMAT))
}

/// `analysis_{stem}_{YYYYMMDD_HHMMSS}.json`
pub fn json_file_name(original: &str, now: DateTime<Local>) -> String {
    format!("analysis_{}_{}.json", stem(original), now.format(FILE_STAMP_FORMAT))
}

/// Write exactly `full_text` (UTF-8, no header) and return the path used.
pub fn save_text(dir: &Path, full_text: &str, original: &str) -> Result<PathBuf, PersistError> {
    let path = dir.join(text_file_name(original, Local::now()));
    write(&path, full_text.as_bytes())?;
    info!(path = %path.display(), bytes = full_text.len(), "saved extracted text");
    Ok(path)
}

/// Write `record` as 2-space indented JSON with non-ASCII kept literal.
pub fn save_json(dir: &Path, record: &FlatRecord, original: &str) -> Result<PathBuf, PersistError> {
    let body = serde_json::to_string_pretty(record)?;
    let path = dir.join(json_file_name(original, Local::now()));
    write(&path, body.as_bytes())?;
    info!(path = %path.display(), "saved structured record");
    Ok(path)
}

fn write(path: &Path, bytes: &[u8]) -> Result<(), PersistError> {
    fs::write(path, bytes).map_err(|source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap()
    }

    #[test]
    fn names_strip_directory_and_extension() {
        assert_eq!(
            text_file_name("scans/invoice.v2.pdf", at()),
            "extracted_invoice.v2_20240309_070501.txt"
        );
        assert_eq!(json_file_name("receipt", at()), "analysis_receipt_20240309_070501.json");
    }

    #[test]
    fn text_is_written_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_text(dir.path(), "línea uno\nline two", "form.pdf").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "línea uno\nline two");
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("extracted_form_") && name.ends_with(".txt"));
    }

    #[test]
    fn missing_directory_reports_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = save_text(&missing, "x", "a.pdf").unwrap_err();
        assert!(matches!(err, PersistError::Io { ref path, .. } if path.starts_with(&missing)));
    }
}
