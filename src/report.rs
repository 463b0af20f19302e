use crate::cell::CellValue;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of the uploading user.
pub type UserId = u64;

/// Label used for reports without a category.
pub const UNCATEGORIZED: &str = "uncategorized";

static INVISIBLE_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\p{Cc}\p{Cf}\p{Co}\p{Cn}]").expect("static pattern compiles")
});

/// Strips control, format, private-use and unassigned characters, then trims.
/// Blank results become `None`.
pub fn sanitize_label(input: Option<&str>) -> Option<String> {
    let cleaned = INVISIBLE_CHARS.replace_all(input?, "");
    let trimmed = cleaned.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Processing,
    Uploaded,
    Error,
}

impl ReportStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Processing)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("report status is already {from:?}; cannot move to {to:?}")]
pub struct StatusTransitionError {
    pub from: ReportStatus,
    pub to: ReportStatus,
}

static NULL_CELL: CellValue = CellValue::Null;

/// One sampled data row, positionally aligned with [`Report::headers`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(pub Vec<CellValue>);

impl Row {
    pub fn get(&self, idx: usize) -> &CellValue {
        self.0.get(idx).unwrap_or(&NULL_CELL)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub total_columns: usize,
    pub total_rows: u64,
    pub sample_rows: usize,
    /// True when the file had more rows than were kept.
    pub is_sample: bool,
    pub upload_timestamp_ms: i64,
    /// CRC32 of the decompressed body, byte-order mark excluded.
    pub checksum: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    pub owner_id: UserId,
    /// Storage name assigned at upload.
    pub file_name: String,
    pub original_file_name: String,
    pub file_size_bytes: u64,
    pub category: Option<String>,
    pub period: Option<String>,
    pub delimiter: char,
    pub encoding: String,
    pub headers: Vec<String>,
    pub sample_rows: Vec<Row>,
    /// Every data row in the file, not just the sample.
    pub row_count: u64,
    pub metadata: ReportMetadata,
    pub uploaded_at: DateTime<Utc>,
    status: ReportStatus,
    pub is_public: bool,
}

impl Report {
    /// A fresh record in `Processing` state with no rows yet.
    pub fn new(
        owner_id: UserId,
        original_file_name: impl Into<String>,
        file_size_bytes: u64,
        category: Option<&str>,
        period: Option<&str>,
        is_public: bool,
    ) -> Self {
        let uploaded_at = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id,
            file_name: uuid::Uuid::new_v4().to_string(),
            original_file_name: original_file_name.into(),
            file_size_bytes,
            category: sanitize_label(category),
            period: sanitize_label(period),
            delimiter: ',',
            encoding: String::new(),
            headers: Vec::new(),
            sample_rows: Vec::new(),
            row_count: 0,
            metadata: ReportMetadata {
                total_columns: 0,
                total_rows: 0,
                sample_rows: 0,
                is_sample: false,
                upload_timestamp_ms: uploaded_at.timestamp_millis(),
                checksum: None,
            },
            uploaded_at,
            status: ReportStatus::Processing,
            is_public,
        }
    }

    pub fn status(&self) -> ReportStatus {
        self.status
    }

    /// Moves a `Processing` report to a terminal status.
    pub fn finish(&mut self, to: ReportStatus) -> Result<(), StatusTransitionError> {
        if self.status.is_terminal() || !to.is_terminal() {
            return Err(StatusTransitionError {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    /// Only fully uploaded reports feed aggregations.
    pub fn is_analyzable(&self) -> bool {
        self.status == ReportStatus::Uploaded
    }

    /// Index of the first header named `column`.
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column)
    }

    pub fn category_label(&self) -> &str {
        self.category.as_deref().unwrap_or(UNCATEGORIZED)
    }
}
