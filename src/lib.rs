//! Ingestion and analysis of uploaded delimited text files.
//!
//! - Upload path: file-name check, optional gzip/zstd, encoding and
//!   delimiter sniffing, bounded typed sample plus exact row count.
//! - Query path: visibility-gated reads, per-user statistics, category
//!   listing and per-column value frequencies.
//!
//! Data shape:
//! - [`Report`] with `headers`, `sample_rows` (at most 1000 [`Row`]s of
//!   [`CellValue`]) and the authoritative `row_count`.
//! - Persistence goes through [`ReportStore`]; [`MemoryStore`] is built in.
#![cfg_attr(docsrs, feature(doc_cfg))]
//
pub mod analysis;
pub mod cell;
mod codec;
pub mod config;
mod engine;
mod io;
pub mod parse;
pub mod report;
pub mod sniff;
pub mod store;
pub mod visibility;

pub use crate::analysis::{CategoryPeriods, ColumnAnalysis, PeriodEntry, UserStats, ValueCount};
pub use crate::cell::CellValue;
pub use crate::config::{AnalysisLimits, EngineConfig, IngestConfig};
pub use crate::engine::ReportEngine;
pub use crate::io::{read_body, text_reader, Compression, Upload, UploadMeta};
pub use crate::report::{Report, ReportMetadata, ReportStatus, Row, UserId, UNCATEGORIZED};
pub use crate::store::{MemoryStore, ReportStore, StoreError};

use crate::report::StatusTransitionError;
use thiserror::Error;

/// Broad failure classes, for callers that map errors onto a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    EmptyInput,
    UnsupportedFormat,
    ParseFailure,
    NotFound,
    Forbidden,
    StoreFailure,
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("upload is empty")]
    EmptyInput,
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("upload exceeds {limit} bytes once decompressed")]
    TooLarge { limit: u64 },
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv_async::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("report not found: {0}")]
    NotFound(String),
    #[error("report not accessible: {0}")]
    Forbidden(String),
    #[error(transparent)]
    Status(#[from] StatusTransitionError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ReportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyInput => ErrorKind::EmptyInput,
            Self::UnsupportedFormat(_) | Self::TooLarge { .. } => ErrorKind::UnsupportedFormat,
            Self::Csv(_) | Self::Io(_) | Self::Status(_) => ErrorKind::ParseFailure,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::Store(_) => ErrorKind::StoreFailure,
        }
    }

    /// `NotFound` and `Forbidden` alike; report both the same way to avoid
    /// leaking whether a private report exists.
    pub fn is_hidden(&self) -> bool {
        matches!(self.kind(), ErrorKind::NotFound | ErrorKind::Forbidden)
    }
}

pub type ReportResult<T> = std::result::Result<T, ReportError>;
