use crate::analysis::{self, CategoryPeriods, ColumnAnalysis, UserStats};
use crate::config::EngineConfig;
use crate::io::{read_body, text_reader, Upload};
use crate::parse::{parse_table, ParsedTable};
use crate::report::{Report, ReportStatus, UserId};
use crate::sniff::{first_line, sniff_delimiter, sniff_encoding, SniffedEncoding};
use crate::store::ReportStore;
use crate::visibility::can_read;
use crate::{ReportError, ReportResult};
use std::cmp::Reverse;

/// Ingestion and analysis over an injected [`ReportStore`].
pub struct ReportEngine<S> {
    store: S,
    config: EngineConfig,
}

impl<S: ReportStore> ReportEngine<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Turns an upload into a stored `UPLOADED` report.
    ///
    /// Validation failures (empty upload, non-text file name) return before
    /// a record exists. Failures after that mark the record `ERROR`; it is
    /// only stored when `record_failures` is set.
    pub async fn ingest(
        &self,
        upload: Upload,
        owner: UserId,
        category: Option<&str>,
        period: Option<&str>,
        is_public: bool,
    ) -> ReportResult<Report> {
        log::info!(
            "ingesting {:?} for user {owner} (category: {category:?}, period: {period:?})",
            upload.file_name()
        );
        if upload.bytes.is_empty() {
            return Err(ReportError::EmptyInput);
        }
        if !upload.meta.is_delimited_text() {
            return Err(ReportError::UnsupportedFormat(format!(
                "{:?} is not a delimited text file",
                upload.file_name()
            )));
        }

        let mut report = Report::new(
            owner,
            upload.file_name(),
            upload.size(),
            category,
            period,
            is_public,
        );

        match self.parse_upload(upload).await {
            Ok((sniffed, delimiter, checksum, table)) => {
                fill_report(
                    &mut report,
                    sniffed,
                    delimiter,
                    checksum,
                    table,
                    self.config.ingest.sample_cap,
                );
                report.finish(ReportStatus::Uploaded)?;
                let report = self.store.create(report).await?;
                log::info!(
                    "report {} stored: {} rows, {} columns, {} sampled",
                    report.id,
                    report.row_count,
                    report.headers.len(),
                    report.sample_rows.len()
                );
                Ok(report)
            }
            Err(err) => {
                log::error!("ingestion of {:?} failed: {err}", report.original_file_name);
                report.finish(ReportStatus::Error)?;
                if self.config.ingest.record_failures {
                    let id = report.id.clone();
                    if let Err(store_err) = self.store.create(report).await {
                        log::error!("could not record failed report {id}: {store_err}");
                    }
                }
                Err(err)
            }
        }
    }

    async fn parse_upload(
        &self,
        upload: Upload,
    ) -> ReportResult<(SniffedEncoding, char, u32, ParsedTable)> {
        let cfg = &self.config.ingest;
        let compression = upload.meta.compression();
        let body = read_body(upload.bytes, compression, cfg.max_body_bytes).await?;

        let sniffed = sniff_encoding(&body);
        let payload = sniffed.payload(&body);
        if payload.is_empty() {
            return Err(ReportError::EmptyInput);
        }
        if !is_wide(sniffed) && payload.contains(&0) {
            return Err(ReportError::UnsupportedFormat(
                "body contains NUL bytes".to_owned(),
            ));
        }
        let checksum = crc32fast::hash(payload);

        let line = first_line(payload, sniffed.encoding);
        let delimiter = sniff_delimiter(line.as_deref());
        log::info!(
            "detected encoding {} and delimiter {delimiter:?}",
            sniffed.name()
        );

        let reader = text_reader(body.clone(), sniffed);
        let table = parse_table(reader, delimiter, cfg.sample_cap, cfg.buffer_capacity).await?;
        if table.headers.iter().all(String::is_empty) {
            return Err(ReportError::UnsupportedFormat("no header row".to_owned()));
        }
        Ok((sniffed, delimiter, checksum, table))
    }

    /// A single report, gated by visibility.
    pub async fn get(&self, report_id: &str, requester: Option<UserId>) -> ReportResult<Report> {
        let report = self
            .store
            .find_by_id(report_id)
            .await?
            .ok_or_else(|| ReportError::NotFound(report_id.to_owned()))?;
        if !can_read(&report, requester) {
            return Err(ReportError::Forbidden(report_id.to_owned()));
        }
        Ok(report)
    }

    /// Public reports plus the user's own, newest first.
    pub async fn list_for_user(&self, owner: UserId) -> ReportResult<Vec<Report>> {
        let mut reports = self.store.find_public_or_owned(owner).await?;
        reports.sort_by_key(|r| Reverse(r.uploaded_at));
        Ok(reports)
    }

    /// Removes a report. Only its owner may delete it.
    pub async fn delete(&self, report_id: &str, requester: UserId) -> ReportResult<()> {
        let report = self
            .store
            .find_by_id(report_id)
            .await?
            .ok_or_else(|| ReportError::NotFound(report_id.to_owned()))?;
        if report.owner_id != requester {
            log::warn!(
                "user {requester} tried to delete report {report_id} owned by {}",
                report.owner_id
            );
            return Err(ReportError::Forbidden(report_id.to_owned()));
        }
        if !self.store.delete_by_id(report_id).await? {
            return Err(ReportError::NotFound(report_id.to_owned()));
        }
        log::info!("report {report_id} deleted by user {requester}");
        Ok(())
    }

    /// Statistics over the user's own reports.
    pub async fn user_stats(&self, owner: UserId) -> ReportResult<UserStats> {
        let reports = self.store.find_by_owner(owner).await?;
        Ok(UserStats::from_reports(&reports))
    }

    /// Category to period listing over public and owned reports.
    pub async fn categories_with_periods(&self, owner: UserId) -> ReportResult<CategoryPeriods> {
        let reports = self.store.find_public_or_owned(owner).await?;
        Ok(analysis::categories_with_periods(&reports))
    }

    /// Value frequencies of `column` over the user's own reports.
    pub async fn column_analysis(&self, owner: UserId, column: &str) -> ReportResult<ColumnAnalysis> {
        let reports = self.store.find_by_owner(owner).await?;
        Ok(ColumnAnalysis::compute(&reports, column, self.config.analysis))
    }
}

fn is_wide(sniffed: SniffedEncoding) -> bool {
    sniffed.encoding == encoding_rs::UTF_16LE || sniffed.encoding == encoding_rs::UTF_16BE
}

fn fill_report(
    report: &mut Report,
    sniffed: SniffedEncoding,
    delimiter: char,
    checksum: u32,
    table: ParsedTable,
    sample_cap: usize,
) {
    report.delimiter = delimiter;
    report.encoding = sniffed.name().to_owned();
    report.metadata.total_columns = table.headers.len();
    report.metadata.total_rows = table.row_count;
    report.metadata.sample_rows = table.rows.len();
    report.metadata.is_sample = table.row_count > sample_cap as u64;
    report.metadata.checksum = Some(checksum);
    report.headers = table.headers;
    report.sample_rows = table.rows;
    report.row_count = table.row_count;
}
