/// Settings for turning an upload into a report.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Rows kept verbatim per report. Counting never stops at this cap.
    pub sample_cap: usize,
    /// Upper bound on the body size after decompression.
    pub max_body_bytes: u64,
    /// Persist a failed ingestion as an `ERROR` record before returning the error.
    pub record_failures: bool,
    /// Internal buffer of the CSV reader.
    pub buffer_capacity: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            sample_cap: 1000,
            max_body_bytes: 256 << 20, // 256 MiB
            record_failures: false,
            buffer_capacity: 1 << 20, // 1 MiB
        }
    }
}

/// Work and output bounds for column analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisLimits {
    /// Non-null values visited per call, summed across reports.
    pub max_values: usize,
    /// Entries returned in `value_counts`.
    pub top_k: usize,
}

impl Default for AnalysisLimits {
    fn default() -> Self {
        Self {
            max_values: 10_000,
            top_k: 20,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub ingest: IngestConfig,
    pub analysis: AnalysisLimits,
}
