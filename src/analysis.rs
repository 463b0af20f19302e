//! Read-only aggregations over stored reports.
//!
//! Everything here is a pure function of a report slice. Reports that are
//! not `UPLOADED` are skipped.

use crate::config::AnalysisLimits;
use crate::report::Report;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    /// Distinct non-null categories.
    pub total_categories: usize,
    pub total_reports: usize,
    pub public_reports: usize,
    pub private_reports: usize,
    pub reports_by_category: BTreeMap<String, u64>,
    pub total_rows: u64,
    /// Union of all headers, first-seen order.
    pub available_columns: Vec<String>,
}

impl UserStats {
    pub fn from_reports(reports: &[Report]) -> Self {
        let reports: Vec<&Report> = reports.iter().filter(|r| r.is_analyzable()).collect();

        let categories: HashSet<&str> = reports
            .iter()
            .filter_map(|r| r.category.as_deref())
            .collect();

        let mut reports_by_category = BTreeMap::new();
        for report in &reports {
            *reports_by_category
                .entry(report.category_label().to_owned())
                .or_insert(0) += 1;
        }

        let mut seen = HashSet::new();
        let available_columns = reports
            .iter()
            .flat_map(|r| r.headers.iter())
            .filter(|h| seen.insert(h.as_str()))
            .cloned()
            .collect();

        let public_reports = reports.iter().filter(|r| r.is_public).count();
        Self {
            total_categories: categories.len(),
            total_reports: reports.len(),
            public_reports,
            private_reports: reports.len() - public_reports,
            reports_by_category,
            total_rows: reports.iter().map(|r| r.row_count).sum(),
            available_columns,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueCount {
    pub value: String,
    pub count: u64,
}

/// Value frequencies that remember first-seen order for tie-breaking.
#[derive(Debug, Default)]
pub struct FrequencyTable {
    index: HashMap<String, usize>,
    entries: Vec<ValueCount>,
}

impl FrequencyTable {
    pub fn add(&mut self, value: String) {
        match self.index.get(&value) {
            Some(&i) => self.entries[i].count += 1,
            None => {
                self.index.insert(value.clone(), self.entries.len());
                self.entries.push(ValueCount { value, count: 1 });
            }
        }
    }

    pub fn distinct(&self) -> usize {
        self.entries.len()
    }

    /// The `k` most frequent values, ties in first-seen order.
    pub fn top(mut self, k: usize) -> Vec<ValueCount> {
        // stable: equal counts keep insertion order
        self.entries.sort_by(|a, b| b.count.cmp(&a.count));
        self.entries.truncate(k);
        self.entries
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnAnalysis {
    pub column_name: String,
    pub value_counts: Vec<ValueCount>,
    /// Full `row_count` of every visited report carrying the column.
    pub total_values: u64,
    /// Entries in `value_counts`.
    pub unique_values: usize,
    /// Distinct values seen before truncation.
    pub total_unique_values: usize,
    pub is_limited: bool,
    /// Non-null sample values actually visited.
    pub processed_values: usize,
}

impl ColumnAnalysis {
    /// Frequency of each value of `column` across the sampled rows of `reports`.
    ///
    /// Stops once `limits.max_values` non-null values have been counted,
    /// whichever report that happens in. A report visited only partly still
    /// adds its full `row_count` to `total_values`; reports never reached add
    /// nothing.
    pub fn compute(reports: &[Report], column: &str, limits: AnalysisLimits) -> Self {
        let mut table = FrequencyTable::default();
        let mut processed = 0usize;
        let mut total_values = 0u64;

        for report in reports.iter().filter(|r| r.is_analyzable()) {
            if processed >= limits.max_values {
                log::debug!(
                    "column analysis of {column:?} hit the {} value cap",
                    limits.max_values
                );
                break;
            }
            let Some(idx) = report.column_index(column) else {
                continue;
            };

            for row in &report.sample_rows {
                if processed >= limits.max_values {
                    break;
                }
                let cell = row.get(idx);
                if !cell.is_null() {
                    table.add(cell.to_string());
                    processed += 1;
                }
            }
            total_values += report.row_count;
        }

        let total_unique_values = table.distinct();
        let value_counts = table.top(limits.top_k);
        Self {
            column_name: column.to_owned(),
            unique_values: value_counts.len(),
            value_counts,
            total_values,
            total_unique_values,
            is_limited: total_unique_values > limits.top_k,
            processed_values: processed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodEntry {
    pub period: Option<String>,
    pub report_id: String,
    pub file_name: String,
    pub row_count: u64,
    pub uploaded_at: DateTime<Utc>,
}

/// Category label to the periods reported under it.
pub type CategoryPeriods = BTreeMap<String, Vec<PeriodEntry>>;

/// Groups reports by category, one entry per report id.
pub fn categories_with_periods(reports: &[Report]) -> CategoryPeriods {
    let mut categories = CategoryPeriods::new();
    for report in reports.iter().filter(|r| r.is_analyzable()) {
        let periods = categories
            .entry(report.category_label().to_owned())
            .or_default();
        if periods.iter().any(|p| p.report_id == report.id) {
            continue;
        }
        periods.push(PeriodEntry {
            period: report.period.clone(),
            report_id: report.id.clone(),
            file_name: report.original_file_name.clone(),
            row_count: report.row_count,
            uploaded_at: report.uploaded_at,
        });
    }
    categories
}
