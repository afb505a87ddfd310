//! Machine-readable report contracts printed by the `flu_months` CLI.

use serde::{Deserialize, Serialize};

pub const REPORT_SCHEMA: &str = "flu-months.report.v1";

/// Outcome of the passage filter over one source FASTA.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterReport {
    pub source_path: String,
    pub output_path: String,
    pub total_records: usize,
    pub unpassaged: usize,
    pub passaged: usize,
    pub unknown_passage: usize,
    pub missing_start_codon: usize,
    pub missing_stop_codon: usize,
    pub written: usize,
}

/// Counts produced while ordering records into the timeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReport {
    pub input_path: String,
    pub total_records: usize,
    pub retained: usize,
    pub missing_day: usize,
    pub before_study_start: usize,
    pub malformed_date: usize,
    pub months_with_data: usize,
}

/// One rolling window of the ordered timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutPointRow {
    pub label: String,
    pub low: usize,
    pub high: usize,
    pub rolling3: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowReport {
    pub label: String,
    pub window_records: usize,
    pub sampled_records: usize,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub schema: String,
    pub run_prefix: String,
    pub output_dir: String,
    pub sample_size: usize,
    pub seed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterReport>,
    pub order: OrderReport,
    pub windows: Vec<WindowReport>,
}

impl RunReport {
    pub fn total_sampled(&self) -> usize {
        self.windows.iter().map(|w| w.sampled_records).sum()
    }
}
