use crate::{
    collection_date::MonthKey,
    error::{ErrorCode, PipelineError},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_RUN_PREFIX: &str = "unpassaged";
pub const DEFAULT_SOURCE_FASTA: &str = "pH1H1_human_northamerica_all_HA.fasta";
pub const DEFAULT_SAMPLE_SIZE: usize = 25;

/// First month of the study. Only earlier months of the start year are
/// dropped; records from previous years pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyStart {
    pub year: i32,
    pub month: u32,
}

impl Default for StudyStart {
    fn default() -> Self {
        Self {
            year: 2009,
            month: 4,
        }
    }
}

impl StudyStart {
    pub fn admits(&self, key: MonthKey) -> bool {
        !(key.year == self.year && key.month < self.month)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Names both the filtered FASTA (`<prefix>.fasta`) and the output directory.
    pub run_prefix: String,
    pub source_fasta: String,
    pub input_fasta: Option<String>,
    pub output_dir: Option<String>,
    pub sample_size: usize,
    pub seed: Option<u64>,
    pub study_start: StudyStart,
    /// Treat unparsable dates as fatal instead of skipping the record.
    pub strict_dates: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            run_prefix: DEFAULT_RUN_PREFIX.to_string(),
            source_fasta: DEFAULT_SOURCE_FASTA.to_string(),
            input_fasta: None,
            output_dir: None,
            sample_size: DEFAULT_SAMPLE_SIZE,
            seed: None,
            study_start: StudyStart::default(),
            strict_dates: false,
        }
    }
}

impl PipelineConfig {
    pub fn load_from_path(path: &str) -> Result<Self, PipelineError> {
        let text = std::fs::read_to_string(path).map_err(|e| PipelineError {
            code: ErrorCode::Io,
            message: format!("Could not read config file '{path}': {e}"),
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| PipelineError {
            code: ErrorCode::InvalidInput,
            message: format!("Could not parse config JSON '{path}': {e}"),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.run_prefix.trim().is_empty() {
            return Err(PipelineError::new(
                ErrorCode::InvalidInput,
                "run_prefix must not be empty",
            ));
        }
        if self.sample_size == 0 {
            return Err(PipelineError::new(
                ErrorCode::InvalidInput,
                "sample_size must be at least 1",
            ));
        }
        if !(1..=12).contains(&self.study_start.month) {
            return Err(PipelineError::new(
                ErrorCode::InvalidInput,
                format!("study_start month {} is out of range", self.study_start.month),
            ));
        }
        Ok(())
    }

    /// The filtered FASTA that feeds the timeline.
    pub fn input_path(&self) -> PathBuf {
        self.input_fasta
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(format!("{}.fasta", self.run_prefix)))
    }

    pub fn output_path(&self) -> PathBuf {
        self.output_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(&self.run_prefix))
    }
}
