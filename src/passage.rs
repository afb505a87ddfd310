//! Passage-history classification and ORF trimming of source records.
//!
//! Markers are tried in [`PassageMarker::PRECEDENCE`] order and the first hit
//! decides the record. Culture markers come first and are matched after
//! negated phrases such as `NOT SIAT` have been removed from the tag, so
//! `"Original, not SIAT"` stays unpassaged while `"Original/MDCK1"` does not.

use crate::{
    error::PipelineError,
    open_reading_frame::{OpenReadingFrame, TrimError},
    sequence_record::{PASSAGE_FIELD, SequenceRecord, write_fasta_file},
};
use flu_months_protocol::FilterReport;
use lazy_static::lazy_static;
use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PassageStatus {
    Unpassaged,
    Passaged,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PassageMarker {
    Mdck,
    Siat,
    CellSeries,
    MonkeyKidney,
    RhesusSeries,
    SiatSeries,
    MdckSeries,
    UnknownCellSeries,
    Egg,
    NotSiat,
    Original,
    Clinical,
    Direct,
    P0,
    Lung,
}

impl PassageMarker {
    pub const PRECEDENCE: [PassageMarker; 15] = [
        PassageMarker::Mdck,
        PassageMarker::Siat,
        PassageMarker::CellSeries,
        PassageMarker::MonkeyKidney,
        PassageMarker::RhesusSeries,
        PassageMarker::SiatSeries,
        PassageMarker::MdckSeries,
        PassageMarker::UnknownCellSeries,
        PassageMarker::Egg,
        PassageMarker::NotSiat,
        PassageMarker::Original,
        PassageMarker::Clinical,
        PassageMarker::Direct,
        PassageMarker::P0,
        PassageMarker::Lung,
    ];

    /// Pattern matched against the upper-cased passage tag. Series markers
    /// must form a whole token, so `E10` matches and `EXTRACTED` does not.
    pub fn pattern(&self) -> &'static str {
        match self {
            PassageMarker::Mdck => r"MDCK",
            PassageMarker::Siat => r"SIAT",
            PassageMarker::CellSeries => r"\bC_?([1-9]\d*|X)\b",
            PassageMarker::MonkeyKidney => r"TMK|RHMK|RMK|PMK",
            PassageMarker::RhesusSeries => r"\bR(II|[1-9]\d*|X)\b",
            PassageMarker::SiatSeries => r"\bS([1-9]\d*|X)\b",
            PassageMarker::MdckSeries => r"\bM([1-9]\d*|X)\b",
            PassageMarker::UnknownCellSeries => r"\bX[1-9]\d*\b",
            PassageMarker::Egg => r"\bE([1-9]\d*|X)\b|EGG",
            PassageMarker::NotSiat => NEGATED_CULTURE,
            PassageMarker::Original => r"ORIGINAL|\bOR_",
            PassageMarker::Clinical => r"CLINICAL",
            PassageMarker::Direct => r"DIRECT",
            PassageMarker::P0 => r"\bP0\b",
            PassageMarker::Lung => r"LUNG",
        }
    }

    pub fn status(&self) -> PassageStatus {
        match self {
            PassageMarker::NotSiat
            | PassageMarker::Original
            | PassageMarker::Clinical
            | PassageMarker::Direct
            | PassageMarker::P0
            | PassageMarker::Lung => PassageStatus::Unpassaged,
            _ => PassageStatus::Passaged,
        }
    }

    fn regex(&self) -> &'static Regex {
        &MARKER_REGEXES[*self as usize]
    }

    pub fn matches(&self, tag: &str) -> bool {
        self.regex().is_match(&tag.to_uppercase())
    }
}

const NEGATED_CULTURE: &str = r"NOT\s+SIAT\d*";

lazy_static! {
    // Indexed by enum discriminant.
    static ref MARKER_REGEXES: Vec<Regex> = {
        let mut markers = PassageMarker::PRECEDENCE.to_vec();
        markers.sort_by_key(|m| *m as usize);
        markers
            .iter()
            .map(|m| Regex::new(m.pattern()).expect("passage marker pattern"))
            .collect()
    };
    static ref NEGATED_CULTURE_RE: Regex = Regex::new(NEGATED_CULTURE).expect("negation pattern");
}

/// Classifies a passage tag; returns the deciding marker, if any.
pub fn classify(tag: &str) -> (PassageStatus, Option<PassageMarker>) {
    let upper = tag.to_uppercase();
    let without_negations = NEGATED_CULTURE_RE.replace_all(&upper, " ");
    for marker in PassageMarker::PRECEDENCE {
        let haystack: &str = match marker.status() {
            PassageStatus::Passaged => &without_negations,
            _ => &upper,
        };
        if marker.regex().is_match(haystack) {
            return (marker.status(), Some(marker));
        }
    }
    (PassageStatus::Unknown, None)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOutcome {
    Kept(SequenceRecord),
    Passaged,
    UnknownPassage,
    Untrimmable(TrimError),
}

impl FilterOutcome {
    pub fn for_record(record: &SequenceRecord) -> Self {
        let Some(tag) = record.header_field(PASSAGE_FIELD) else {
            return FilterOutcome::UnknownPassage;
        };
        match classify(&tag).0 {
            PassageStatus::Passaged => FilterOutcome::Passaged,
            PassageStatus::Unknown => FilterOutcome::UnknownPassage,
            PassageStatus::Unpassaged => match OpenReadingFrame::trim(record.seq()) {
                Ok(seq) => FilterOutcome::Kept(record.with_sequence(&seq)),
                Err(e) => FilterOutcome::Untrimmable(e),
            },
        }
    }
}

/// Keeps unpassaged records, each trimmed to its first open reading frame.
/// Input order is preserved.
pub fn filter_unpassaged(records: &[SequenceRecord]) -> (Vec<SequenceRecord>, FilterReport) {
    let outcomes: Vec<FilterOutcome> = records.par_iter().map(FilterOutcome::for_record).collect();

    let mut report = FilterReport {
        total_records: records.len(),
        ..FilterReport::default()
    };
    let mut kept = Vec::new();
    for (record, outcome) in records.iter().zip(outcomes) {
        match outcome {
            FilterOutcome::Kept(trimmed) => {
                report.unpassaged += 1;
                kept.push(trimmed);
            }
            FilterOutcome::Passaged => report.passaged += 1,
            FilterOutcome::UnknownPassage => report.unknown_passage += 1,
            FilterOutcome::Untrimmable(e) => {
                report.unpassaged += 1;
                match e {
                    TrimError::NoStartCodon => report.missing_start_codon += 1,
                    TrimError::NoStopCodon { .. } => report.missing_stop_codon += 1,
                }
                warn!(id = record.id(), "skipping unpassaged record: {e}");
            }
        }
    }
    (kept, report)
}

/// Reads `source`, filters it and writes the kept records to `output`.
pub fn filter_file<P: AsRef<Path>, Q: AsRef<Path>>(
    source: P,
    output: Q,
) -> Result<FilterReport, PipelineError> {
    let records = SequenceRecord::from_fasta_file(source.as_ref())?;
    let (kept, mut report) = filter_unpassaged(&records);
    report.source_path = source.as_ref().to_string_lossy().to_string();
    report.output_path = output.as_ref().to_string_lossy().to_string();
    report.written = write_fasta_file(output.as_ref(), kept.iter())?;
    info!(
        total = report.total_records,
        unpassaged = report.unpassaged,
        written = report.written,
        "passage filter done"
    );
    Ok(report)
}
