//! Rolling three-month windows over the ordered timeline.
//!
//! A window is three consecutive *months with data*: a calendar month without
//! records is absent from the count table, so a gap compresses the window
//! instead of shrinking it. Offsets come from cumulative counts and are checked
//! against a directly computed rolling sum before anything is written.

use crate::{
    collection_date::MonthKey,
    error::{ErrorCode, PipelineError},
};
use flu_months_protocol::CutPointRow;
use itertools::Itertools;
use std::path::Path;
use tracing::{debug, info};

pub const WINDOW_MONTHS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthCount {
    pub key: MonthKey,
    pub count: usize,
}

impl MonthCount {
    pub fn new(key: MonthKey, count: usize) -> Self {
        Self { key, count }
    }
}

/// Offsets `[low, high)` of one window in the ordered record sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CutPoint {
    pub label: MonthKey,
    pub low: usize,
    pub high: usize,
}

impl CutPoint {
    pub fn len(&self) -> usize {
        self.high.saturating_sub(self.low)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Counts per month, in calendar order. The keys must already be sorted.
pub fn month_counts(month_keys: &[MonthKey]) -> Result<Vec<MonthCount>, PipelineError> {
    let counts: Vec<MonthCount> = month_keys
        .iter()
        .dedup_with_count()
        .map(|(count, key)| MonthCount::new(*key, count))
        .collect();
    if let Some((a, b)) = counts
        .iter()
        .tuple_windows()
        .find(|(a, b): &(&MonthCount, &MonthCount)| a.key >= b.key)
    {
        return Err(PipelineError::new(
            ErrorCode::InvalidInput,
            format!("Month keys are not in calendar order: {} before {}", a.key, b.key),
        ));
    }
    Ok(counts)
}

/// Inclusive prefix sums of the month counts.
pub fn cumulative_counts(counts: &[MonthCount]) -> Vec<usize> {
    counts
        .iter()
        .scan(0usize, |total, mc| {
            *total += mc.count;
            Some(*total)
        })
        .collect()
}

/// Direct three-month sums; entry `j` belongs to month index `j + 2`.
pub fn rolling_sums(counts: &[MonthCount]) -> Vec<usize> {
    counts
        .windows(WINDOW_MONTHS)
        .map(|w| w.iter().map(|mc| mc.count).sum())
        .collect()
}

/// One cut point per month index `i >= 2`: `low = cumulative[i-3]` (or 0),
/// `high = cumulative[i]`.
pub fn cut_points_from_counts(counts: &[MonthCount]) -> Vec<CutPoint> {
    let cumulative = cumulative_counts(counts);
    (WINDOW_MONTHS - 1..counts.len())
        .map(|i| CutPoint {
            label: counts[i].key,
            low: if i >= WINDOW_MONTHS {
                cumulative[i - WINDOW_MONTHS]
            } else {
                0
            },
            high: cumulative[i],
        })
        .collect()
}

/// Fails with `ErrorCode::Integrity` unless every `high - low` equals the
/// matching rolling sum.
pub fn verify_cut_points(cut_points: &[CutPoint], rolling: &[usize]) -> Result<(), PipelineError> {
    if cut_points.len() != rolling.len() {
        return Err(PipelineError::new(
            ErrorCode::Integrity,
            format!(
                "The cut points are not at the correct indices: {} windows but {} rolling sums",
                cut_points.len(),
                rolling.len()
            ),
        ));
    }
    for (cp, expected) in cut_points.iter().zip(rolling) {
        let span = cp.high.checked_sub(cp.low);
        if span != Some(*expected) {
            return Err(PipelineError::new(
                ErrorCode::Integrity,
                format!(
                    "The cut points are not at the correct indices: window {} spans [{}, {}) but the rolling sum is {expected}",
                    cp.label, cp.low, cp.high
                ),
            ));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CutPointTable {
    counts: Vec<MonthCount>,
    cut_points: Vec<CutPoint>,
    rolling: Vec<usize>,
}

impl CutPointTable {
    /// Builds and verifies the windows for an ordered month-key sequence.
    pub fn generate(month_keys: &[MonthKey]) -> Result<Self, PipelineError> {
        let counts = month_counts(month_keys)?;
        let cut_points = cut_points_from_counts(&counts);
        let rolling = rolling_sums(&counts);
        verify_cut_points(&cut_points, &rolling)?;

        info!(
            months = counts.len(),
            windows = cut_points.len(),
            "generated cut points"
        );
        for (cp, sum) in cut_points.iter().zip(&rolling) {
            debug!(label = %cp.label, low = cp.low, high = cp.high, rolling3 = sum);
        }
        Ok(Self {
            counts,
            cut_points,
            rolling,
        })
    }

    pub fn counts(&self) -> &[MonthCount] {
        &self.counts
    }

    pub fn cut_points(&self) -> &[CutPoint] {
        &self.cut_points
    }

    pub fn rolling(&self) -> &[usize] {
        &self.rolling
    }

    pub fn rows(&self) -> Vec<CutPointRow> {
        self.cut_points
            .iter()
            .zip(&self.rolling)
            .map(|(cp, sum)| CutPointRow {
                label: cp.label.to_string(),
                low: cp.low,
                high: cp.high,
                rolling3: *sum,
            })
            .collect()
    }

    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), PipelineError> {
        let mut writer = csv::Writer::from_path(path.as_ref())?;
        for row in self.rows() {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}
