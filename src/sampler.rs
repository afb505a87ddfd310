use crate::{
    collection_date::MonthKey,
    cut_points::CutPoint,
    error::{ErrorCode, PipelineError},
    sequence_record::SequenceRecord,
};
use flu_months_protocol::WindowReport;
use rand::{Rng, seq::index};
use tracing::{debug, info};

/// Destination for one sampled window. Returns where the window was stored.
pub trait WindowSink {
    fn write_window(
        &mut self,
        label: MonthKey,
        records: &[&SequenceRecord],
    ) -> Result<String, PipelineError>;
}

/// Slices `records[low..high]` and, when the slice holds at least
/// `sample_size` records, draws `sample_size` of them uniformly without
/// replacement. Smaller slices are returned whole and in order.
pub fn sample_window<'a, R: Rng + ?Sized>(
    records: &'a [SequenceRecord],
    cut_point: &CutPoint,
    sample_size: usize,
    rng: &mut R,
) -> Result<Vec<&'a SequenceRecord>, PipelineError> {
    let window = records.get(cut_point.low..cut_point.high).ok_or_else(|| {
        PipelineError::new(
            ErrorCode::OutOfRange,
            format!(
                "Window {} spans [{}, {}) outside of {} ordered records",
                cut_point.label,
                cut_point.low,
                cut_point.high,
                records.len()
            ),
        )
    })?;
    if window.len() < sample_size {
        return Ok(window.iter().collect());
    }
    Ok(index::sample(rng, window.len(), sample_size)
        .into_iter()
        .map(|i| &window[i])
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSampler {
    sample_size: usize,
}

impl WindowSampler {
    pub fn new(sample_size: usize) -> Result<Self, PipelineError> {
        if sample_size == 0 {
            return Err(PipelineError::new(
                ErrorCode::InvalidInput,
                "sample_size must be at least 1",
            ));
        }
        Ok(Self { sample_size })
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    /// Samples every window and hands each one to `sink` as soon as it is drawn.
    pub fn sample_all<R, S>(
        &self,
        records: &[SequenceRecord],
        cut_points: &[CutPoint],
        rng: &mut R,
        sink: &mut S,
    ) -> Result<Vec<WindowReport>, PipelineError>
    where
        R: Rng + ?Sized,
        S: WindowSink + ?Sized,
    {
        let mut reports = Vec::with_capacity(cut_points.len());
        for cut_point in cut_points {
            let sample = sample_window(records, cut_point, self.sample_size, rng)?;
            let path = sink.write_window(cut_point.label, &sample)?;
            debug!(
                label = %cut_point.label,
                window = cut_point.len(),
                sampled = sample.len(),
                "wrote window"
            );
            reports.push(WindowReport {
                label: cut_point.label.to_string(),
                window_records: cut_point.len(),
                sampled_records: sample.len(),
                path,
            });
        }
        info!(windows = reports.len(), "sampled all windows");
        Ok(reports)
    }
}
