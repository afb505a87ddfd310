use crate::{
    config::PipelineConfig,
    cut_points::CutPointTable,
    error::PipelineError,
    output::OutputLocation,
    passage,
    sampler::WindowSampler,
    sequence_record::SequenceRecord,
    timeline::{OrderedTimeline, RecordOrderer},
};
use flu_months_protocol::{FilterReport, REPORT_SCHEMA, RunReport};
use rand::Rng;
use tracing::info;

/// Runs filter → order → cut points → sampling for one configuration.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Writes the unpassaged, ORF-trimmed records of the source FASTA to the
    /// run's input file.
    pub fn filter_source(&self) -> Result<FilterReport, PipelineError> {
        passage::filter_file(&self.config.source_fasta, self.config.input_path())
    }

    pub fn load_timeline(&self) -> Result<OrderedTimeline, PipelineError> {
        let records = SequenceRecord::from_fasta_file(self.config.input_path())?;
        RecordOrderer::new(self.config.study_start, self.config.strict_dates).order(records)
    }

    pub fn cut_points(&self, timeline: &OrderedTimeline) -> Result<CutPointTable, PipelineError> {
        CutPointTable::generate(timeline.month_keys())
    }

    /// The full run. Cut points are generated and verified before the output
    /// directory is touched, and windows only become visible once all of them
    /// have been written.
    pub fn run<R: Rng + ?Sized>(
        &self,
        filter_first: bool,
        rng: &mut R,
    ) -> Result<RunReport, PipelineError> {
        let filter = if filter_first {
            Some(self.filter_source()?)
        } else {
            None
        };

        let timeline = self.load_timeline()?;
        let table = self.cut_points(&timeline)?;
        let sampler = WindowSampler::new(self.config.sample_size)?;

        let mut output = OutputLocation::prepare_fresh(self.config.output_path())?;
        let windows = sampler.sample_all(timeline.records(), table.cut_points(), rng, &mut output)?;
        let output_dir = output.commit()?;

        let report = RunReport {
            schema: REPORT_SCHEMA.to_string(),
            run_prefix: self.config.run_prefix.clone(),
            output_dir: output_dir.to_string_lossy().to_string(),
            sample_size: sampler.sample_size(),
            seed: self.config.seed,
            filter,
            order: timeline.to_report(&self.config.input_path().to_string_lossy()),
            windows,
        };
        info!(
            windows = report.windows.len(),
            sampled = report.total_sampled(),
            output = %report.output_dir,
            "run complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use rand::{SeedableRng, rngs::StdRng};
    use std::fs;
    use tempfile::tempdir;

    fn write_input(path: &std::path::Path, dates: &[&str]) {
        let text: String = dates
            .iter()
            .enumerate()
            .map(|(i, date)| format!(">A/Test/{i}/2009 | {date} | Original\nATGAAACCC\n"))
            .collect();
        fs::write(path, text).unwrap();
    }

    fn config_in(dir: &std::path::Path, sample_size: usize) -> PipelineConfig {
        PipelineConfig {
            run_prefix: "trial".to_string(),
            input_fasta: Some(dir.join("trial.fasta").to_string_lossy().to_string()),
            output_dir: Some(dir.join("trial").to_string_lossy().to_string()),
            sample_size,
            seed: Some(5),
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_run_writes_one_file_per_window() {
        let td = tempdir().unwrap();
        write_input(
            &td.path().join("trial.fasta"),
            &[
                "2009-04-02",
                "2009-04-20",
                "2009-05-05",
                "2009-06-01",
                "2009-06-11",
                "2009-06-30",
                "2009-07-04",
                "2009-03-30",
                "2009-07",
            ],
        );
        let pipeline = Pipeline::new(config_in(td.path(), 4)).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let report = pipeline.run(false, &mut rng).unwrap();

        assert_eq!(report.order.retained, 7);
        assert_eq!(report.order.months_with_data, 4);
        let labels: Vec<&str> = report.windows.iter().map(|w| w.label.as_str()).collect();
        assert_eq!(labels, vec!["2009-06", "2009-07"]);
        assert_eq!(report.windows[0].window_records, 6);
        assert_eq!(report.windows[0].sampled_records, 4);
        assert_eq!(report.windows[1].window_records, 5);

        let out = td.path().join("trial");
        let mut files: Vec<String> = fs::read_dir(&out)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        files.sort();
        assert_eq!(files, vec!["2009-06.fasta", "2009-07.fasta"]);
        let june = SequenceRecord::from_fasta_file(out.join("2009-06.fasta")).unwrap();
        assert_eq!(june.len(), 4);
    }

    #[test]
    fn test_missing_input_aborts_before_touching_output() {
        let td = tempdir().unwrap();
        let out = td.path().join("trial");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("2009-06.fasta"), ">old\nATG\n").unwrap();

        let pipeline = Pipeline::new(config_in(td.path(), 25)).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let err = pipeline.run(false, &mut rng).unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
        assert!(out.join("2009-06.fasta").exists());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = PipelineConfig {
            sample_size: 0,
            ..PipelineConfig::default()
        };
        assert!(Pipeline::new(config).is_err());
    }
}
