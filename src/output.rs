use crate::{
    collection_date::MonthKey,
    error::{ErrorCode, PipelineError},
    sampler::WindowSink,
    sequence_record::{SequenceRecord, write_fasta_file},
};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

pub const WINDOW_FILE_EXTENSION: &str = "fasta";

/// A freshly recreated output directory.
///
/// Windows are written into a hidden staging directory beside the target and
/// only moved into place by [`OutputLocation::commit`]; dropping an uncommitted
/// location removes the staging directory, so a failed run leaves no windows.
#[derive(Debug)]
pub struct OutputLocation {
    target: PathBuf,
    staging: PathBuf,
    committed: bool,
}

impl OutputLocation {
    pub fn prepare_fresh<P: AsRef<Path>>(target: P) -> Result<Self, PipelineError> {
        let target = target.as_ref().to_path_buf();
        let name = target
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                PipelineError::new(
                    ErrorCode::InvalidInput,
                    format!("Output path '{}' has no directory name", target.display()),
                )
            })?;
        let staging = target.with_file_name(format!(".{name}.partial"));

        for dir in [&target, &staging] {
            if dir.exists() {
                fs::remove_dir_all(dir).map_err(|e| {
                    PipelineError::new(
                        ErrorCode::Io,
                        format!("Could not remove output directory '{}': {e}", dir.display()),
                    )
                })?;
            }
        }
        fs::create_dir_all(&staging).map_err(|e| {
            PipelineError::new(
                ErrorCode::Io,
                format!("Could not create output directory '{}': {e}", staging.display()),
            )
        })?;

        Ok(Self {
            target,
            staging,
            committed: false,
        })
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn staging(&self) -> &Path {
        &self.staging
    }

    pub fn window_file_name(label: MonthKey) -> String {
        format!("{label}.{WINDOW_FILE_EXTENSION}")
    }

    pub fn commit(mut self) -> Result<PathBuf, PipelineError> {
        fs::rename(&self.staging, &self.target).map_err(|e| {
            PipelineError::new(
                ErrorCode::Io,
                format!(
                    "Could not move '{}' to '{}': {e}",
                    self.staging.display(),
                    self.target.display()
                ),
            )
        })?;
        self.committed = true;
        info!(output = %self.target.display(), "output directory ready");
        Ok(self.target.clone())
    }
}

impl WindowSink for OutputLocation {
    fn write_window(
        &mut self,
        label: MonthKey,
        records: &[&SequenceRecord],
    ) -> Result<String, PipelineError> {
        let file_name = Self::window_file_name(label);
        write_fasta_file(self.staging.join(&file_name), records.iter().copied())?;
        Ok(self.target.join(file_name).to_string_lossy().to_string())
    }
}

impl Drop for OutputLocation {
    fn drop(&mut self) {
        if self.committed || !self.staging.exists() {
            return;
        }
        if let Err(e) = fs::remove_dir_all(&self.staging) {
            warn!(staging = %self.staging.display(), "could not remove staging directory: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_prepare_clears_previous_run() {
        let td = tempdir().unwrap();
        let target = td.path().join("unpassaged");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("2008-01.fasta"), ">old\nACGT\n").unwrap();

        let output = OutputLocation::prepare_fresh(&target).unwrap();
        assert!(!target.exists());
        assert!(output.staging().is_dir());

        let committed = output.commit().unwrap();
        assert_eq!(committed, target);
        assert!(target.is_dir());
        assert_eq!(fs::read_dir(&target).unwrap().count(), 0);
    }

    #[test]
    fn test_windows_land_in_target_after_commit() {
        let td = tempdir().unwrap();
        let target = td.path().join("run");
        let record = SequenceRecord::new("A/Ohio/1/2009", Some("| 2009-06-01 | P0"), b"ATGAAA");

        let mut output = OutputLocation::prepare_fresh(&target).unwrap();
        let reported = output
            .write_window(MonthKey::new(2009, 6), &[&record])
            .unwrap();
        assert!(!target.join("2009-06.fasta").exists());
        output.commit().unwrap();

        assert_eq!(reported, target.join("2009-06.fasta").to_string_lossy());
        let written = SequenceRecord::from_fasta_file(target.join("2009-06.fasta")).unwrap();
        assert_eq!(written, vec![record]);
    }

    #[test]
    fn test_uncommitted_output_leaves_nothing_behind() {
        let td = tempdir().unwrap();
        let target = td.path().join("run");
        let staging = {
            let mut output = OutputLocation::prepare_fresh(&target).unwrap();
            output.write_window(MonthKey::new(2009, 6), &[]).unwrap();
            output.staging().to_path_buf()
        };
        assert!(!staging.exists());
        assert!(!target.exists());
    }
}
