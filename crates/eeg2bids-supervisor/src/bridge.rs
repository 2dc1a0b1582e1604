use eeg2bids_supervisor_core::{
    Artifact, ConversionJob, ConversionOutcome, JobInput, MSG_CONVERSION_FAILED, MSG_SET_CREATED,
    MSG_SET_EXISTS, read_flag_checks,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Failure message when the converter finished but its flag report is
/// missing or unparseable
pub const MSG_FLAGS_UNREADABLE: &str = "Conversion flag report could not be read.";

/// Marshals a finished (or skipped) conversion into the structured outcome
/// delivered to the UI layer, by inspecting expected output artifacts on
/// disk and parsing the converter's flag report.
pub struct ResultBridge {
    artifacts: Vec<Artifact>,
    source_dir: PathBuf,
    dest_dir: PathBuf,
}

impl ResultBridge {
    pub fn new(job: &ConversionJob, source_dir: &Path, dest_dir: &Path) -> Self {
        let artifacts = job
            .active_inputs()
            .map(|input: &JobInput| Artifact {
                path: format!("{}.set", input.stem()),
                name: input.stem(),
                task: input.task.clone(),
                run: input.run,
            })
            .collect();
        Self {
            artifacts,
            source_dir: source_dir.to_path_buf(),
            dest_dir: dest_dir.to_path_buf(),
        }
    }

    /// Expected output artifacts whose files are not on disk
    pub fn missing_artifacts(&self) -> Vec<&str> {
        self.artifacts
            .iter()
            .filter(|artifact| !self.dest_dir.join(&artifact.path).exists())
            .map(|artifact| artifact.path.as_str())
            .collect()
    }

    pub fn all_artifacts_exist(&self) -> bool {
        !self.artifacts.is_empty() && self.missing_artifacts().is_empty()
    }

    /// Outcome for the no-spawn path: every artifact was already on disk.
    /// A flag report from an earlier run is attached when present.
    pub fn outcome_for_existing(&self) -> ConversionOutcome {
        let flags = read_flag_checks(&self.source_dir).unwrap_or_else(|_| BTreeMap::new());
        ConversionOutcome::succeeded(
            MSG_SET_EXISTS,
            self.artifacts.clone(),
            flags,
            self.dest_dir.to_string_lossy().into_owned(),
        )
    }

    /// Outcome after the converter process exited.
    ///
    /// Success is keyed purely on artifact existence; the exit status only
    /// feeds the diagnostics of a failure outcome. A corrupt flag report is
    /// itself a reported failure, never a crash.
    pub fn outcome_after_exit(
        &self,
        raw_status: &str,
        stdout: String,
        stderr: String,
    ) -> ConversionOutcome {
        let missing = self.missing_artifacts();
        if !missing.is_empty() {
            return ConversionOutcome::failed(
                MSG_CONVERSION_FAILED,
                format!("{raw_status}; missing output artifacts: {}", missing.join(", ")),
                stdout,
                stderr,
            );
        }

        match read_flag_checks(&self.source_dir) {
            Ok(flags) => ConversionOutcome::succeeded(
                MSG_SET_CREATED,
                self.artifacts.clone(),
                flags,
                self.dest_dir.to_string_lossy().into_owned(),
            ),
            Err(e) => ConversionOutcome::failed(MSG_FLAGS_UNREADABLE, e.to_string(), stdout, stderr),
        }
    }

    /// Outcome for a job the supervisor gave up on (timeout, cancellation)
    pub fn aborted_outcome(&self, reason: &str, stdout: String, stderr: String) -> ConversionOutcome {
        ConversionOutcome::failed(MSG_CONVERSION_FAILED, reason.to_string(), stdout, stderr)
    }
}
