use crate::error::SupervisorError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Manifest of input base names handed to the external converter
pub const MANIFEST_FILE: &str = "files.json";

/// Data-quality flag report produced by the external converter
pub const FLAG_CHECK_FILE: &str = "flagchecks.json";

/// One recording directory selected for conversion.
///
/// `run` is the 1-based run index when a task has multiple recordings, or -1
/// when the task has a single unindexed recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobInput {
    pub path: PathBuf,
    pub task: String,
    #[serde(default = "default_run")]
    pub run: i32,
    #[serde(default)]
    pub exclude: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

fn default_run() -> i32 {
    -1
}

impl JobInput {
    /// Base file name as listed in the manifest, e.g. `a.mff`
    pub fn base_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// File stem used to derive the expected output artifact, e.g. `a`
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// One on-demand conversion request: an ordered input set plus an optional
/// destination override. Discarded after the job resolves.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionJob {
    inputs: Vec<JobInput>,
    output_hint: Option<PathBuf>,
}

impl ConversionJob {
    pub fn new(inputs: Vec<JobInput>) -> Self {
        Self {
            inputs,
            output_hint: None,
        }
    }

    pub fn with_output_hint(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_hint = Some(dir.into());
        self
    }

    /// Inputs that take part in the conversion, in request order
    pub fn active_inputs(&self) -> impl Iterator<Item = &JobInput> {
        self.inputs.iter().filter(|input| !input.exclude)
    }

    /// Task name to free-text reason for every excluded input
    pub fn excluded_reasons(&self) -> BTreeMap<String, String> {
        self.inputs
            .iter()
            .filter(|input| input.exclude)
            .map(|input| {
                (
                    input.task.clone(),
                    input.reason.clone().unwrap_or_default(),
                )
            })
            .collect()
    }

    /// Common parent directory of the job inputs.
    ///
    /// All inputs are expected to share the first entry's parent; a
    /// mismatching input is logged as a configuration problem but the job
    /// proceeds with the first entry's parent. Returns None when there is no
    /// active input.
    pub fn shared_parent(&self) -> Option<PathBuf> {
        let first = self.active_inputs().next()?;
        let parent = first.path.parent()?.to_path_buf();

        for input in self.active_inputs().skip(1) {
            if input.path.parent() != Some(parent.as_path()) {
                warn!(
                    input = %input.path.display(),
                    expected_parent = %parent.display(),
                    "Job input does not share the common parent directory"
                );
            }
        }

        Some(parent)
    }

    /// Destination directory for the converter output
    pub fn output_directory(&self) -> Option<PathBuf> {
        self.output_hint
            .clone()
            .or_else(|| self.shared_parent())
    }

    /// Write `files.json` into `dir`, listing the base names of the active
    /// inputs in request order. The manifest must exist on disk before the
    /// external process is invoked.
    pub fn write_manifest(&self, dir: &Path) -> Result<PathBuf, SupervisorError> {
        let names: Vec<String> = self.active_inputs().map(JobInput::base_name).collect();
        let path = dir.join(MANIFEST_FILE);
        let json = serde_json::to_string(&names)
            .map_err(|e| SupervisorError::Other(e.into()))?;
        std::fs::write(&path, json)?;
        Ok(path)
    }
}

/// Parse the converter-produced flag report from `dir`.
///
/// A missing file or invalid JSON is a `ManifestCorrupt` error, reported to
/// the caller rather than propagated as a panic down the result path.
pub fn read_flag_checks(dir: &Path) -> Result<BTreeMap<String, i64>, SupervisorError> {
    let path = dir.join(FLAG_CHECK_FILE);
    let raw = std::fs::read_to_string(&path).map_err(|e| {
        SupervisorError::ManifestCorrupt(format!("{}: {e}", path.display()))
    })?;
    serde_json::from_str(&raw)
        .map_err(|e| SupervisorError::ManifestCorrupt(format!("{}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(path: &str, task: &str, run: i32) -> JobInput {
        JobInput {
            path: PathBuf::from(path),
            task: task.to_string(),
            run,
            exclude: false,
            reason: None,
        }
    }

    #[test]
    fn test_manifest_contains_base_names_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let job = ConversionJob::new(vec![
            input("/d/a.mff", "faces", -1),
            input("/d/b.mff", "vep", -1),
        ]);

        let manifest = job.write_manifest(dir.path()).unwrap();
        assert_eq!(manifest, dir.path().join("files.json"));

        let raw = std::fs::read_to_string(&manifest).unwrap();
        let names: Vec<String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(names, vec!["a.mff".to_string(), "b.mff".to_string()]);
    }

    #[test]
    fn test_excluded_inputs_left_out_of_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let mut excluded = input("/d/c.mff", "rest", -1);
        excluded.exclude = true;
        excluded.reason = Some("bad recording".to_string());

        let job = ConversionJob::new(vec![input("/d/a.mff", "faces", -1), excluded]);

        let manifest = job.write_manifest(dir.path()).unwrap();
        let names: Vec<String> =
            serde_json::from_str(&std::fs::read_to_string(&manifest).unwrap()).unwrap();
        assert_eq!(names, vec!["a.mff".to_string()]);

        let reasons = job.excluded_reasons();
        assert_eq!(reasons.get("rest").map(String::as_str), Some("bad recording"));
    }

    #[test]
    fn test_shared_parent() {
        let job = ConversionJob::new(vec![
            input("/d/a.mff", "faces", -1),
            input("/d/b.mff", "vep", -1),
        ]);
        assert_eq!(job.shared_parent(), Some(PathBuf::from("/d")));

        // Mismatching parent is logged, not rejected
        let job = ConversionJob::new(vec![
            input("/d/a.mff", "faces", -1),
            input("/elsewhere/b.mff", "vep", -1),
        ]);
        assert_eq!(job.shared_parent(), Some(PathBuf::from("/d")));

        let job = ConversionJob::new(vec![]);
        assert_eq!(job.shared_parent(), None);
    }

    #[test]
    fn test_output_hint_overrides_parent() {
        let job = ConversionJob::new(vec![input("/d/a.mff", "faces", -1)])
            .with_output_hint("/out");
        assert_eq!(job.output_directory(), Some(PathBuf::from("/out")));
    }

    #[test]
    fn test_read_flag_checks_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(FLAG_CHECK_FILE),
            r#"{"face_present": 1, "face_num": 0}"#,
        )
        .unwrap();

        let flags = read_flag_checks(dir.path()).unwrap();
        assert_eq!(flags.get("face_present"), Some(&1));
        assert_eq!(flags.get("face_num"), Some(&0));
    }

    #[test]
    fn test_read_flag_checks_missing_is_manifest_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_flag_checks(dir.path()).unwrap_err();
        assert!(matches!(err, SupervisorError::ManifestCorrupt(_)));
    }

    #[test]
    fn test_read_flag_checks_invalid_json_is_manifest_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(FLAG_CHECK_FILE), "{not json").unwrap();
        let err = read_flag_checks(dir.path()).unwrap_err();
        assert!(matches!(err, SupervisorError::ManifestCorrupt(_)));
    }
}
