use crate::bridge::ResultBridge;
use crate::launcher::check_runtime_prerequisites_env;
use eeg2bids_supervisor_core::{
    ConversionJob, ConversionOutcome, Platform, ProcessHandle, ServiceDescriptor, ServiceKind,
    ServiceLog, ServiceProcessManager, SupervisorConfig, SupervisorError,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Executes on-demand conversion jobs, one at a time.
///
/// A second `convert` call while one is in flight is rejected rather than
/// raced on the shared manifest file. Every job is bounded by the configured
/// timeout and can be cancelled through `cancel_in_flight`.
pub struct ConversionRunner<M: ServiceProcessManager> {
    config: SupervisorConfig,
    manager: Arc<M>,
    log: ServiceLog,
    in_flight: AtomicBool,
    current_cancel: std::sync::Mutex<CancellationToken>,
}

impl<M: ServiceProcessManager> ConversionRunner<M> {
    pub fn new(config: SupervisorConfig, manager: Arc<M>) -> std::io::Result<Self> {
        let kind = ServiceKind::FormatConverter;
        let log = match &config.log_dir {
            Some(dir) => ServiceLog::open(kind.name(), dir, config.log_max_bytes)?,
            None => ServiceLog::tracing_only(kind.name()),
        };
        Ok(Self {
            config,
            manager,
            log,
            in_flight: AtomicBool::new(false),
            current_cancel: std::sync::Mutex::new(CancellationToken::new()),
        })
    }

    /// Cancel the job currently in flight, if any. The job resolves with a
    /// failure outcome; the converter process is killed.
    pub fn cancel_in_flight(&self) {
        self.current_cancel
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .cancel();
    }

    /// Run one conversion job to completion and deliver its structured
    /// outcome.
    ///
    /// Pre-launch refusals (runtime prerequisite missing, no inputs, missing
    /// converter executable, job already in flight) come back as errors; once
    /// the converter has been spawned, every failure mode is reported through
    /// the outcome instead.
    pub async fn convert(&self, job: ConversionJob) -> Result<ConversionOutcome, SupervisorError> {
        // The token is installed under the same lock that `cancel_in_flight`
        // takes, so a cancel can never land between claiming the slot and
        // installing the job's token.
        let cancel = {
            let mut slot = self
                .current_cancel
                .lock()
                .unwrap_or_else(|p| p.into_inner());
            if self.in_flight.swap(true, Ordering::SeqCst) {
                return Err(SupervisorError::JobInFlight);
            }
            let cancel = CancellationToken::new();
            *slot = cancel.clone();
            cancel
        };

        let result = self.run(job, cancel).await;
        self.in_flight.store(false, Ordering::SeqCst);
        result
    }

    async fn run(
        &self,
        job: ConversionJob,
        cancel: CancellationToken,
    ) -> Result<ConversionOutcome, SupervisorError> {
        check_runtime_prerequisites_env(&self.config, ServiceKind::FormatConverter)?;

        let source_dir = job.shared_parent().ok_or_else(|| {
            SupervisorError::Configuration("No MFF file selected.".to_string())
        })?;
        let dest_dir = job.output_directory().unwrap_or_else(|| source_dir.clone());
        let bridge = ResultBridge::new(&job, &source_dir, &dest_dir);

        if bridge.all_artifacts_exist() {
            info!(source = %source_dir.display(), "All SET artifacts already on disk, skipping conversion");
            return Ok(bridge.outcome_for_existing());
        }

        // The manifest must exist before the converter is invoked
        let manifest = job.write_manifest(&source_dir)?;

        let descriptor = ServiceDescriptor::resolve(
            ServiceKind::FormatConverter,
            Platform::current(),
            &self.config,
        )
        .with_job_args(&source_dir, &dest_dir, &manifest);

        if descriptor.program_must_exist() && !descriptor.program.exists() {
            return Err(SupervisorError::Launch(format!(
                "executable not found: {}",
                descriptor.program.display()
            )));
        }

        let mut handle = self
            .manager
            .spawn_service(&descriptor, self.log.clone())
            .await?;

        let waited = tokio::select! {
            _ = cancel.cancelled() => None,
            waited = tokio::time::timeout(self.config.job_timeout(), handle.wait()) => Some(waited),
        };

        let Some(waited) = waited else {
            let _ = handle.kill().await;
            return Ok(bridge.aborted_outcome(
                "conversion cancelled",
                handle.captured_stdout(),
                handle.captured_stderr(),
            ));
        };

        let status = match waited {
            Err(_) => {
                let _ = handle.kill().await;
                return Ok(bridge.aborted_outcome(
                    &format!(
                        "conversion timed out after {}s",
                        self.config.job_timeout_secs
                    ),
                    handle.captured_stdout(),
                    handle.captured_stderr(),
                ));
            }
            Ok(Ok(status)) => status,
            Ok(Err(e)) => return Err(SupervisorError::Other(e)),
        };

        // Let the forwarding tasks drain the tail of the output streams
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        Ok(bridge.outcome_after_exit(
            &format!("{status:?}"),
            handle.captured_stdout(),
            handle.captured_stderr(),
        ))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use eeg2bids_supervisor_core::{JobInput, MANIFEST_FILE, MSG_SET_EXISTS, OutcomeMessage};
    use eeg2bids_supervisor_unix::UnixServiceManager;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    // Converter script creating one .set artifact per manifest entry plus a
    // flag report, mirroring the real service's observable behavior.
    const CONVERT_ALL: &str = r#"#!/bin/sh
src="$1"; dst="$2"; manifest="$3"
for name in $(tr -d '[]"' < "$manifest" | tr ',' '\n'); do
  : > "$dst/${name%.*}.set"
done
printf '{"face_present": 1, "face_num": 1, "VEP_present": 1, "VEP_num": 1}' > "$src/flagchecks.json"
"#;

    const CONVERT_NONE: &str = "#!/bin/sh\nexit 1\n";

    const SLEEP_FOREVER: &str = "#!/bin/sh\nsleep 30\n";

    fn install_converter(root: &Path, script: &str) {
        let program = if cfg!(target_os = "macos") {
            root.join("dist/mff2set-service.app/Contents/MacOS/mff2set-service")
        } else {
            root.join("dist/mff2set-service/mff2set-service")
        };
        std::fs::create_dir_all(program.parent().unwrap()).unwrap();
        std::fs::write(&program, script).unwrap();
        std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    fn runner(root: &Path, timeout_secs: u64) -> ConversionRunner<UnixServiceManager> {
        let mut config = SupervisorConfig::builder()
            .resource_root(root)
            // Present in any sane PATH, so the prerequisite check passes
            .runtime_marker("/")
            .build()
            .unwrap();
        config.job_timeout_secs = timeout_secs;
        let manager = Arc::new(<UnixServiceManager as ServiceProcessManager>::new(&config));
        ConversionRunner::new(config, manager).unwrap()
    }

    fn input(path: PathBuf, task: &str, run: i32) -> JobInput {
        JobInput {
            path,
            task: task.to_string(),
            run,
            exclude: false,
            reason: None,
        }
    }

    fn job(dir: &Path) -> ConversionJob {
        ConversionJob::new(vec![
            input(dir.join("a.mff"), "faces", -1),
            input(dir.join("b.mff"), "vep", -1),
        ])
    }

    #[tokio::test]
    async fn test_convert_roundtrip() {
        let root = tempfile::tempdir().unwrap();
        install_converter(root.path(), CONVERT_ALL);
        let data = tempfile::tempdir().unwrap();

        let outcome = runner(root.path(), 60)
            .convert(job(data.path()))
            .await
            .unwrap();

        assert!(outcome.success);
        let names: Vec<_> = outcome.artifacts.iter().map(|a| a.path.as_str()).collect();
        assert_eq!(names, vec!["a.set", "b.set"]);
        assert_eq!(outcome.flags.len(), 4);
        assert_eq!(outcome.flags.get("face_present"), Some(&1));
        assert_eq!(outcome.output_directory, data.path().to_string_lossy());

        let manifest: Vec<String> = serde_json::from_str(
            &std::fs::read_to_string(data.path().join(MANIFEST_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(manifest, vec!["a.mff".to_string(), "b.mff".to_string()]);
    }

    #[tokio::test]
    async fn test_convert_failure_reports_diagnostics() {
        let root = tempfile::tempdir().unwrap();
        install_converter(root.path(), CONVERT_NONE);
        let data = tempfile::tempdir().unwrap();

        let outcome = runner(root.path(), 60)
            .convert(job(data.path()))
            .await
            .unwrap();

        assert!(!outcome.success);
        assert!(outcome.artifacts.is_empty());
        match outcome.message {
            OutcomeMessage::Error(parts) => assert_eq!(parts.len(), 4),
            OutcomeMessage::Text(_) => panic!("expected error message list"),
        }
    }

    #[tokio::test]
    async fn test_existing_artifacts_skip_the_spawn() {
        let root = tempfile::tempdir().unwrap();
        // Converter would fail if it ran
        install_converter(root.path(), CONVERT_NONE);
        let data = tempfile::tempdir().unwrap();
        std::fs::write(data.path().join("a.set"), "").unwrap();
        std::fs::write(data.path().join("b.set"), "").unwrap();

        let outcome = runner(root.path(), 60)
            .convert(job(data.path()))
            .await
            .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.message, OutcomeMessage::Text(MSG_SET_EXISTS.to_string()));
        assert!(!data.path().join(MANIFEST_FILE).exists());
    }

    #[tokio::test]
    async fn test_refusal_without_runtime_marker() {
        let root = tempfile::tempdir().unwrap();
        install_converter(root.path(), CONVERT_ALL);
        let data = tempfile::tempdir().unwrap();

        let mut config = SupervisorConfig::builder()
            .resource_root(root.path())
            .runtime_marker("marker-that-is-not-in-path")
            .build()
            .unwrap();
        config.job_timeout_secs = 60;
        let manager = Arc::new(<UnixServiceManager as ServiceProcessManager>::new(&config));
        let runner = ConversionRunner::new(config, manager).unwrap();

        for _ in 0..2 {
            let result = runner.convert(job(data.path())).await;
            assert!(matches!(result, Err(SupervisorError::Configuration(_))));
        }
        // Refused before any side effect
        assert!(!data.path().join(MANIFEST_FILE).exists());
    }

    #[tokio::test]
    async fn test_second_job_in_flight_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        install_converter(root.path(), SLEEP_FOREVER);
        let data = tempfile::tempdir().unwrap();

        let runner = Arc::new(runner(root.path(), 60));

        let background = {
            let runner = runner.clone();
            let job = job(data.path());
            tokio::spawn(async move { runner.convert(job).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(300)).await;

        let second = runner.convert(job(data.path())).await;
        assert!(matches!(second, Err(SupervisorError::JobInFlight)));

        runner.cancel_in_flight();
        let first = background.await.unwrap().unwrap();
        assert!(!first.success);
    }

    #[tokio::test]
    async fn test_stale_cancellation_does_not_abort_next_job() {
        let root = tempfile::tempdir().unwrap();
        install_converter(root.path(), CONVERT_ALL);
        let data = tempfile::tempdir().unwrap();

        let runner = runner(root.path(), 60);
        // Cancel with nothing in flight; the next job installs its own token
        runner.cancel_in_flight();
        runner.cancel_in_flight();

        let outcome = runner.convert(job(data.path())).await.unwrap();
        assert!(outcome.success);
    }

    #[tokio::test]
    async fn test_job_timeout_is_reported() {
        let root = tempfile::tempdir().unwrap();
        install_converter(root.path(), SLEEP_FOREVER);
        let data = tempfile::tempdir().unwrap();

        let outcome = runner(root.path(), 1)
            .convert(job(data.path()))
            .await
            .unwrap();

        assert!(!outcome.success);
        match outcome.message {
            OutcomeMessage::Error(parts) => assert!(parts[1].contains("timed out")),
            OutcomeMessage::Text(_) => panic!("expected error message list"),
        }
    }
}
