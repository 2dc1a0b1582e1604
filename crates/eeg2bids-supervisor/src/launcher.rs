use eeg2bids_supervisor_core::{
    Platform, ProcessHandle, ServiceDescriptor, ServiceKind, ServiceLog, ServiceProcessManager,
    SupervisorConfig, SupervisorError, TerminationResult,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

/// Refusal message shown when the numeric runtime is not installed
pub const MSG_ENV_NOT_CONFIGURED: &str = "Environment not configured for processing MFF files.";

/// Check the launch-time environment precondition for a service.
///
/// MFF conversion needs the numeric runtime, detected by a marker substring
/// in PATH, on every platform except Windows where the runtime ships with
/// the packaged converter. The check is a pure function of the PATH value,
/// so a refused launch stays refused on retry.
pub fn check_runtime_prerequisites(
    config: &SupervisorConfig,
    kind: ServiceKind,
    platform: Platform,
    path_value: &str,
) -> Result<(), SupervisorError> {
    if kind == ServiceKind::FormatConverter
        && platform != Platform::Windows
        && !config.marker_in_path(path_value)
    {
        return Err(SupervisorError::Configuration(
            MSG_ENV_NOT_CONFIGURED.to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn check_runtime_prerequisites_env(
    config: &SupervisorConfig,
    kind: ServiceKind,
) -> Result<(), SupervisorError> {
    let path = std::env::var("PATH").unwrap_or_default();
    check_runtime_prerequisites(config, kind, Platform::current(), &path)
}

/// Owns the lifecycle of one named helper service: at most one live process
/// at a time, platform-resolved launch, logged output, idempotent shutdown.
pub struct ServiceLauncher<M: ServiceProcessManager> {
    config: SupervisorConfig,
    kind: ServiceKind,
    manager: Arc<M>,
    log: ServiceLog,
    handle: Mutex<Option<M::Handle>>,
}

impl<M: ServiceProcessManager> ServiceLauncher<M> {
    pub fn new(
        config: SupervisorConfig,
        kind: ServiceKind,
        manager: Arc<M>,
    ) -> std::io::Result<Self> {
        let log = match &config.log_dir {
            Some(dir) => ServiceLog::open(kind.name(), dir, config.log_max_bytes)?,
            None => ServiceLog::tracing_only(kind.name()),
        };
        Ok(Self {
            config,
            kind,
            manager,
            log,
            handle: Mutex::new(None),
        })
    }

    pub fn kind(&self) -> ServiceKind {
        self.kind
    }

    /// Launch the service, tearing down any previous instance first.
    ///
    /// Launch-time refusals (missing runtime prerequisite, missing
    /// executable, OS spawn rejection) are surfaced immediately to the
    /// caller; nothing is spawned in that case.
    pub async fn start(&self) -> Result<(), SupervisorError> {
        check_runtime_prerequisites_env(&self.config, self.kind)?;

        // At most one process per named service
        self.shutdown().await;

        if self.kind == ServiceKind::ConversionServer {
            // Recover from a previous unclean shutdown; failures here are
            // logged by the manager and the launch proceeds regardless.
            self.manager.release_port(self.config.server_port).await;
        }

        let descriptor = ServiceDescriptor::resolve(self.kind, Platform::current(), &self.config);
        if descriptor.program_must_exist() && !descriptor.program.exists() {
            return Err(SupervisorError::Launch(format!(
                "executable not found: {}",
                descriptor.program.display()
            )));
        }

        let handle = self
            .manager
            .spawn_service(&descriptor, self.log.clone())
            .await?;
        info!(service = %self.kind, pid = ?handle.get_pid(), "Service started");
        *self.handle.lock().await = Some(handle);
        Ok(())
    }

    /// Tear down the current instance using the platform shutdown strategy.
    /// A no-op when no process is active; the handle slot is cleared either
    /// way, so calling twice is safe.
    pub async fn shutdown(&self) {
        let mut slot = self.handle.lock().await;
        let Some(mut handle) = slot.take() else {
            return;
        };

        self.log.info(&format!("[SHUTDOWN of {}]", self.kind));
        match self.manager.shutdown_service(&mut handle).await {
            TerminationResult::Success
            | TerminationResult::Skipped
            | TerminationResult::ProcessNotFound => {}
            other => {
                // Shutdown still proceeds: the reference is already cleared
                error!(
                    service = %self.kind,
                    result = ?other,
                    "{}",
                    SupervisorError::Shutdown(format!("{other:?}"))
                );
            }
        }
    }

    /// Whether a spawned instance is currently alive
    pub async fn is_running(&self) -> bool {
        match self.handle.lock().await.as_ref() {
            Some(handle) => handle.is_running().await,
            None => false,
        }
    }
}
