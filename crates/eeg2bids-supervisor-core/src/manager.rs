use crate::config::SupervisorConfig;
use crate::descriptor::ServiceDescriptor;
use crate::error::SupervisorError;
use crate::logrotate::ServiceLog;
use crate::process::{ProcessHandle, TerminationResult};
use async_trait::async_trait;

/// Platform-specific process management seam.
///
/// Implementations spawn service processes with their output streams wired
/// into the given service log, and encode the platform's shutdown strategy:
/// Windows awaits a forced `taskkill` by pid, non-mac POSIX delivers a
/// termination signal directly, macOS deliberately leaves the process to the
/// app bundle's own exit handling.
#[async_trait]
pub trait ServiceProcessManager: Send + Sync {
    /// The type of process handle this manager produces
    type Handle: ProcessHandle;

    fn new(config: &SupervisorConfig) -> Self
    where
        Self: Sized;

    /// Spawn the described service with stdout/stderr forwarded line by line
    /// into `log` at info/error level.
    ///
    /// An OS refusal to create the process, or a missing program, is a
    /// `Launch` error; nothing is retried here.
    async fn spawn_service(
        &self,
        descriptor: &ServiceDescriptor,
        log: ServiceLog,
    ) -> Result<Self::Handle, SupervisorError>;

    /// Apply the platform shutdown strategy to a spawned handle
    async fn shutdown_service(&self, handle: &mut Self::Handle) -> TerminationResult;

    /// Best-effort reclaim of a local port left bound by an unclean
    /// shutdown. Failures are logged and never fail the caller.
    async fn release_port(&self, port: u16);
}

/// Factory trait for creating platform-specific service process managers
pub trait ServiceProcessManagerFactory {
    /// The type of process manager this factory creates
    type Manager: ServiceProcessManager;

    /// Create a process manager for the current platform
    fn create_process_manager(config: &SupervisorConfig) -> Self::Manager;

    /// Get the platform name for logging and debugging
    fn platform_name() -> &'static str;
}
