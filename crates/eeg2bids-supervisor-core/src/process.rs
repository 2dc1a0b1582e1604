use anyhow::Result;
use async_trait::async_trait;

/// Unique identifier for a process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessId(pub u32);

impl From<u32> for ProcessId {
    fn from(pid: u32) -> Self {
        Self(pid)
    }
}

impl std::fmt::Display for ProcessId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of a process after termination
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessStatus {
    /// Process exited with status information
    Exited(std::process::ExitStatus),
    /// Process was terminated by the supervisor
    Terminated,
}

/// Result of a process termination operation
#[derive(Debug, Clone, PartialEq)]
pub enum TerminationResult {
    /// Process was successfully terminated (or the kill signal delivered)
    Success,
    /// Process was not found (already exited)
    ProcessNotFound,
    /// Access denied (insufficient privileges)
    AccessDenied,
    /// Process was deliberately left running (macOS app-lifecycle quirk)
    Skipped,
    /// Operation failed with specific error message
    Failed(String),
}

/// Lifecycle state of a supervised service process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Running,
    Exited,
    KillRequested,
}

/// Trait representing a handle to a spawned service process
#[async_trait]
pub trait ProcessHandle: Send + Sync {
    /// Get the process ID (None if process has exited)
    fn get_pid(&self) -> Option<ProcessId>;

    /// Get the command that started this process
    fn get_command(&self) -> &str;

    /// Get the arguments passed to this process
    fn get_args(&self) -> &[String];

    /// Get the lifecycle state last observed by the supervisor
    fn state(&self) -> ServiceState;

    /// Everything the process wrote to stdout so far
    fn captured_stdout(&self) -> String;

    /// Everything the process wrote to stderr so far
    fn captured_stderr(&self) -> String;

    /// Check if the process is still running (non-blocking)
    async fn is_running(&self) -> bool;

    /// Try to get exit status without blocking
    async fn try_wait(&mut self) -> Result<Option<ProcessStatus>>;

    /// Wait for the process to exit (blocking)
    async fn wait(&mut self) -> Result<ProcessStatus>;

    /// Kill the process (platform-specific implementation)
    async fn kill(&mut self) -> Result<()>;
}

/// Implementation of ProcessHandle for boxed trait objects
#[async_trait]
impl ProcessHandle for Box<dyn ProcessHandle> {
    fn get_pid(&self) -> Option<ProcessId> {
        (**self).get_pid()
    }

    fn get_command(&self) -> &str {
        (**self).get_command()
    }

    fn get_args(&self) -> &[String] {
        (**self).get_args()
    }

    fn state(&self) -> ServiceState {
        (**self).state()
    }

    fn captured_stdout(&self) -> String {
        (**self).captured_stdout()
    }

    fn captured_stderr(&self) -> String {
        (**self).captured_stderr()
    }

    async fn is_running(&self) -> bool {
        (**self).is_running().await
    }

    async fn try_wait(&mut self) -> Result<Option<ProcessStatus>> {
        (**self).try_wait().await
    }

    async fn wait(&mut self) -> Result<ProcessStatus> {
        (**self).wait().await
    }

    async fn kill(&mut self) -> Result<()> {
        (**self).kill().await
    }
}
