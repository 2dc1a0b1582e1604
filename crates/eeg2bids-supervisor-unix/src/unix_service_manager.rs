#[cfg(unix)]
mod unix_impl {
    use anyhow::Result;
    use async_trait::async_trait;
    use eeg2bids_supervisor_core::{
        CaptureBuffer, Platform, ProcessHandle, ProcessId, ProcessStatus, ServiceDescriptor,
        ServiceLog, ServiceProcessManager, ServiceProcessManagerFactory, ServiceState, StreamKind,
        SupervisorConfig, SupervisorError, TerminationResult, capture_buffer, forward_lines,
    };
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid as NixPid;
    use std::process::Stdio;
    use tokio::process::{Child, Command};
    use tracing::{info, warn};

    /// Unix-specific service handle implementation
    pub struct UnixServiceHandle {
        child: Child,
        command: String,
        args: Vec<String>,
        state: ServiceState,
        stdout: CaptureBuffer,
        stderr: CaptureBuffer,
    }

    #[async_trait]
    impl ProcessHandle for UnixServiceHandle {
        fn get_pid(&self) -> Option<ProcessId> {
            self.child.id().map(ProcessId::from)
        }

        fn get_command(&self) -> &str {
            &self.command
        }

        fn get_args(&self) -> &[String] {
            &self.args
        }

        fn state(&self) -> ServiceState {
            self.state
        }

        fn captured_stdout(&self) -> String {
            self.stdout.lock().unwrap_or_else(|p| p.into_inner()).clone()
        }

        fn captured_stderr(&self) -> String {
            self.stderr.lock().unwrap_or_else(|p| p.into_inner()).clone()
        }

        async fn is_running(&self) -> bool {
            if let Some(pid) = self.get_pid() {
                // Signal 0 probes for existence without delivering anything
                signal::kill(NixPid::from_raw(pid.0 as i32), None).is_ok()
            } else {
                false
            }
        }

        async fn try_wait(&mut self) -> Result<Option<ProcessStatus>> {
            match self.child.try_wait()? {
                Some(status) => {
                    self.state = ServiceState::Exited;
                    Ok(Some(ProcessStatus::Exited(status)))
                }
                None => Ok(None),
            }
        }

        async fn wait(&mut self) -> Result<ProcessStatus> {
            let status = self.child.wait().await?;
            self.state = ServiceState::Exited;
            Ok(ProcessStatus::Exited(status))
        }

        async fn kill(&mut self) -> Result<()> {
            self.state = ServiceState::KillRequested;
            self.child
                .kill()
                .await
                .map_err(|e| anyhow::anyhow!("Failed to kill process: {}", e))
        }
    }

    /// Unix implementation of the service process manager
    pub struct UnixServiceManager;

    #[async_trait]
    impl ServiceProcessManager for UnixServiceManager {
        type Handle = UnixServiceHandle;

        fn new(_config: &SupervisorConfig) -> Self {
            Self
        }

        async fn spawn_service(
            &self,
            descriptor: &ServiceDescriptor,
            log: ServiceLog,
        ) -> Result<Self::Handle, SupervisorError> {
            let mut cmd = Command::new(&descriptor.program);
            cmd.args(&descriptor.args)
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                // New process group for clean signal delivery
                .process_group(0);

            let mut child = cmd.spawn().map_err(|e| {
                SupervisorError::Launch(format!("{}: {e}", descriptor.program.display()))
            })?;

            let stdout = capture_buffer();
            let stderr = capture_buffer();

            if let Some(out) = child.stdout.take() {
                tokio::spawn(forward_lines(
                    out,
                    StreamKind::Stdout,
                    log.clone(),
                    stdout.clone(),
                ));
            }
            if let Some(err) = child.stderr.take() {
                tokio::spawn(forward_lines(
                    err,
                    StreamKind::Stderr,
                    log.clone(),
                    stderr.clone(),
                ));
            }

            if let Some(pid) = child.id() {
                info!(
                    pid = %pid,
                    command = %descriptor.program.display(),
                    args = ?descriptor.args,
                    "Spawned Unix service process"
                );
            }

            Ok(UnixServiceHandle {
                child,
                command: descriptor.program.to_string_lossy().into_owned(),
                args: descriptor.args.clone(),
                state: ServiceState::Running,
                stdout,
                stderr,
            })
        }

        async fn shutdown_service(&self, handle: &mut Self::Handle) -> TerminationResult {
            // macOS: the process is deliberately left running; the app
            // bundle's own exit handling reclaims it. Callers must not
            // assume the process has exited on this platform.
            if Platform::current() == Platform::MacOs {
                info!(
                    command = %handle.get_command(),
                    "Leaving service process running on macOS"
                );
                return TerminationResult::Skipped;
            }

            let Some(pid) = handle.get_pid() else {
                return TerminationResult::ProcessNotFound;
            };

            handle.state = ServiceState::KillRequested;
            match signal::kill(NixPid::from_raw(pid.0 as i32), Signal::SIGTERM) {
                Ok(()) => {
                    info!("Sent SIGTERM to process {}", pid);
                    TerminationResult::Success
                }
                Err(nix::errno::Errno::ESRCH) => {
                    info!("Process {} not found (already terminated)", pid);
                    TerminationResult::ProcessNotFound
                }
                Err(nix::errno::Errno::EPERM) => {
                    warn!("Permission denied to terminate process {}", pid);
                    TerminationResult::AccessDenied
                }
                Err(e) => {
                    warn!("Failed to send SIGTERM to process {}: {}", pid, e);
                    TerminationResult::Failed(format!("SIGTERM failed: {e}"))
                }
            }
        }

        async fn release_port(&self, port: u16) {
            let output = Command::new("lsof")
                .args(["-ti", &format!("tcp:{port}")])
                .output()
                .await;

            let output = match output {
                Ok(output) => output,
                Err(e) => {
                    warn!(port, error = %e, "Could not run lsof to release port");
                    return;
                }
            };

            for line in String::from_utf8_lossy(&output.stdout).lines() {
                let Ok(pid) = line.trim().parse::<i32>() else {
                    continue;
                };
                match signal::kill(NixPid::from_raw(pid), Signal::SIGKILL) {
                    Ok(()) => info!(port, pid, "Killed stale listener on service port"),
                    Err(e) => warn!(port, pid, error = %e, "Could not kill stale listener"),
                }
            }
        }
    }

    /// Factory for creating Unix service manager instances
    pub struct UnixServiceManagerFactory;

    impl ServiceProcessManagerFactory for UnixServiceManagerFactory {
        type Manager = UnixServiceManager;

        fn create_process_manager(config: &SupervisorConfig) -> Self::Manager {
            UnixServiceManager::new(config)
        }

        fn platform_name() -> &'static str {
            "Unix"
        }
    }
}

#[cfg(unix)]
pub use unix_impl::{UnixServiceHandle, UnixServiceManager, UnixServiceManagerFactory};

// Provide stub implementations for non-Unix systems
#[cfg(not(unix))]
pub struct UnixServiceHandle;

#[cfg(not(unix))]
pub struct UnixServiceManager;

#[cfg(not(unix))]
impl UnixServiceManager {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(not(unix))]
impl Default for UnixServiceManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use eeg2bids_supervisor_core::{
        InvocationMode, Platform, ProcessHandle, ProcessStatus, ServiceDescriptor, ServiceKind,
        ServiceLog, ServiceProcessManager, ServiceState, SupervisorConfig, TerminationResult,
    };
    use std::path::PathBuf;

    fn config() -> SupervisorConfig {
        SupervisorConfig::builder()
            .resource_root("/tmp")
            .build()
            .unwrap()
    }

    fn descriptor(program: &str, args: &[&str]) -> ServiceDescriptor {
        ServiceDescriptor {
            kind: ServiceKind::FormatConverter,
            platform: Platform::current(),
            program: PathBuf::from(program),
            args: args.iter().map(|s| s.to_string()).collect(),
            invocation_mode: InvocationMode::SpawnBlocking,
        }
    }

    #[tokio::test]
    async fn test_spawn_captures_stdout() {
        let manager = UnixServiceManager::new(&config());
        let log = ServiceLog::tracing_only("test");

        let mut handle = manager
            .spawn_service(&descriptor("/bin/echo", &["hello world"]), log)
            .await
            .unwrap();

        let status = handle.wait().await.unwrap();
        assert!(matches!(status, ProcessStatus::Exited(s) if s.success()));
        assert_eq!(handle.state(), ServiceState::Exited);

        // Forwarding tasks race the wait; give them a moment to drain
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        assert!(handle.captured_stdout().contains("hello world"));
    }

    #[tokio::test]
    async fn test_spawn_missing_program_is_launch_failure() {
        let manager = UnixServiceManager::new(&config());
        let log = ServiceLog::tracing_only("test");

        let result = manager
            .spawn_service(&descriptor("/no/such/binary", &[]), log)
            .await;
        assert!(matches!(
            result,
            Err(eeg2bids_supervisor_core::SupervisorError::Launch(_))
        ));
    }

    #[tokio::test]
    async fn test_shutdown_terminates_long_running_process() {
        let manager = UnixServiceManager::new(&config());
        let log = ServiceLog::tracing_only("test");

        let mut handle = manager
            .spawn_service(&descriptor("/bin/sleep", &["30"]), log)
            .await
            .unwrap();

        let result = manager.shutdown_service(&mut handle).await;
        if Platform::current() == Platform::MacOs {
            assert_eq!(result, TerminationResult::Skipped);
            handle.kill().await.unwrap();
        } else {
            assert_eq!(result, TerminationResult::Success);
            assert_eq!(handle.state(), ServiceState::KillRequested);
            let status = handle.wait().await.unwrap();
            assert!(matches!(status, ProcessStatus::Exited(_)));
        }
    }
}
