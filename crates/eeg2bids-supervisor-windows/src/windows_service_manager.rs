#[cfg(windows)]
mod windows_impl {
    use anyhow::Result;
    use async_trait::async_trait;
    use eeg2bids_supervisor_core::{
        CaptureBuffer, ProcessHandle, ProcessId, ProcessStatus, ServiceDescriptor, ServiceLog,
        ServiceProcessManager, ServiceProcessManagerFactory, ServiceState, StreamKind,
        SupervisorConfig, SupervisorError, TerminationResult, capture_buffer, forward_lines,
    };
    use std::process::Stdio;
    use sysinfo::System;
    use tokio::process::{Child, Command};
    use tracing::{info, warn};

    /// Windows-specific service handle implementation
    pub struct WindowsServiceHandle {
        child: Child,
        command: String,
        args: Vec<String>,
        state: ServiceState,
        stdout: CaptureBuffer,
        stderr: CaptureBuffer,
    }

    #[async_trait]
    impl ProcessHandle for WindowsServiceHandle {
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
            let Some(pid) = self.get_pid() else {
                return false;
            };
            let mut system = System::new();
            system.refresh_processes_specifics(
                sysinfo::ProcessesToUpdate::All,
                true,
                sysinfo::ProcessRefreshKind::default(),
            );
            system.processes().keys().any(|p| p.as_u32() == pid.0)
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

    /// Windows implementation of the service process manager
    pub struct WindowsServiceManager;

    #[async_trait]
    impl ServiceProcessManager for WindowsServiceManager {
        type Handle = WindowsServiceHandle;

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
                .stderr(Stdio::piped());

            // CREATE_NO_WINDOW: background services must not pop a console
            cmd.creation_flags(0x08000000);

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
                    "Spawned Windows service process"
                );
            }

            Ok(WindowsServiceHandle {
                child,
                command: descriptor.program.to_string_lossy().into_owned(),
                args: descriptor.args.clone(),
                state: ServiceState::Running,
                stdout,
                stderr,
            })
        }

        /// Forced kill by pid, awaited before returning so the caller only
        /// proceeds once the taskkill command has completed.
        async fn shutdown_service(&self, handle: &mut Self::Handle) -> TerminationResult {
            let Some(pid) = handle.get_pid() else {
                return TerminationResult::ProcessNotFound;
            };

            handle.state = ServiceState::KillRequested;
            let output = Command::new("taskkill")
                .args(["/PID", &pid.to_string(), "/T", "/F"])
                .output()
                .await;

            match output {
                Ok(output) => {
                    let stdout = String::from_utf8_lossy(&output.stdout);
                    if !stdout.trim().is_empty() {
                        info!(pid = %pid, "taskkill: {}", stdout.trim());
                    }
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    if !stderr.trim().is_empty() {
                        warn!(pid = %pid, "taskkill: {}", stderr.trim());
                    }

                    if output.status.success() {
                        TerminationResult::Success
                    } else {
                        TerminationResult::Failed(format!(
                            "taskkill exited with {}",
                            output.status
                        ))
                    }
                }
                Err(e) => {
                    warn!(pid = %pid, error = %e, "Failed to run taskkill");
                    TerminationResult::Failed(format!("taskkill failed: {e}"))
                }
            }
        }

        async fn release_port(&self, port: u16) {
            // netstat -ano lists "proto local foreign state pid"
            let output = Command::new("netstat").args(["-ano", "-p", "tcp"]).output().await;

            let output = match output {
                Ok(output) => output,
                Err(e) => {
                    warn!(port, error = %e, "Could not run netstat to release port");
                    return;
                }
            };

            let needle = format!(":{port}");
            for line in String::from_utf8_lossy(&output.stdout).lines() {
                let columns: Vec<&str> = line.split_whitespace().collect();
                if columns.len() != 5 {
                    continue;
                }
                let (local, state, pid) = (columns[1], columns[3], columns[4]);
                if !local.ends_with(&needle) || !state.eq_ignore_ascii_case("LISTENING") {
                    continue;
                }

                match Command::new("taskkill")
                    .args(["/PID", pid, "/F"])
                    .output()
                    .await
                {
                    Ok(out) if out.status.success() => {
                        info!(port, pid, "Killed stale listener on service port");
                    }
                    Ok(out) => {
                        warn!(port, pid, status = %out.status, "Could not kill stale listener");
                    }
                    Err(e) => {
                        warn!(port, pid, error = %e, "Could not run taskkill for stale listener");
                    }
                }
            }
        }
    }

    /// Factory for creating Windows service manager instances
    pub struct WindowsServiceManagerFactory;

    impl ServiceProcessManagerFactory for WindowsServiceManagerFactory {
        type Manager = WindowsServiceManager;

        fn create_process_manager(config: &SupervisorConfig) -> Self::Manager {
            WindowsServiceManager::new(config)
        }

        fn platform_name() -> &'static str {
            "Windows"
        }
    }
}

#[cfg(windows)]
pub use windows_impl::{WindowsServiceHandle, WindowsServiceManager, WindowsServiceManagerFactory};

// Provide stub implementations for non-Windows systems
#[cfg(not(windows))]
pub struct WindowsServiceHandle;

#[cfg(not(windows))]
pub struct WindowsServiceManager;

#[cfg(not(windows))]
impl WindowsServiceManager {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(not(windows))]
impl Default for WindowsServiceManager {
    fn default() -> Self {
        Self::new()
    }
}
