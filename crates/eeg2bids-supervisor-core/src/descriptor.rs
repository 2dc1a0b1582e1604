use crate::config::{LaunchMode, SupervisorConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Host platform, resolved once at launch time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Posix,
    Windows,
    MacOs,
}

impl Platform {
    /// Detect the platform of the host this process runs on
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Posix
        }
    }
}

/// Logical name of a supervised helper service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceKind {
    /// Persistent WebSocket-speaking conversion server
    ConversionServer,
    /// On-demand MFF-to-SET format converter
    FormatConverter,
}

impl ServiceKind {
    pub fn name(&self) -> &'static str {
        match self {
            ServiceKind::ConversionServer => "set2bids-service",
            ServiceKind::FormatConverter => "mff2set-service",
        }
    }
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// How the service process is driven once spawned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationMode {
    /// Long-lived process, stdout/stderr streamed for the life of the service
    SpawnStreaming,
    /// Short-lived job, supervisor awaits exit
    SpawnBlocking,
}

/// One external executable invocation, immutable for the life of a service
/// instance
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDescriptor {
    pub kind: ServiceKind,
    pub platform: Platform,
    pub program: PathBuf,
    pub args: Vec<String>,
    pub invocation_mode: InvocationMode,
}

impl ServiceDescriptor {
    /// Resolve the platform-specific invocation for a named service.
    ///
    /// Development mode swaps the packaged conversion-server binary for an
    /// interpreter script; the on-demand converter is always the packaged
    /// binary.
    pub fn resolve(kind: ServiceKind, platform: Platform, config: &SupervisorConfig) -> Self {
        match kind {
            ServiceKind::ConversionServer => {
                if config.mode == LaunchMode::Development {
                    let (interpreter, script) = match platform {
                        Platform::Windows => ("powershell.exe", "start-server.ps1"),
                        Platform::MacOs | Platform::Posix => ("bash", "start-server.sh"),
                    };
                    return Self {
                        kind,
                        platform,
                        program: PathBuf::from(interpreter),
                        args: vec![
                            config
                                .resource_root
                                .join(script)
                                .to_string_lossy()
                                .into_owned(),
                        ],
                        invocation_mode: InvocationMode::SpawnStreaming,
                    };
                }

                let relative = match platform {
                    Platform::Windows => "dist/set2bids-service-windows/set2bids-service-windows.exe",
                    Platform::MacOs => "dist/set2bids-service.app/Contents/MacOS/set2bids-service",
                    Platform::Posix => "dist/set2bids-service/set2bids-service",
                };
                Self {
                    kind,
                    platform,
                    program: config.resource_root.join(relative),
                    args: Vec::new(),
                    invocation_mode: InvocationMode::SpawnStreaming,
                }
            }
            ServiceKind::FormatConverter => {
                let relative = match platform {
                    Platform::Windows => "dist/mff2set-service-windows/mff2set-service-windows.exe",
                    Platform::MacOs => "dist/mff2set-service.app/Contents/MacOS/mff2set-service",
                    Platform::Posix => "dist/mff2set-service/mff2set-service",
                };
                Self {
                    kind,
                    platform,
                    program: config.resource_root.join(relative),
                    args: Vec::new(),
                    invocation_mode: InvocationMode::SpawnBlocking,
                }
            }
        }
    }

    /// Attach the three positional converter arguments:
    /// source directory, destination directory, manifest path.
    pub fn with_job_args(mut self, source_dir: &Path, dest_dir: &Path, manifest: &Path) -> Self {
        self.args = vec![
            source_dir.to_string_lossy().into_owned(),
            dest_dir.to_string_lossy().into_owned(),
            manifest.to_string_lossy().into_owned(),
        ];
        self
    }

    /// Whether the resolved program is a packaged binary whose presence on
    /// disk can be checked before spawning. Interpreter invocations
    /// (development mode) rely on the interpreter being on PATH.
    pub fn program_must_exist(&self) -> bool {
        self.program.is_absolute()
    }
}
