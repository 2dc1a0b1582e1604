//! Helper-process supervisor for the EEG2BIDS wizard.
//!
//! Launches, supervises and tears down the external conversion services
//! (the persistent conversion server and the on-demand MFF-to-SET
//! converter), captures their output into rotated log files and delivers
//! conversion results as structured outcomes.

mod bridge;
mod converter;
mod factory;
mod launcher;
mod telemetry;

pub use bridge::{MSG_FLAGS_UNREADABLE, ResultBridge};
pub use converter::ConversionRunner;
pub use factory::{PlatformServiceManager, PlatformServiceManagerFactory};
pub use launcher::{MSG_ENV_NOT_CONFIGURED, ServiceLauncher, check_runtime_prerequisites};
pub use telemetry::{init_tracing, init_tracing_json};

// Re-export core functionality
pub use eeg2bids_supervisor_core::*;

use std::sync::Arc;

/// Launcher for the persistent conversion server on the host platform
pub fn conversion_server_launcher(
    config: SupervisorConfig,
) -> std::io::Result<ServiceLauncher<PlatformServiceManager>> {
    let manager = Arc::new(PlatformServiceManagerFactory::create_process_manager(&config));
    ServiceLauncher::new(config, ServiceKind::ConversionServer, manager)
}

/// Runner for on-demand conversion jobs on the host platform
pub fn conversion_runner(
    config: SupervisorConfig,
) -> std::io::Result<ConversionRunner<PlatformServiceManager>> {
    let manager = Arc::new(PlatformServiceManagerFactory::create_process_manager(&config));
    ConversionRunner::new(config, manager)
}
