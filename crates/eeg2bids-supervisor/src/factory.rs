use eeg2bids_supervisor_core::{ServiceProcessManagerFactory, SupervisorConfig};

/// Platform-independent factory that selects the appropriate implementation
/// at compile time
pub struct PlatformServiceManagerFactory;

impl ServiceProcessManagerFactory for PlatformServiceManagerFactory {
    #[cfg(unix)]
    type Manager = eeg2bids_supervisor_unix::UnixServiceManager;

    #[cfg(windows)]
    type Manager = eeg2bids_supervisor_windows::WindowsServiceManager;

    fn create_process_manager(config: &SupervisorConfig) -> Self::Manager {
        #[cfg(unix)]
        return eeg2bids_supervisor_unix::UnixServiceManagerFactory::create_process_manager(config);

        #[cfg(windows)]
        return eeg2bids_supervisor_windows::WindowsServiceManagerFactory::create_process_manager(
            config,
        );
    }

    fn platform_name() -> &'static str {
        #[cfg(unix)]
        return eeg2bids_supervisor_unix::UnixServiceManagerFactory::platform_name();

        #[cfg(windows)]
        return eeg2bids_supervisor_windows::WindowsServiceManagerFactory::platform_name();
    }
}

/// The process manager type for the host platform
pub type PlatformServiceManager =
    <PlatformServiceManagerFactory as ServiceProcessManagerFactory>::Manager;
