mod windows_service_manager;

pub use windows_service_manager::{WindowsServiceHandle, WindowsServiceManager};

#[cfg(windows)]
pub use windows_service_manager::WindowsServiceManagerFactory;
