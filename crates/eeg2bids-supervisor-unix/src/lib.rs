mod unix_service_manager;

pub use unix_service_manager::{UnixServiceHandle, UnixServiceManager};

#[cfg(unix)]
pub use unix_service_manager::UnixServiceManagerFactory;
