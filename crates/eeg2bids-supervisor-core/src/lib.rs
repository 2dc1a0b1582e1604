//! EEG2BIDS Supervisor Core - platform-independent abstractions
//!
//! This crate provides the configuration, error taxonomy, process traits,
//! manifest/flag-file handling and log rotation shared across the
//! platform-specific service manager implementations.

mod config;
mod descriptor;
mod error;
mod flags;
mod logrotate;
mod manager;
mod manifest;
mod outcome;
mod process;
mod stdio;

pub use config::*;
pub use descriptor::*;
pub use error::*;
pub use flags::*;
pub use logrotate::*;
pub use manager::*;
pub use manifest::*;
pub use outcome::*;
pub use process::*;
pub use stdio::*;
