//! Shared building blocks for every Chousei crate: identifiers, the
//! top-level error type and layered configuration.

pub mod config;
pub mod error;
pub mod types;

pub use config::ChouseiConfig;
pub use error::{ChouseiError, Result};
pub use types::ScheduleId;
