//! Utility modules shared across the loader

pub mod lock;
pub mod logging;

pub use lock::with_lock;
#[cfg(feature = "json-logging")]
pub use logging::init_json_logging;
pub use logging::{init_logging, init_logging_from_config};
