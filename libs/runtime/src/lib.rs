//! Process-level plumbing shared by everything that embeds the library core:
//! layered configuration loading and logging bootstrap.

pub mod config;
pub mod logging;
pub mod paths;

pub use config::{AppConfig, AppSection, LoggingConfig, Section};
pub use logging::init_logging_from_config;
