pub mod config;
pub mod error;
pub mod logging;

pub use config::{AppConfig, ConfigManager, ConfigSource, HistoryConfig};
pub use error::{HistoryError, Result};
pub use logging::{setup_logging, LoggingConfig};
