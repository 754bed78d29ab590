//! Logging setup and timing helpers.

mod logging;
mod timer;

pub use logging::{init_logging, log_file_name, LoggingGuard, LoggingOptions};
pub use timer::SpanTimer;
