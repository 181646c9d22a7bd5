pub use palmkiosk_core::errors::{AppError, AppResult, ErrorCategory};

use palmkiosk_config::ConfigError;

pub fn from_config_error(err: ConfigError) -> AppError {
    match err {
        ConfigError::Read { path, source } => AppError::ConfigRead { path, source },
        ConfigError::Parse { path, message } => AppError::ConfigParse { path, message },
    }
}
