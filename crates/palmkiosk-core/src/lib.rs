pub mod errors;
pub mod frames;
pub mod kiosk;
pub mod palm;

pub use errors::{AppError, AppResult, ErrorCategory};
pub use kiosk::{Kiosk, KioskConfig, NotificationSink, TerminalEvent, TracingSink};
