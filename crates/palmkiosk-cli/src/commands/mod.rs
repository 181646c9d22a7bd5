use std::any::Any;
use std::process::ExitCode;

use crate::cli::{Commands, OutputMode, StoreArgs};
use crate::errors::AppResult;

pub trait CommandHandler: Send + Sync {
    fn execute(&self, mode: OutputMode, verbose: bool) -> AppResult<ExitCode>;
    fn as_any(&self) -> &dyn Any;
}

mod config;
mod enroll;
mod recognize;
mod users;

pub use config::ConfigHandler;
pub use enroll::EnrollHandler;
pub use recognize::RecognizeHandler;
pub use users::UsersHandler;

/// Builds the handler for `command`, resolving storage with `store`.
pub fn dispatch(command: Commands, store: StoreArgs) -> Box<dyn CommandHandler> {
    match command {
        Commands::Enroll(args) => Box::new(EnrollHandler::new(args, store)),
        Commands::Recognize(args) => Box::new(RecognizeHandler::new(args, store)),
        Commands::Users(cmd) => Box::new(UsersHandler::new(cmd, store)),
        Commands::Config(cmd) => Box::new(ConfigHandler::new(cmd, store)),
    }
}

impl From<Commands> for Box<dyn CommandHandler> {
    fn from(command: Commands) -> Self {
        dispatch(command, StoreArgs::default())
    }
}
