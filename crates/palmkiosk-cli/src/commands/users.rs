use std::any::Any;
use std::process::ExitCode;

use crate::cli::{OutputMode, StoreArgs, UsersCommands};
use crate::commands::CommandHandler;
use crate::errors::AppResult;
use crate::output::render_users;
use crate::users::{self, UsersOutcome};

pub struct UsersHandler {
    command: UsersCommands,
    store: StoreArgs,
    run: Box<dyn Fn(&UsersCommands, &StoreArgs) -> AppResult<UsersOutcome> + Send + Sync>,
    render: Box<dyn Fn(&UsersOutcome, OutputMode) -> AppResult<()> + Send + Sync>,
}

impl UsersHandler {
    pub fn new(command: UsersCommands, store: StoreArgs) -> Self {
        Self::with_dependencies(command, store, users::run_users, render_users)
    }

    pub fn with_dependencies(
        command: UsersCommands,
        store: StoreArgs,
        run: impl Fn(&UsersCommands, &StoreArgs) -> AppResult<UsersOutcome> + Send + Sync + 'static,
        render: impl Fn(&UsersOutcome, OutputMode) -> AppResult<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            command,
            store,
            run: Box::new(run),
            render: Box::new(render),
        }
    }
}

impl CommandHandler for UsersHandler {
    fn execute(&self, mode: OutputMode, _verbose: bool) -> AppResult<ExitCode> {
        let outcome = (self.run)(&self.command, &self.store)?;
        (self.render)(&outcome, mode)?;
        Ok(ExitCode::SUCCESS)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
