use std::any::Any;
use std::process::ExitCode;

use crate::cli::{ConfigCommands, OutputMode, StoreArgs};
use crate::commands::CommandHandler;
use crate::config::{self, ConfigReport};
use crate::errors::AppResult;
use crate::output::render_config;

pub struct ConfigHandler {
    command: ConfigCommands,
    store: StoreArgs,
    show: Box<dyn Fn(&StoreArgs) -> AppResult<ConfigReport> + Send + Sync>,
    render: Box<dyn Fn(&ConfigReport, OutputMode) -> AppResult<()> + Send + Sync>,
}

impl ConfigHandler {
    pub fn new(command: ConfigCommands, store: StoreArgs) -> Self {
        Self::with_dependencies(command, store, config::show_config, render_config)
    }

    pub fn with_dependencies(
        command: ConfigCommands,
        store: StoreArgs,
        show: impl Fn(&StoreArgs) -> AppResult<ConfigReport> + Send + Sync + 'static,
        render: impl Fn(&ConfigReport, OutputMode) -> AppResult<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            command,
            store,
            show: Box::new(show),
            render: Box::new(render),
        }
    }
}

impl CommandHandler for ConfigHandler {
    fn execute(&self, mode: OutputMode, _verbose: bool) -> AppResult<ExitCode> {
        match self.command {
            ConfigCommands::Show => {
                let report = (self.show)(&self.store)?;
                (self.render)(&report, mode)?;
            }
        }
        Ok(ExitCode::SUCCESS)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
