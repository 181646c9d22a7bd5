use std::any::Any;
use std::process::ExitCode;

use crate::cli::{EnrollArgs, OutputMode, StoreArgs};
use crate::commands::CommandHandler;
use crate::enroll::{self, EnrollOutcome};
use crate::errors::AppResult;
use crate::output::render_enroll;

pub struct EnrollHandler {
    args: EnrollArgs,
    store: StoreArgs,
    run: Box<dyn Fn(&EnrollArgs, &StoreArgs) -> AppResult<EnrollOutcome> + Send + Sync>,
    render: Box<dyn Fn(&EnrollOutcome, OutputMode, bool) -> AppResult<()> + Send + Sync>,
}

impl EnrollHandler {
    pub fn new(args: EnrollArgs, store: StoreArgs) -> Self {
        Self::with_dependencies(args, store, enroll::run_enrollment, render_enroll)
    }

    pub fn with_dependencies(
        args: EnrollArgs,
        store: StoreArgs,
        run: impl Fn(&EnrollArgs, &StoreArgs) -> AppResult<EnrollOutcome> + Send + Sync + 'static,
        render: impl Fn(&EnrollOutcome, OutputMode, bool) -> AppResult<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            args,
            store,
            run: Box::new(run),
            render: Box::new(render),
        }
    }
}

impl CommandHandler for EnrollHandler {
    fn execute(&self, mode: OutputMode, verbose: bool) -> AppResult<ExitCode> {
        let outcome = (self.run)(&self.args, &self.store)?;
        (self.render)(&outcome, mode, verbose)?;
        Ok(ExitCode::SUCCESS)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
