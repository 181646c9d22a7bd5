use std::any::Any;
use std::process::ExitCode;

use crate::cli::{OutputMode, RecognizeArgs, StoreArgs};
use crate::commands::CommandHandler;
use crate::errors::AppResult;
use crate::output::render_recognize;
use crate::recognize::{self, RecognizeOutcome};

/// Exit code reported when the probe matched nobody.
pub const NO_MATCH_EXIT_CODE: u8 = 10;

pub struct RecognizeHandler {
    args: RecognizeArgs,
    store: StoreArgs,
    run: Box<dyn Fn(&RecognizeArgs, &StoreArgs) -> AppResult<RecognizeOutcome> + Send + Sync>,
    render: Box<dyn Fn(&RecognizeOutcome, OutputMode) -> AppResult<()> + Send + Sync>,
}

impl RecognizeHandler {
    pub fn new(args: RecognizeArgs, store: StoreArgs) -> Self {
        Self::with_dependencies(args, store, recognize::run_recognition, render_recognize)
    }

    pub fn with_dependencies(
        args: RecognizeArgs,
        store: StoreArgs,
        run: impl Fn(&RecognizeArgs, &StoreArgs) -> AppResult<RecognizeOutcome>
            + Send
            + Sync
            + 'static,
        render: impl Fn(&RecognizeOutcome, OutputMode) -> AppResult<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            args,
            store,
            run: Box::new(run),
            render: Box::new(render),
        }
    }
}

impl CommandHandler for RecognizeHandler {
    fn execute(&self, mode: OutputMode, _verbose: bool) -> AppResult<ExitCode> {
        let outcome = (self.run)(&self.args, &self.store)?;
        (self.render)(&outcome, mode)?;
        if outcome.result.is_match {
            Ok(ExitCode::SUCCESS)
        } else {
            Ok(ExitCode::from(NO_MATCH_EXIT_CODE))
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
