use std::path::PathBuf;

use chrono::{SecondsFormat, Utc};
use palmkiosk_config::ResolvedConfig;
use palmkiosk_core::frames::read_image_file;
use palmkiosk_core::palm::MatchResult;
use serde::Serialize;

use crate::cli::{RecognizeArgs, StoreArgs};
use crate::config;
use crate::errors::AppResult;

#[derive(Debug, Clone, Serialize)]
pub struct RecognizeOutcome {
    pub probe: PathBuf,
    pub threshold: f64,
    #[serde(flatten)]
    pub result: MatchResult,
    pub checked_at: String,
}

pub fn run_recognition(args: &RecognizeArgs, store: &StoreArgs) -> AppResult<RecognizeOutcome> {
    let settings = config::load_settings(store)?;
    recognize_with_config(args, &settings.resolved)
}

pub fn recognize_with_config(
    args: &RecognizeArgs,
    resolved: &ResolvedConfig,
) -> AppResult<RecognizeOutcome> {
    let threshold = args.threshold.unwrap_or(resolved.similarity_threshold);
    let probe = read_image_file(&args.probe)?;
    let kiosk = config::open_kiosk(resolved)?;
    let result = kiosk.recognize_with_threshold(&probe, threshold)?;
    Ok(RecognizeOutcome {
        probe: args.probe.clone(),
        threshold,
        result,
        checked_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}
