use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use palmkiosk_config::ResolvedConfig;
use palmkiosk_core::frames::{DirectoryFrameSource, FrameSource};
use palmkiosk_core::palm::{
    CancelOutcome, Hand, ImageAssetStore, RecordStore, SessionEvent, SessionStatus,
    SimilarityMetric,
};
use palmkiosk_core::Kiosk;
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::{EnrollArgs, StoreArgs};
use crate::config;
use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone, Serialize)]
pub struct EnrollOutcome {
    pub id: String,
    pub name: String,
    pub session_id: Option<String>,
    pub left_samples: usize,
    pub right_samples: usize,
    pub registry_path: PathBuf,
    pub completed_at: String,
    #[serde(skip)]
    pub logs: Vec<String>,
}

pub fn run_enrollment(args: &EnrollArgs, store: &StoreArgs) -> AppResult<EnrollOutcome> {
    let settings = config::load_settings(store)?;
    enroll_with_config(args, &settings.resolved)
}

pub fn enroll_with_config(args: &EnrollArgs, resolved: &ResolvedConfig) -> AppResult<EnrollOutcome> {
    let mut frames = DirectoryFrameSource::open(&args.frames)?;
    let mut kiosk = config::open_kiosk(resolved)?;
    let mut outcome = enroll_from_source(&mut kiosk, &mut frames, args, thread::sleep)?;
    outcome.registry_path = resolved.registry_path.clone();
    Ok(outcome)
}

/// Runs one session to completion from `frames`. `wait` is called with the
/// hand-switch pause before the session resumes. Any failure,
/// including running out of frames, cancels the session so nothing of the
/// attempt stays registered.
pub fn enroll_from_source<R, A, M, F>(
    kiosk: &mut Kiosk<R, A, M>,
    frames: &mut F,
    args: &EnrollArgs,
    mut wait: impl FnMut(Duration),
) -> AppResult<EnrollOutcome>
where
    R: RecordStore,
    A: ImageAssetStore,
    M: SimilarityMetric,
    F: FrameSource,
{
    let started = kiosk.begin_enrollment(&args.name, &args.id, args.force)?;
    let mut logs = vec![format!(
        "Enrollment started for {} ({})",
        started.subject_name.clone().unwrap_or_default(),
        started.subject_id.clone().unwrap_or_default()
    )];

    loop {
        let snapshot = kiosk.session_snapshot();
        match snapshot.status {
            SessionStatus::Capturing => {
                let frame = match frames.next_frame() {
                    Ok(Some(frame)) => frame,
                    Ok(None) => {
                        let err = AppError::CaptureFailure(format!(
                            "frame source exhausted after {} of {} samples",
                            snapshot.total_captured, snapshot.total_required
                        ));
                        return Err(abandon(kiosk, err));
                    }
                    Err(err) => return Err(abandon(kiosk, err)),
                };
                let captured = match kiosk.capture_sample(&frame) {
                    Ok(captured) => captured,
                    Err(err) => return Err(abandon(kiosk, err)),
                };
                for event in &captured.events {
                    if let SessionEvent::HandComplete(hand) = event {
                        logs.push(format!(
                            "{} hand complete ({} samples)",
                            capitalize(*hand),
                            snapshot.quota
                        ));
                    }
                }
            }
            SessionStatus::PauseBeforeSwitch => {
                let remaining =
                    Duration::from_millis(snapshot.pause_remaining_millis.unwrap_or_default());
                info!(millis = remaining.as_millis() as u64, "waiting before hand switch");
                wait(remaining);
                // The snapshot truncates to whole milliseconds.
                if let Err(err) = kiosk.resume() {
                    return Err(abandon(kiosk, err));
                }
            }
            SessionStatus::Completed => {
                let record = kiosk
                    .registry()
                    .get(snapshot.subject_id.as_deref().unwrap_or_default())
                    .cloned();
                kiosk.acknowledge_completion()?;
                let record = record.ok_or_else(|| AppError::UserNotFound {
                    id: snapshot.subject_id.clone().unwrap_or_default(),
                })?;
                logs.push(format!("Enrollment complete: {} images", record.images.len()));
                return Ok(EnrollOutcome {
                    left_samples: record.images_for(Hand::Left).count(),
                    right_samples: record.images_for(Hand::Right).count(),
                    id: record.id,
                    name: record.name,
                    session_id: snapshot.session_id,
                    registry_path: PathBuf::new(),
                    completed_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                    logs,
                });
            }
            SessionStatus::Idle | SessionStatus::Cancelled => {
                return Err(AppError::InvalidSessionState {
                    action: "continue enrollment",
                    state: snapshot.status.to_string(),
                });
            }
        }
    }
}

fn abandon<R, A, M>(kiosk: &mut Kiosk<R, A, M>, err: AppError) -> AppError
where
    R: RecordStore,
    A: ImageAssetStore,
    M: SimilarityMetric,
{
    match kiosk.cancel_enrollment() {
        Ok(CancelOutcome::RolledBack { id, images_removed }) => {
            warn!(id = %id, images_removed, error = %err, "enrollment abandoned");
        }
        Ok(CancelOutcome::NotActive) => {}
        Err(cancel_err) => {
            warn!(error = %cancel_err, "failed to roll back abandoned enrollment");
        }
    }
    err
}

fn capitalize(hand: Hand) -> &'static str {
    match hand {
        Hand::Left => "Left",
        Hand::Right => "Right",
    }
}
