use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::palm::assets::{AssetName, Hand, ImageAssetStore};
use crate::palm::identity::{validate_display_name, validate_national_id};
use crate::palm::registry::{ImageRef, RecordStore, UserRegistry};

pub const DEFAULT_SAMPLES_PER_HAND: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentConfig {
    pub samples_per_hand: u32,
    /// Zero switches hands immediately after the left-hand quota.
    pub hand_switch_pause: Duration,
}

impl Default for EnrollmentConfig {
    fn default() -> Self {
        Self {
            samples_per_hand: DEFAULT_SAMPLES_PER_HAND,
            hand_switch_pause: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Capturing,
    PauseBeforeSwitch,
    Cancelled,
    Completed,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Capturing => "capturing",
            SessionStatus::PauseBeforeSwitch => "paused before hand switch",
            SessionStatus::Cancelled => "cancelled",
            SessionStatus::Completed => "completed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "hand", rename_all = "snake_case")]
pub enum SessionEvent {
    HandComplete(Hand),
    PauseStarted(Hand),
    HandSwitched(Hand),
    Completed,
    Cancelled,
}

/// Everything the presentation layer needs to draw the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Option<String>,
    pub subject_id: Option<String>,
    pub subject_name: Option<String>,
    pub status: SessionStatus,
    pub hand: Hand,
    pub captured: u32,
    pub quota: u32,
    pub total_captured: u32,
    pub total_required: u32,
    /// Ring progress for the current hand, 0..360.
    pub progress_degrees: f64,
    pub pause_remaining_millis: Option<u64>,
    pub hint: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptureOutcome {
    pub image: ImageRef,
    pub events: Vec<SessionEvent>,
    pub snapshot: SessionSnapshot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CancelOutcome {
    NotActive,
    RolledBack { id: String, images_removed: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Capturing,
    Paused { remaining: Duration },
    Completed,
}

#[derive(Debug, Clone)]
struct Subject {
    session_id: Uuid,
    id: String,
    name: String,
}

/// Drives sample acquisition for one subject: `samples_per_hand` left-hand
/// samples, an optional pause, the same for the right hand, then completion.
/// A single instance is the registry-wide enrollment slot.
#[derive(Debug)]
pub struct EnrollmentSession {
    config: EnrollmentConfig,
    phase: Phase,
    subject: Option<Subject>,
    hand: Hand,
    captured: u32,
    progress: u32,
    total: u32,
}

impl EnrollmentSession {
    pub fn new(config: EnrollmentConfig) -> Self {
        let config = EnrollmentConfig {
            samples_per_hand: config.samples_per_hand.max(1),
            ..config
        };
        Self {
            config,
            phase: Phase::Idle,
            subject: None,
            hand: Hand::Left,
            captured: 0,
            progress: 0,
            total: 0,
        }
    }

    pub fn config(&self) -> &EnrollmentConfig {
        &self.config
    }

    pub fn status(&self) -> SessionStatus {
        match self.phase {
            Phase::Idle => SessionStatus::Idle,
            Phase::Capturing => SessionStatus::Capturing,
            Phase::Paused { .. } => SessionStatus::PauseBeforeSwitch,
            Phase::Completed => SessionStatus::Completed,
        }
    }

    /// True while samples are being collected or the hand-switch pause runs.
    pub fn is_active(&self) -> bool {
        matches!(self.phase, Phase::Capturing | Phase::Paused { .. })
    }

    pub fn is_complete(&self) -> bool {
        self.phase == Phase::Completed
    }

    pub fn subject_id(&self) -> Option<&str> {
        self.subject.as_ref().map(|subject| subject.id.as_str())
    }

    /// Registers an empty record for the subject and begins with the left hand.
    /// Nothing is written when validation or the duplicate check fails.
    pub fn start<R, A>(
        &mut self,
        registry: &mut UserRegistry<R, A>,
        name: &str,
        id: &str,
        force: bool,
    ) -> AppResult<SessionSnapshot>
    where
        R: RecordStore,
        A: ImageAssetStore,
    {
        if let Some(subject) = self.subject.as_ref().filter(|_| self.is_active()) {
            return Err(AppError::SessionActive {
                id: subject.id.clone(),
            });
        }
        let id = validate_national_id(id)?;
        let name = validate_display_name(name)?;

        let record = registry.add_user(&name, &id, force)?;
        let subject = Subject {
            session_id: Uuid::new_v4(),
            id: record.id,
            name: record.name,
        };
        info!(session = %subject.session_id, id = %subject.id, "enrollment started");

        self.subject = Some(subject);
        self.phase = Phase::Capturing;
        self.hand = Hand::Left;
        self.captured = 0;
        self.progress = 0;
        self.total = 0;
        Ok(self.snapshot())
    }

    /// Stores one frame for the current hand. On any failure the counters are
    /// unchanged and no asset or image reference is left behind.
    pub fn capture_sample<R, A>(
        &mut self,
        registry: &mut UserRegistry<R, A>,
        frame: &[u8],
    ) -> AppResult<CaptureOutcome>
    where
        R: RecordStore,
        A: ImageAssetStore,
    {
        if self.phase != Phase::Capturing {
            return Err(self.invalid_state("capture a sample"));
        }
        let subject = match self.subject.as_ref() {
            Some(subject) => subject.clone(),
            None => return Err(self.invalid_state("capture a sample")),
        };
        if frame.is_empty() {
            return Err(AppError::CaptureFailure("empty frame".into()));
        }

        let asset = AssetName::new(subject.id.clone(), self.hand, self.captured + 1);
        let path = registry.assets().save(frame, &asset)?;
        let image = match registry.add_image(&subject.id, &path) {
            Ok(image) => image,
            Err(err) => {
                if let Err(cleanup) = registry.assets().delete(&path) {
                    warn!(path = %path.display(), error = %cleanup, "failed to remove orphaned sample");
                }
                return Err(err);
            }
        };

        self.captured += 1;
        self.progress += 1;
        self.total += 1;

        let mut events = Vec::new();
        if self.captured >= self.config.samples_per_hand {
            events.push(SessionEvent::HandComplete(self.hand));
            self.captured = 0;
            self.progress = 0;
            match self.hand {
                Hand::Left => {
                    self.hand = Hand::Right;
                    if self.config.hand_switch_pause.is_zero() {
                        events.push(SessionEvent::HandSwitched(Hand::Right));
                    } else {
                        self.phase = Phase::Paused {
                            remaining: self.config.hand_switch_pause,
                        };
                        events.push(SessionEvent::PauseStarted(Hand::Right));
                    }
                }
                Hand::Right => {
                    self.phase = Phase::Completed;
                    events.push(SessionEvent::Completed);
                    info!(session = %subject.session_id, id = %subject.id, samples = self.total, "enrollment completed");
                }
            }
        }

        Ok(CaptureOutcome {
            image,
            events,
            snapshot: self.snapshot(),
        })
    }

    /// Feeds elapsed time into the hand-switch pause; the session owns no
    /// clock of its own.
    pub fn advance(&mut self, elapsed: Duration) -> Vec<SessionEvent> {
        let Phase::Paused { remaining } = self.phase else {
            return Vec::new();
        };
        let remaining = remaining.saturating_sub(elapsed);
        if remaining.is_zero() {
            self.phase = Phase::Capturing;
            vec![SessionEvent::HandSwitched(self.hand)]
        } else {
            self.phase = Phase::Paused { remaining };
            Vec::new()
        }
    }

    /// Ends the hand-switch pause early.
    pub fn resume(&mut self) -> AppResult<Vec<SessionEvent>> {
        match self.phase {
            Phase::Paused { remaining } => Ok(self.advance(remaining)),
            _ => Err(self.invalid_state("resume")),
        }
    }

    /// Deletes the in-progress record and its images and returns to idle. A
    /// no-op when idle; if the rollback cannot be persisted the session stays
    /// active so the cancel can be retried.
    pub fn cancel<R, A>(&mut self, registry: &mut UserRegistry<R, A>) -> AppResult<CancelOutcome>
    where
        R: RecordStore,
        A: ImageAssetStore,
    {
        match self.phase {
            Phase::Idle => return Ok(CancelOutcome::NotActive),
            Phase::Completed => return Err(self.invalid_state("cancel")),
            Phase::Capturing | Phase::Paused { .. } => {}
        }
        let Some(subject) = self.subject.clone() else {
            self.reset();
            return Ok(CancelOutcome::NotActive);
        };

        let images_removed = match registry.delete_user(&subject.id) {
            Ok(removed) => removed.assets_removed + removed.assets_missing,
            Err(AppError::UserNotFound { .. }) => 0,
            Err(err) => return Err(err),
        };
        info!(session = %subject.session_id, id = %subject.id, images_removed, "enrollment cancelled");

        self.reset();
        Ok(CancelOutcome::RolledBack {
            id: subject.id,
            images_removed,
        })
    }

    /// Returns a completed session to idle. The caller decides when.
    pub fn finish(&mut self) -> AppResult<SessionSnapshot> {
        if self.phase != Phase::Completed {
            return Err(self.invalid_state("finish"));
        }
        self.reset();
        Ok(self.snapshot())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let quota = self.config.samples_per_hand;
        SessionSnapshot {
            session_id: self
                .subject
                .as_ref()
                .map(|subject| subject.session_id.to_string()),
            subject_id: self.subject.as_ref().map(|subject| subject.id.clone()),
            subject_name: self.subject.as_ref().map(|subject| subject.name.clone()),
            status: self.status(),
            hand: self.hand,
            captured: self.captured,
            quota,
            total_captured: self.total,
            total_required: quota * 2,
            progress_degrees: f64::from(self.progress) * 360.0 / f64::from(quota),
            pause_remaining_millis: match self.phase {
                Phase::Paused { remaining } => {
                    Some(u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX))
                }
                _ => None,
            },
            hint: self.hint(),
        }
    }

    fn hint(&self) -> String {
        match self.phase {
            Phase::Idle => "Place your palm inside the circle".to_string(),
            Phase::Capturing => format!(
                "Capturing {} hand ({}/{})",
                self.hand, self.captured, self.config.samples_per_hand
            ),
            Phase::Paused { .. } => format!("Switch to your {} hand", self.hand),
            Phase::Completed => "Enrollment complete".to_string(),
        }
    }

    fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.subject = None;
        self.hand = Hand::Left;
        self.captured = 0;
        self.progress = 0;
        self.total = 0;
    }

    fn invalid_state(&self, action: &'static str) -> AppError {
        AppError::InvalidSessionState {
            action,
            state: self.status().to_string(),
        }
    }
}

impl Default for EnrollmentSession {
    fn default() -> Self {
        Self::new(EnrollmentConfig::default())
    }
}
