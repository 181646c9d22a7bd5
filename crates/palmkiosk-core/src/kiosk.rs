use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use crate::errors::{AppError, AppResult};
use crate::palm::assets::{FilesystemAssetStore, ImageAssetStore};
use crate::palm::identity::canonical_id;
use crate::palm::enrollment::{
    CancelOutcome, CaptureOutcome, EnrollmentConfig, EnrollmentSession, SessionEvent,
    SessionSnapshot, SessionStatus,
};
use crate::palm::matcher::{
    GrayscaleCorrelation, MatchResult, MatchingEngine, SimilarityMetric, DEFAULT_THRESHOLD,
};
use crate::palm::registry::{
    ImageRef, JsonRecordStore, RecordStore, RemovedUser, UserRecord, UserRegistry,
};

#[derive(Debug, Clone, PartialEq)]
pub struct KioskConfig {
    pub enrollment: EnrollmentConfig,
    pub threshold: f64,
}

impl Default for KioskConfig {
    fn default() -> Self {
        Self {
            enrollment: EnrollmentConfig::default(),
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Outcomes announced to the notification sink. Intermediate progress is
/// only available by polling the session snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TerminalEvent {
    EnrollmentCompleted { id: String, name: String, samples: u32 },
    Recognition(MatchResult),
}

/// Fire-and-forget consumer of terminal events (voice prompts, popups).
pub trait NotificationSink {
    fn notify(&self, event: &TerminalEvent);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, event: &TerminalEvent) {
        match event {
            TerminalEvent::EnrollmentCompleted { id, samples, .. } => {
                info!(target: "palmkiosk.notify", id = %id, samples, "enrollment completed");
            }
            TerminalEvent::Recognition(result) => match &result.candidate {
                Some(candidate) => info!(
                    target: "palmkiosk.notify",
                    id = %candidate.id,
                    score = result.score,
                    "recognition succeeded"
                ),
                None => info!(target: "palmkiosk.notify", score = result.score, "recognition failed"),
            },
        }
    }
}

/// Single-writer core: one registry, one enrollment slot and one matcher.
/// Callers feed frames, probes and elapsed time; nothing runs in the
/// background.
pub struct Kiosk<R = JsonRecordStore, A = FilesystemAssetStore, M = GrayscaleCorrelation> {
    registry: UserRegistry<R, A>,
    session: EnrollmentSession,
    engine: MatchingEngine<M>,
    threshold: f64,
    notifier: Box<dyn NotificationSink>,
}

impl Kiosk<JsonRecordStore, FilesystemAssetStore, GrayscaleCorrelation> {
    pub fn open(
        registry_path: &Path,
        image_dir: &Path,
        template_size: u32,
        config: KioskConfig,
    ) -> AppResult<Self> {
        let registry = UserRegistry::open_at(registry_path, image_dir)?;
        let engine = MatchingEngine::new(GrayscaleCorrelation::new(template_size));
        Ok(Self::new(registry, engine, config))
    }
}

impl<R, A, M> Kiosk<R, A, M>
where
    R: RecordStore,
    A: ImageAssetStore,
    M: SimilarityMetric,
{
    pub fn new(registry: UserRegistry<R, A>, engine: MatchingEngine<M>, config: KioskConfig) -> Self {
        Self {
            registry,
            session: EnrollmentSession::new(config.enrollment),
            engine,
            threshold: config.threshold,
            notifier: Box::new(TracingSink),
        }
    }

    pub fn with_notifier(mut self, notifier: impl NotificationSink + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    pub fn registry(&self) -> &UserRegistry<R, A> {
        &self.registry
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn is_session_active(&self) -> bool {
        self.session.is_active()
    }

    pub fn session_snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    pub fn begin_enrollment(&mut self, name: &str, id: &str, force: bool) -> AppResult<SessionSnapshot> {
        if self.session.is_active() {
            return Err(AppError::SessionActive {
                id: self.session.subject_id().unwrap_or_default().to_string(),
            });
        }
        self.session.start(&mut self.registry, name, id, force)
    }

    /// Frames that the metric cannot read are refused before anything is
    /// stored.
    pub fn capture_sample(&mut self, frame: &[u8]) -> AppResult<CaptureOutcome> {
        if self.session.status() == SessionStatus::Capturing {
            self.engine.prepare_probe(frame)?;
        }
        let outcome = self.session.capture_sample(&mut self.registry, frame)?;

        if outcome.events.contains(&SessionEvent::Completed) {
            let snapshot = &outcome.snapshot;
            self.notifier.notify(&TerminalEvent::EnrollmentCompleted {
                id: snapshot.subject_id.clone().unwrap_or_default(),
                name: snapshot.subject_name.clone().unwrap_or_default(),
                samples: snapshot.total_captured,
            });
        }
        Ok(outcome)
    }

    pub fn advance(&mut self, elapsed: Duration) -> Vec<SessionEvent> {
        self.session.advance(elapsed)
    }

    pub fn resume(&mut self) -> AppResult<Vec<SessionEvent>> {
        self.session.resume()
    }

    pub fn cancel_enrollment(&mut self) -> AppResult<CancelOutcome> {
        self.session.cancel(&mut self.registry)
    }

    pub fn acknowledge_completion(&mut self) -> AppResult<SessionSnapshot> {
        self.session.finish()
    }

    pub fn recognize(&self, probe: &[u8]) -> AppResult<MatchResult> {
        self.recognize_with_threshold(probe, self.threshold)
    }

    pub fn recognize_with_threshold(&self, probe: &[u8], threshold: f64) -> AppResult<MatchResult> {
        let features = self.engine.prepare_probe(probe)?;
        let result = self
            .engine
            .match_probe(&features, &self.registry.snapshot(), threshold);
        self.notifier
            .notify(&TerminalEvent::Recognition(result.clone()));
        Ok(result)
    }

    pub fn search(&self, query: &str) -> Vec<UserRecord> {
        self.registry.search(query)
    }

    pub fn get_all_users(&self) -> Vec<UserRecord> {
        self.registry.get_all_users()
    }

    pub fn get_images(&self, id: &str) -> Vec<ImageRef> {
        self.registry.get_images(id)
    }

    /// The subject of a running session can only be removed by cancelling it.
    pub fn delete_user(&mut self, id: &str) -> AppResult<RemovedUser> {
        let key = canonical_id(id);
        if self.session.is_active() && self.session.subject_id() == Some(key.as_str()) {
            return Err(AppError::SessionActive { id: key });
        }
        self.registry.delete_user(id)
    }
}
