pub mod assets;
pub mod enrollment;
pub mod identity;
pub mod matcher;
pub mod registry;

pub use assets::{AssetName, AssetRemoval, FilesystemAssetStore, Hand, ImageAssetStore};

pub use enrollment::{
    CancelOutcome, CaptureOutcome, EnrollmentConfig, EnrollmentSession, SessionEvent,
    SessionSnapshot, SessionStatus, DEFAULT_SAMPLES_PER_HAND,
};

pub use identity::{canonical_id, validate_display_name, validate_national_id};

pub use matcher::{
    cosine_similarity, Candidate, GrayscaleCorrelation, MatchResult, MatchingEngine,
    RegistrySnapshot, SimilarityMetric, UserScore, DEFAULT_TEMPLATE_SIZE, DEFAULT_THRESHOLD,
};

pub use registry::{ImageRef, JsonRecordStore, RecordStore, RemovedUser, UserRecord, UserRegistry};
