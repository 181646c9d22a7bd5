use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use thiserror::Error;

use crate::palm::assets::Hand;

/// Coarse classification used by callers deciding how to react to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Conflict,
    NotFound,
    State,
    Capture,
    Io,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid id '{id}': {message}")]
    InvalidId { id: String, message: String },

    #[error("invalid name '{name}': {message}")]
    InvalidName { name: String, message: String },

    #[error("image path {path} does not follow the {{id}}_{{hand}}_{{sequence}}.png convention")]
    InvalidImageName { path: PathBuf },

    #[error("user {id} is already registered")]
    AlreadyExists { id: String },

    #[error("user {id} already has a {hand} image with sequence {sequence}")]
    DuplicateImage {
        id: String,
        hand: Hand,
        sequence: u32,
    },

    #[error("image asset {path} already exists")]
    AssetCollision { path: PathBuf },

    #[error("no user with id {id} is registered")]
    UserNotFound { id: String },

    #[error("image asset {path} not found")]
    AssetNotFound { path: PathBuf },

    #[error("an enrollment session for {id} is already active")]
    SessionActive { id: String },

    #[error("cannot {action} while the enrollment session is {state}")]
    InvalidSessionState { action: &'static str, state: String },

    #[error("capture failed: {0}")]
    CaptureFailure(String),

    #[error("failed to write image asset {path}: {source}")]
    AssetWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read image asset {path}: {source}")]
    AssetRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to delete image asset {path}: {source}")]
    AssetDelete {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write user registry {path}: {source}")]
    RegistryWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read user registry {path}: {source}")]
    RegistryRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("user registry {path} is invalid: {message}")]
    InvalidRegistryFile { path: PathBuf, message: String },

    #[error("failed to read frame source {path}: {source}")]
    FrameRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read configuration file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration file {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::InvalidId { .. }
            | AppError::InvalidName { .. }
            | AppError::InvalidImageName { .. }
            | AppError::ConfigParse { .. } => ErrorCategory::Validation,
            AppError::AlreadyExists { .. }
            | AppError::DuplicateImage { .. }
            | AppError::AssetCollision { .. } => ErrorCategory::Conflict,
            AppError::UserNotFound { .. } | AppError::AssetNotFound { .. } => {
                ErrorCategory::NotFound
            }
            AppError::SessionActive { .. } | AppError::InvalidSessionState { .. } => {
                ErrorCategory::State
            }
            AppError::CaptureFailure(_) => ErrorCategory::Capture,
            AppError::AssetWrite { .. }
            | AppError::AssetRead { .. }
            | AppError::AssetDelete { .. }
            | AppError::RegistryWrite { .. }
            | AppError::RegistryRead { .. }
            | AppError::InvalidRegistryFile { .. }
            | AppError::FrameRead { .. }
            | AppError::ConfigRead { .. }
            | AppError::Io(_)
            | AppError::Serialization(_) => ErrorCategory::Io,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        match self.category() {
            ErrorCategory::Validation | ErrorCategory::Capture => ExitCode::from(2),
            ErrorCategory::Conflict | ErrorCategory::State => ExitCode::from(3),
            ErrorCategory::NotFound => ExitCode::from(4),
            ErrorCategory::Io => ExitCode::from(1),
        }
    }

    pub fn human_message(&self) -> String {
        self.to_string()
    }
}

pub type AppResult<T> = Result<T, AppError>;
