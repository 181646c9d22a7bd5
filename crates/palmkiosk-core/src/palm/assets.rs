use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::errors::{AppError, AppResult};

const ASSET_EXTENSION: &str = "png";

/// Which palm a sample belongs to. Display labels in any language normalize
/// onto these two values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Hand::Left => "left",
            Hand::Right => "right",
        }
    }
}

impl fmt::Display for Hand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Hand {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "left" | "l" | "左" | "左手" => Ok(Hand::Left),
            "right" | "r" | "右" | "右手" => Ok(Hand::Right),
            other => Err(format!("unknown hand label '{other}'")),
        }
    }
}

/// Logical asset name `{id}_{hand}_{sequence}`; sequences start at 1.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetName {
    pub id: String,
    pub hand: Hand,
    pub sequence: u32,
}

impl AssetName {
    pub fn new(id: impl Into<String>, hand: Hand, sequence: u32) -> Self {
        Self {
            id: id.into(),
            hand,
            sequence,
        }
    }

    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}.{ASSET_EXTENSION}",
            self.id, self.hand, self.sequence
        )
    }

    /// Recovers the logical name from an asset path, ignoring its directory.
    pub fn from_path(path: &Path) -> Option<Self> {
        if path.extension().and_then(|ext| ext.to_str()) != Some(ASSET_EXTENSION) {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        let mut parts = stem.rsplitn(3, '_');
        let sequence = parts.next()?.parse::<u32>().ok()?;
        let hand = parts.next()?.parse::<Hand>().ok()?;
        let id = parts.next()?;
        if id.is_empty() || sequence == 0 {
            return None;
        }
        Some(Self::new(id, hand, sequence))
    }
}

impl fmt::Display for AssetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.id, self.hand, self.sequence)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetRemoval {
    Removed,
    Missing,
}

pub trait ImageAssetStore {
    /// Persists `bytes` under `name` and returns the resulting path. Never
    /// overwrites an existing asset.
    fn save(&self, bytes: &[u8], name: &AssetName) -> AppResult<PathBuf>;
    fn load(&self, path: &Path) -> AppResult<Vec<u8>>;
    fn delete(&self, path: &Path) -> AppResult<AssetRemoval>;
}

#[derive(Debug, Clone)]
pub struct FilesystemAssetStore {
    dir: PathBuf,
}

impl FilesystemAssetStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &AssetName) -> PathBuf {
        self.dir.join(name.file_name())
    }
}

impl ImageAssetStore for FilesystemAssetStore {
    fn save(&self, bytes: &[u8], name: &AssetName) -> AppResult<PathBuf> {
        let path = self.path_for(name);
        fs::create_dir_all(&self.dir).map_err(|source| AppError::AssetWrite {
            path: self.dir.clone(),
            source,
        })?;

        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(|source| AppError::AssetWrite {
            path: path.clone(),
            source,
        })?;
        tmp.write_all(bytes)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|source| AppError::AssetWrite {
                path: path.clone(),
                source,
            })?;

        tmp.persist_noclobber(&path).map_err(|err| {
            if err.error.kind() == io::ErrorKind::AlreadyExists {
                AppError::AssetCollision { path: path.clone() }
            } else {
                AppError::AssetWrite {
                    path: path.clone(),
                    source: err.error,
                }
            }
        })?;

        debug!(asset = %name, path = %path.display(), bytes = bytes.len(), "saved image asset");
        Ok(path)
    }

    fn load(&self, path: &Path) -> AppResult<Vec<u8>> {
        fs::read(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                AppError::AssetNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                AppError::AssetRead {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })
    }

    fn delete(&self, path: &Path) -> AppResult<AssetRemoval> {
        match fs::remove_file(path) {
            Ok(()) => Ok(AssetRemoval::Removed),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(AssetRemoval::Missing),
            Err(source) => Err(AppError::AssetDelete {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}
