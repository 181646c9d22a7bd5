use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub const PRIMARY_CONFIG_PATH: &str = "/etc/palmkiosk/config.toml";
pub const SECONDARY_CONFIG_PATH: &str = "/usr/local/etc/palmkiosk/config.toml";
pub const DATA_DIR_ENV: &str = "PALMKIOSK_DATA_DIR";
pub const DEFAULT_DATA_DIR: &str = "/var/lib/palmkiosk";
pub const DEFAULT_REGISTRY_FILE: &str = "user_data.json";
pub const DEFAULT_IMAGE_DIR: &str = "local_images";
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.5;
pub const DEFAULT_SAMPLES_PER_HAND: u32 = 10;
pub const DEFAULT_HAND_SWITCH_PAUSE_MILLIS: u64 = 0;
pub const DEFAULT_TEMPLATE_SIZE: u32 = 64;
pub const MIN_TEMPLATE_SIZE: u32 = 8;

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub similarity_threshold: Option<f64>,
    pub samples_per_hand: Option<u32>,
    pub hand_switch_pause_millis: Option<u64>,
    pub registry_path: Option<PathBuf>,
    pub image_dir: Option<PathBuf>,
    pub template_size: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub similarity_threshold: f64,
    pub samples_per_hand: u32,
    pub hand_switch_pause: Duration,
    pub registry_path: PathBuf,
    pub image_dir: PathBuf,
    pub template_size: u32,
}

impl ResolvedConfig {
    pub fn from_raw(raw: ConfigFile) -> Self {
        Self::from_raw_with_data_dir(raw, &default_data_dir())
    }

    pub fn from_raw_with_data_dir(raw: ConfigFile, data_dir: &Path) -> Self {
        let threshold = raw
            .similarity_threshold
            .filter(|value| value.is_finite())
            .unwrap_or(DEFAULT_SIMILARITY_THRESHOLD)
            .clamp(0.0, 1.0);
        Self {
            similarity_threshold: threshold,
            samples_per_hand: raw
                .samples_per_hand
                .unwrap_or(DEFAULT_SAMPLES_PER_HAND)
                .max(1),
            hand_switch_pause: Duration::from_millis(
                raw.hand_switch_pause_millis
                    .unwrap_or(DEFAULT_HAND_SWITCH_PAUSE_MILLIS),
            ),
            registry_path: raw
                .registry_path
                .unwrap_or_else(|| data_dir.join(DEFAULT_REGISTRY_FILE)),
            image_dir: raw
                .image_dir
                .unwrap_or_else(|| data_dir.join(DEFAULT_IMAGE_DIR)),
            template_size: raw
                .template_size
                .unwrap_or(DEFAULT_TEMPLATE_SIZE)
                .max(MIN_TEMPLATE_SIZE),
        }
    }
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self::from_raw(ConfigFile::default())
    }
}

fn default_data_dir() -> PathBuf {
    env::var_os(DATA_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

/// Resolved settings and the file they came from, if any.
#[derive(Debug, Clone)]
pub struct ResolvedConfigWithSource {
    pub resolved: ResolvedConfig,
    pub source: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

pub fn default_sources() -> [PathBuf; 2] {
    [
        PathBuf::from(PRIMARY_CONFIG_PATH),
        PathBuf::from(SECONDARY_CONFIG_PATH),
    ]
}

/// First file in `paths` that exists, parsed. Absent files are skipped;
/// any other read failure stops the search.
fn find_config(paths: &[PathBuf]) -> Result<Option<(PathBuf, ConfigFile)>, ConfigError> {
    let Some((path, contents)) = first_readable(paths)? else {
        return Ok(None);
    };
    let raw = parse_config(&path, &contents)?;
    Ok(Some((path, raw)))
}

fn parse_config(path: &Path, contents: &str) -> Result<ConfigFile, ConfigError> {
    toml::from_str(contents).map_err(|err| ConfigError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

pub fn load_resolved_from_paths(
    paths: &[PathBuf],
) -> Result<ResolvedConfigWithSource, ConfigError> {
    let (source, raw) = match find_config(paths)? {
        Some((path, raw)) => (Some(path), raw),
        None => (None, ConfigFile::default()),
    };
    Ok(ResolvedConfigWithSource {
        resolved: ResolvedConfig::from_raw(raw),
        source,
    })
}

fn first_readable(paths: &[PathBuf]) -> Result<Option<(PathBuf, String)>, ConfigError> {
    for path in paths {
        match fs::read_to_string(path) {
            Ok(contents) => return Ok(Some((path.clone(), contents))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.clone(),
                    source,
                })
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn earlier_source_shadows_later_ones() {
        let dir = tempdir().unwrap();
        let primary = dir.path().join("primary.toml");
        let secondary = dir.path().join("secondary.toml");
        fs::write(&primary, "samples_per_hand = 5").unwrap();
        fs::write(&secondary, "samples_per_hand = 2").unwrap();

        let (path, raw) = find_config(&[primary.clone(), secondary]).unwrap().unwrap();
        assert_eq!(path, primary);
        assert_eq!(raw.samples_per_hand, Some(5));
    }

    #[test]
    fn absent_files_are_skipped() {
        let dir = tempdir().unwrap();
        let secondary = dir.path().join("secondary.toml");
        fs::write(&secondary, "image_dir = \"/srv/palms\"").unwrap();

        let settings =
            load_resolved_from_paths(&[dir.path().join("absent.toml"), secondary.clone()])
                .unwrap();
        assert_eq!(settings.source, Some(secondary));
        assert_eq!(settings.resolved.image_dir, PathBuf::from("/srv/palms"));
    }

    #[test]
    fn malformed_and_unknown_keys_name_the_file() {
        let dir = tempdir().unwrap();
        let malformed = dir.path().join("malformed.toml");
        let typo = dir.path().join("typo.toml");
        fs::write(&malformed, "registry_path = { nested = true }").unwrap();
        fs::write(&typo, "similarity_treshold = 0.7").unwrap();

        for path in [malformed, typo] {
            match find_config(&[path.clone()]).unwrap_err() {
                ConfigError::Parse { path: reported, .. } => assert_eq!(reported, path),
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn unreadable_source_stops_the_search() {
        let dir = tempdir().unwrap();
        let directory = dir.path().join("config.toml");
        fs::create_dir_all(&directory).unwrap();
        let fallback = dir.path().join("fallback.toml");
        fs::write(&fallback, "").unwrap();

        match find_config(&[directory.clone(), fallback]).unwrap_err() {
            ConfigError::Read { path, .. } => assert_eq!(path, directory),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn no_source_yields_defaults() {
        let settings = load_resolved_from_paths(&[]).unwrap();
        assert!(settings.source.is_none());
        let resolved = settings.resolved;
        assert_eq!(resolved.similarity_threshold, DEFAULT_SIMILARITY_THRESHOLD);
        assert_eq!(resolved.samples_per_hand, DEFAULT_SAMPLES_PER_HAND);
        assert_eq!(resolved.hand_switch_pause, Duration::ZERO);
        assert_eq!(resolved.template_size, DEFAULT_TEMPLATE_SIZE);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let raw = ConfigFile {
            similarity_threshold: Some(1.7),
            samples_per_hand: Some(0),
            hand_switch_pause_millis: Some(5000),
            template_size: Some(2),
            ..ConfigFile::default()
        };
        let resolved = ResolvedConfig::from_raw_with_data_dir(raw, Path::new("/data"));
        assert_eq!(resolved.similarity_threshold, 1.0);
        assert_eq!(resolved.samples_per_hand, 1);
        assert_eq!(resolved.hand_switch_pause, Duration::from_secs(5));
        assert_eq!(resolved.template_size, MIN_TEMPLATE_SIZE);
    }

    #[test]
    fn storage_paths_default_under_the_data_dir() {
        let resolved = ResolvedConfig::from_raw_with_data_dir(ConfigFile::default(), Path::new("/data"));
        assert_eq!(resolved.registry_path, PathBuf::from("/data/user_data.json"));
        assert_eq!(resolved.image_dir, PathBuf::from("/data/local_images"));

        let explicit = ConfigFile {
            registry_path: Some(PathBuf::from("/srv/users.json")),
            ..ConfigFile::default()
        };
        let resolved = ResolvedConfig::from_raw_with_data_dir(explicit, Path::new("/data"));
        assert_eq!(resolved.registry_path, PathBuf::from("/srv/users.json"));
    }
}
