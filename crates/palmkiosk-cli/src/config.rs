use std::path::PathBuf;

use palmkiosk_config::{self as config_source, ResolvedConfig, ResolvedConfigWithSource};
use palmkiosk_core::palm::EnrollmentConfig;
use palmkiosk_core::{Kiosk, KioskConfig};
use serde::Serialize;
use tracing::debug;

use crate::cli::StoreArgs;
use crate::errors::{from_config_error, AppResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigReport {
    pub source: Option<PathBuf>,
    pub similarity_threshold: f64,
    pub samples_per_hand: u32,
    pub hand_switch_pause_millis: u64,
    pub registry_path: PathBuf,
    pub image_dir: PathBuf,
    pub template_size: u32,
}

impl From<&ResolvedConfigWithSource> for ConfigReport {
    fn from(settings: &ResolvedConfigWithSource) -> Self {
        let resolved = &settings.resolved;
        Self {
            source: settings.source.clone(),
            similarity_threshold: resolved.similarity_threshold,
            samples_per_hand: resolved.samples_per_hand,
            hand_switch_pause_millis: u64::try_from(resolved.hand_switch_pause.as_millis())
                .unwrap_or(u64::MAX),
            registry_path: resolved.registry_path.clone(),
            image_dir: resolved.image_dir.clone(),
            template_size: resolved.template_size,
        }
    }
}

pub fn show_config(store: &StoreArgs) -> AppResult<ConfigReport> {
    load_settings(store).map(|settings| ConfigReport::from(&settings))
}

/// Resolved config with command-line storage overrides applied.
pub fn load_settings(store: &StoreArgs) -> AppResult<ResolvedConfigWithSource> {
    load_settings_from(store, &config_source::default_sources())
}

pub fn load_settings_from(
    store: &StoreArgs,
    sources: &[PathBuf],
) -> AppResult<ResolvedConfigWithSource> {
    let mut settings =
        config_source::load_resolved_from_paths(sources).map_err(from_config_error)?;
    match &settings.source {
        Some(path) => debug!(source = %path.display(), "loaded configuration"),
        None => debug!("no configuration file found; using defaults"),
    }
    apply_overrides(&mut settings.resolved, store);
    Ok(settings)
}

pub fn apply_overrides(resolved: &mut ResolvedConfig, store: &StoreArgs) {
    if let Some(path) = &store.registry {
        resolved.registry_path = path.clone();
    }
    if let Some(dir) = &store.image_dir {
        resolved.image_dir = dir.clone();
    }
}

pub fn kiosk_config(resolved: &ResolvedConfig) -> KioskConfig {
    KioskConfig {
        enrollment: EnrollmentConfig {
            samples_per_hand: resolved.samples_per_hand,
            hand_switch_pause: resolved.hand_switch_pause,
        },
        threshold: resolved.similarity_threshold,
    }
}

pub fn open_kiosk(resolved: &ResolvedConfig) -> AppResult<Kiosk> {
    Kiosk::open(
        &resolved.registry_path,
        &resolved.image_dir,
        resolved.template_size,
        kiosk_config(resolved),
    )
}
