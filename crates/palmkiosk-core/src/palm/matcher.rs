use image::imageops::{self, FilterType};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::errors::{AppError, AppResult};
use crate::palm::assets::ImageAssetStore;
use crate::palm::registry::{RecordStore, UserRecord, UserRegistry};

pub const DEFAULT_THRESHOLD: f64 = 0.5;
pub const DEFAULT_TEMPLATE_SIZE: u32 = 64;

/// Pluggable `(probe, template) -> [0, 1]` contract. Features are extracted
/// once per image so the probe is decoded a single time per match.
pub trait SimilarityMetric {
    type Features;

    fn extract(&self, image: &[u8]) -> AppResult<Self::Features>;
    fn similarity(&self, probe: &Self::Features, template: &Self::Features) -> f64;
}

/// Normalized cross-correlation of grayscale images scaled to a fixed square.
/// Anti-correlated and featureless images score 0.
#[derive(Debug, Clone, Copy)]
pub struct GrayscaleCorrelation {
    side: u32,
}

impl GrayscaleCorrelation {
    pub fn new(side: u32) -> Self {
        Self { side: side.max(1) }
    }
}

impl Default for GrayscaleCorrelation {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE_SIZE)
    }
}

impl SimilarityMetric for GrayscaleCorrelation {
    type Features = Vec<f64>;

    fn extract(&self, image: &[u8]) -> AppResult<Vec<f64>> {
        let decoded = image::load_from_memory(image)
            .map_err(|err| AppError::CaptureFailure(format!("undecodable image: {err}")))?;
        let gray = decoded.to_luma8();
        let scaled = imageops::resize(&gray, self.side, self.side, FilterType::Triangle);

        let values: Vec<f64> = scaled.pixels().map(|pixel| f64::from(pixel.0[0])).collect();
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        Ok(values.into_iter().map(|value| value - mean).collect())
    }

    fn similarity(&self, probe: &Vec<f64>, template: &Vec<f64>) -> f64 {
        if probe.len() != template.len() {
            return 0.0;
        }
        cosine_similarity(probe, template).clamp(0.0, 1.0)
    }
}

/// Cosine of the angle between two vectors; 0 when either has no magnitude.
pub fn cosine_similarity(lhs: &[f64], rhs: &[f64]) -> f64 {
    let mut dot = 0.0;
    let mut norm_lhs = 0.0;
    let mut norm_rhs = 0.0;

    for (l, r) in lhs.iter().zip(rhs.iter()) {
        dot += l * r;
        norm_lhs += l * l;
        norm_rhs += r * r;
    }

    let denominator = norm_lhs.sqrt() * norm_rhs.sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        return 0.0;
    }
    dot / denominator
}

/// Read-only view of the registry handed to the matcher.
pub struct RegistrySnapshot<'a, A> {
    pub users: &'a [UserRecord],
    pub assets: &'a A,
}

impl<R: RecordStore, A: ImageAssetStore> UserRegistry<R, A> {
    pub fn snapshot(&self) -> RegistrySnapshot<'_, A> {
        RegistrySnapshot {
            users: self.users(),
            assets: self.assets(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserScore {
    pub id: String,
    pub score: f64,
    pub templates: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub candidate: Option<Candidate>,
    pub score: f64,
    pub is_match: bool,
    /// Users with at least one readable template, best first; ties keep
    /// registry order.
    pub ranking: Vec<UserScore>,
}

impl MatchResult {
    pub fn no_match(score: f64) -> Self {
        Self {
            candidate: None,
            score,
            is_match: false,
            ranking: Vec::new(),
        }
    }
}

pub struct MatchingEngine<M = GrayscaleCorrelation> {
    metric: M,
}

impl<M: SimilarityMetric> MatchingEngine<M> {
    pub fn new(metric: M) -> Self {
        Self { metric }
    }

    pub fn metric(&self) -> &M {
        &self.metric
    }

    /// Decodes a live image. Failures are reported as `CaptureFailure` and the
    /// match must not run.
    pub fn prepare_probe(&self, bytes: &[u8]) -> AppResult<M::Features> {
        if bytes.is_empty() {
            return Err(AppError::CaptureFailure("empty probe image".into()));
        }
        self.metric.extract(bytes).map_err(|err| match err {
            AppError::CaptureFailure(message) => AppError::CaptureFailure(message),
            other => AppError::CaptureFailure(other.to_string()),
        })
    }

    /// Scores the probe against every user: per-user score is the mean over
    /// readable templates, the best strictly-greater score wins, and the
    /// result is a match only when that score exceeds `threshold`.
    pub fn match_probe<A: ImageAssetStore>(
        &self,
        probe: &M::Features,
        snapshot: &RegistrySnapshot<'_, A>,
        threshold: f64,
    ) -> MatchResult {
        let mut ranking = Vec::with_capacity(snapshot.users.len());
        let mut best: Option<(usize, f64)> = None;

        for (index, user) in snapshot.users.iter().enumerate() {
            let Some((score, templates)) = self.score_user(probe, user, snapshot.assets) else {
                continue;
            };
            debug!(id = %user.id, score, templates, "scored user");
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((index, score));
            }
            ranking.push(UserScore {
                id: user.id.clone(),
                score,
                templates,
            });
        }

        ranking.sort_by(|a, b| b.score.total_cmp(&a.score));

        let score = best.map(|(_, score)| score).unwrap_or(0.0);
        let is_match = best.is_some() && score > threshold;
        let candidate = best.filter(|_| is_match).map(|(index, _)| {
            let user = &snapshot.users[index];
            Candidate {
                id: user.id.clone(),
                name: user.name.clone(),
            }
        });

        info!(
            users = snapshot.users.len(),
            score,
            threshold,
            is_match,
            "completed probe match"
        );

        MatchResult {
            candidate,
            score,
            is_match,
            ranking,
        }
    }

    pub fn match_bytes<A: ImageAssetStore>(
        &self,
        probe: &[u8],
        snapshot: &RegistrySnapshot<'_, A>,
        threshold: f64,
    ) -> AppResult<MatchResult> {
        let features = self.prepare_probe(probe)?;
        Ok(self.match_probe(&features, snapshot, threshold))
    }

    fn score_user<A: ImageAssetStore>(
        &self,
        probe: &M::Features,
        user: &UserRecord,
        assets: &A,
    ) -> Option<(f64, usize)> {
        let mut total = 0.0;
        let mut templates = 0usize;

        for image in &user.images {
            let template = match assets
                .load(&image.path)
                .and_then(|bytes| self.metric.extract(&bytes))
            {
                Ok(template) => template,
                Err(err) => {
                    warn!(id = %user.id, path = %image.path.display(), error = %err, "skipping unreadable template");
                    continue;
                }
            };
            let similarity = self.metric.similarity(probe, &template);
            if !similarity.is_finite() {
                warn!(id = %user.id, path = %image.path.display(), "skipping non-finite similarity");
                continue;
            }
            total += similarity.clamp(0.0, 1.0);
            templates += 1;
        }

        (templates > 0).then(|| (total / templates as f64, templates))
    }
}

impl Default for MatchingEngine<GrayscaleCorrelation> {
    fn default() -> Self {
        Self::new(GrayscaleCorrelation::default())
    }
}
