use crate::challenge::{
    CatalogError, ChallengeCatalog, ChallengeKind, ChallengeThresholds, CANONICAL_ORDER,
};
use crate::framing::{FramingValidator, DEFAULT_EDGE_INSET};
use crate::geometry::Rectangle;
use crate::session::SessionConfig;
use crate::types::{AxisConvention, CaptureRegion};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Margin subtracted from the region's shorter side to derive `max_face_size`.
pub const DEFAULT_FACE_SIZE_MARGIN: f32 = 20.0;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// User-facing liveness configuration, loaded from TOML and `LIVENESS_*`
/// environment variables. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LivenessConfig {
    /// Hold challenges while the face is off-center or too close.
    pub strict_framing: bool,
    pub axis_convention: AxisConvention,
    /// Total inset per axis applied to detector face boxes.
    pub edge_inset: f32,
    /// Explicit "too close" size; derived from the region when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_face_size: Option<f32>,
    pub face_size_margin: f32,
    pub challenge_order: Vec<ChallengeKind>,
    pub capture_region: Rectangle,
    pub thresholds: ChallengeThresholds,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            strict_framing: true,
            axis_convention: AxisConvention::Direct,
            edge_inset: DEFAULT_EDGE_INSET,
            max_face_size: None,
            face_size_margin: DEFAULT_FACE_SIZE_MARGIN,
            challenge_order: CANONICAL_ORDER.to_vec(),
            capture_region: Rectangle::new(0.0, 0.0, 400.0, 400.0),
            thresholds: ChallengeThresholds::default(),
        }
    }
}

impl LivenessConfig {
    /// Load from a TOML file. Missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&text)?;
        tracing::debug!(path = %path.display(), "liveness config loaded");
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Defaults with `LIVENESS_*` environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`. Unparseable values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let f32_var = |key: &str| lookup(key).and_then(|v| v.trim().parse::<f32>().ok());

        if let Some(v) = lookup("LIVENESS_STRICT_FRAMING") {
            match parse_bool(&v) {
                Some(strict) => self.strict_framing = strict,
                None => tracing::warn!(value = %v, "ignoring LIVENESS_STRICT_FRAMING"),
            }
        }
        if let Some(v) = lookup("LIVENESS_AXIS_CONVENTION") {
            match v.parse() {
                Ok(convention) => self.axis_convention = convention,
                Err(err) => tracing::warn!(error = %err, "ignoring LIVENESS_AXIS_CONVENTION"),
            }
        }
        if let Some(v) = f32_var("LIVENESS_EDGE_INSET") {
            self.edge_inset = v;
        }
        if let Some(v) = f32_var("LIVENESS_MAX_FACE_SIZE") {
            self.max_face_size = Some(v);
        }
        if let Some(v) = f32_var("LIVENESS_EYE_CLOSED_THRESHOLD") {
            self.thresholds.eye_closed = v;
        }
        if let Some(v) = f32_var("LIVENESS_LEFT_TURN_THRESHOLD") {
            self.thresholds.left_turn = v;
        }
        if let Some(v) = f32_var("LIVENESS_RIGHT_TURN_THRESHOLD") {
            self.thresholds.right_turn = v;
        }
        if let Some(v) = f32_var("LIVENESS_SMILE_THRESHOLD") {
            self.thresholds.smile = v;
        }
        self
    }

    pub fn capture_region(&self) -> CaptureRegion {
        match self.max_face_size {
            Some(size) => CaptureRegion::new(self.capture_region, size),
            None => CaptureRegion::with_margin(self.capture_region, self.face_size_margin),
        }
    }

    /// Validate and build the immutable settings shared by sessions.
    pub fn resolve(&self) -> Result<SessionConfig, ConfigError> {
        let rect = &self.capture_region;
        if !rect.is_finite() || rect.width <= 0.0 || rect.height <= 0.0 {
            return Err(invalid(
                "capture_region",
                format!("{rect:?} must have positive finite size"),
            ));
        }
        if !self.edge_inset.is_finite() || self.edge_inset < 0.0 {
            return Err(invalid(
                "edge_inset",
                format!("{} must be finite and >= 0", self.edge_inset),
            ));
        }
        let short_side = rect.width.min(rect.height);
        if self.edge_inset >= short_side {
            return Err(invalid(
                "edge_inset",
                format!(
                    "{} must be smaller than the capture region's shorter side ({short_side})",
                    self.edge_inset
                ),
            ));
        }
        let region = self.capture_region();
        if !region.max_face_size.is_finite() || region.max_face_size <= 0.0 {
            return Err(invalid(
                "max_face_size",
                format!("{} must be finite and > 0", region.max_face_size),
            ));
        }

        let t = &self.thresholds;
        let probabilities = [
            ("thresholds.eye_closed", t.eye_closed),
            ("thresholds.smile", t.smile),
        ];
        for (field, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(field, format!("{value} must be within [0, 1]")));
            }
        }
        if !t.left_turn.is_finite() || !t.right_turn.is_finite() || t.left_turn <= t.right_turn {
            return Err(invalid(
                "thresholds",
                format!(
                    "left_turn ({}) must be finite and greater than right_turn ({})",
                    t.left_turn, t.right_turn
                ),
            ));
        }

        let catalog = ChallengeCatalog::from_order(&self.challenge_order, &self.thresholds)?;

        Ok(SessionConfig {
            validator: FramingValidator::new(region, self.edge_inset),
            catalog,
            convention: self.axis_convention,
            strict_framing: self.strict_framing,
        })
    }
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { field, reason }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}
