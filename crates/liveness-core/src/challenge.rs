//! Challenge catalog: the ordered behavioral tests a subject must pass.

use crate::types::{AxisConvention, FrameObservation};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const DEFAULT_EYE_CLOSED_THRESHOLD: f32 = 0.5;
pub const DEFAULT_LEFT_TURN_THRESHOLD: f32 = 10.0;
pub const DEFAULT_RIGHT_TURN_THRESHOLD: f32 = -10.0;
pub const DEFAULT_SMILE_THRESHOLD: f32 = 0.5;

/// Canonical challenge order.
pub const CANONICAL_ORDER: [ChallengeKind; 5] = [
    ChallengeKind::Blink,
    ChallengeKind::BlinkOneEye(Side::Right),
    ChallengeKind::TurnHead(Side::Left),
    ChallengeKind::TurnHead(Side::Right),
    ChallengeKind::Smile,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeKind {
    Blink,
    BlinkOneEye(Side),
    TurnHead(Side),
    Smile,
}

impl ChallengeKind {
    pub fn default_instruction(&self) -> &'static str {
        match self {
            ChallengeKind::Blink => "Blink both eyes",
            ChallengeKind::BlinkOneEye(Side::Right) => "Close your right eye",
            ChallengeKind::BlinkOneEye(Side::Left) => "Close your left eye",
            ChallengeKind::TurnHead(Side::Left) => "Turn your head to the left",
            ChallengeKind::TurnHead(Side::Right) => "Turn your head to the right",
            ChallengeKind::Smile => "Smile",
        }
    }
}

impl fmt::Display for ChallengeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChallengeKind::Blink => f.write_str("blink"),
            ChallengeKind::BlinkOneEye(Side::Left) => f.write_str("blink_one_eye(left)"),
            ChallengeKind::BlinkOneEye(Side::Right) => f.write_str("blink_one_eye(right)"),
            ChallengeKind::TurnHead(Side::Left) => f.write_str("turn_head(left)"),
            ChallengeKind::TurnHead(Side::Right) => f.write_str("turn_head(right)"),
            ChallengeKind::Smile => f.write_str("smile"),
        }
    }
}

/// Per-kind numeric cutoffs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChallengeThresholds {
    /// An eye counts as closed at or below this open probability.
    pub eye_closed: f32,
    /// Signed yaw at or above this passes a left turn.
    pub left_turn: f32,
    /// Signed yaw at or below this passes a right turn (negative).
    pub right_turn: f32,
    /// Smile probability strictly above this passes.
    pub smile: f32,
}

impl Default for ChallengeThresholds {
    fn default() -> Self {
        Self {
            eye_closed: DEFAULT_EYE_CLOSED_THRESHOLD,
            left_turn: DEFAULT_LEFT_TURN_THRESHOLD,
            right_turn: DEFAULT_RIGHT_TURN_THRESHOLD,
            smile: DEFAULT_SMILE_THRESHOLD,
        }
    }
}

impl ChallengeThresholds {
    pub fn for_kind(&self, kind: ChallengeKind) -> f32 {
        match kind {
            ChallengeKind::Blink | ChallengeKind::BlinkOneEye(_) => self.eye_closed,
            ChallengeKind::TurnHead(Side::Left) => self.left_turn,
            ChallengeKind::TurnHead(Side::Right) => self.right_turn,
            ChallengeKind::Smile => self.smile,
        }
    }
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeSpec {
    pub kind: ChallengeKind,
    pub instruction_text: String,
    pub threshold: f32,
}

impl ChallengeSpec {
    pub fn new(kind: ChallengeKind, threshold: f32) -> Self {
        Self {
            kind,
            instruction_text: kind.default_instruction().to_string(),
            threshold,
        }
    }

    /// Does this frame satisfy the challenge under `convention`?
    pub fn is_satisfied(&self, observation: &FrameObservation, convention: AxisConvention) -> bool {
        let t = self.threshold;
        match self.kind {
            ChallengeKind::Blink => {
                observation.left_eye_open_probability <= t
                    && observation.right_eye_open_probability <= t
            }
            ChallengeKind::BlinkOneEye(side) => {
                // Preview channels are mirrored: the subject's right eye is on the left.
                let eyes = convention.eye_channels(observation);
                let (closing, open) = match side {
                    Side::Right => (eyes.left, eyes.right),
                    Side::Left => (eyes.right, eyes.left),
                };
                closing <= t && open > t
            }
            ChallengeKind::TurnHead(Side::Left) => {
                convention.signed_yaw(observation.head_yaw_angle_degrees) >= t
            }
            ChallengeKind::TurnHead(Side::Right) => {
                convention.signed_yaw(observation.head_yaw_angle_degrees) <= t
            }
            ChallengeKind::Smile => observation.smiling_probability > t,
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum CatalogError {
    #[error("challenge catalog is empty")]
    Empty,
    #[error("challenge {0} appears more than once")]
    Duplicate(ChallengeKind),
}

/// Ordered, non-empty, duplicate-free list of challenges.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChallengeCatalog {
    specs: Vec<ChallengeSpec>,
}

impl ChallengeCatalog {
    /// Canonical five-step catalog.
    pub fn canonical(thresholds: &ChallengeThresholds) -> Self {
        Self {
            specs: CANONICAL_ORDER
                .iter()
                .map(|&kind| ChallengeSpec::new(kind, thresholds.for_kind(kind)))
                .collect(),
        }
    }

    pub fn from_order(
        order: &[ChallengeKind],
        thresholds: &ChallengeThresholds,
    ) -> Result<Self, CatalogError> {
        let specs = order
            .iter()
            .map(|&kind| ChallengeSpec::new(kind, thresholds.for_kind(kind)))
            .collect();
        Self::from_specs(specs)
    }

    pub fn from_specs(specs: Vec<ChallengeSpec>) -> Result<Self, CatalogError> {
        if specs.is_empty() {
            return Err(CatalogError::Empty);
        }
        for (i, spec) in specs.iter().enumerate() {
            if specs[..i].iter().any(|s| s.kind == spec.kind) {
                return Err(CatalogError::Duplicate(spec.kind));
            }
        }
        Ok(Self { specs })
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Always false; construction rejects empty catalogs.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ChallengeSpec> {
        self.specs.get(index)
    }

    pub fn specs(&self) -> &[ChallengeSpec] {
        &self.specs
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChallengeSpec> {
        self.specs.iter()
    }
}

impl Default for ChallengeCatalog {
    fn default() -> Self {
        Self::canonical(&ChallengeThresholds::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rectangle;
    use rstest::rstest;

    fn face() -> FrameObservation {
        FrameObservation::new(Rectangle::new(100.0, 100.0, 200.0, 200.0))
    }

    fn spec(kind: ChallengeKind) -> ChallengeSpec {
        ChallengeSpec::new(kind, ChallengeThresholds::default().for_kind(kind))
    }

    #[test]
    fn test_canonical_order() {
        let catalog = ChallengeCatalog::default();
        let kinds: Vec<_> = catalog.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, CANONICAL_ORDER.to_vec());
        assert_eq!(catalog.get(3).unwrap().threshold, DEFAULT_RIGHT_TURN_THRESHOLD);
    }

    #[rstest]
    #[case(0.5, 0.5, true)]
    #[case(0.1, 0.2, true)]
    #[case(0.51, 0.1, false)]
    #[case(0.1, 0.9, false)]
    fn test_blink(#[case] left: f32, #[case] right: f32, #[case] expected: bool) {
        let obs = face().with_eyes(left, right);
        let blink = spec(ChallengeKind::Blink);
        assert_eq!(blink.is_satisfied(&obs, AxisConvention::Direct), expected);
        assert_eq!(blink.is_satisfied(&obs, AxisConvention::Mirrored), expected);
    }

    #[test]
    fn test_blink_right_eye_direct() {
        let wink = spec(ChallengeKind::BlinkOneEye(Side::Right));
        assert!(wink.is_satisfied(&face().with_eyes(0.1, 0.9), AxisConvention::Direct));
        assert!(!wink.is_satisfied(&face().with_eyes(0.9, 0.1), AxisConvention::Direct));
    }

    #[test]
    fn test_blink_right_eye_mirrored() {
        let wink = spec(ChallengeKind::BlinkOneEye(Side::Right));
        assert!(wink.is_satisfied(&face().with_eyes(0.9, 0.1), AxisConvention::Mirrored));
        assert!(!wink.is_satisfied(&face().with_eyes(0.1, 0.9), AxisConvention::Mirrored));
    }

    #[test]
    fn test_blink_one_eye_rejects_both_closed() {
        let wink = spec(ChallengeKind::BlinkOneEye(Side::Right));
        let obs = face().with_eyes(0.1, 0.1);
        assert!(!wink.is_satisfied(&obs, AxisConvention::Direct));
        assert!(!wink.is_satisfied(&obs, AxisConvention::Mirrored));
    }

    #[test]
    fn test_blink_left_eye_is_opposite_channel() {
        let wink = spec(ChallengeKind::BlinkOneEye(Side::Left));
        assert!(wink.is_satisfied(&face().with_eyes(0.9, 0.1), AxisConvention::Direct));
    }

    #[rstest]
    #[case(AxisConvention::Direct, 15.0, true, false)]
    #[case(AxisConvention::Direct, -15.0, false, true)]
    #[case(AxisConvention::Mirrored, 15.0, false, true)]
    #[case(AxisConvention::Mirrored, -15.0, true, false)]
    #[case(AxisConvention::Direct, 10.0, true, false)]
    #[case(AxisConvention::Direct, 5.0, false, false)]
    fn test_turn_head_by_convention(
        #[case] convention: AxisConvention,
        #[case] yaw: f32,
        #[case] passes_left: bool,
        #[case] passes_right: bool,
    ) {
        let obs = face().with_yaw(yaw);
        let left = spec(ChallengeKind::TurnHead(Side::Left));
        let right = spec(ChallengeKind::TurnHead(Side::Right));
        assert_eq!(left.is_satisfied(&obs, convention), passes_left);
        assert_eq!(right.is_satisfied(&obs, convention), passes_right);
    }

    #[test]
    fn test_smile_is_strict() {
        let smile = spec(ChallengeKind::Smile);
        assert!(!smile.is_satisfied(&face().with_smile(0.5), AxisConvention::Direct));
        assert!(smile.is_satisfied(&face().with_smile(0.51), AxisConvention::Direct));
    }

    #[test]
    fn test_custom_order() {
        let order = [ChallengeKind::Smile, ChallengeKind::Blink];
        let thresholds = ChallengeThresholds::default();
        let catalog = ChallengeCatalog::from_order(&order, &thresholds).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get(0).unwrap().kind, ChallengeKind::Smile);
    }

    #[test]
    fn test_empty_order_rejected() {
        let err = ChallengeCatalog::from_order(&[], &ChallengeThresholds::default()).unwrap_err();
        assert_eq!(err, CatalogError::Empty);
    }

    #[test]
    fn test_duplicate_rejected() {
        let order = [ChallengeKind::Blink, ChallengeKind::Smile, ChallengeKind::Blink];
        let thresholds = ChallengeThresholds::default();
        let err = ChallengeCatalog::from_order(&order, &thresholds).unwrap_err();
        assert_eq!(err, CatalogError::Duplicate(ChallengeKind::Blink));
    }

    #[test]
    fn test_kind_serde_names() {
        let json = serde_json::to_string(&ChallengeKind::TurnHead(Side::Left)).unwrap();
        assert_eq!(json, r#"{"turn_head":"left"}"#);
        let kind: ChallengeKind = serde_json::from_str(r#""blink""#).unwrap();
        assert_eq!(kind, ChallengeKind::Blink);
    }
}
