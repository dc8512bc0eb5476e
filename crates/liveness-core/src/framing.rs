//! Framing validation: is exactly one face inside the capture region at a
//! sensible distance?

use crate::geometry::Rectangle;
use crate::types::{CaptureRegion, FrameObservation};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default total inset per axis applied to detector boxes.
pub const DEFAULT_EDGE_INSET: f32 = 65.0;

/// Classification of one observation against the capture region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FramingResult {
    /// Zero faces or more than one face in the frame.
    NoSingleFace,
    /// The inset face box crosses the capture region boundary.
    NotFramed,
    /// The inset face box reaches the maximum size on both axes.
    TooClose,
    Framed,
}

impl fmt::Display for FramingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FramingResult::NoSingleFace => "no_single_face",
            FramingResult::NotFramed => "not_framed",
            FramingResult::TooClose => "too_close",
            FramingResult::Framed => "framed",
        };
        f.write_str(s)
    }
}

/// Classifies observations against a fixed capture region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FramingValidator {
    region: CaptureRegion,
    /// Total shrink per axis; detector boxes are loose at the edges.
    edge_inset: f32,
}

impl FramingValidator {
    pub fn new(region: CaptureRegion, edge_inset: f32) -> Self {
        Self { region, edge_inset }
    }

    pub fn region(&self) -> &CaptureRegion {
        &self.region
    }

    pub fn edge_inset(&self) -> f32 {
        self.edge_inset
    }

    /// The face box after the edge inset is applied.
    pub fn inner_box(&self, bounding_box: &Rectangle) -> Rectangle {
        bounding_box.inset(self.edge_inset)
    }

    pub fn classify(&self, observation: &FrameObservation) -> FramingResult {
        if observation.face_count != 1 {
            return FramingResult::NoSingleFace;
        }
        if !observation.bounding_box.is_finite() {
            return FramingResult::NotFramed;
        }

        let inner = self.inner_box(&observation.bounding_box);
        if !self.region.rect.contains(&inner) {
            return FramingResult::NotFramed;
        }
        if inner.is_at_least(self.region.max_face_size) {
            return FramingResult::TooClose;
        }
        FramingResult::Framed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn validator() -> FramingValidator {
        let region = CaptureRegion::new(Rectangle::new(0.0, 0.0, 400.0, 400.0), 300.0);
        FramingValidator::new(region, DEFAULT_EDGE_INSET)
    }

    fn face_at(x: f32, y: f32, w: f32, h: f32) -> FrameObservation {
        FrameObservation::new(Rectangle::new(x, y, w, h))
    }

    #[rstest]
    #[case(0)]
    #[case(2)]
    #[case(7)]
    fn test_face_count_other_than_one(#[case] count: u32) {
        let obs = face_at(100.0, 100.0, 200.0, 200.0).with_face_count(count);
        assert_eq!(validator().classify(&obs), FramingResult::NoSingleFace);
    }

    #[test]
    fn test_centered_face_is_framed() {
        let obs = face_at(100.0, 100.0, 200.0, 200.0);
        assert_eq!(validator().classify(&obs), FramingResult::Framed);
    }

    #[test]
    fn test_inset_absorbs_loose_edges() {
        // Raw box spills 30px past the left edge; inset pulls it back in.
        let obs = face_at(-30.0, 100.0, 200.0, 200.0);
        assert_eq!(validator().classify(&obs), FramingResult::Framed);
    }

    #[rstest]
    #[case(-60.0, 100.0)]
    #[case(260.0, 100.0)]
    #[case(100.0, -60.0)]
    #[case(100.0, 260.0)]
    fn test_off_center_is_not_framed(#[case] x: f32, #[case] y: f32) {
        let obs = face_at(x, y, 200.0, 200.0);
        assert_eq!(validator().classify(&obs), FramingResult::NotFramed);
    }

    #[test]
    fn test_oversized_face_is_too_close() {
        // Inner box 335 x 335 stays inside the region but exceeds 300.
        let obs = face_at(0.0, 0.0, 400.0, 400.0);
        assert_eq!(validator().classify(&obs), FramingResult::TooClose);
    }

    #[test]
    fn test_wide_short_face_is_not_too_close() {
        let obs = face_at(0.0, 50.0, 400.0, 250.0);
        assert_eq!(validator().classify(&obs), FramingResult::Framed);
    }

    #[test]
    fn test_not_framed_wins_over_too_close() {
        let obs = face_at(-100.0, -100.0, 600.0, 600.0);
        assert_eq!(validator().classify(&obs), FramingResult::NotFramed);
    }

    #[test]
    fn test_non_finite_box_is_not_framed() {
        let obs = FrameObservation::new(Rectangle {
            min_x: f32::NAN,
            min_y: f32::NAN,
            width: f32::INFINITY,
            height: f32::NAN,
        });
        assert_eq!(validator().classify(&obs), FramingResult::NotFramed);
    }

    #[test]
    fn test_inner_box_applies_inset() {
        let inner = validator().inner_box(&Rectangle::new(0.0, 0.0, 165.0, 165.0));
        assert_eq!(inner, Rectangle::new(32.5, 32.5, 100.0, 100.0));
    }
}
