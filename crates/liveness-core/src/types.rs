use crate::geometry::Rectangle;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Neutral values substituted for non-finite observation fields.
const NEUTRAL_EYE_OPEN: f32 = 1.0;
const NEUTRAL_SMILE: f32 = 0.0;
const NEUTRAL_YAW: f32 = 0.0;

/// One camera frame's worth of face geometry from the external tracker.
///
/// Describes the single tracked face; `face_count` covers the whole frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameObservation {
    pub bounding_box: Rectangle,
    pub left_eye_open_probability: f32,
    pub right_eye_open_probability: f32,
    /// Raw tracker yaw; sign depends on the session's [`AxisConvention`].
    pub head_yaw_angle_degrees: f32,
    pub smiling_probability: f32,
    pub face_count: u32,
}

impl FrameObservation {
    /// A single, neutral face: eyes open, facing forward, not smiling.
    pub fn new(bounding_box: Rectangle) -> Self {
        Self {
            bounding_box,
            left_eye_open_probability: NEUTRAL_EYE_OPEN,
            right_eye_open_probability: NEUTRAL_EYE_OPEN,
            head_yaw_angle_degrees: NEUTRAL_YAW,
            smiling_probability: NEUTRAL_SMILE,
            face_count: 1,
        }
    }

    pub fn with_eyes(mut self, left_open: f32, right_open: f32) -> Self {
        self.left_eye_open_probability = left_open;
        self.right_eye_open_probability = right_open;
        self
    }

    pub fn with_yaw(mut self, degrees: f32) -> Self {
        self.head_yaw_angle_degrees = degrees;
        self
    }

    pub fn with_smile(mut self, probability: f32) -> Self {
        self.smiling_probability = probability;
        self
    }

    pub fn with_face_count(mut self, count: u32) -> Self {
        self.face_count = count;
        self
    }

    /// True if every field is finite and probabilities are within [0, 1].
    pub fn is_well_formed(&self) -> bool {
        let prob_ok = |p: f32| (0.0..=1.0).contains(&p);
        self.bounding_box.is_finite()
            && self.bounding_box.width >= 0.0
            && self.bounding_box.height >= 0.0
            && prob_ok(self.left_eye_open_probability)
            && prob_ok(self.right_eye_open_probability)
            && prob_ok(self.smiling_probability)
            && self.head_yaw_angle_degrees.is_finite()
    }

    /// Copy with probabilities clamped to [0, 1] and non-finite values
    /// replaced by neutral ones, so NaN can never satisfy a challenge.
    ///
    /// A non-finite bounding box is kept as-is; the framing validator
    /// rejects it rather than treating it as a point at the origin.
    pub fn sanitized(&self) -> Self {
        let prob = |p: f32, neutral: f32| if p.is_finite() { p.clamp(0.0, 1.0) } else { neutral };
        let bbox = &self.bounding_box;
        Self {
            bounding_box: if bbox.is_finite() {
                Rectangle::new(bbox.min_x, bbox.min_y, bbox.width, bbox.height)
            } else {
                *bbox
            },
            left_eye_open_probability: prob(self.left_eye_open_probability, NEUTRAL_EYE_OPEN),
            right_eye_open_probability: prob(self.right_eye_open_probability, NEUTRAL_EYE_OPEN),
            head_yaw_angle_degrees: if self.head_yaw_angle_degrees.is_finite() {
                self.head_yaw_angle_degrees
            } else {
                NEUTRAL_YAW
            },
            smiling_probability: prob(self.smiling_probability, NEUTRAL_SMILE),
            face_count: self.face_count,
        }
    }
}

/// On-screen region the face must sit inside, plus the "too close" size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaptureRegion {
    pub rect: Rectangle,
    /// Inset face boxes at least this large on both axes are too close.
    pub max_face_size: f32,
}

impl CaptureRegion {
    pub fn new(rect: Rectangle, max_face_size: f32) -> Self {
        Self { rect, max_face_size }
    }

    /// Derive the size threshold as the region's shorter side minus `margin`.
    pub fn with_margin(rect: Rectangle, margin: f32) -> Self {
        Self {
            rect,
            max_face_size: rect.width.min(rect.height) - margin,
        }
    }
}

/// How raw tracker output maps onto the subject's movements.
///
/// Front-camera pipelines differ in whether yaw and eye channels arrive
/// mirrored; the camera layer resolves this once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisConvention {
    /// Use the tracker's values as reported.
    #[default]
    Direct,
    /// Negate yaw and swap the eye channels.
    Mirrored,
}

/// Eye-open probabilities in preview orientation.
///
/// The preview is a mirror image, so `left` is the subject's right eye.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeChannels {
    pub left: f32,
    pub right: f32,
}

impl AxisConvention {
    /// Yaw in the engine's frame: positive is a turn to the preview's left.
    pub fn signed_yaw(self, raw_degrees: f32) -> f32 {
        match self {
            AxisConvention::Direct => raw_degrees,
            AxisConvention::Mirrored => -raw_degrees,
        }
    }

    pub fn eye_channels(self, observation: &FrameObservation) -> EyeChannels {
        let (left, right) = (
            observation.left_eye_open_probability,
            observation.right_eye_open_probability,
        );
        match self {
            AxisConvention::Direct => EyeChannels { left, right },
            AxisConvention::Mirrored => EyeChannels {
                left: right,
                right: left,
            },
        }
    }
}

impl fmt::Display for AxisConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisConvention::Direct => f.write_str("direct"),
            AxisConvention::Mirrored => f.write_str("mirrored"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown axis convention {0:?} (expected \"direct\" or \"mirrored\")")]
pub struct ParseConventionError(String);

impl FromStr for AxisConvention {
    type Err = ParseConventionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(AxisConvention::Direct),
            "mirrored" => Ok(AxisConvention::Mirrored),
            other => Err(ParseConventionError(other.to_string())),
        }
    }
}
