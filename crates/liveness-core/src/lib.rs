//! liveness-core — Liveness verification for selfie capture.
//!
//! Classifies per-frame face observations against a capture region and
//! walks an ordered set of behavioral challenges (blink, one-eyed blink,
//! head turns, smile). Passing the final challenge fires the capture
//! trigger exactly once.

pub mod challenge;
pub mod config;
pub mod framing;
pub mod geometry;
pub mod session;
pub mod trace;
pub mod trigger;
pub mod types;

pub use challenge::{ChallengeCatalog, ChallengeKind, ChallengeSpec, ChallengeThresholds, Side};
pub use config::{ConfigError, LivenessConfig};
pub use framing::{FramingResult, FramingValidator};
pub use geometry::{contains, Rectangle};
pub use session::{Instruction, LivenessSession, SessionConfig, SessionStatus, StepOutput};
pub use trigger::CaptureTrigger;
pub use types::{AxisConvention, CaptureRegion, FrameObservation};
