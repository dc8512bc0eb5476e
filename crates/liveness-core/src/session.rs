//! Liveness session: the per-frame challenge state machine.
//!
//! A session walks the challenge catalog one step at a time. Each frame
//! either advances the current challenge, holds it (framing problem or the
//! predicate not met), or resets to the first challenge when the subject is
//! lost or a second face appears. Passing the last challenge fires the
//! capture trigger exactly once; the session is then terminal until
//! [`LivenessSession::reset`] is called.

use crate::challenge::{ChallengeCatalog, ChallengeKind, ChallengeSpec};
use crate::framing::{FramingResult, FramingValidator};
use crate::trigger::CaptureTrigger;
use crate::types::{AxisConvention, FrameObservation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Immutable per-session settings; shareable across sessions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionConfig {
    pub validator: FramingValidator,
    pub catalog: ChallengeCatalog,
    pub convention: AxisConvention,
    /// When false, `NotFramed` and `TooClose` are ignored and challenges
    /// are evaluated regardless of framing.
    pub strict_framing: bool,
}

/// Guidance key for the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Instruction {
    PositionFace,
    TooClose,
    KeepStill,
    ChallengePrompt(ChallengeKind),
    Verified,
}

impl Instruction {
    pub fn default_text(&self) -> &'static str {
        match self {
            Instruction::PositionFace => "Position your face in the circle",
            Instruction::TooClose => "You're too close, move back",
            Instruction::KeepStill => "Keep still and perform the following",
            Instruction::ChallengePrompt(kind) => kind.default_instruction(),
            Instruction::Verified => "Verified",
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.default_text())
    }
}

/// Result of feeding one observation to a session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepOutput {
    pub instruction: Instruction,
    pub framing: FramingResult,
    /// Challenge index after this step; equals the catalog length once verified.
    pub index: usize,
    /// The active challenge passed on this frame.
    pub advanced: bool,
    /// Progress was discarded on this frame.
    pub reset: bool,
    /// This frame completed the sequence and fired the capture trigger.
    pub verified_now: bool,
}

/// Serializable snapshot of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub index: usize,
    pub total: usize,
    pub verified: bool,
    pub current_challenge: Option<ChallengeKind>,
    pub framed_and_still: bool,
}

pub struct LivenessSession {
    config: Arc<SessionConfig>,
    trigger: Box<dyn CaptureTrigger + Send>,
    index: usize,
    framed_and_still: bool,
    captured: bool,
}

impl LivenessSession {
    pub fn new(config: Arc<SessionConfig>, trigger: impl CaptureTrigger + Send + 'static) -> Self {
        tracing::info!(
            challenges = config.catalog.len(),
            convention = %config.convention,
            strict_framing = config.strict_framing,
            "liveness session created"
        );
        Self {
            config,
            trigger: Box::new(trigger),
            index: 0,
            framed_and_still: false,
            captured: false,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn current_index(&self) -> usize {
        self.index
    }

    /// The challenge awaiting a pass, or `None` once verified.
    pub fn current_challenge(&self) -> Option<&ChallengeSpec> {
        self.config.catalog.get(self.index)
    }

    pub fn is_verified(&self) -> bool {
        self.captured
    }

    /// `(passed, total)` challenge counts.
    pub fn progress(&self) -> (usize, usize) {
        (self.index, self.config.catalog.len())
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            index: self.index,
            total: self.config.catalog.len(),
            verified: self.captured,
            current_challenge: self.current_challenge().map(|s| s.kind),
            framed_and_still: self.framed_and_still,
        }
    }

    /// Return to the first challenge and re-arm the capture trigger.
    pub fn reset(&mut self) {
        tracing::info!(from = self.index, "liveness session reset");
        self.index = 0;
        self.framed_and_still = false;
        self.captured = false;
    }

    /// Advance the state machine by one frame.
    pub fn observe(&mut self, observation: &FrameObservation) -> StepOutput {
        if !observation.is_well_formed() {
            tracing::warn!(?observation, "malformed observation; sanitizing");
        }
        let obs = observation.sanitized();
        let framing = self.config.validator.classify(&obs);

        if self.captured {
            return self.hold(Instruction::Verified, framing);
        }

        if framing == FramingResult::NoSingleFace {
            let had_progress = self.index > 0;
            if had_progress {
                tracing::info!(
                    from = self.index,
                    face_count = obs.face_count,
                    "subject lost; restarting challenges"
                );
            }
            self.index = 0;
            self.framed_and_still = false;
            return StepOutput {
                instruction: Instruction::PositionFace,
                framing,
                index: 0,
                advanced: false,
                reset: had_progress,
                verified_now: false,
            };
        }

        if self.config.strict_framing {
            match framing {
                FramingResult::NotFramed => {
                    self.framed_and_still = false;
                    return self.hold(Instruction::PositionFace, framing);
                }
                FramingResult::TooClose => {
                    self.framed_and_still = false;
                    return self.hold(Instruction::TooClose, framing);
                }
                _ => {}
            }
        }

        let became_still = !self.framed_and_still;
        self.framed_and_still = true;

        let total = self.config.catalog.len();
        let Some(spec) = self.config.catalog.get(self.index.min(total - 1)) else {
            return self.hold(Instruction::PositionFace, framing);
        };
        let kind = spec.kind;
        let advanced = spec.is_satisfied(&obs, self.config.convention);

        if advanced {
            self.index += 1;
            tracing::debug!(index = self.index, kind = %kind, "challenge passed");
        } else {
            tracing::trace!(index = self.index, kind = %kind, %framing, "challenge pending");
        }

        if self.index >= total {
            self.captured = true;
            tracing::info!(challenges = total, "liveness verified; firing capture trigger");
            self.trigger.fire();
            return StepOutput {
                instruction: Instruction::Verified,
                framing,
                index: self.index,
                advanced,
                reset: false,
                verified_now: true,
            };
        }

        let instruction = match self.current_challenge() {
            Some(spec) if !became_still => Instruction::ChallengePrompt(spec.kind),
            _ => Instruction::KeepStill,
        };

        StepOutput {
            instruction,
            framing,
            index: self.index,
            advanced,
            reset: false,
            verified_now: false,
        }
    }

    fn hold(&self, instruction: Instruction, framing: FramingResult) -> StepOutput {
        StepOutput {
            instruction,
            framing,
            index: self.index,
            advanced: false,
            reset: false,
            verified_now: false,
        }
    }
}

impl fmt::Debug for LivenessSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LivenessSession")
            .field("index", &self.index)
            .field("framed_and_still", &self.framed_and_still)
            .field("captured", &self.captured)
            .finish_non_exhaustive()
    }
}
