//! Intervention gating
//!
//! Maps the engine's intervention level to the modal gate the UI must
//! present, and converts user acknowledgments into score reductions. The
//! gate never sets the level itself: it only hands reduction amounts back
//! to the host, which applies them through `ImpulseEngine::reduce_score`
//! and lets reclassification drive the next transition.
//!
//! All timed behavior (the reflection notice, the breathing routine)
//! advances through explicit `advance(elapsed)` calls from the host's
//! tick, so dropping the gate (or leaving the level that armed a timer)
//! cancels it outright. Nothing can fire after teardown.

use crate::types::InterventionLevel;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How long the reflection notice stays up before auto-dismissing
pub const REFLECTION_NOTICE_SECS: f64 = 5.0;

/// Breathing phase durations (one 9-second cycle)
pub const BREATHING_INHALE_SECS: f64 = 4.0;
pub const BREATHING_EXHALE_SECS: f64 = 4.0;
pub const BREATHING_HOLD_SECS: f64 = 1.0;

/// Fixed total duration of the guided breathing routine
pub const BREATHING_TOTAL_SECS: f64 = 25.0;

/// Score reduction granted on completing the breathing routine
pub const BREATHING_REWARD: f64 = 0.15;

/// Confirmation phrase required to leave the micro-lock (case-insensitive)
pub const MICRO_LOCK_PHRASE: &str = "I can wait";

/// Score reduction granted on a micro-lock unlock
pub const MICRO_LOCK_REWARD: f64 = 0.2;

/// Score reduction granted on an emergency safe-mode unlock
pub const SAFE_MODE_REWARD: f64 = 0.5;

/// Ambient settings injected into the gating component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterventionSettings {
    /// Whether the camera monitor overlay is enabled (decorative, out of
    /// the core's scope; carried as recognized configuration only)
    pub enable_camera: bool,
    /// Whether haptic cues accompany the breathing routine
    pub enable_vibration: bool,
}

impl Default for InterventionSettings {
    fn default() -> Self {
        Self {
            enable_camera: true,
            enable_vibration: true,
        }
    }
}

/// What the UI must present for the current level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateDirective {
    /// No gating
    None,
    /// Non-blocking reflection notice
    Notice,
    /// Visual degradation hint only
    Grayscale,
    /// Blocking breathing routine modal
    Breathing,
    /// Blocking typed-confirmation lock
    MicroLock,
    /// Full safe-mode lock
    SafeMode,
}

/// Outcome handed back to the host when a gate resolves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateOutcome {
    /// The breathing routine completed; apply the reduction
    BreathingComplete { reduce: f64 },
}

/// Phase within the 9-second breathing cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreathingPhase {
    Inhale,
    Exhale,
    Hold,
}

/// Guided breathing routine: 4 s inhale, 4 s exhale, 1 s hold, repeating
/// for a fixed total of 25 seconds.
///
/// Time only advances through [`BreathingRoutine::advance`]; dropping the
/// routine mid-way cancels it and its completion can never fire.
#[derive(Debug, Clone)]
pub struct BreathingRoutine {
    elapsed: f64,
    complete: bool,
}

impl Default for BreathingRoutine {
    fn default() -> Self {
        Self::new()
    }
}

impl BreathingRoutine {
    pub fn new() -> Self {
        Self {
            elapsed: 0.0,
            complete: false,
        }
    }

    /// Advance the routine; returns true exactly once, when the total
    /// duration has just been reached.
    pub fn advance(&mut self, elapsed: Duration) -> bool {
        if self.complete {
            return false;
        }
        self.elapsed += elapsed.as_secs_f64();
        if self.elapsed >= BREATHING_TOTAL_SECS {
            self.complete = true;
            return true;
        }
        false
    }

    /// Finish early ("I am calm now"); returns true if the routine was
    /// still pending.
    pub fn finish_early(&mut self) -> bool {
        if self.complete {
            return false;
        }
        self.complete = true;
        true
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Current phase within the repeating 9-second cycle
    pub fn phase(&self) -> BreathingPhase {
        let cycle_len = BREATHING_INHALE_SECS + BREATHING_EXHALE_SECS + BREATHING_HOLD_SECS;
        let in_cycle = self.elapsed % cycle_len;
        if in_cycle < BREATHING_INHALE_SECS {
            BreathingPhase::Inhale
        } else if in_cycle < BREATHING_INHALE_SECS + BREATHING_EXHALE_SECS {
            BreathingPhase::Exhale
        } else {
            BreathingPhase::Hold
        }
    }

    /// Seconds left on the countdown, clamped at zero
    pub fn remaining_secs(&self) -> f64 {
        (BREATHING_TOTAL_SECS - self.elapsed).max(0.0)
    }
}

/// Intervention gate driven by the level the engine computes each tick.
#[derive(Debug, Clone)]
pub struct InterventionGate {
    settings: InterventionSettings,
    level: InterventionLevel,
    /// Seconds left on the reflection notice; None once dismissed
    notice_remaining: Option<f64>,
    routine: Option<BreathingRoutine>,
}

impl Default for InterventionGate {
    fn default() -> Self {
        Self::new(InterventionSettings::default())
    }
}

impl InterventionGate {
    pub fn new(settings: InterventionSettings) -> Self {
        Self {
            settings,
            level: InterventionLevel::Normal,
            notice_remaining: None,
            routine: None,
        }
    }

    pub fn settings(&self) -> &InterventionSettings {
        &self.settings
    }

    /// Observe the level the engine just computed.
    ///
    /// Entering Reflection arms the transient notice; entering Breathing
    /// arms a fresh routine; leaving Breathing cancels any routine still
    /// in flight, dangling timers included.
    pub fn observe_level(&mut self, level: InterventionLevel) {
        if level == self.level {
            return;
        }

        if level == InterventionLevel::Reflection {
            self.notice_remaining = Some(REFLECTION_NOTICE_SECS);
        } else {
            self.notice_remaining = None;
        }

        if level == InterventionLevel::Breathing {
            self.routine = Some(BreathingRoutine::new());
        } else {
            self.routine = None;
        }

        self.level = level;
    }

    /// Advance gate-internal timers by `elapsed`.
    ///
    /// Returns the outcome to apply, if any. The breathing completion is
    /// delivered at most once per armed routine.
    pub fn advance(&mut self, elapsed: Duration) -> Option<GateOutcome> {
        if let Some(remaining) = self.notice_remaining.as_mut() {
            *remaining -= elapsed.as_secs_f64();
            if *remaining <= 0.0 {
                self.notice_remaining = None;
            }
        }

        if let Some(routine) = self.routine.as_mut() {
            if routine.advance(elapsed) {
                return Some(GateOutcome::BreathingComplete {
                    reduce: BREATHING_REWARD,
                });
            }
        }

        None
    }

    /// What the UI should present right now
    pub fn directive(&self) -> GateDirective {
        match self.level {
            InterventionLevel::Normal => GateDirective::None,
            InterventionLevel::Reflection => {
                if self.notice_remaining.is_some() {
                    GateDirective::Notice
                } else {
                    GateDirective::None
                }
            }
            InterventionLevel::Grayscale => GateDirective::Grayscale,
            InterventionLevel::Breathing => GateDirective::Breathing,
            InterventionLevel::MicroLock => GateDirective::MicroLock,
            InterventionLevel::SafeMode => GateDirective::SafeMode,
        }
    }

    /// Manually dismiss the reflection notice (no score effect)
    pub fn dismiss_notice(&mut self) {
        self.notice_remaining = None;
    }

    /// End the breathing routine early ("I am calm now")
    pub fn finish_breathing_early(&mut self) -> Option<GateOutcome> {
        if let Some(routine) = self.routine.as_mut() {
            if routine.finish_early() {
                return Some(GateOutcome::BreathingComplete {
                    reduce: BREATHING_REWARD,
                });
            }
        }
        None
    }

    /// The breathing routine in flight, for rendering phase and countdown
    pub fn breathing(&self) -> Option<&BreathingRoutine> {
        self.routine.as_ref()
    }

    /// Attempt a micro-lock unlock with the typed phrase.
    ///
    /// The comparison is a case-insensitive exact match; anything else
    /// leaves the unlock unavailable. Returns the reduction to apply.
    pub fn attempt_unlock(&self, input: &str) -> Option<f64> {
        if self.level != InterventionLevel::MicroLock {
            return None;
        }
        if input.to_lowercase() == MICRO_LOCK_PHRASE.to_lowercase() {
            Some(MICRO_LOCK_REWARD)
        } else {
            None
        }
    }

    /// Emergency unlock, only available in safe mode. Returns the
    /// reduction to apply.
    pub fn emergency_unlock(&self) -> Option<f64> {
        if self.level == InterventionLevel::SafeMode {
            Some(SAFE_MODE_REWARD)
        } else {
            None
        }
    }

    /// Haptic cue length in milliseconds for the given breathing phase,
    /// honoring the vibration setting. Inhale gets a light tick each
    /// second, the hold a single stronger tick, the exhale none.
    pub fn haptic_cue(&self, phase: BreathingPhase) -> Option<u32> {
        if !self.settings.enable_vibration {
            return None;
        }
        match phase {
            BreathingPhase::Inhale => Some(50),
            BreathingPhase::Hold => Some(80),
            BreathingPhase::Exhale => None,
        }
    }
}
