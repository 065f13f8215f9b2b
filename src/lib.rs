//! Impulse Sense - Impulse scoring and intervention engine for shopping behavior signals
//!
//! Impulse Sense turns raw shopping interaction signals (scrolls, clicks,
//! product views, cart adds) into derived state through a deterministic
//! loop: signal scoring → level classification → escalation-edge detection
//! → history sampling → intervention gating.
//!
//! ## Modules
//!
//! - **Engine**: the 1 Hz loop that owns the impulse state and history
//! - **Intervention**: maps levels to UI gates and acknowledgment rewards

pub mod engine;
pub mod error;
pub mod history;
pub mod intervention;
pub mod scoring;
pub mod types;

pub use engine::{ImpulseEngine, INITIAL_SCORE, TICK_INTERVAL};
pub use error::EngineError;
pub use history::{HistoryBuffer, HISTORY_CAPACITY, VIEW_WINDOW_SIZE};
pub use intervention::{
    BreathingRoutine, GateDirective, GateOutcome, InterventionGate, InterventionSettings,
};
pub use scoring::{score_delta, TickSignals};
pub use types::{
    HistorySample, ImpulseState, InteractionEvent, InteractionKind, InterventionEvent,
    InterventionLevel, ProductRef, TriggerInfo,
};

/// Engine version embedded in CLI reports
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for CLI reports
pub const PRODUCER_NAME: &str = "impulse-sense";
