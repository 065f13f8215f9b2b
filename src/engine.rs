//! Impulse engine loop
//!
//! The engine is the sole owner and mutator of the impulse state, the
//! excitement history, and the carried-forward previous level used for
//! escalation-edge detection. UI layers feed it discrete interaction
//! events and drive `tick` once per second; they only ever read snapshots
//! back out.
//!
//! The host owns the clock: every mutating entry point takes the current
//! timestamp, so the engine itself holds no timers and teardown cannot
//! leave anything behind to fire later.

use crate::error::EngineError;
use crate::history::{HistoryBuffer, VIEW_WINDOW_SIZE};
use crate::scoring::{
    clamp01, score_delta, TickSignals, ADD_TO_CART_DELTA, CLICK_EVENT_DELTA, PRODUCT_VIEW_DELTA,
    SCROLL_EVENT_DELTA,
};
use crate::types::{
    HistorySample, ImpulseState, InteractionKind, InterventionEvent, InterventionLevel,
    ProductRef, TriggerInfo,
};
use chrono::{DateTime, Timelike, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;
use uuid::Uuid;

/// Score every session starts from
pub const INITIAL_SCORE: f64 = 0.1;

/// Period of the engine loop
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Excitement is the score rescaled to 0-10 for display
pub const EXCITEMENT_SCALE: f64 = 10.0;

/// Trigger reason recorded on every add-to-cart event
const ADD_TO_CART_REASON: &str = "Rapid Add to Cart + High Interest";

/// Product context reported when no product has been viewed yet
const BROWSING_CONTEXT: &str = "Browsing";

/// True for the high-risk evening window (22:00-04:59).
pub fn high_risk_hour(hour: u32) -> bool {
    hour >= 22 || hour <= 4
}

/// The impulse scoring engine.
///
/// Single-threaded cooperative model: one logical mutation (a tick or a
/// discrete event) runs to completion before the next begins, so no
/// locking is needed around the state or the history buffer.
#[derive(Debug)]
pub struct ImpulseEngine {
    state: ImpulseState,
    /// Level recorded on the previous tick or event, for edge detection
    prev_level: InterventionLevel,
    /// Last-viewed product, used as trigger context
    current_product: Option<ProductRef>,
    history: HistoryBuffer,
    interventions: Vec<InterventionEvent>,
    active_trigger: Option<TriggerInfo>,
    rng: StdRng,
    running: bool,
}

impl Default for ImpulseEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ImpulseEngine {
    /// Create an engine with an OS-seeded noise source
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_os_rng())
    }

    /// Create an engine with a deterministic noise source
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            state: Self::fresh_state(),
            prev_level: InterventionLevel::Normal,
            current_product: None,
            history: HistoryBuffer::new(),
            interventions: Vec::new(),
            active_trigger: None,
            rng,
            running: false,
        }
    }

    fn fresh_state() -> ImpulseState {
        ImpulseState {
            score: INITIAL_SCORE,
            level: InterventionLevel::from_score(INITIAL_SCORE),
            is_shopping: false,
            session_high_risk: false,
        }
    }

    /// Begin a session at the given time.
    ///
    /// Resets the state, history, and event log, and evaluates the
    /// high-risk time-of-day flag once for the session. Idempotent while
    /// the session is already running.
    pub fn start_session(&mut self, now: DateTime<Utc>) {
        if self.running {
            return;
        }
        self.state = Self::fresh_state();
        self.state.session_high_risk = high_risk_hour(now.hour());
        self.prev_level = InterventionLevel::Normal;
        self.current_product = None;
        self.history.clear();
        self.interventions.clear();
        self.active_trigger = None;
        self.running = true;
    }

    /// Stop the session. Idempotent; a stopped engine freezes at its last
    /// snapshot and no later tick or event can mutate it.
    pub fn stop_session(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Advance the engine by one tick.
    ///
    /// Returns [`EngineError::NotRunning`] when the session is stopped;
    /// callers treat that as "state frozen at last snapshot", not a fault.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Result<(), EngineError> {
        if !self.running {
            return Err(EngineError::NotRunning);
        }

        // Score is frozen at Breathing and above: escalating past this
        // point requires an explicit intervention acknowledgment.
        if self.state.level < InterventionLevel::Breathing {
            let signals = TickSignals {
                scroll_fast: self.state.is_shopping,
                click_rapid: false,
                intervention_active: self.state.level > InterventionLevel::Normal,
            };
            let delta = score_delta(signals, &mut self.rng);
            self.set_score(self.state.score + delta);
        }

        self.record_sample(now, false);
        Ok(())
    }

    /// Apply a discrete interaction event.
    ///
    /// Unlike the automatic tick path, discrete events are applied at any
    /// level (an add-to-cart still spikes the score above Breathing). Each
    /// event appends its own immediate history sample with its own edge
    /// detection, independent of the 1 Hz tick.
    pub fn apply_event(
        &mut self,
        kind: InteractionKind,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        if !self.running {
            return Err(EngineError::NotRunning);
        }

        let delta = match kind {
            InteractionKind::ProductView => PRODUCT_VIEW_DELTA,
            InteractionKind::Scroll => SCROLL_EVENT_DELTA,
            InteractionKind::Click => CLICK_EVENT_DELTA,
            InteractionKind::AddToCart => ADD_TO_CART_DELTA,
        };
        self.set_score(self.state.score + delta);
        self.record_sample(now, kind == InteractionKind::AddToCart);
        Ok(())
    }

    /// Record the product currently being viewed and apply its view spike.
    pub fn notify_product_viewed(
        &mut self,
        product: ProductRef,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        if !self.running {
            return Err(EngineError::NotRunning);
        }
        self.current_product = Some(product);
        self.apply_event(InteractionKind::ProductView, now)
    }

    /// Clear the product context (user navigated back to the overview).
    pub fn clear_product_context(&mut self) {
        self.current_product = None;
    }

    pub fn notify_scroll(&mut self, now: DateTime<Utc>) -> Result<(), EngineError> {
        self.apply_event(InteractionKind::Scroll, now)
    }

    pub fn notify_click(&mut self, now: DateTime<Utc>) -> Result<(), EngineError> {
        self.apply_event(InteractionKind::Click, now)
    }

    pub fn notify_add_to_cart(&mut self, now: DateTime<Utc>) -> Result<(), EngineError> {
        self.apply_event(InteractionKind::AddToCart, now)
    }

    /// Set the shopping-context flag (true while the catalog view is active).
    pub fn set_shopping(&mut self, shopping: bool) {
        self.state.is_shopping = shopping;
    }

    /// Reduce the score by `amount` (intervention acknowledgment).
    ///
    /// The amount is clamped to non-negative and the result to [0, 1];
    /// the level is reclassified immediately so the gating UI observes the
    /// de-escalation synchronously. No-op on a stopped engine, so an
    /// acknowledgment arriving after teardown cannot corrupt state.
    pub fn reduce_score(&mut self, amount: f64) {
        if !self.running {
            return;
        }
        self.set_score(self.state.score - amount.max(0.0));
    }

    /// Snapshot of the current state
    pub fn state(&self) -> ImpulseState {
        self.state
    }

    /// Viewing window over the excitement history (see [`HistoryBuffer::window`])
    pub fn history_window(&self, offset: usize, window_size: usize) -> Vec<HistorySample> {
        self.history.window(offset, window_size)
    }

    /// The live 30-sample window
    pub fn live_window(&self) -> Vec<HistorySample> {
        self.history.window(0, VIEW_WINDOW_SIZE)
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Most recent trigger, while its level is still in effect
    pub fn active_trigger(&self) -> Option<&TriggerInfo> {
        self.active_trigger.as_ref()
    }

    /// Append-only log of escalation events, for analytics
    pub fn intervention_events(&self) -> &[InterventionEvent] {
        &self.interventions
    }

    /// Clamp-and-reclassify: the one place score and level change together,
    /// keeping `level == from_score(score)` after every mutation.
    fn set_score(&mut self, score: f64) {
        self.state.score = clamp01(score);
        self.state.level = InterventionLevel::from_score(self.state.score);
        if let Some(trigger) = &self.active_trigger {
            if self.state.level < trigger.level {
                self.active_trigger = None;
            }
        }
    }

    /// Append a history sample, running escalation-edge detection against
    /// the level carried forward from the previous tick or event.
    ///
    /// An add-to-cart sample always carries a trigger whose reported level
    /// is floored to Grayscale; the floor never touches the score itself.
    fn record_sample(&mut self, now: DateTime<Utc>, cart_event: bool) {
        let level = self.state.level;
        let mut trigger = None;

        if level > self.prev_level && level > InterventionLevel::Normal {
            let info = self.build_trigger(level, now);
            self.interventions.push(InterventionEvent {
                id: Uuid::new_v4().to_string(),
                timestamp: now,
                level,
            });
            self.active_trigger = Some(info.clone());
            trigger = Some(info);
        }

        if cart_event {
            let info = TriggerInfo {
                level: level.max(InterventionLevel::Grayscale),
                product_context: self.product_context(),
                reason: ADD_TO_CART_REASON.to_string(),
                display_time: now.format("%H:%M").to_string(),
            };
            self.active_trigger = Some(info.clone());
            trigger = Some(info);
        }

        self.history.push(HistorySample {
            timestamp: now,
            excitement: self.state.score * EXCITEMENT_SCALE,
            trigger,
        });
        self.prev_level = level;
    }

    fn product_context(&self) -> String {
        self.current_product
            .as_ref()
            .map(|p| p.title.clone())
            .unwrap_or_else(|| BROWSING_CONTEXT.to_string())
    }

    fn build_trigger(&self, level: InterventionLevel, now: DateTime<Utc>) -> TriggerInfo {
        let context = self.product_context();
        let reason = if level >= InterventionLevel::MicroLock {
            let brand = self
                .current_product
                .as_ref()
                .map(|p| p.brand.as_str())
                .unwrap_or("Brand");
            format!("Rapid browsing + repeated visits to {brand}")
        } else if level >= InterventionLevel::Breathing {
            format!("High intensity interaction with {context}")
        } else {
            format!("Extended viewing of {context}")
        };

        TriggerInfo {
            level,
            product_context: context,
            reason,
            display_time: now.format("%H:%M").to_string(),
        }
    }
}
