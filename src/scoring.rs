//! Impulse score deltas
//!
//! Pure scoring functions mapping behavioral signals to score deltas.
//! The stochastic noise term is the only nondeterministic element; the
//! random source is injected so callers can seed it for deterministic runs.

use rand::Rng;

/// Per-tick increment while scrolling fast
pub const SCROLL_FAST_DELTA: f64 = 0.005;
/// Per-tick increment while clicking rapidly
pub const CLICK_RAPID_DELTA: f64 = 0.02;
/// Passive decay per tick while an intervention is active (faster calm-down)
pub const INTERVENTION_DECAY: f64 = 0.01;
/// Passive decay per tick otherwise (slow natural decay)
pub const NATURAL_DECAY: f64 = 0.001;
/// Probability of adding a noise perturbation on a tick
pub const NOISE_PROBABILITY: f64 = 0.3;
/// Noise is drawn uniformly from [-NOISE_AMPLITUDE, +NOISE_AMPLITUDE]
pub const NOISE_AMPLITUDE: f64 = 0.005;

/// Score spike when a product detail view opens
pub const PRODUCT_VIEW_DELTA: f64 = 0.05;
/// Score spike on an add-to-cart event
pub const ADD_TO_CART_DELTA: f64 = 0.25;
/// Score increment per catalog scroll event
pub const SCROLL_EVENT_DELTA: f64 = 0.002;
/// Score increment per tap/click event
pub const CLICK_EVENT_DELTA: f64 = 0.05;

/// Behavioral signals observed during one engine tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickSignals {
    /// Fast scrolling detected (approximated by "catalog view active")
    pub scroll_fast: bool,
    /// Rapid clicking detected (unused in the tick path)
    pub click_rapid: bool,
    /// An intervention level above normal is currently active
    pub intervention_active: bool,
}

/// Compute the per-tick score delta for the given signals.
///
/// The deterministic component depends only on the signals; the delta does
/// not depend on the current score. With probability [`NOISE_PROBABILITY`]
/// a uniform perturbation in [-[`NOISE_AMPLITUDE`], +[`NOISE_AMPLITUDE`]]
/// is added, so property tests must treat the result as a tolerance band
/// around the deterministic part.
pub fn score_delta<R: Rng + ?Sized>(signals: TickSignals, rng: &mut R) -> f64 {
    let mut delta = 0.0;

    if signals.scroll_fast {
        delta += SCROLL_FAST_DELTA;
    }
    if signals.click_rapid {
        delta += CLICK_RAPID_DELTA;
    }

    // Passive decay only applies when neither behavior signal is set.
    if !signals.scroll_fast && !signals.click_rapid {
        delta -= if signals.intervention_active {
            INTERVENTION_DECAY
        } else {
            NATURAL_DECAY
        };
    }

    if rng.random::<f64>() < NOISE_PROBABILITY {
        delta += rng.random_range(-NOISE_AMPLITUDE..=NOISE_AMPLITUDE);
    }

    delta
}

/// Clamp a score to the valid [0, 1] range. NaN collapses to 0.
pub fn clamp01(score: f64) -> f64 {
    if score.is_nan() {
        return 0.0;
    }
    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    /// The deterministic part of a delta, recovered as the band center.
    fn assert_within_noise(delta: f64, deterministic: f64) {
        assert!(
            (delta - deterministic).abs() <= NOISE_AMPLITUDE + 1e-12,
            "delta {delta} outside noise band around {deterministic}"
        );
    }

    #[test]
    fn scroll_fast_increments() {
        let mut rng = rng();
        for _ in 0..100 {
            let delta = score_delta(
                TickSignals {
                    scroll_fast: true,
                    ..Default::default()
                },
                &mut rng,
            );
            assert_within_noise(delta, SCROLL_FAST_DELTA);
        }
    }

    #[test]
    fn click_rapid_is_the_stronger_signal() {
        let mut rng = rng();
        for _ in 0..100 {
            let delta = score_delta(
                TickSignals {
                    click_rapid: true,
                    ..Default::default()
                },
                &mut rng,
            );
            assert_within_noise(delta, CLICK_RAPID_DELTA);
        }
    }

    #[test]
    fn both_signals_stack() {
        let mut rng = rng();
        let delta = score_delta(
            TickSignals {
                scroll_fast: true,
                click_rapid: true,
                intervention_active: false,
            },
            &mut rng,
        );
        assert_within_noise(delta, SCROLL_FAST_DELTA + CLICK_RAPID_DELTA);
    }

    #[test]
    fn passive_decay_is_slow_without_intervention() {
        let mut rng = rng();
        for _ in 0..100 {
            let delta = score_delta(TickSignals::default(), &mut rng);
            assert_within_noise(delta, -NATURAL_DECAY);
        }
    }

    #[test]
    fn passive_decay_is_fast_with_intervention() {
        let mut rng = rng();
        for _ in 0..100 {
            let delta = score_delta(
                TickSignals {
                    intervention_active: true,
                    ..Default::default()
                },
                &mut rng,
            );
            assert_within_noise(delta, -INTERVENTION_DECAY);
        }
    }

    #[test]
    fn seeded_rng_is_reproducible() {
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);
        let signals = TickSignals {
            scroll_fast: true,
            ..Default::default()
        };
        for _ in 0..50 {
            assert_eq!(score_delta(signals, &mut a), score_delta(signals, &mut b));
        }
    }

    #[test]
    fn noise_fires_on_roughly_a_third_of_ticks() {
        let mut rng = rng();
        let mut noisy = 0;
        let trials = 5000;
        for _ in 0..trials {
            let delta = score_delta(TickSignals::default(), &mut rng);
            if (delta + NATURAL_DECAY).abs() > 1e-12 {
                noisy += 1;
            }
        }
        let fraction = noisy as f64 / trials as f64;
        // Statistical bound, not an exact value.
        assert!(fraction > 0.2 && fraction < 0.4, "noise fraction {fraction}");
    }

    #[test]
    fn clamp01_bounds_and_handles_nan() {
        assert_eq!(clamp01(1.5), 1.0);
        assert_eq!(clamp01(-0.5), 0.0);
        assert_eq!(clamp01(0.3), 0.3);
        assert_eq!(clamp01(f64::NAN), 0.0);
    }
}
