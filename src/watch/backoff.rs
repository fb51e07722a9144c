use std::time::Duration;

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use tracing::warn;

use super::StopSignal;
use crate::config::RetrySettings;

/// Uniform jitter ratio applied around each computed delay (±20%).
pub const JITTER_RATIO: f64 = 0.2;

/// `min(current * multiplier, max)`, saturating at `max` on overflow.
pub fn compute_next_backoff(
    current: Duration,
    multiplier: f64,
    max: Duration,
) -> Duration {
    match Duration::try_from_secs_f64(current.as_secs_f64() * multiplier) {
        Ok(next) => next.min(max),
        Err(_) => max,
    }
}

/// Perturbs `delay` by a uniform factor in `[1 - JITTER_RATIO, 1 + JITTER_RATIO]`.
///
/// Falls back to the unperturbed delay when the random generator cannot be
/// seeded.
pub fn apply_jitter(delay: Duration) -> Duration {
    match StdRng::from_rng(rand::thread_rng()) {
        Ok(mut rng) => jitter_with(&mut rng, delay),
        Err(e) => {
            warn!(error = %e, "jitter source unavailable, using unperturbed backoff");
            delay
        }
    }
}

pub(crate) fn jitter_with<R: Rng + ?Sized>(
    rng: &mut R,
    delay: Duration,
) -> Duration {
    let factor = 1.0 + rng.gen_range(-JITTER_RATIO..=JITTER_RATIO);
    Duration::try_from_secs_f64(delay.as_secs_f64() * factor).unwrap_or(delay)
}

/// Exponential backoff state for one resilient watch.
///
/// Keeps the un-jittered base so growth follows `initial, initial*m, ...`
/// up to `max`; jitter only affects the returned delay.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial: Duration,
    max: Duration,
    multiplier: f64,
    current: Duration,
}

impl ExponentialBackoff {
    pub fn new(
        initial: Duration,
        max: Duration,
        multiplier: f64,
    ) -> Self {
        Self {
            initial,
            max,
            multiplier,
            current: initial,
        }
    }

    pub(crate) fn from_settings(settings: &RetrySettings) -> Self {
        Self::new(
            settings.initial_backoff,
            settings.max_backoff,
            settings.backoff_multiplier,
        )
    }

    /// Base delay the next call to [`Self::next_delay`] will jitter
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Returns the jittered delay to wait now and advances the base.
    pub fn next_delay(&mut self) -> Duration {
        let base = self.current;
        self.current = compute_next_backoff(base, self.multiplier, self.max);
        apply_jitter(base)
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// Sleeps for `duration` unless the caller or the client stops first.
///
/// Returns `true` if the full duration elapsed.
pub(crate) async fn cancellable_sleep(
    duration: Duration,
    stop: &StopSignal,
) -> bool {
    tokio::select! {
        biased;
        _ = stop.stopped() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}
