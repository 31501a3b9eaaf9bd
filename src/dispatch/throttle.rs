//! Start-to-start spacing for outbound knowledge-base calls.
//!
//! A single process-local gate: unlike a per-domain limiter there is only one
//! upstream, so one timestamp is enough.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Warning threshold for cumulative throttle delay.
const CUMULATIVE_DELAY_WARNING_THRESHOLD: Duration = Duration::from_secs(60);

/// Enforces a minimum delay between the *start* of consecutive calls.
///
/// The delay is a floor: a slow call that already took longer than
/// `min_delay` lets the next call start immediately.
#[derive(Debug)]
pub struct Throttle {
    min_delay: Duration,
    /// `None` until the first call has started.
    last_start: Mutex<Option<Instant>>,
    cumulative_delay_ms: AtomicU64,
}

impl Throttle {
    /// Creates a throttle; a zero `min_delay` disables waiting.
    #[must_use]
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            last_start: Mutex::new(None),
            cumulative_delay_ms: AtomicU64::new(0),
        }
    }

    /// Returns whether throttling is disabled.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.min_delay.is_zero()
    }

    /// Returns the configured minimum delay.
    #[must_use]
    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// Total time spent waiting so far.
    #[must_use]
    pub fn cumulative_delay(&self) -> Duration {
        Duration::from_millis(self.cumulative_delay_ms.load(Ordering::SeqCst))
    }

    /// Waits until the next call may start, then records the start time.
    pub async fn acquire(&self) {
        if self.is_disabled() {
            return;
        }

        let mut last_start = self.last_start.lock().await;
        if let Some(previous) = *last_start {
            let elapsed = previous.elapsed();
            if elapsed < self.min_delay {
                let delay = self.min_delay.saturating_sub(elapsed);
                let cumulative = self.add_cumulative_delay(delay);
                debug!(
                    delay_ms = delay.as_millis(),
                    cumulative_ms = cumulative.as_millis(),
                    "throttling knowledge-base call"
                );
                if cumulative >= CUMULATIVE_DELAY_WARNING_THRESHOLD
                    && cumulative.saturating_sub(delay) < CUMULATIVE_DELAY_WARNING_THRESHOLD
                {
                    warn!(
                        cumulative_delay_secs = cumulative.as_secs(),
                        "long cumulative throttle delay - consider a larger batch size"
                    );
                }
                tokio::time::sleep(delay).await;
            }
        }
        *last_start = Some(Instant::now());
    }

    #[allow(clippy::cast_possible_truncation)]
    fn add_cumulative_delay(&self, delay: Duration) -> Duration {
        let delay_ms = delay.as_millis() as u64;
        let total = self
            .cumulative_delay_ms
            .fetch_add(delay_ms, Ordering::SeqCst)
            + delay_ms;
        Duration::from_millis(total)
    }
}
