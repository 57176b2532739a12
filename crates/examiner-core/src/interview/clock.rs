//! Quota metering.
//!
//! [`QuotaMeter`] is the pure counter: prepaid seconds, time used, and
//! the settlement owed at teardown. [`QuotaClock`] turns wall-clock time
//! into meter ticks for a [`ClockTarget`] until cancelled; each tick meters
//! exactly one clock period, whatever the period is. The clock never
//! touches the connection itself; exhaustion is reported back to the
//! target, which notifies the client and closes through its own paths.

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Result of metering one period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue { remaining: i64 },
    /// The quota is used up; the session must end.
    Exhausted,
    /// The session is no longer open; nothing was metered.
    Closed,
}

/// Prepaid seconds versus time consumed.
///
/// Usage is kept in milliseconds so any clock period meters exactly the
/// wall-clock time it covers. A started second counts as used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaMeter {
    quota: i64,
    used_ms: i64,
}

impl QuotaMeter {
    /// A negative quota is treated as zero.
    pub fn new(quota: i64) -> Self {
        Self {
            quota: quota.max(0),
            used_ms: 0,
        }
    }

    pub fn quota(&self) -> i64 {
        self.quota
    }

    /// Whole seconds used, rounded up.
    pub fn used(&self) -> i64 {
        (self.used_ms + 999) / 1000
    }

    pub fn remaining(&self) -> i64 {
        (self.quota - self.used()).max(0)
    }

    /// Meter `elapsed` of wall-clock time. Usage never passes the quota.
    pub fn tick(&mut self, elapsed: Duration) -> TickOutcome {
        let quota_ms = self.quota.saturating_mul(1000);
        if self.used_ms >= quota_ms {
            return TickOutcome::Exhausted;
        }
        let elapsed_ms = i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX);
        self.used_ms = self.used_ms.saturating_add(elapsed_ms).min(quota_ms);
        if self.used_ms >= quota_ms {
            TickOutcome::Exhausted
        } else {
            TickOutcome::Continue {
                remaining: self.remaining(),
            }
        }
    }

    /// Quota to write back at teardown, or `None` when nothing was used.
    pub fn settlement(&self) -> Option<i64> {
        (self.used_ms > 0).then(|| self.remaining())
    }
}

/// Receiver of clock ticks.
pub trait ClockTarget: Send + Sync {
    /// Meter `period` of usage under the target's own exclusion.
    fn meter_tick(&self, period: Duration) -> impl Future<Output = TickOutcome> + Send;

    /// Called once when a tick reports [`TickOutcome::Exhausted`].
    fn quota_exhausted(&self) -> impl Future<Output = ()> + Send;
}

/// Periodic ticker driving a [`ClockTarget`].
#[derive(Debug, Clone, Copy)]
pub struct QuotaClock {
    period: Duration,
}

impl QuotaClock {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    /// Tick until `cancel` fires, the target reports it is closed, or the
    /// quota runs out. The first tick happens one full period after start.
    pub async fn run<T: ClockTarget>(&self, target: &T, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.period, self.period);
        // Late ticks are caught up so metered time tracks wall-clock time.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                _ = ticker.tick() => match target.meter_tick(self.period).await {
                    TickOutcome::Continue { .. } => {}
                    TickOutcome::Exhausted => {
                        target.quota_exhausted().await;
                        return;
                    }
                    TickOutcome::Closed => return,
                },
            }
        }
    }
}

impl Default for QuotaClock {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    struct CountingTarget {
        meter: Mutex<QuotaMeter>,
        closed: AtomicBool,
        exhausted_calls: AtomicUsize,
        ticks: AtomicUsize,
    }

    impl CountingTarget {
        fn new(quota: i64) -> Self {
            Self {
                meter: Mutex::new(QuotaMeter::new(quota)),
                closed: AtomicBool::new(false),
                exhausted_calls: AtomicUsize::new(0),
                ticks: AtomicUsize::new(0),
            }
        }
    }

    impl ClockTarget for CountingTarget {
        async fn meter_tick(&self, period: Duration) -> TickOutcome {
            if self.closed.load(Ordering::SeqCst) {
                return TickOutcome::Closed;
            }
            self.ticks.fetch_add(1, Ordering::SeqCst);
            self.meter.lock().await.tick(period)
        }

        async fn quota_exhausted(&self) {
            self.exhausted_calls.fetch_add(1, Ordering::SeqCst);
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    const SECOND: Duration = Duration::from_secs(1);

    #[test]
    fn test_meter_counts_down() {
        let mut meter = QuotaMeter::new(3);
        assert_eq!(meter.tick(SECOND), TickOutcome::Continue { remaining: 2 });
        assert_eq!(meter.tick(SECOND), TickOutcome::Continue { remaining: 1 });
        assert_eq!(meter.tick(SECOND), TickOutcome::Exhausted);
        assert_eq!(meter.used(), 3);
        assert_eq!(meter.remaining(), 0);
    }

    #[test]
    fn test_meter_never_exceeds_quota() {
        let mut meter = QuotaMeter::new(2);
        for _ in 0..10 {
            meter.tick(SECOND);
            assert!(meter.used() <= meter.quota());
        }
        assert_eq!(meter.used(), 2);
        assert_eq!(meter.tick(SECOND), TickOutcome::Exhausted);
    }

    #[test]
    fn test_meter_zero_and_negative_quota() {
        let mut meter = QuotaMeter::new(-5);
        assert_eq!(meter.quota(), 0);
        assert_eq!(meter.tick(SECOND), TickOutcome::Exhausted);
        assert_eq!(meter.used(), 0);
        assert_eq!(meter.settlement(), None);
    }

    #[test]
    fn test_settlement_only_after_use() {
        let mut meter = QuotaMeter::new(100);
        assert_eq!(meter.settlement(), None);
        for _ in 0..40 {
            meter.tick(SECOND);
        }
        assert_eq!(meter.settlement(), Some(60));
    }

    #[test]
    fn test_meter_charges_elapsed_time_not_ticks() {
        let mut meter = QuotaMeter::new(10);
        assert_eq!(
            meter.tick(Duration::from_millis(500)),
            TickOutcome::Continue { remaining: 9 }
        );
        assert_eq!(meter.used(), 1);
        assert_eq!(meter.settlement(), Some(9));
        meter.tick(Duration::from_millis(500));
        assert_eq!(meter.used(), 1);

        // A long period is capped at the quota.
        assert_eq!(meter.tick(Duration::from_secs(30)), TickOutcome::Exhausted);
        assert_eq!(meter.used(), 10);
        assert_eq!(meter.settlement(), Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clock_runs_until_exhausted() {
        let target = CountingTarget::new(10);
        let started = Instant::now();
        QuotaClock::default()
            .run(&target, CancellationToken::new())
            .await;

        assert_eq!(target.ticks.load(Ordering::SeqCst), 10);
        assert_eq!(target.exhausted_calls.load(Ordering::SeqCst), 1);
        assert_eq!(target.meter.lock().await.used(), 10);
        assert_eq!(started.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_period_exhausts_after_same_wall_time() {
        let target = CountingTarget::new(10);
        let started = Instant::now();
        QuotaClock::new(Duration::from_millis(250))
            .run(&target, CancellationToken::new())
            .await;

        assert_eq!(target.ticks.load(Ordering::SeqCst), 40);
        assert_eq!(target.exhausted_calls.load(Ordering::SeqCst), 1);
        assert_eq!(target.meter.lock().await.used(), 10);
        assert_eq!(started.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clock_stops_on_cancel() {
        let target = CountingTarget::new(1_000);
        let cancel = CancellationToken::new();

        let stopper = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(4_500)).await;
            stopper.cancel();
        });

        QuotaClock::default().run(&target, cancel).await;
        assert_eq!(target.ticks.load(Ordering::SeqCst), 4);
        assert_eq!(target.exhausted_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clock_stops_when_target_closed() {
        let target = CountingTarget::new(1_000);
        target.closed.store(true, Ordering::SeqCst);
        QuotaClock::default()
            .run(&target, CancellationToken::new())
            .await;
        assert_eq!(target.ticks.load(Ordering::SeqCst), 0);
    }
}
