//! Event waiter
//!
//! Coordinates a test thread with provider callbacks that arrive on threads
//! the test does not own. The test arms the waiter, triggers the action under
//! test, then waits until no event has arrived for a full quiescence window.
//!
//! All state sits behind one mutex. Two condition variables carry the
//! signals:
//! - `ready`: the waiter is inside `wait_for_events` and accepts one more event
//! - `new_data`: a provider appended an event
//!
//! ```text
//! Unarmed --arm--> Armed-Idle --event--> Armed-Receiving
//!    ^                 ^                        |
//!    |                 +----quiescence----------+
//!    +------purge------+
//! ```

use crate::config::WaiterConfig;
use crate::error::WaiterError;
use crate::types::{CapturedEvent, ElementId, EventPayload};
use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Receiver side of the provider contract
///
/// Providers call this zero or more times per armed cycle, from any thread.
pub trait EventSink: Send + Sync {
    /// Deliver one event raised by `source`
    fn on_provider_event(&self, source: ElementId, payload: EventPayload);
}

/// Counters kept across the waiter's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WaiterStats {
    /// Events appended to the captured list
    pub captured_total: u64,
    /// Events dropped because the waiter was not armed
    pub discarded_unarmed: u64,
    /// Provider callbacks that gave up waiting for ready-to-receive
    pub gate_timeouts: u64,
    /// Completed waits
    pub waits: u64,
    /// Events removed by purges
    pub purged_total: u64,
}

#[derive(Debug)]
struct WaiterState {
    captured: Vec<CapturedEvent>,
    armed: bool,
    last_arrival: Instant,
    ready_to_receive: bool,
    new_data: bool,
    waited: bool,
    generation: u64,
    stats: WaiterStats,
}

impl WaiterState {
    fn new() -> Self {
        Self {
            captured: Vec::new(),
            armed: false,
            last_arrival: Instant::now(),
            ready_to_receive: false,
            new_data: false,
            waited: false,
            generation: 0,
            stats: WaiterStats::default(),
        }
    }
}

/// Result of one wait cycle
#[derive(Debug, Clone)]
pub struct WaitOutcome {
    /// Count the caller asked for
    pub expected: usize,
    /// Count actually captured when the window closed
    pub observed: usize,
    /// Snapshot of the captured list, in arrival order
    pub captured: Vec<CapturedEvent>,
    /// Quiescence window that was waited out
    pub window: Duration,
    /// When the wait began
    pub started_at: Instant,
    /// Total time spent inside the wait
    pub elapsed: Duration,
    /// Whether the waiter was armed when the wait began
    pub was_armed: bool,
}

impl WaitOutcome {
    /// `observed == expected`
    #[inline]
    #[must_use]
    pub fn met_expectation(&self) -> bool {
        self.observed == self.expected
    }
}

/// Quiescence-based event waiter
///
/// One instance per test session, shared with providers through an `Arc`.
#[derive(Debug)]
pub struct EventWaiter {
    config: WaiterConfig,
    state: Mutex<WaiterState>,
    ready: Condvar,
    new_data: Condvar,
}

impl EventWaiter {
    /// Create a waiter with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(WaiterConfig::default())
    }

    /// Create a waiter with custom configuration
    #[must_use]
    pub fn with_config(config: WaiterConfig) -> Self {
        Self {
            config,
            state: Mutex::new(WaiterState::new()),
            ready: Condvar::new(),
            new_data: Condvar::new(),
        }
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &WaiterConfig {
        &self.config
    }

    /// Prepare for a new wait cycle
    ///
    /// Call before subscribing the provider callback. Captured events are
    /// kept, so several subscriptions can be armed ahead of a single wait.
    pub fn arm(&self) {
        let mut state = self.state.lock();
        state.ready_to_receive = false;
        state.new_data = false;
        state.waited = false;
        state.armed = true;
        tracing::info!(
            generation = state.generation,
            captured = state.captured.len(),
            "armed event waiter"
        );
    }

    /// Block until no event has arrived for the quiescence window
    ///
    /// Always waits the window out, even when `expected` events are already
    /// captured. Never fails: compare `observed` with `expected` on the
    /// returned outcome.
    pub fn wait_for_events(&self, expected: usize, quiescence: Duration) -> WaitOutcome {
        let window = self.config.quiescence_mode.window(expected, quiescence);
        tracing::info!(
            expected,
            window_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX),
            "waiting for a period of no events"
        );

        let started_at = Instant::now();
        let mut state = self.state.lock();
        let was_armed = state.armed;
        if !was_armed {
            tracing::warn!("wait_for_events called on an unarmed waiter; results may be empty or stale");
        }
        state.waited = true;
        state.last_arrival = started_at;

        loop {
            let idle = state.last_arrival.elapsed();
            if idle >= window {
                break;
            }

            state.ready_to_receive = true;
            self.ready.notify_all();

            if !state.new_data {
                let _ = self.new_data.wait_for(&mut state, window - idle);
            }
            state.new_data = false;
            tracing::trace!(captured = state.captured.len(), "wait iteration");
        }

        state.stats.waits += 1;
        let captured = state.captured.clone();
        drop(state);

        let observed = captured.len();
        tracing::info!(observed, expected, "stopped waiting for events");

        WaitOutcome {
            expected,
            observed,
            captured,
            window,
            started_at,
            elapsed: started_at.elapsed(),
            was_armed,
        }
    }

    /// Wait using the configured default quiescence
    pub fn wait_for_default(&self, expected: usize) -> WaitOutcome {
        self.wait_for_events(expected, self.config.default_quiescence)
    }

    /// Run [`EventWaiter::wait_for_events`] on tokio's blocking pool
    ///
    /// # Errors
    /// Returns `WaiterError::Join` if the blocking task panicked or was
    /// cancelled by runtime shutdown.
    pub async fn wait_for_events_async(
        self: Arc<Self>,
        expected: usize,
        quiescence: Duration,
    ) -> Result<WaitOutcome, WaiterError> {
        let outcome =
            tokio::task::spawn_blocking(move || self.wait_for_events(expected, quiescence)).await?;
        Ok(outcome)
    }

    /// Clear captured events and disarm
    ///
    /// Returns how many events were cleared. Provider callbacks still held
    /// at the receive gate drop their event.
    pub fn purge(&self) -> usize {
        let mut state = self.state.lock();
        let cleared = state.captured.len();
        tracing::info!(cleared, "clearing captured events");

        state.captured.clear();
        state.armed = false;
        state.ready_to_receive = false;
        state.new_data = false;
        state.waited = false;
        state.generation += 1;
        state.stats.purged_total += cleared as u64;
        self.ready.notify_all();
        cleared
    }

    /// Number of captured events
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.state.lock().captured.len()
    }

    /// Snapshot of captured events
    #[must_use]
    pub fn captured(&self) -> Vec<CapturedEvent> {
        self.state.lock().captured.clone()
    }

    /// Whether the waiter currently accepts events
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.state.lock().armed
    }

    /// Whether a wait completed since the last arm or purge
    #[must_use]
    pub fn has_waited(&self) -> bool {
        self.state.lock().waited
    }

    /// Lifetime counters
    #[must_use]
    pub fn stats(&self) -> WaiterStats {
        self.state.lock().stats
    }

    fn record(&self, source: ElementId, payload: EventPayload) {
        let mut state = self.state.lock();
        if !state.armed {
            state.stats.discarded_unarmed += 1;
            tracing::debug!(%source, kind = %payload.kind(), "discarding event on unarmed waiter");
            return;
        }

        let generation = state.generation;
        if let Some(gate) = self.config.receive_gate {
            let deadline = Instant::now() + gate;
            loop {
                if state.ready_to_receive || state.generation != generation {
                    break;
                }
                if self.ready.wait_until(&mut state, deadline).timed_out() {
                    if !state.ready_to_receive && state.generation == generation {
                        state.stats.gate_timeouts += 1;
                        tracing::warn!(%source, "no wait in progress after receive gate timeout; appending anyway");
                    }
                    break;
                }
            }
            if state.generation != generation {
                state.stats.discarded_unarmed += 1;
                tracing::debug!(%source, "waiter purged while event was held; discarding");
                return;
            }
        }

        let arrived_at = Instant::now();
        state.last_arrival = arrived_at;
        let sequence = state.captured.len();
        tracing::debug!(
            index = sequence,
            count = sequence + 1,
            %source,
            kind = %payload.kind(),
            "FIRED!! {}",
            payload.describe()
        );
        state.captured.push(CapturedEvent {
            sequence,
            source,
            payload,
            arrived_at,
        });
        state.stats.captured_total += 1;

        if self.config.receive_gate.is_some() {
            state.ready_to_receive = false;
        }
        state.new_data = true;
        self.new_data.notify_all();
    }
}

impl Default for EventWaiter {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for EventWaiter {
    fn on_provider_event(&self, source: ElementId, payload: EventPayload) {
        self.record(source, payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ids, EventKind, StructureChangeType};
    use std::thread;

    fn ungated() -> EventWaiter {
        EventWaiter::with_config(WaiterConfig::new().without_receive_gate())
    }

    fn name_change(n: u32) -> EventPayload {
        EventPayload::property_changed(ids::NAME, n, n + 1)
    }

    #[test]
    fn events_before_arm_are_discarded() {
        let waiter = ungated();
        waiter.on_provider_event(ElementId::new(), name_change(0));

        assert_eq!(waiter.event_count(), 0);
        assert_eq!(waiter.stats().discarded_unarmed, 1);

        waiter.arm();
        waiter.on_provider_event(ElementId::new(), name_change(1));
        assert_eq!(waiter.event_count(), 1);
    }

    #[test]
    fn empty_wait_lasts_the_window() {
        let waiter = ungated();
        waiter.arm();

        let outcome = waiter.wait_for_events(0, Duration::from_millis(80));

        assert_eq!(outcome.observed, 0);
        assert!(outcome.captured.is_empty());
        assert!(outcome.met_expectation());
        assert!(outcome.elapsed >= Duration::from_millis(80));
        assert!(outcome.elapsed < Duration::from_secs(2));
    }

    #[test]
    fn captured_in_dispatch_order() {
        let waiter = ungated();
        waiter.arm();
        let source = ElementId::new();
        for i in 0..5 {
            waiter.on_provider_event(source, name_change(i));
        }

        let outcome = waiter.wait_for_events(5, Duration::from_millis(20));

        assert_eq!(outcome.observed, 5);
        for (i, event) in outcome.captured.iter().enumerate() {
            assert_eq!(event.sequence, i);
            assert_eq!(event.payload, name_change(u32::try_from(i).unwrap()));
        }
    }

    #[test]
    fn does_not_return_early_when_expected_reached() {
        let waiter = ungated();
        waiter.arm();
        waiter.on_provider_event(ElementId::new(), name_change(0));

        let outcome = waiter.wait_for_events(1, Duration::from_millis(120));

        assert_eq!(outcome.observed, 1);
        assert!(outcome.elapsed >= Duration::from_millis(120));
    }

    #[test]
    fn purge_clears_and_disarms() {
        let waiter = ungated();
        waiter.arm();
        waiter.on_provider_event(ElementId::new(), name_change(0));
        waiter.on_provider_event(ElementId::new(), name_change(1));

        assert_eq!(waiter.purge(), 2);
        assert!(!waiter.is_armed());
        assert_eq!(waiter.event_count(), 0);

        waiter.on_provider_event(ElementId::new(), name_change(2));
        waiter.arm();
        let outcome = waiter.wait_for_events(0, Duration::from_millis(10));
        assert_eq!(outcome.observed, 0);
        assert_eq!(waiter.stats().purged_total, 2);
    }

    #[test]
    fn arm_keeps_events_from_earlier_subscriptions() {
        let waiter = ungated();
        waiter.arm();
        waiter.on_provider_event(
            ElementId::new(),
            EventPayload::StructureChanged {
                change: StructureChangeType::ChildAdded,
            },
        );
        waiter.arm();
        waiter.on_provider_event(ElementId::new(), EventPayload::Generic { event: ids::INVOKED });

        let outcome = waiter.wait_for_events(2, Duration::from_millis(10));
        let kinds: Vec<_> = outcome.captured.iter().map(CapturedEvent::kind).collect();
        assert_eq!(kinds, vec![EventKind::StructureChanged, EventKind::Generic]);
    }

    #[test]
    fn unarmed_wait_is_flagged() {
        let waiter = ungated();
        let outcome = waiter.wait_for_events(1, Duration::from_millis(10));

        assert!(!outcome.was_armed);
        assert_eq!(outcome.observed, 0);
        assert!(!outcome.met_expectation());
        assert!(waiter.has_waited());
    }

    #[test]
    fn gate_holds_provider_until_wait_starts() {
        let waiter = Arc::new(EventWaiter::with_config(
            WaiterConfig::new().with_receive_gate(Duration::from_secs(5)),
        ));
        waiter.arm();

        let sink = Arc::clone(&waiter);
        let provider = thread::spawn(move || {
            sink.on_provider_event(ElementId::new(), name_change(0));
        });

        thread::sleep(Duration::from_millis(100));
        assert_eq!(waiter.event_count(), 0);

        let outcome = waiter.wait_for_events(1, Duration::from_millis(100));
        provider.join().unwrap();

        assert_eq!(outcome.observed, 1);
        assert!(outcome.captured[0].arrived_at >= outcome.started_at);
        assert_eq!(waiter.stats().gate_timeouts, 0);
    }

    #[test]
    fn gate_timeout_still_appends() {
        let waiter = EventWaiter::with_config(
            WaiterConfig::new().with_receive_gate(Duration::from_millis(20)),
        );
        waiter.arm();

        let before = Instant::now();
        waiter.on_provider_event(ElementId::new(), name_change(0));

        assert!(before.elapsed() >= Duration::from_millis(20));
        assert_eq!(waiter.event_count(), 1);
        assert_eq!(waiter.stats().gate_timeouts, 1);
    }

    #[test]
    fn purge_releases_held_provider() {
        let waiter = Arc::new(EventWaiter::with_config(
            WaiterConfig::new().with_receive_gate(Duration::from_secs(5)),
        ));
        waiter.arm();

        let sink = Arc::clone(&waiter);
        let provider = thread::spawn(move || {
            let start = Instant::now();
            sink.on_provider_event(ElementId::new(), name_change(0));
            start.elapsed()
        });

        thread::sleep(Duration::from_millis(50));
        waiter.purge();
        let held = provider.join().unwrap();

        assert!(held < Duration::from_secs(5));
        assert_eq!(waiter.event_count(), 0);
        assert_eq!(waiter.stats().discarded_unarmed, 1);
    }

    #[test]
    fn concurrent_gated_providers_all_land() {
        let waiter = Arc::new(EventWaiter::with_config(
            WaiterConfig::new().with_receive_gate(Duration::from_secs(2)),
        ));
        waiter.arm();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let sink = Arc::clone(&waiter);
                thread::spawn(move || sink.on_provider_event(ElementId::from_u128(i), name_change(0)))
            })
            .collect();

        let outcome = waiter.wait_for_events(8, Duration::from_millis(150));
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(outcome.observed, 8);
        let mut sources: Vec<_> = outcome.captured.iter().map(|e| e.source).collect();
        sources.sort();
        sources.dedup();
        assert_eq!(sources.len(), 8);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn async_wait_matches_sync_semantics() {
        let waiter = Arc::new(ungated());
        waiter.arm();
        waiter.on_provider_event(ElementId::new(), name_change(0));

        let outcome = Arc::clone(&waiter)
            .wait_for_events_async(1, Duration::from_millis(30))
            .await
            .unwrap();

        assert_eq!(outcome.observed, 1);
        assert!(outcome.elapsed >= Duration::from_millis(30));
    }
}
