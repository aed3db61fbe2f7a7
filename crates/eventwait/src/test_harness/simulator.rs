//! Waiter Simulator - concurrent provider rounds
//!
//! Each round arms a waiter, starts several provider threads firing scripted
//! events with random spacing, waits for quiescence, verifies the capture and
//! purges. Between rounds an orphan event is fired at the purged waiter.
//!
//! Key invariants checked:
//! - Every dispatched event is captured exactly once
//! - Events from one thread keep their dispatch order
//! - The wait never returns before the quiescence window closes
//! - Events fired while unarmed never show up in a later round

use crate::config::WaiterConfig;
use crate::provider::{ProviderRun, ScriptedProvider};
use crate::types::{ids, CapturedEvent, ElementId, EventPayload};
use crate::waiter::{EventSink, EventWaiter, WaiterStats};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Source used for events fired at a purged waiter
const ORPHAN_SOURCE: ElementId = ElementId::from_u128(u128::MAX);

/// Simulator configuration
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Arm/wait/purge cycles
    pub rounds: u32,
    /// Provider threads per round
    pub threads: u32,
    /// Events each provider thread fires per round
    pub events_per_thread: u32,
    /// Upper bound of the random pause before each event
    pub max_spacing: Duration,
    /// Quiescence passed to every wait
    pub quiescence: Duration,
    /// Waiter under test
    pub waiter: WaiterConfig,
    /// Stop at the first violating round
    pub stop_on_first_violation: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            rounds: 5,
            threads: 4,
            events_per_thread: 3,
            max_spacing: Duration::from_millis(20),
            quiescence: Duration::from_millis(100),
            waiter: WaiterConfig::default(),
            stop_on_first_violation: false,
        }
    }
}

/// A violation detected during simulation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Violation {
    /// Fewer events captured than dispatched
    LostEvents { round: u32, dispatched: usize, captured: usize },
    /// The same dispatched event captured more than once
    DuplicatedEvent { round: u32, thread: u64, index: u64 },
    /// Events from one thread captured out of dispatch order
    OrderBroken { round: u32, thread: u64 },
    /// Wait returned before the window closed
    EarlyReturn { round: u32, elapsed_ms: u64, window_ms: u64 },
    /// An event fired at the purged waiter leaked into a round
    PrearmLeak { round: u32 },
    /// Captured event that no thread dispatched
    UnknownEvent { round: u32 },
}

/// Statistics for simulation
#[derive(Debug, Clone, Default, Serialize)]
pub struct SimulatorStats {
    pub rounds_run: u32,
    pub events_dispatched: u64,
    pub events_captured: u64,
    pub longest_wait_ms: u64,
    pub waiter: WaiterStats,
}

/// Final report from simulator
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub seed: u64,
    pub stats: SimulatorStats,
    pub violations: Vec<Violation>,
}

impl SimulationReport {
    /// Check if simulation passed all criteria
    #[must_use]
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Generate text report
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Event Waiter Simulation Report ===\n\n");
        report.push_str(&format!("Seed: {}\n", self.seed));
        report.push_str(&format!("Rounds Run: {}\n", self.stats.rounds_run));
        report.push_str(&format!("Events Dispatched: {}\n", self.stats.events_dispatched));
        report.push_str(&format!("Events Captured: {}\n", self.stats.events_captured));
        report.push_str(&format!("Longest Wait: {}ms\n", self.stats.longest_wait_ms));
        report.push_str(&format!("Discarded While Unarmed: {}\n", self.stats.waiter.discarded_unarmed));
        report.push_str(&format!("Receive Gate Timeouts: {}\n", self.stats.waiter.gate_timeouts));
        report.push_str(&format!("Violations: {}\n", self.violations.len()));

        if !self.violations.is_empty() {
            report.push_str("\n=== Violations ===\n");
            for (i, v) in self.violations.iter().enumerate() {
                report.push_str(&format!("{}. {:?}\n", i + 1, v));
            }
        }

        report.push_str(&format!(
            "\n=== Result: {} ===\n",
            if self.passed() { "PASS" } else { "FAIL" }
        ));

        report
    }

    /// Render the report as pretty JSON
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Run the waiter simulator
#[must_use]
pub fn run_simulation(config: &SimulatorConfig) -> SimulationReport {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let waiter = Arc::new(EventWaiter::with_config(config.waiter.clone()));
    let mut stats = SimulatorStats::default();
    let mut violations = Vec::new();

    tracing::info!(seed = config.seed, rounds = config.rounds, threads = config.threads, "starting simulation");

    for round in 0..config.rounds {
        waiter.arm();

        let runs = spawn_round(&mut rng, config, &waiter);
        let dispatched = (config.threads as usize) * (config.events_per_thread as usize);
        let outcome = waiter.wait_for_events(dispatched, config.quiescence);
        let joined: usize = runs.into_iter().map(ProviderRun::join).sum();

        stats.rounds_run += 1;
        stats.events_dispatched += joined as u64;
        stats.events_captured += outcome.observed as u64;
        stats.longest_wait_ms = stats
            .longest_wait_ms
            .max(u64::try_from(outcome.elapsed.as_millis()).unwrap_or(u64::MAX));

        let before = violations.len();
        check_round(round, joined, &outcome.captured, &mut violations);
        if outcome.elapsed < outcome.window {
            violations.push(Violation::EarlyReturn {
                round,
                elapsed_ms: u64::try_from(outcome.elapsed.as_millis()).unwrap_or(u64::MAX),
                window_ms: u64::try_from(outcome.window.as_millis()).unwrap_or(u64::MAX),
            });
        }

        // Anything still in flight after joining would be a late event
        let late = waiter.event_count().saturating_sub(outcome.observed);
        if late > 0 {
            tracing::warn!(round, late, "events arrived after the wait returned");
        }

        waiter.purge();
        waiter.on_provider_event(ORPHAN_SOURCE, EventPayload::Generic { event: ids::WINDOW_CLOSED });

        if violations.len() > before {
            tracing::warn!(round, new = violations.len() - before, "round produced violations");
            if config.stop_on_first_violation {
                break;
            }
        }
    }

    stats.waiter = waiter.stats();
    SimulationReport {
        seed: config.seed,
        stats,
        violations,
    }
}

/// Start one provider thread per configured thread, each with its own script
fn spawn_round(rng: &mut StdRng, config: &SimulatorConfig, waiter: &Arc<EventWaiter>) -> Vec<ProviderRun> {
    let max_spacing_ms = u64::try_from(config.max_spacing.as_millis()).unwrap_or(u64::MAX);
    (0..config.threads)
        .map(|thread| {
            let sink: Arc<dyn EventSink> = waiter.clone();
            let source = ElementId::from_u128(u128::from(thread));
            let mut provider = ScriptedProvider::new(sink);
            for index in 0..config.events_per_thread {
                let delay = Duration::from_millis(rng.gen_range(0..=max_spacing_ms));
                provider = provider.then(delay, source, tagged_payload(thread, index));
            }
            provider.spawn()
        })
        .collect()
}

fn tagged_payload(thread: u32, index: u32) -> EventPayload {
    EventPayload::property_changed(
        ids::VALUE,
        serde_json::Value::Null,
        serde_json::json!({ "thread": thread, "index": index }),
    )
}

fn tag_of(event: &CapturedEvent) -> Option<(u64, u64)> {
    match &event.payload {
        EventPayload::PropertyChanged { new_value, .. } => {
            Some((new_value.get("thread")?.as_u64()?, new_value.get("index")?.as_u64()?))
        }
        _ => None,
    }
}

fn check_round(round: u32, dispatched: usize, captured: &[CapturedEvent], violations: &mut Vec<Violation>) {
    if captured.iter().any(|e| e.source == ORPHAN_SOURCE) {
        violations.push(Violation::PrearmLeak { round });
    }

    let mut last_index: HashMap<u64, u64> = HashMap::new();
    let mut seen = std::collections::HashSet::new();
    for event in captured.iter().filter(|e| e.source != ORPHAN_SOURCE) {
        let Some((thread, index)) = tag_of(event) else {
            violations.push(Violation::UnknownEvent { round });
            continue;
        };
        if !seen.insert((thread, index)) {
            violations.push(Violation::DuplicatedEvent { round, thread, index });
            continue;
        }
        if let Some(prev) = last_index.insert(thread, index) {
            if prev > index {
                violations.push(Violation::OrderBroken { round, thread });
            }
        }
    }

    if seen.len() < dispatched {
        violations.push(Violation::LostEvents {
            round,
            dispatched,
            captured: seen.len(),
        });
    }
}
