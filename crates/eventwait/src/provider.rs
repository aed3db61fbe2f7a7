//! Scripted event provider
//!
//! Stand-in for the accessibility runtime: replays a script of events into an
//! [`EventSink`] from threads the caller does not drive.

use crate::types::{ElementId, EventPayload};
use crate::waiter::EventSink;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// One scripted event
#[derive(Debug, Clone)]
pub struct ScriptStep {
    /// Pause before firing, relative to the previous step on the same thread
    pub delay: Duration,
    /// Element raising the event
    pub source: ElementId,
    /// Event data
    pub payload: EventPayload,
}

/// Replays scripted events into a sink
pub struct ScriptedProvider {
    sink: Arc<dyn EventSink>,
    steps: Vec<ScriptStep>,
}

impl std::fmt::Debug for ScriptedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedProvider")
            .field("steps", &self.steps.len())
            .finish_non_exhaustive()
    }
}

/// Handle over the threads firing a script
#[derive(Debug)]
pub struct ProviderRun {
    handles: Vec<JoinHandle<usize>>,
}

impl ProviderRun {
    /// Wait for every firing thread; returns the number of events fired
    ///
    /// A panicking thread contributes zero.
    pub fn join(self) -> usize {
        self.handles
            .into_iter()
            .map(|h| h.join().unwrap_or(0))
            .sum()
    }
}

impl ScriptedProvider {
    /// Create an empty script targeting `sink`
    #[must_use]
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            sink,
            steps: Vec::new(),
        }
    }

    /// Append a step
    #[must_use]
    pub fn then(mut self, delay: Duration, source: ElementId, payload: EventPayload) -> Self {
        self.steps.push(ScriptStep {
            delay,
            source,
            payload,
        });
        self
    }

    /// Append an already built step
    #[must_use]
    pub fn step(mut self, step: ScriptStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Number of scripted steps
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the script is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Fire every step in order on one background thread
    #[must_use]
    pub fn spawn(self) -> ProviderRun {
        let Self { sink, steps } = self;
        let handle = thread::spawn(move || fire(&*sink, steps));
        ProviderRun {
            handles: vec![handle],
        }
    }

    /// Fire each step on its own thread, concurrently
    #[must_use]
    pub fn spawn_concurrent(self) -> ProviderRun {
        let Self { sink, steps } = self;
        let handles = steps
            .into_iter()
            .map(|step| {
                let sink = Arc::clone(&sink);
                thread::spawn(move || fire(&*sink, vec![step]))
            })
            .collect();
        ProviderRun { handles }
    }
}

fn fire(sink: &dyn EventSink, steps: Vec<ScriptStep>) -> usize {
    let mut fired = 0;
    for step in steps {
        if !step.delay.is_zero() {
            thread::sleep(step.delay);
        }
        sink.on_provider_event(step.source, step.payload);
        fired += 1;
    }
    fired
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ids;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        seen: Mutex<Vec<ElementId>>,
    }

    impl EventSink for RecordingSink {
        fn on_provider_event(&self, source: ElementId, _payload: EventPayload) {
            self.seen.lock().push(source);
        }
    }

    #[test]
    fn sequential_script_preserves_order() {
        let sink = Arc::new(RecordingSink::default());
        let ids_in: Vec<_> = (0..4).map(ElementId::from_u128).collect();

        let mut provider = ScriptedProvider::new(sink.clone());
        for id in &ids_in {
            provider = provider.then(Duration::from_millis(1), *id, EventPayload::Generic { event: ids::INVOKED });
        }
        assert_eq!(provider.len(), 4);

        assert_eq!(provider.spawn().join(), 4);
        assert_eq!(*sink.seen.lock(), ids_in);
    }

    #[test]
    fn concurrent_script_fires_everything() {
        let sink = Arc::new(RecordingSink::default());
        let mut provider = ScriptedProvider::new(sink.clone());
        for i in 0..8 {
            provider = provider.then(Duration::ZERO, ElementId::from_u128(i), EventPayload::Generic { event: ids::INVOKED });
        }

        assert_eq!(provider.spawn_concurrent().join(), 8);
        assert_eq!(sink.seen.lock().len(), 8);
    }

    #[test]
    fn empty_script() {
        let sink = Arc::new(RecordingSink::default());
        let provider = ScriptedProvider::new(sink);
        assert!(provider.is_empty());
        assert_eq!(provider.spawn().join(), 0);
    }
}
