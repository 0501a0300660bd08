//! Observer registry for session events.
//!
//! Presentation collaborators register a [`SessionObserver`] and receive
//! every [`SessionEvent`] exactly once, in emission order. Observers are
//! purely reactive: they are invoked while the session is locked and must
//! not call back into the session. Anything that needs to react with a
//! session call should forward the event through a [`ChannelObserver`] and
//! act on it from its own task.

use spacerun_types::SessionEvent;
use tokio::sync::mpsc;
use tracing::debug;

/// Receives session events.
pub trait SessionObserver: Send {
    /// Called once per emitted event.
    fn on_event(&mut self, event: &SessionEvent);
}

/// A no-op observer for testing.
pub struct NoOpObserver;

impl SessionObserver for NoOpObserver {
    fn on_event(&mut self, _event: &SessionEvent) {}
}

/// Forwards every event into an unbounded Tokio channel.
///
/// Events sent after the receiver is dropped are discarded.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl ChannelObserver {
    /// Create an observer and the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl SessionObserver for ChannelObserver {
    fn on_event(&mut self, event: &SessionEvent) {
        if self.tx.send(event.clone()).is_err() {
            debug!(event = event.name(), "event receiver dropped");
        }
    }
}

/// Handle returned by [`ObserverRegistry::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Ordered set of registered observers.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: Vec<(ObserverId, Box<dyn SessionObserver>)>,
    next_id: u64,
}

impl ObserverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer. It receives events emitted from now on.
    pub fn subscribe(&mut self, observer: Box<dyn SessionObserver>) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.observers.push((id, observer));
        id
    }

    /// Remove an observer. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(existing, _)| *existing != id);
        self.observers.len() != before
    }

    /// Number of registered observers.
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Whether no observer is registered.
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Deliver `event` to every observer in registration order.
    pub fn dispatch(&mut self, event: &SessionEvent) {
        for (_, observer) in &mut self.observers {
            observer.on_event(event);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    struct Recording {
        label: &'static str,
        log: Arc<Mutex<Vec<(&'static str, String)>>>,
    }

    impl SessionObserver for Recording {
        fn on_event(&mut self, event: &SessionEvent) {
            self.log
                .lock()
                .unwrap()
                .push((self.label, event.name().to_owned()));
        }
    }

    #[test]
    fn dispatch_reaches_every_observer_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ObserverRegistry::new();
        let _ = registry.subscribe(Box::new(Recording {
            label: "first",
            log: Arc::clone(&log),
        }));
        let _ = registry.subscribe(Box::new(Recording {
            label: "second",
            log: Arc::clone(&log),
        }));

        registry.dispatch(&SessionEvent::ScoreChanged { score: 1 });

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log.first().unwrap().0, "first");
        assert_eq!(log.get(1).unwrap().0, "second");
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ObserverRegistry::new();
        let id = registry.subscribe(Box::new(Recording {
            label: "only",
            log: Arc::clone(&log),
        }));

        assert!(registry.unsubscribe(id));
        assert!(!registry.unsubscribe(id));
        assert!(registry.is_empty());

        registry.dispatch(&SessionEvent::ScoreChanged { score: 1 });
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn channel_observer_forwards_events() {
        let (observer, mut rx) = ChannelObserver::channel();
        let mut registry = ObserverRegistry::new();
        let _ = registry.subscribe(Box::new(observer));
        let _ = registry.subscribe(Box::new(NoOpObserver));
        assert_eq!(registry.len(), 2);

        registry.dispatch(&SessionEvent::SoundToggled { enabled: false });
        assert_eq!(
            rx.try_recv().unwrap(),
            SessionEvent::SoundToggled { enabled: false }
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn channel_observer_survives_dropped_receiver() {
        let (mut observer, rx) = ChannelObserver::channel();
        drop(rx);
        observer.on_event(&SessionEvent::ScoreChanged { score: 3 });
    }
}
