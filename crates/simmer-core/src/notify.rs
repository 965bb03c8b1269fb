//! Session notifications.
//!
//! Observers are called synchronously, in registration order, from inside
//! the operation that caused the event and after that operation's
//! persistence write. They receive a shared reference and cannot call back
//! into the engine.

use std::sync::{Arc, Mutex};

pub use simmer_types::{ObserverId, ObserverSet};
use simmer_types::{Recipe, SessionState};

/// Something observable happened to the cooking session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Whole seconds remaining changed.
    TimeChanged(u64),
    /// The session moved to a new state. `is_cooking()` on the state is the
    /// active flag.
    StateChanged(SessionState),
    /// A recipe finished and its result was credited.
    Finished(Recipe),
}

/// Receiver of [`SessionEvent`]s.
pub trait SessionObserver: Send {
    /// Called once per event.
    fn on_event(&mut self, event: &SessionEvent);
}

impl<F> SessionObserver for F
where
    F: FnMut(&SessionEvent) + Send,
{
    fn on_event(&mut self, event: &SessionEvent) {
        self(event);
    }
}

/// An observer that records every event, shareable across clones.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<SessionEvent>>>,
}

impl EventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of everything recorded so far.
    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Discard everything recorded so far.
    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl SessionObserver for EventLog {
    fn on_event(&mut self, event: &SessionEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deliver(set: &mut ObserverSet<dyn SessionObserver>, event: &SessionEvent) {
        set.for_each(|observer| observer.on_event(event));
    }

    #[test]
    fn closures_and_logs_both_observe() {
        let order: Arc<Mutex<Vec<&'static str>>> = Arc::default();
        let log = EventLog::new();
        let mut set: ObserverSet<dyn SessionObserver> = ObserverSet::default();
        for name in ["first", "second"] {
            let order = Arc::clone(&order);
            set.subscribe(Box::new(move |_: &SessionEvent| {
                if let Ok(mut order) = order.lock() {
                    order.push(name);
                }
            }));
        }
        set.subscribe(Box::new(log.clone()));

        deliver(&mut set, &SessionEvent::TimeChanged(9));
        let seen = order.lock().map(|o| o.clone()).unwrap_or_default();
        assert_eq!(seen, vec!["first", "second"]);
        assert_eq!(log.events(), vec![SessionEvent::TimeChanged(9)]);
    }

    #[test]
    fn unsubscribed_log_stays_empty() {
        let log = EventLog::new();
        let mut set: ObserverSet<dyn SessionObserver> = ObserverSet::default();
        let id = set.subscribe(Box::new(log.clone()));

        assert!(set.unsubscribe(id));
        deliver(&mut set, &SessionEvent::StateChanged(SessionState::Running));
        assert!(log.events().is_empty());
    }

    #[test]
    fn clear_discards_history() {
        let log = EventLog::new();
        let mut set: ObserverSet<dyn SessionObserver> = ObserverSet::default();
        set.subscribe(Box::new(log.clone()));
        deliver(&mut set, &SessionEvent::TimeChanged(1));
        log.clear();
        assert!(log.events().is_empty());
    }
}
