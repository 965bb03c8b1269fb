//! Observer registration shared by the session engine, the energy pool and
//! the inventory ledger.
//!
//! Each owner keeps an [`ObserverSet`] of its own observer trait object and
//! delivers to it synchronously, in registration order, after the write
//! that persisted the change.

/// Handle returned by subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObserverId(u64);

/// Registered observers in registration order.
pub struct ObserverSet<O: ?Sized> {
    next_id: u64,
    observers: Vec<(ObserverId, Box<O>)>,
}

impl<O: ?Sized> Default for ObserverSet<O> {
    fn default() -> Self {
        Self {
            next_id: 0,
            observers: Vec::new(),
        }
    }
}

impl<O: ?Sized> core::fmt::Debug for ObserverSet<O> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ObserverSet")
            .field("count", &self.observers.len())
            .finish()
    }
}

impl<O: ?Sized> ObserverSet<O> {
    /// Register an observer.
    pub fn subscribe(&mut self, observer: Box<O>) -> ObserverId {
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

    /// Whether nobody is listening.
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Hand every observer to `deliver`, in registration order.
    pub fn for_each(&mut self, mut deliver: impl FnMut(&mut O)) {
        for (_, observer) in &mut self.observers {
            deliver(observer.as_mut());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Tally = dyn FnMut(u32) -> u32 + Send;

    #[test]
    fn delivery_in_registration_order() {
        let mut set: ObserverSet<Tally> = ObserverSet::default();
        set.subscribe(Box::new(|n| n.saturating_add(1)));
        set.subscribe(Box::new(|n| n.saturating_mul(10)));

        let mut value = 1;
        set.for_each(|observer| value = observer(value));
        assert_eq!(value, 20);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let mut set: ObserverSet<Tally> = ObserverSet::default();
        let id = set.subscribe(Box::new(|n| n));
        assert_eq!(set.len(), 1);

        assert!(set.unsubscribe(id));
        assert!(!set.unsubscribe(id));
        assert!(set.is_empty());

        let mut calls = 0_u32;
        set.for_each(|_| calls = calls.saturating_add(1));
        assert_eq!(calls, 0);
    }

    #[test]
    fn ids_are_distinct() {
        let mut set: ObserverSet<Tally> = ObserverSet::default();
        let a = set.subscribe(Box::new(|n| n));
        let b = set.subscribe(Box::new(|n| n));
        assert_ne!(a, b);
    }
}
