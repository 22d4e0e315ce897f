//! Generation tokens tying reusable list slots to their current content.
//!
//! A slot is rebound every time the list recycles it. Each bind hands out a
//! new [`SlotTicket`]; a delivery carrying an older ticket for the same slot
//! is stale and must not touch the slot.

use std::collections::HashMap;

/// Monotonic bind counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

/// `(slot, generation)` captured when a request is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotTicket {
    /// Slot index.
    pub slot: usize,
    /// Generation the slot was bound to.
    pub generation: Generation,
}

/// Current binding of every slot. Owned by one control loop.
#[derive(Debug, Default)]
pub struct SlotBindings {
    current: HashMap<usize, Generation>,
    next: u64,
}

impl SlotBindings {
    /// Creates an empty binding table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `slot` to fresh content, superseding any earlier ticket.
    pub fn bind(&mut self, slot: usize) -> SlotTicket {
        self.next += 1;
        let generation = Generation(self.next);
        self.current.insert(slot, generation);
        SlotTicket { slot, generation }
    }

    /// Returns true while `ticket` is the slot's latest binding.
    #[must_use]
    pub fn is_current(&self, ticket: &SlotTicket) -> bool {
        self.current.get(&ticket.slot) == Some(&ticket.generation)
    }

    /// Forgets `slot`; outstanding tickets for it become stale.
    pub fn unbind(&mut self, slot: usize) {
        self.current.remove(&slot);
    }

    /// Number of bound slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.current.len()
    }

    /// Returns true if no slot is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_ticket_is_current() {
        let mut bindings = SlotBindings::new();
        let ticket = bindings.bind(3);
        assert!(bindings.is_current(&ticket));
    }

    #[test]
    fn test_rebind_makes_previous_ticket_stale() {
        let mut bindings = SlotBindings::new();
        let first = bindings.bind(3);
        let second = bindings.bind(3);

        assert!(!bindings.is_current(&first));
        assert!(bindings.is_current(&second));
        assert!(second.generation > first.generation);
    }

    #[test]
    fn test_slots_are_independent() {
        let mut bindings = SlotBindings::new();
        let a = bindings.bind(0);
        let b = bindings.bind(1);
        bindings.bind(1);

        assert!(bindings.is_current(&a));
        assert!(!bindings.is_current(&b));
        assert_eq!(bindings.len(), 2);
    }

    #[test]
    fn test_unbind_invalidates_ticket() {
        let mut bindings = SlotBindings::new();
        let ticket = bindings.bind(7);
        bindings.unbind(7);

        assert!(!bindings.is_current(&ticket));
        assert!(bindings.is_empty());
    }

    #[test]
    fn test_ticket_for_other_slot_never_matches() {
        let mut bindings = SlotBindings::new();
        let ticket = bindings.bind(2);
        let forged = SlotTicket {
            slot: 4,
            generation: ticket.generation,
        };
        assert!(!bindings.is_current(&forged));
    }
}
