//! Per-node flooding state machine.
//!
//! Pure, synchronous and owned by exactly one worker. The async worker in
//! [`crate::worker`] only moves messages between this state and the links.

use serde::Serialize;

/// A strict increase of a node's known maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MaxUpdate {
    pub old: u64,
    pub new: u64,
}

/// What a node knows: its seed, the best maximum seen so far, and which
/// neighbors have not yet been told about that maximum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaxState {
    value: u64,
    max: u64,
    needs_send: Vec<bool>,
}

impl MaxState {
    /// Initial state for a node with `ports` neighbors.
    ///
    /// Every neighbor starts flagged: each must hear the seed at least once.
    pub fn new(value: u64, ports: usize) -> Self {
        Self {
            value,
            max: value,
            needs_send: vec![true; ports],
        }
    }

    /// The node's own seed.
    pub fn value(&self) -> u64 {
        self.value
    }

    /// Best maximum known. Never decreases.
    pub fn max(&self) -> u64 {
        self.max
    }

    /// Whether neighbor `port` still has to hear the current maximum.
    pub fn needs_send(&self, port: usize) -> bool {
        self.needs_send.get(port).copied().unwrap_or(false)
    }

    /// Number of neighbors still to be told.
    pub fn pending(&self) -> usize {
        self.needs_send.iter().filter(|&&flag| flag).count()
    }

    /// Nothing left to tell anyone.
    pub fn is_quiescent(&self) -> bool {
        self.pending() == 0
    }

    /// Apply a neighbor's reported maximum.
    ///
    /// A larger payload raises `max` and re-flags every neighbor, including
    /// the one that reported it. Anything else is discarded unchanged.
    pub fn observe(&mut self, payload: u64) -> Option<MaxUpdate> {
        if payload <= self.max {
            return None;
        }

        let update = MaxUpdate {
            old: self.max,
            new: payload,
        };
        self.max = payload;
        self.needs_send.iter_mut().for_each(|flag| *flag = true);
        Some(update)
    }

    /// Clear the flag for `port` after its send succeeded.
    pub fn mark_sent(&mut self, port: usize) {
        if let Some(flag) = self.needs_send.get_mut(port) {
            *flag = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn initial_state_flags_every_neighbor() {
        let state = MaxState::new(42, 3);
        assert_eq!(state.value(), 42);
        assert_eq!(state.max(), 42);
        assert_eq!(state.pending(), 3);
        assert!((0..3).all(|i| state.needs_send(i)));
    }

    #[test]
    fn isolated_node_is_quiescent() {
        let state = MaxState::new(4, 0);
        assert!(state.is_quiescent());
        assert!(!state.needs_send(0));
    }

    #[test]
    fn larger_payload_reflags_all() {
        let mut state = MaxState::new(3, 3);
        (0..3).for_each(|i| state.mark_sent(i));
        assert!(state.is_quiescent());

        let update = state.observe(9);
        assert_eq!(update, Some(MaxUpdate { old: 3, new: 9 }));
        assert_eq!(state.max(), 9);
        assert_eq!(state.pending(), 3);
        assert_eq!(state.value(), 3);
    }

    #[test]
    fn redelivery_is_idempotent() {
        let mut state = MaxState::new(3, 2);
        state.observe(9);
        state.mark_sent(0);
        state.mark_sent(1);

        let before = state.clone();
        assert_eq!(state.observe(9), None);
        assert_eq!(state.observe(5), None);
        assert_eq!(state, before);
    }

    #[test]
    fn mark_sent_out_of_range_is_ignored() {
        let mut state = MaxState::new(1, 1);
        state.mark_sent(5);
        assert_eq!(state.pending(), 1);
    }

    proptest! {
        #[test]
        fn max_is_monotone(seed in 0u64..1000, payloads in prop::collection::vec(0u64..1000, 0..64)) {
            let mut state = MaxState::new(seed, 4);
            let mut last = state.max();
            for payload in payloads {
                let update = state.observe(payload);
                prop_assert!(state.max() >= last);
                prop_assert_eq!(update.is_some(), state.max() > last);
                prop_assert_eq!(state.max(), last.max(payload));
                last = state.max();
            }
            prop_assert_eq!(state.value(), seed);
        }
    }
}
