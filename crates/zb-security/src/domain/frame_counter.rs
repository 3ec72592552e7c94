//! # Frame Counter Tracker
//!
//! Anti-replay state per (peer, counter scope). A scope names the key id
//! carried by the frame and the stored key that verified it, so two keys
//! that are valid at the same time never share a counter. A counter is
//! accepted only when it is strictly above the last accepted value, unless
//! an out-of-band reset has been authorized, in which case any value below
//! the reset window is accepted once.
//!
//! Checking and committing are separate steps so that a frame whose MIC
//! fails never advances the stored counter.

use crate::domain::entities::{
    ExtendedAddress, KeyId, FRAME_COUNTER_RESET_MAX, MAX_FRAME_COUNTER,
};
use crate::domain::errors::SecurityError;
use crate::domain::key_store::KeySlot;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Key an incoming counter is tracked against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CounterScope {
    /// Key identifier carried by the frame
    pub key_id: KeyId,
    /// Store slot of the key that verified the frame
    pub slot: KeySlot,
}

impl CounterScope {
    /// Scope for frames under `key_id` verified by the key in `slot`.
    pub fn new(key_id: KeyId, slot: KeySlot) -> Self {
        Self { key_id, slot }
    }

    /// Scope of network key `sequence`.
    pub fn network(sequence: u8) -> Self {
        Self::new(KeyId::Network, KeySlot::Network { sequence })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct CounterState {
    last_accepted: u32,
    reset_authorized: bool,
}

/// Persisted incoming counter for one (peer, scope).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterRecord {
    /// Sender extended address
    pub peer: ExtendedAddress,
    /// Key the counter belongs to
    pub scope: CounterScope,
    /// Last accepted frame counter
    pub last_accepted: u32,
}

/// Incoming frame counters of every known peer.
#[derive(Clone, Debug)]
pub struct FrameCounterTracker {
    reset_max: u32,
    entries: HashMap<(ExtendedAddress, CounterScope), CounterState>,
}

impl Default for FrameCounterTracker {
    fn default() -> Self {
        Self::new(FRAME_COUNTER_RESET_MAX)
    }
}

impl FrameCounterTracker {
    /// Tracker accepting resets to values below `reset_max`.
    pub fn new(reset_max: u32) -> Self {
        Self {
            reset_max,
            entries: HashMap::new(),
        }
    }

    /// Exclusive upper bound for a reset value.
    pub fn reset_max(&self) -> u32 {
        self.reset_max
    }

    /// Would `incoming` be accepted? Does not change state.
    ///
    /// # Errors
    ///
    /// `CounterExhausted` for `0xFFFFFFFF`, `Replay` when `incoming` is not
    /// above the stored value and no reset covers it.
    pub fn check(
        &self,
        peer: ExtendedAddress,
        scope: CounterScope,
        incoming: u32,
    ) -> Result<(), SecurityError> {
        if incoming == MAX_FRAME_COUNTER {
            return Err(SecurityError::CounterExhausted);
        }
        match self.entries.get(&(peer, scope)) {
            None => Ok(()),
            Some(state) if incoming > state.last_accepted => Ok(()),
            Some(state) if state.reset_authorized && incoming < self.reset_max => Ok(()),
            Some(state) => Err(SecurityError::Replay {
                frame_counter: incoming,
                last_accepted: state.last_accepted,
            }),
        }
    }

    /// Record `incoming` as accepted and consume any pending reset.
    pub fn commit(&mut self, peer: ExtendedAddress, scope: CounterScope, incoming: u32) {
        self.entries.insert(
            (peer, scope),
            CounterState {
                last_accepted: incoming,
                reset_authorized: false,
            },
        );
    }

    /// [`check`](Self::check) then [`commit`](Self::commit).
    pub fn accept_and_advance(
        &mut self,
        peer: ExtendedAddress,
        scope: CounterScope,
        incoming: u32,
    ) -> Result<(), SecurityError> {
        self.check(peer, scope, incoming)?;
        self.commit(peer, scope, incoming);
        Ok(())
    }

    /// Allow the next accepted frame from `peer` under `key_id` to restart
    /// below the reset window, whichever key it arrives under. Returns
    /// false if nothing is stored yet.
    pub fn authorize_reset(&mut self, peer: ExtendedAddress, key_id: KeyId) -> bool {
        let mut authorized = false;
        for ((p, scope), state) in self.entries.iter_mut() {
            if *p == peer && scope.key_id == key_id {
                state.reset_authorized = true;
                authorized = true;
            }
        }
        authorized
    }

    /// Overwrite the stored counter with `value`.
    ///
    /// # Errors
    ///
    /// `Replay` if `value` is not below the reset window; the stored
    /// counter is left unchanged.
    pub fn reset(
        &mut self,
        peer: ExtendedAddress,
        scope: CounterScope,
        value: u32,
    ) -> Result<(), SecurityError> {
        if value >= self.reset_max {
            return Err(SecurityError::Replay {
                frame_counter: value,
                last_accepted: self.stored(peer, scope).unwrap_or(0),
            });
        }
        self.commit(peer, scope, value);
        Ok(())
    }

    /// Last accepted counter, if any.
    pub fn stored(&self, peer: ExtendedAddress, scope: CounterScope) -> Option<u32> {
        self.entries
            .get(&(peer, scope))
            .map(|state| state.last_accepted)
    }

    /// Scopes with a stored counter for `peer` under `key_id`.
    pub fn scopes(&self, peer: ExtendedAddress, key_id: KeyId) -> Vec<CounterScope> {
        self.entries
            .keys()
            .filter(|(p, scope)| *p == peer && scope.key_id == key_id)
            .map(|(_, scope)| *scope)
            .collect()
    }

    /// Drop one counter.
    pub fn forget(&mut self, peer: ExtendedAddress, scope: CounterScope) -> bool {
        self.entries.remove(&(peer, scope)).is_some()
    }

    /// Drop every counter of `peer`; returns how many were removed.
    pub fn forget_peer(&mut self, peer: ExtendedAddress) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(p, _), _| *p != peer);
        before - self.entries.len()
    }

    /// Drop every counter verified by the key in `slot`, e.g. once that key
    /// is replaced with new material.
    pub fn forget_slot(&mut self, slot: KeySlot) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(_, scope), _| scope.slot != slot);
        before - self.entries.len()
    }

    /// Number of tracked (peer, scope) pairs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored counters, sorted by peer, key id and slot.
    pub fn records(&self) -> Vec<CounterRecord> {
        let mut records: Vec<_> = self
            .entries
            .iter()
            .map(|(&(peer, scope), state)| CounterRecord {
                peer,
                scope,
                last_accepted: state.last_accepted,
            })
            .collect();
        records.sort_by_key(|r| (r.peer, r.scope.key_id, format!("{:?}", r.scope.slot)));
        records
    }

    /// Load persisted counters, replacing any with the same key.
    pub fn restore(&mut self, records: &[CounterRecord]) {
        for record in records {
            self.commit(record.peer, record.scope, record.last_accepted);
        }
    }
}
