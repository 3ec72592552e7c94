//! # Key Store
//!
//! Holds every key the stack can secure frames with, indexed by slot:
//!
//! | Slot | Key type | Scope |
//! |------|----------|-------|
//! | `Network { sequence }` | StandardNetwork | whole network, one active |
//! | `ApplicationLink { peer }` | ApplicationLink | one peer |
//! | `TrustCenterLink { peer }` | TrustCenterLink | one peer |
//! | `GlobalLink(kind)` | TrustCenterLink | any peer (preconfigured / distributed) |
//! | `Direct { key_type, peer }` | Zigbee Direct authorization | optional peer |
//!
//! Key-transport and key-load keys are never stored; they are derived from
//! the resolved link key with HMAC-AES-MMO and share its outgoing counter.

use crate::domain::entities::{
    EncryptType, ExtendedAddress, FrameCounter, KeyId, KeyType, ZIGBEE_ALLIANCE_09,
};
use crate::domain::errors::SecurityError;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use std::collections::HashMap;
use zb_crypto::{hmac_aes_mmo, SecretKey, KEY_SIZE};
use zeroize::Zeroize;

/// HMAC input deriving the key-transport key from a link key.
const TRANSPORT_KEY_INPUT: u8 = 0x00;

/// HMAC input deriving the key-load key from a link key.
const KEY_LOAD_KEY_INPUT: u8 = 0x02;

/// Which global link key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GlobalLinkKind {
    /// Preconfigured trust center link key (ZigBeeAlliance09 by default)
    Preconfigured,
    /// Distributed-security global link key
    Distributed,
}

/// Where a key lives in the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeySlot {
    /// Network key with its sequence number
    Network {
        /// Key sequence number
        sequence: u8,
    },
    /// Application link key shared with `peer`
    ApplicationLink {
        /// Peer extended address
        peer: ExtendedAddress,
    },
    /// Unique trust center link key of `peer`
    TrustCenterLink {
        /// Peer extended address
        peer: ExtendedAddress,
    },
    /// Global link key
    GlobalLink(GlobalLinkKind),
    /// Zigbee Direct authorization key
    Direct {
        /// One of the 0xB0-0xB3 key types
        key_type: KeyType,
        /// Peer, for per-device authorization keys
        peer: Option<ExtendedAddress>,
    },
}

impl KeySlot {
    /// Key class stored in this slot.
    pub fn key_type(&self) -> KeyType {
        match self {
            Self::Network { .. } => KeyType::StandardNetwork,
            Self::ApplicationLink { .. } => KeyType::ApplicationLink,
            Self::TrustCenterLink { .. } | Self::GlobalLink(_) => KeyType::TrustCenterLink,
            Self::Direct { key_type, .. } => *key_type,
        }
    }

    /// Peer this slot is bound to.
    pub fn peer(&self) -> Option<ExtendedAddress> {
        match self {
            Self::ApplicationLink { peer } | Self::TrustCenterLink { peer } => Some(*peer),
            Self::Direct { peer, .. } => *peer,
            Self::Network { .. } | Self::GlobalLink(_) => None,
        }
    }

    /// Encrypt type reported when this key authenticates a frame.
    pub fn encrypt_type(&self) -> EncryptType {
        match self {
            Self::Network { .. } => EncryptType::StandardNetwork,
            Self::ApplicationLink { .. } => EncryptType::ApplicationLink,
            Self::TrustCenterLink { .. } => EncryptType::TrustCenterLink,
            Self::GlobalLink(GlobalLinkKind::Preconfigured) => EncryptType::GlobalTrustCenterLink,
            Self::GlobalLink(GlobalLinkKind::Distributed) => {
                EncryptType::DistributedTrustCenterLink
            }
            Self::Direct { .. } => EncryptType::None,
        }
    }
}

/// One stored key with its outgoing frame counter.
#[derive(Clone, Debug)]
pub struct KeyEntry {
    slot: KeySlot,
    key: SecretKey,
    outgoing: FrameCounter,
}

impl KeyEntry {
    /// Network key `sequence`.
    pub fn network(sequence: u8, key: SecretKey) -> Self {
        Self::new(KeySlot::Network { sequence }, key)
    }

    /// Application link key for `peer`.
    pub fn application_link(peer: ExtendedAddress, key: SecretKey) -> Self {
        Self::new(KeySlot::ApplicationLink { peer }, key)
    }

    /// Trust center link key for `peer`.
    pub fn trust_center_link(peer: ExtendedAddress, key: SecretKey) -> Self {
        Self::new(KeySlot::TrustCenterLink { peer }, key)
    }

    /// Global link key.
    pub fn global_link(kind: GlobalLinkKind, key: SecretKey) -> Self {
        Self::new(KeySlot::GlobalLink(kind), key)
    }

    /// Zigbee Direct authorization key.
    ///
    /// # Errors
    ///
    /// `MalformedInput` unless `key_type` is one of the authorization types.
    pub fn direct(
        key_type: KeyType,
        peer: Option<ExtendedAddress>,
        key: SecretKey,
    ) -> Result<Self, SecurityError> {
        if !key_type.is_direct_authorization() {
            return Err(SecurityError::MalformedInput(format!(
                "{key_type:?} is not a Zigbee Direct authorization key"
            )));
        }
        Ok(Self::new(KeySlot::Direct { key_type, peer }, key))
    }

    fn new(slot: KeySlot, key: SecretKey) -> Self {
        Self {
            slot,
            key,
            outgoing: FrameCounter::default(),
        }
    }

    /// Start the outgoing counter at a commissioned value.
    pub fn with_counter(mut self, value: u32) -> Self {
        self.outgoing = FrameCounter::new(value);
        self
    }

    /// Slot.
    pub fn slot(&self) -> KeySlot {
        self.slot
    }

    /// Key material.
    pub fn key(&self) -> &SecretKey {
        &self.key
    }

    /// Key class.
    pub fn key_type(&self) -> KeyType {
        self.slot.key_type()
    }

    /// Bound peer.
    pub fn peer(&self) -> Option<ExtendedAddress> {
        self.slot.peer()
    }

    /// Value the next outgoing frame will carry.
    pub fn frame_counter(&self) -> u32 {
        self.outgoing.value()
    }

    /// Network key sequence number.
    pub fn key_sequence(&self) -> Option<u8> {
        match self.slot {
            KeySlot::Network { sequence } => Some(sequence),
            _ => None,
        }
    }
}

/// Key material resolved for one frame.
#[derive(Clone, Debug)]
pub struct FrameKey {
    /// Slot whose counter and identity back the key
    pub slot: KeySlot,
    /// Key to run CCM* with (derived for transport / key-load)
    pub key: SecretKey,
    /// Reported on accept
    pub encrypt_type: EncryptType,
}

// =============================================================================
// PERSISTENCE
// =============================================================================

/// Persisted form of one key entry.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    /// Slot
    pub slot: KeySlot,
    /// Raw key material
    #[serde_as(as = "Bytes")]
    pub key: [u8; KEY_SIZE],
    /// Next outgoing frame counter
    pub frame_counter: u32,
}

impl Drop for KeyRecord {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

/// Persisted form of the whole store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyStoreSnapshot {
    /// All entries, sorted by slot debug order for stable output
    pub entries: Vec<KeyRecord>,
    /// Active network key sequence number
    pub active_network_sequence: Option<u8>,
}

// =============================================================================
// KEY STORE
// =============================================================================

/// Keys indexed by slot.
#[derive(Clone, Debug)]
pub struct KeyStore {
    entries: HashMap<KeySlot, KeyEntry>,
    active_network_sequence: Option<u8>,
    global_link_fallback: bool,
}

impl Default for KeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyStore {
    /// Empty store with global link fallback enabled.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            active_network_sequence: None,
            global_link_fallback: true,
        }
    }

    /// Store holding the preconfigured ZigBeeAlliance09 global link key.
    pub fn with_well_known_key() -> Self {
        let mut store = Self::new();
        store.set_global_link_key(
            GlobalLinkKind::Preconfigured,
            SecretKey::from_bytes(ZIGBEE_ALLIANCE_09),
        );
        store
    }

    /// Allow or forbid global link keys as a fallback after per-peer keys.
    pub fn set_global_link_fallback(&mut self, enabled: bool) {
        self.global_link_fallback = enabled;
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no key is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sequence number of the active network key.
    pub fn active_network_sequence(&self) -> Option<u8> {
        self.active_network_sequence
    }

    /// Entry in `slot`.
    pub fn get(&self, slot: &KeySlot) -> Option<&KeyEntry> {
        self.entries.get(slot)
    }

    /// Iterate over all entries.
    pub fn iter(&self) -> impl Iterator<Item = &KeyEntry> {
        self.entries.values()
    }

    /// Install or replace a key; returns the entry it replaced.
    ///
    /// The first network key installed becomes the active one.
    pub fn add_or_replace(&mut self, entry: KeyEntry) -> Option<KeyEntry> {
        if let KeySlot::Network { sequence } = entry.slot {
            self.active_network_sequence.get_or_insert(sequence);
        }
        self.entries.insert(entry.slot, entry)
    }

    /// Install a raw trust center link key for `peer`.
    ///
    /// # Errors
    ///
    /// `InvalidKeyLength` unless `raw` is exactly 16 bytes.
    pub fn add_device_link_key_by_key(
        &mut self,
        peer: ExtendedAddress,
        raw: &[u8],
    ) -> Result<(), SecurityError> {
        let key = SecretKey::from_slice(raw)
            .map_err(|_| SecurityError::InvalidKeyLength { actual: raw.len() })?;
        self.add_or_replace(KeyEntry::trust_center_link(peer, key));
        Ok(())
    }

    /// Install a global link key.
    pub fn set_global_link_key(&mut self, kind: GlobalLinkKind, key: SecretKey) {
        self.add_or_replace(KeyEntry::global_link(kind, key));
    }

    /// Remove the key in `slot`.
    pub fn remove(&mut self, slot: &KeySlot) -> Option<KeyEntry> {
        let removed = self.entries.remove(slot);
        if let Some(KeySlot::Network { sequence }) = removed.as_ref().map(KeyEntry::slot) {
            if self.active_network_sequence == Some(sequence) {
                self.active_network_sequence = None;
            }
        }
        removed
    }

    /// Remove every key bound to `peer`; returns the removed entries.
    pub fn remove_device(&mut self, peer: ExtendedAddress) -> Vec<KeyEntry> {
        let slots: Vec<KeySlot> = self
            .entries
            .keys()
            .filter(|slot| slot.peer() == Some(peer))
            .copied()
            .collect();
        slots
            .iter()
            .filter_map(|slot| self.entries.remove(slot))
            .collect()
    }

    /// Make network key `sequence` the active one.
    ///
    /// # Errors
    ///
    /// `KeyNotFound` if no network key with that sequence is stored.
    pub fn switch_network_key(&mut self, sequence: u8) -> Result<(), SecurityError> {
        if !self.entries.contains_key(&KeySlot::Network { sequence }) {
            return Err(SecurityError::KeyNotFound {
                key_id: KeyId::Network,
            });
        }
        self.active_network_sequence = Some(sequence);
        Ok(())
    }

    /// Network key with `sequence`.
    pub fn network_key(&self, sequence: u8) -> Option<&KeyEntry> {
        self.entries.get(&KeySlot::Network { sequence })
    }

    /// Resolve the entry backing `key_id`.
    ///
    /// Network keys ignore `peer` and resolve to the active sequence. Link,
    /// transport and key-load identifiers resolve to the first link key
    /// candidate for `peer`. The local-only identifiers never resolve.
    pub fn lookup(&self, key_id: KeyId, peer: Option<ExtendedAddress>) -> Option<&KeyEntry> {
        match key_id {
            KeyId::Network => self
                .active_network_sequence
                .and_then(|sequence| self.network_key(sequence)),
            KeyId::Link | KeyId::Transport | KeyId::KeyLoad => {
                self.link_key_candidates(peer).into_iter().next()
            }
            KeyId::BothLinkAndNetwork | KeyId::Default => None,
        }
    }

    /// Link keys to try for `peer`, in order: application link, trust
    /// center link, distributed global, preconfigured global.
    pub fn link_key_candidates(&self, peer: Option<ExtendedAddress>) -> Vec<&KeyEntry> {
        let mut slots = Vec::with_capacity(4);
        if let Some(peer) = peer {
            slots.push(KeySlot::ApplicationLink { peer });
            slots.push(KeySlot::TrustCenterLink { peer });
        }
        if self.global_link_fallback || peer.is_none() {
            slots.push(KeySlot::GlobalLink(GlobalLinkKind::Distributed));
            slots.push(KeySlot::GlobalLink(GlobalLinkKind::Preconfigured));
        }
        slots
            .iter()
            .filter_map(|slot| self.entries.get(slot))
            .collect()
    }

    /// Key to secure an outgoing frame with.
    ///
    /// # Errors
    ///
    /// `KeyNotFound` if nothing resolves.
    pub fn frame_key(
        &self,
        key_id: KeyId,
        peer: Option<ExtendedAddress>,
    ) -> Result<FrameKey, SecurityError> {
        let entry = self
            .lookup(key_id, peer)
            .ok_or(SecurityError::KeyNotFound { key_id })?;
        Ok(derive_frame_key(entry, key_id))
    }

    /// Keys to try on an incoming frame, in preference order.
    ///
    /// # Errors
    ///
    /// `KeyNotFound` if nothing resolves, `MalformedHeader` for a network
    /// frame without a key sequence number.
    pub fn decrypt_candidates(
        &self,
        key_id: KeyId,
        peer: ExtendedAddress,
        key_sequence: Option<u8>,
    ) -> Result<Vec<FrameKey>, SecurityError> {
        let candidates: Vec<FrameKey> = match key_id {
            KeyId::Network => {
                let sequence = key_sequence.ok_or_else(|| {
                    SecurityError::MalformedHeader("network frame without key sequence".to_string())
                })?;
                self.network_key(sequence)
                    .map(|entry| derive_frame_key(entry, key_id))
                    .into_iter()
                    .collect()
            }
            KeyId::Link | KeyId::Transport | KeyId::KeyLoad => self
                .link_key_candidates(Some(peer))
                .into_iter()
                .map(|entry| derive_frame_key(entry, key_id))
                .collect(),
            KeyId::BothLinkAndNetwork | KeyId::Default => {
                return Err(SecurityError::MalformedHeader(format!(
                    "key id {key_id:?} is not valid on a received frame"
                )))
            }
        };
        if candidates.is_empty() {
            return Err(SecurityError::KeyNotFound { key_id });
        }
        Ok(candidates)
    }

    /// Take the next outgoing counter of the key in `slot`.
    ///
    /// # Errors
    ///
    /// `KeyNotFound` for an empty slot, `CounterExhausted` once the key's
    /// counter is spent.
    pub fn next_outgoing(&mut self, slot: &KeySlot) -> Result<u32, SecurityError> {
        let entry = self.entries.get_mut(slot).ok_or(SecurityError::KeyNotFound {
            key_id: slot_key_id(slot),
        })?;
        entry.outgoing.next_outgoing()
    }

    /// Export entries and counters.
    pub fn snapshot(&self) -> KeyStoreSnapshot {
        let mut entries: Vec<KeyRecord> = self
            .entries
            .values()
            .map(|entry| KeyRecord {
                slot: entry.slot,
                key: *entry.key.as_bytes(),
                frame_counter: entry.outgoing.value(),
            })
            .collect();
        entries.sort_by_key(|record| format!("{:?}", record.slot));
        KeyStoreSnapshot {
            entries,
            active_network_sequence: self.active_network_sequence,
        }
    }

    /// Rebuild a store from a snapshot.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if the active network sequence names a missing key.
    pub fn restore(snapshot: &KeyStoreSnapshot) -> Result<Self, SecurityError> {
        let mut store = Self::new();
        for record in &snapshot.entries {
            store.entries.insert(
                record.slot,
                KeyEntry::new(record.slot, SecretKey::from_bytes(record.key))
                    .with_counter(record.frame_counter),
            );
        }
        if let Some(sequence) = snapshot.active_network_sequence {
            if store.network_key(sequence).is_none() {
                return Err(SecurityError::InvalidConfig(format!(
                    "active network key {sequence} missing from snapshot"
                )));
            }
        }
        store.active_network_sequence = snapshot.active_network_sequence;
        Ok(store)
    }
}

fn slot_key_id(slot: &KeySlot) -> KeyId {
    match slot {
        KeySlot::Network { .. } => KeyId::Network,
        _ => KeyId::Link,
    }
}

fn derive_frame_key(entry: &KeyEntry, key_id: KeyId) -> FrameKey {
    let key = match key_id {
        KeyId::Transport => derive_key(&entry.key, TRANSPORT_KEY_INPUT),
        KeyId::KeyLoad => derive_key(&entry.key, KEY_LOAD_KEY_INPUT),
        _ => entry.key.clone(),
    };
    FrameKey {
        slot: entry.slot,
        key,
        encrypt_type: entry.slot.encrypt_type(),
    }
}

/// HMAC-AES-MMO of a single input octet under `link_key`.
fn derive_key(link_key: &SecretKey, input: u8) -> SecretKey {
    SecretKey::from_bytes(hmac_aes_mmo(link_key.as_bytes(), &[input]))
}
