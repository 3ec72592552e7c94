//! # Security Service
//!
//! Application service that implements the `ZigbeeSecurityApi` trait.
//!
//! ## Architecture
//!
//! This is the hexagonal "application service" that:
//! - Owns the key store and the incoming frame counter tracker
//! - Implements the inbound port (`ZigbeeSecurityApi`)
//! - Publishes every outcome through the outbound port (`SecurityEventSink`)
//! - Delegates header coding, CCM*, CBKE and ECDSA to the domain layer
//!
//! All methods are synchronous. A host that drives one instance from
//! several contexts wraps it in [`SharedSecurityService`].

use crate::domain::cbke::{self, CbkeKeys, EphemeralKeyPair, ImplicitCertificate};
use crate::domain::config::SecurityConfig;
use crate::domain::entities::{
    ExtendedAddress, IncomingFrame, KeyId, OutgoingFrame, SecurityLevel, UnsecuredFrame,
};
use crate::domain::errors::{SecurityError, StatusCode};
use crate::domain::frame_counter::{CounterRecord, CounterScope, FrameCounterTracker};
use crate::domain::header::{with_level, AuxHeader, SecurityControl};
use crate::domain::image::{self, EcdsaSignatureSuite};
use crate::domain::install_code;
use crate::domain::key_store::{KeyEntry, KeySlot, KeyStore, KeyStoreSnapshot};
use crate::domain::nonce::build_nonce;
use crate::domain::transform;
use crate::ports::inbound::ZigbeeSecurityApi;
use crate::ports::outbound::{
    CredentialKind, KeyAgreementScheme, SecurityEvent, SecurityEventSink,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, trace};
use zb_crypto::ecc::SharedSecret;
use zb_crypto::{aes_mmo_hash, Digest};
use zb_telemetry::{HistogramTimer, EC_OPERATION_DURATION};

/// Service behind a lock, for hosts with more than one driving context.
pub type SharedSecurityService<S> = Arc<Mutex<SecurityService<S>>>;

/// Persisted state: keys with their outgoing counters, and the last
/// accepted incoming counter per peer and key.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecuritySnapshot {
    /// Key store contents
    pub keys: KeyStoreSnapshot,
    /// Incoming frame counters
    pub counters: Vec<CounterRecord>,
}

impl SecuritySnapshot {
    /// Serialize as JSON.
    ///
    /// # Errors
    ///
    /// `MalformedInput` if serialization fails.
    pub fn to_json(&self) -> Result<String, SecurityError> {
        serde_json::to_string(self)
            .map_err(|e| SecurityError::MalformedInput(format!("snapshot: {e}")))
    }

    /// Parse from JSON.
    ///
    /// # Errors
    ///
    /// `MalformedInput` for invalid JSON or a wrong shape.
    pub fn from_json(json: &str) -> Result<Self, SecurityError> {
        serde_json::from_str(json)
            .map_err(|e| SecurityError::MalformedInput(format!("snapshot: {e}")))
    }
}

/// Zigbee link-layer security service.
pub struct SecurityService<S: SecurityEventSink> {
    config: SecurityConfig,
    keys: KeyStore,
    counters: FrameCounterTracker,
    events: S,
}

impl<S: SecurityEventSink> SecurityService<S> {
    /// Create a service with an empty key store.
    ///
    /// The ZigBeeAlliance09 link key is installed when the configuration
    /// asks for it.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if `config` does not validate.
    pub fn new(config: SecurityConfig, events: S) -> Result<Self, SecurityError> {
        config.validate()?;
        let mut keys = if config.preconfigured_global_link_key {
            KeyStore::with_well_known_key()
        } else {
            KeyStore::new()
        };
        keys.set_global_link_fallback(config.global_link_fallback);
        let counters = FrameCounterTracker::new(config.frame_counter_reset_max);

        Ok(Self {
            config,
            keys,
            counters,
            events,
        })
    }

    /// Rebuild a service from persisted state.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` for an invalid configuration or an inconsistent
    /// snapshot.
    pub fn restore(
        config: SecurityConfig,
        snapshot: &SecuritySnapshot,
        events: S,
    ) -> Result<Self, SecurityError> {
        config.validate()?;
        let mut keys = KeyStore::restore(&snapshot.keys)?;
        keys.set_global_link_fallback(config.global_link_fallback);
        let mut counters = FrameCounterTracker::new(config.frame_counter_reset_max);
        counters.restore(&snapshot.counters);

        Ok(Self {
            config,
            keys,
            counters,
            events,
        })
    }

    /// Export keys and counters.
    pub fn snapshot(&self) -> SecuritySnapshot {
        SecuritySnapshot {
            keys: self.keys.snapshot(),
            counters: self.counters.records(),
        }
    }

    /// Wrap in an `Arc<Mutex<_>>`.
    pub fn into_shared(self) -> SharedSecurityService<S> {
        Arc::new(Mutex::new(self))
    }

    /// Active configuration.
    pub fn config(&self) -> &SecurityConfig {
        &self.config
    }

    /// Key store (read-only).
    pub fn keys(&self) -> &KeyStore {
        &self.keys
    }

    /// Incoming frame counters (read-only).
    pub fn counters(&self) -> &FrameCounterTracker {
        &self.counters
    }

    /// Event sink.
    pub fn events(&self) -> &S {
        &self.events
    }

    // =========================================================================
    // KEY MANAGEMENT
    // =========================================================================

    /// Install or replace a key.
    ///
    /// New material in an occupied slot forgets the incoming counters that
    /// key verified, since senders restart them with the new key. Counters
    /// of every other key are kept.
    pub fn install_key(&mut self, entry: KeyEntry) {
        let slot = entry.slot();
        let rekeyed = self
            .keys
            .get(&slot)
            .is_some_and(|current| current.key() != entry.key());
        self.keys.add_or_replace(entry);

        if rekeyed {
            let forgotten = self.counters.forget_slot(slot);
            debug!(?slot, forgotten, "key material replaced");
        }

        self.events.publish(SecurityEvent::KeyInstalled {
            key_type: slot.key_type(),
            peer: slot.peer(),
        });
    }

    /// Install a raw 16-byte trust center link key for `peer`.
    ///
    /// # Errors
    ///
    /// `InvalidKeyLength` unless `key` is exactly 16 bytes; the store is
    /// left unchanged.
    pub fn install_link_key(
        &mut self,
        peer: ExtendedAddress,
        key: &[u8],
    ) -> Result<(), SecurityError> {
        let secret = zb_crypto::SecretKey::from_slice(key).map_err(|_| {
            self.reject_credential(
                CredentialKind::LinkKey,
                SecurityError::InvalidKeyLength { actual: key.len() },
            )
        })?;
        self.install_key(KeyEntry::trust_center_link(peer, secret));
        Ok(())
    }

    /// Derive the trust center link key for `peer` from its install code.
    ///
    /// # Errors
    ///
    /// `InvalidInstallCode` for an unsupported length or a CRC mismatch;
    /// the store is left unchanged.
    pub fn install_link_key_from_install_code(
        &mut self,
        peer: ExtendedAddress,
        install_code: &[u8],
    ) -> Result<(), SecurityError> {
        let key = install_code::derive_link_key(install_code)
            .map_err(|e| self.reject_credential(CredentialKind::InstallCode, e))?;
        self.install_key(KeyEntry::trust_center_link(peer, key));
        Ok(())
    }

    /// Make network key `sequence` active.
    ///
    /// Counters are tracked per key sequence, so frames still in flight
    /// under the previous key stay replay-protected.
    ///
    /// # Errors
    ///
    /// `KeyNotFound` if no network key with that sequence is stored.
    pub fn switch_network_key(&mut self, sequence: u8) -> Result<(), SecurityError> {
        self.keys.switch_network_key(sequence)?;
        debug!(sequence, "network key switched");
        self.events
            .publish(SecurityEvent::NetworkKeySwitched { sequence });
        Ok(())
    }

    /// Forget every key and incoming counter bound to `peer`; returns the
    /// number of keys removed.
    pub fn remove_device(&mut self, peer: ExtendedAddress) -> usize {
        let keys_removed = self.keys.remove_device(peer).len();
        self.counters.forget_peer(peer);
        self.events.publish(SecurityEvent::DeviceRemoved {
            device: peer,
            keys_removed,
        });
        keys_removed
    }

    // =========================================================================
    // FRAME COUNTERS
    // =========================================================================

    /// Let the next frame from `peer` under `key_id` restart its counter
    /// below the reset window. Returns false if no counter is stored.
    pub fn authorize_counter_reset(&mut self, peer: ExtendedAddress, key_id: KeyId) -> bool {
        let authorized = self.counters.authorize_reset(peer, key_id);
        if authorized {
            self.events
                .publish(SecurityEvent::CounterResetAuthorized { peer, key_id });
        }
        authorized
    }

    /// Overwrite the stored incoming counters for `peer` under `key_id`.
    ///
    /// With nothing stored yet, the counter of the key that would secure a
    /// frame to `peer` is set.
    ///
    /// # Errors
    ///
    /// `Replay` if `value` is not below the reset window, `KeyNotFound` if
    /// no counter is stored and no key resolves.
    pub fn reset_frame_counter(
        &mut self,
        peer: ExtendedAddress,
        key_id: KeyId,
        value: u32,
    ) -> Result<(), SecurityError> {
        let mut scopes = self.counters.scopes(peer, key_id);
        if scopes.is_empty() {
            let frame_key = self.keys.frame_key(key_id, Some(peer))?;
            scopes.push(CounterScope::new(key_id, frame_key.slot));
        }
        for scope in scopes {
            self.counters.reset(peer, scope, value)?;
        }
        Ok(())
    }

    // =========================================================================
    // FRAME PROTECTION
    // =========================================================================

    /// Secure an outgoing frame.
    ///
    /// Returns `header || auxiliary header || body || MIC`. The nonce and
    /// the authenticated data use the real level; the transmitted control
    /// octet carries level zero when `zero_level_on_air` is set.
    ///
    /// # Errors
    ///
    /// `MalformedHeader` for `BothLinkAndNetwork`, `KeyNotFound` if no key
    /// resolves, `CounterExhausted` once the key's counter is spent.
    pub fn secure_outgoing(&mut self, frame: OutgoingFrame) -> Result<Vec<u8>, SecurityError> {
        let key_id = match frame.key_id {
            KeyId::Default => KeyId::Network,
            KeyId::BothLinkAndNetwork => {
                return Err(SecurityError::MalformedHeader(
                    "a frame is secured with exactly one key".to_string(),
                ))
            }
            other => other,
        };
        let level = frame.level.unwrap_or(self.config.network_security_level);

        let frame_key = self.keys.frame_key(key_id, frame.destination)?;
        let frame_counter = self.keys.next_outgoing(&frame_key.slot)?;

        let aux = AuxHeader {
            control: SecurityControl::new(level, key_id, frame.extended_nonce),
            frame_counter,
            source: frame.extended_nonce.then_some(frame.source),
            key_sequence: match frame_key.slot {
                KeySlot::Network { sequence } => Some(sequence),
                _ => None,
            },
        };
        let mut aux_bytes = aux.encode()?;
        let nonce = build_nonce(frame.source, frame_counter, aux_bytes[0]);

        let mut aad = Vec::with_capacity(frame.header.len() + aux_bytes.len());
        aad.extend_from_slice(&frame.header);
        aad.extend_from_slice(&aux_bytes);
        let (body, mic) =
            transform::encrypt(level, &frame_key.key, &nonce, &aad, &frame.payload)?;

        if self.config.zero_level_on_air {
            aux_bytes[0] = with_level(aux_bytes[0], SecurityLevel::None);
        }

        let mut out =
            Vec::with_capacity(frame.header.len() + aux_bytes.len() + body.len() + mic.len());
        out.extend_from_slice(&frame.header);
        out.extend_from_slice(&aux_bytes);
        out.extend_from_slice(&body);
        out.extend_from_slice(mic.as_slice());

        self.events.publish(SecurityEvent::FrameSecured {
            destination: frame.destination,
            key_id,
            frame_counter,
        });
        Ok(out)
    }

    /// Verify and decrypt a received frame.
    ///
    /// The frame counter is committed only after a key verifies the MIC;
    /// a rejected frame leaves every counter unchanged.
    ///
    /// # Errors
    ///
    /// `MalformedHeader`/`MalformedInput` for frames that do not parse or
    /// whose sender is unknown, `Replay`/`CounterExhausted` from the
    /// counter check, `KeyNotFound` if no key applies, `AuthFailure` if no
    /// candidate key verifies the MIC.
    pub fn unsecure_incoming(
        &mut self,
        frame: &IncomingFrame,
    ) -> Result<UnsecuredFrame, SecurityError> {
        let mut source = frame.source;
        let result = self.unsecure(frame, &mut source);

        match &result {
            Ok(unsecured) => self.events.publish(SecurityEvent::FrameAccepted {
                source: unsecured.source,
                key_id: unsecured.key_id,
                frame_counter: unsecured.frame_counter,
                encrypt_type: unsecured.encrypt_type,
            }),
            Err(error) => self.events.publish(SecurityEvent::FrameRejected {
                source,
                error: error.clone(),
            }),
        }
        result
    }

    fn unsecure(
        &mut self,
        frame: &IncomingFrame,
        source: &mut Option<ExtendedAddress>,
    ) -> Result<UnsecuredFrame, SecurityError> {
        if frame.header_len > frame.data.len() {
            return Err(SecurityError::MalformedHeader(format!(
                "header length {} exceeds frame length {}",
                frame.header_len,
                frame.data.len()
            )));
        }
        let (header, rest) = frame.data.split_at(frame.header_len);
        let (aux, aux_len) = AuxHeader::decode(rest, self.config.strict_reserved_bits)?;

        let level = if self.config.zero_level_on_air {
            self.config.network_security_level
        } else {
            aux.control.level
        };
        if !level.protects_as(self.config.network_security_level) {
            debug!(?level, "received level weaker than configured");
            return Err(SecurityError::AuthFailure);
        }
        let sender = aux.source.or(frame.source).ok_or_else(|| {
            SecurityError::MalformedInput("sender address unknown".to_string())
        })?;
        *source = Some(sender);

        let secured = &rest[aux_len..];
        let mic_len = level.mic_length();
        if secured.len() < mic_len {
            return Err(SecurityError::MalformedInput(format!(
                "{} bytes after the auxiliary header, MIC needs {mic_len}",
                secured.len()
            )));
        }
        let (body, mic) = secured.split_at(secured.len() - mic_len);

        let mut aad = Vec::with_capacity(frame.header_len + aux_len);
        aad.extend_from_slice(header);
        aad.extend_from_slice(&rest[..aux_len]);
        aad[frame.header_len] = with_level(aad[frame.header_len], level);
        let nonce = build_nonce(sender, aux.frame_counter, aad[frame.header_len]);

        let key_id = aux.control.key_id;
        let candidates = self.keys.decrypt_candidates(key_id, sender, aux.key_sequence)?;

        // Each key keeps its own counter; a key that already saw this
        // counter is not tried
        let mut counter_error = None;
        for candidate in candidates {
            let scope = CounterScope::new(key_id, candidate.slot);
            if let Err(error) = self.counters.check(sender, scope, aux.frame_counter) {
                trace!(slot = ?candidate.slot, %error, "candidate key skipped");
                counter_error.get_or_insert(error);
                continue;
            }
            match transform::decrypt(level, &candidate.key, &nonce, &aad, body, mic) {
                Ok(payload) => {
                    self.counters.commit(sender, scope, aux.frame_counter);
                    return Ok(UnsecuredFrame {
                        header: header.to_vec(),
                        payload,
                        source: sender,
                        key_id,
                        frame_counter: aux.frame_counter,
                        level,
                        key_sequence: aux.key_sequence,
                        encrypt_type: candidate.encrypt_type,
                    });
                }
                Err(SecurityError::AuthFailure) => {
                    trace!(slot = ?candidate.slot, "candidate key did not verify");
                }
                Err(other) => return Err(other),
            }
        }
        Err(counter_error.unwrap_or(SecurityError::AuthFailure))
    }

    // =========================================================================
    // KEY ESTABLISHMENT
    // =========================================================================

    /// Static ECDH shared secret with the holder of `peer_certificate`.
    ///
    /// # Errors
    ///
    /// `CurveMismatch` for a certificate of the other suite,
    /// `CertificateInvalid` for a certificate that does not parse or
    /// reconstruct.
    pub fn cbke_shared_secret<T: ImplicitCertificate>(
        &self,
        peer_certificate: &[u8],
        keys: &CbkeKeys<T::Curve>,
    ) -> Result<SharedSecret, SecurityError> {
        let _timer = HistogramTimer::start(&EC_OPERATION_DURATION, "ecdh");
        let secret = cbke::derive_shared_secret::<T>(peer_certificate, keys)
            .map_err(|e| self.reject_credential(CredentialKind::Certificate, e))?;
        self.key_established::<T>(peer_certificate, KeyAgreementScheme::Ecdh);
        Ok(secret)
    }

    /// ECMQV shared secret with the holder of `peer_certificate`.
    ///
    /// # Errors
    ///
    /// As [`cbke_shared_secret`](Self::cbke_shared_secret);
    /// `MalformedInput` if the peer ephemeral key does not decode.
    pub fn cbke_mqv_shared_secret<T: ImplicitCertificate>(
        &self,
        peer_certificate: &[u8],
        peer_ephemeral: &[u8],
        keys: &CbkeKeys<T::Curve>,
        own_ephemeral: &EphemeralKeyPair<T::Curve>,
    ) -> Result<SharedSecret, SecurityError> {
        let _timer = HistogramTimer::start(&EC_OPERATION_DURATION, "ecmqv");
        let secret = cbke::derive_mqv_shared_secret::<T>(
            peer_certificate,
            peer_ephemeral,
            keys,
            own_ephemeral,
        )
        .map_err(|e| self.reject_credential(CredentialKind::Certificate, e))?;
        self.key_established::<T>(peer_certificate, KeyAgreementScheme::Ecmqv);
        Ok(secret)
    }

    fn key_established<T: ImplicitCertificate>(
        &self,
        peer_certificate: &[u8],
        scheme: KeyAgreementScheme,
    ) {
        if let Ok(certificate) = T::parse(peer_certificate) {
            self.events.publish(SecurityEvent::KeyEstablished {
                suite: T::SUITE,
                scheme,
                peer: certificate.subject(),
            });
        }
    }

    // =========================================================================
    // IMAGE SIGNATURES
    // =========================================================================

    /// Validate an OTA image signature; returns the signer address.
    ///
    /// # Errors
    ///
    /// `UnsupportedSuite` for an unknown suite, `MalformedInput` for any
    /// length mismatch, `CertificateInvalid`/`SignatureInvalid` if the
    /// signature does not check out.
    #[allow(clippy::too_many_arguments)]
    pub fn validate_image(
        &self,
        suite: u8,
        ca_public_key: &[u8],
        certificate: &[u8],
        signature: &[u8],
        image_digest: &[u8],
        cert_digest: &[u8],
    ) -> Result<ExtendedAddress, SecurityError> {
        let suite = EcdsaSignatureSuite::try_from(suite)
            .map_err(|e| self.reject_credential(CredentialKind::Signature, e))?;
        let _timer = HistogramTimer::start(&EC_OPERATION_DURATION, "ecdsa_verify");
        let signer = image::validate(
            suite,
            ca_public_key,
            certificate,
            signature,
            image_digest,
            cert_digest,
        )
        .map_err(|e| self.reject_credential(CredentialKind::Signature, e))?;

        self.events
            .publish(SecurityEvent::ImageValidated { suite, signer });
        Ok(signer)
    }

    fn reject_credential(&self, kind: CredentialKind, error: SecurityError) -> SecurityError {
        self.events.publish(SecurityEvent::CredentialRejected {
            kind,
            error: error.clone(),
        });
        error
    }
}

impl<S: SecurityEventSink> ZigbeeSecurityApi for SecurityService<S> {
    fn aes_mmo_hash(&self, data: &[u8]) -> Digest {
        aes_mmo_hash(data)
    }

    fn add_device_link_key_by_key(&mut self, peer: ExtendedAddress, key: &[u8]) -> StatusCode {
        StatusCode::from_result(&self.install_link_key(peer, key))
    }

    fn add_device_link_key_by_install_code(
        &mut self,
        peer: ExtendedAddress,
        install_code: &[u8],
    ) -> StatusCode {
        StatusCode::from_result(&self.install_link_key_from_install_code(peer, install_code))
    }

    fn ecdsa_validate(
        &self,
        suite: u8,
        ca_public_key: &[u8],
        certificate: &[u8],
        signature: &[u8],
        image_digest: &[u8],
        cert_digest: &[u8],
    ) -> StatusCode {
        StatusCode::from_result(&self.validate_image(
            suite,
            ca_public_key,
            certificate,
            signature,
            image_digest,
            cert_digest,
        ))
    }

    fn secure_outgoing(&mut self, frame: OutgoingFrame) -> Result<Vec<u8>, SecurityError> {
        SecurityService::secure_outgoing(self, frame)
    }

    fn unsecure_incoming(
        &mut self,
        frame: &IncomingFrame,
    ) -> Result<UnsecuredFrame, SecurityError> {
        SecurityService::unsecure_incoming(self, frame)
    }

    fn authorize_counter_reset(&mut self, peer: ExtendedAddress, key_id: KeyId) -> bool {
        SecurityService::authorize_counter_reset(self, peer, key_id)
    }

    fn remove_device(&mut self, peer: ExtendedAddress) -> usize {
        SecurityService::remove_device(self, peer)
    }
}

// =============================================================================
// TESTS
// =============================================================================
