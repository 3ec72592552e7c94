//! # Key Management Flows
//!
//! Commissioning a joiner from its install code, boundary status codes,
//! network key rotation and device removal.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use zb_crypto::SecretKey;
    use zb_security::{
        CounterScope, CredentialKind, EncryptType, IncomingFrame, KeyEntry, KeyId, KeySlot,
        KeyType, OutgoingFrame, SecurityError, SecurityEvent, StatusCode, ZigbeeSecurityApi,
    };

    fn link_frame() -> OutgoingFrame {
        OutgoingFrame::link(bytes(NWK_HEADER), payload(), SENDER, TRUST_CENTER)
    }

    // =========================================================================
    // INSTALL CODES
    // =========================================================================

    #[test]
    fn test_install_code_commissioning() {
        let code = bytes(INSTALL_CODE_16);
        let mut trust_center = service();
        let mut joiner = service();

        assert_eq!(
            trust_center.add_device_link_key_by_install_code(SENDER, &code),
            StatusCode::Success
        );
        assert_eq!(
            joiner.add_device_link_key_by_install_code(TRUST_CENTER, &code),
            StatusCode::Success
        );
        let installed = trust_center
            .keys()
            .get(&KeySlot::TrustCenterLink { peer: SENDER })
            .unwrap();
        assert_eq!(hex::encode(installed.key().as_bytes()), INSTALL_CODE_16_KEY);

        let data = joiner.secure_outgoing(link_frame()).unwrap();
        let unsecured = trust_center
            .unsecure_incoming(&IncomingFrame::new(data, 8))
            .unwrap();

        assert_eq!(unsecured.payload, payload());
        assert_eq!(unsecured.key_id, KeyId::Link);
        assert_eq!(unsecured.encrypt_type, EncryptType::TrustCenterLink);
    }

    #[test]
    fn test_transport_key_frame_from_install_code() {
        let code = bytes(INSTALL_CODE_16);
        let mut trust_center = service();
        let mut joiner = service();
        trust_center
            .install_link_key_from_install_code(SENDER, &code)
            .unwrap();
        joiner
            .install_link_key_from_install_code(TRUST_CENTER, &code)
            .unwrap();

        let frame = OutgoingFrame::link(bytes(NWK_HEADER), payload(), TRUST_CENTER, SENDER)
            .with_key_id(KeyId::Transport);
        let data = trust_center.secure_outgoing(frame).unwrap();
        let unsecured = joiner.unsecure_incoming(&IncomingFrame::new(data, 8)).unwrap();

        assert_eq!(unsecured.key_id, KeyId::Transport);
        assert_eq!(unsecured.source, TRUST_CENTER);
    }

    #[test]
    fn test_bad_install_codes() {
        let mut service = service();
        let mut events = service.events().subscribe();

        let mut bad_crc = bytes(INSTALL_CODE_16);
        bad_crc[17] ^= 0xFF;
        assert_eq!(
            service.add_device_link_key_by_install_code(SENDER, &bad_crc),
            StatusCode::InvalidParameter
        );
        assert_eq!(
            service.add_device_link_key_by_install_code(SENDER, &[0u8; 9]),
            StatusCode::InvalidParameter
        );
        assert!(service
            .keys()
            .get(&KeySlot::TrustCenterLink { peer: SENDER })
            .is_none());

        for _ in 0..2 {
            assert!(matches!(
                events.try_recv().unwrap(),
                SecurityEvent::CredentialRejected {
                    kind: CredentialKind::InstallCode,
                    error: SecurityError::InvalidInstallCode(_),
                }
            ));
        }
    }

    // =========================================================================
    // RAW LINK KEYS
    // =========================================================================

    #[test]
    fn test_link_key_length_boundaries() {
        let mut service = service();

        for len in [0usize, 15, 17, 32] {
            assert_eq!(
                service.add_device_link_key_by_key(SENDER, &vec![0x11; len]),
                StatusCode::InvalidParameter,
                "length {len}"
            );
        }
        assert_eq!(
            service.add_device_link_key_by_key(SENDER, &[0x11; 16]),
            StatusCode::Success
        );
        assert_eq!(
            service
                .keys()
                .get(&KeySlot::TrustCenterLink { peer: SENDER })
                .unwrap()
                .key_type(),
            KeyType::TrustCenterLink
        );
    }

    #[test]
    fn test_replacing_link_key_restarts_counters() {
        let mut trust_center = service();
        let mut joiner = service();
        trust_center.install_link_key(SENDER, &[0x11; 16]).unwrap();
        joiner.install_link_key(TRUST_CENTER, &[0x11; 16]).unwrap();

        let data = joiner.secure_outgoing(link_frame()).unwrap();
        trust_center.unsecure_incoming(&IncomingFrame::new(data, 8)).unwrap();
        let scope = CounterScope::new(KeyId::Link, KeySlot::TrustCenterLink { peer: SENDER });
        assert_eq!(trust_center.counters().stored(SENDER, scope), Some(0));

        // Same material again keeps the counter
        trust_center.install_link_key(SENDER, &[0x11; 16]).unwrap();
        assert_eq!(trust_center.counters().stored(SENDER, scope), Some(0));

        trust_center.install_link_key(SENDER, &[0x22; 16]).unwrap();
        assert_eq!(trust_center.counters().stored(SENDER, scope), None);

        // A rejoined device starts from zero under the new key
        let mut rejoined = service();
        rejoined.install_link_key(TRUST_CENTER, &[0x22; 16]).unwrap();
        let data = rejoined.secure_outgoing(link_frame()).unwrap();
        assert_eq!(
            trust_center
                .unsecure_incoming(&IncomingFrame::new(data, 8))
                .unwrap()
                .frame_counter,
            0
        );
    }

    // =========================================================================
    // NETWORK KEY ROTATION
    // =========================================================================

    #[test]
    fn test_network_key_switch() {
        let next_key = SecretKey::from_bytes([0x5A; 16]);
        let mut sender = service_with_network_key(100);
        let mut receiver = service_with_network_key(0);
        for service in [&mut sender, &mut receiver] {
            service.install_key(KeyEntry::network(1, next_key.clone()));
        }

        let old = sender
            .secure_outgoing(OutgoingFrame::network(bytes(NWK_HEADER), payload(), SENDER))
            .unwrap();
        receiver.unsecure_incoming(&IncomingFrame::new(old.clone(), 8)).unwrap();

        sender.switch_network_key(1).unwrap();
        receiver.switch_network_key(1).unwrap();
        assert_eq!(receiver.counters().stored(SENDER, CounterScope::network(0)), Some(100));
        assert_eq!(receiver.counters().stored(SENDER, CounterScope::network(1)), None);
        assert!(matches!(
            receiver.unsecure_incoming(&IncomingFrame::new(old, 8)),
            Err(SecurityError::Replay { .. })
        ));

        let new = sender
            .secure_outgoing(OutgoingFrame::network(bytes(NWK_HEADER), payload(), SENDER))
            .unwrap();
        // Key sequence octet follows the 8-byte header and 13-byte aux prefix
        assert_eq!(new[8 + 13], 1);
        let unsecured = receiver.unsecure_incoming(&IncomingFrame::new(new, 8)).unwrap();
        assert_eq!(unsecured.key_sequence, Some(1));
        assert_eq!(unsecured.frame_counter, 0);

        // Frames under the previous key still verify while it is stored
        let mut late = service_with_network_key(200);
        let straggler = late
            .secure_outgoing(OutgoingFrame::network(bytes(NWK_HEADER), payload(), SENDER))
            .unwrap();
        assert_eq!(
            receiver
                .unsecure_incoming(&IncomingFrame::new(straggler, 8))
                .unwrap()
                .key_sequence,
            Some(0)
        );

        assert_eq!(
            receiver.switch_network_key(9),
            Err(SecurityError::KeyNotFound {
                key_id: KeyId::Network
            })
        );
    }

    // =========================================================================
    // DEVICE REMOVAL
    // =========================================================================

    #[test]
    fn test_remove_device() {
        let mut trust_center = service_with_network_key(0);
        let mut joiner = service_with_network_key(0);
        trust_center.install_link_key(SENDER, &[0x11; 16]).unwrap();
        trust_center.install_key(KeyEntry::application_link(
            SENDER,
            SecretKey::from_bytes([0x33; 16]),
        ));
        joiner.install_link_key(TRUST_CENTER, &[0x11; 16]).unwrap();

        let data = joiner
            .secure_outgoing(OutgoingFrame::network(bytes(NWK_HEADER), payload(), SENDER))
            .unwrap();
        trust_center.unsecure_incoming(&IncomingFrame::new(data, 8)).unwrap();

        let mut events = trust_center.events().subscribe();
        assert_eq!(ZigbeeSecurityApi::remove_device(&mut trust_center, SENDER), 2);
        assert_eq!(
            events.try_recv().unwrap(),
            SecurityEvent::DeviceRemoved {
                device: SENDER,
                keys_removed: 2,
            }
        );
        assert_eq!(trust_center.counters().stored(SENDER, CounterScope::network(0)), None);
        assert!(trust_center
            .keys()
            .get(&KeySlot::Network { sequence: 0 })
            .is_some());

        let data = joiner.secure_outgoing(link_frame()).unwrap();
        // Only the preconfigured global key is left, which does not match
        assert_eq!(
            trust_center.unsecure_incoming(&IncomingFrame::new(data, 8)),
            Err(SecurityError::AuthFailure)
        );
        assert_eq!(trust_center.remove_device(SENDER), 0);
    }

    #[test]
    fn test_aes_mmo_through_api() {
        let service = service();
        assert_eq!(
            hex::encode(service.aes_mmo_hash(b"zigbee ota image payload")),
            IMAGE_DIGEST
        );
    }
}
