//! # Frame Protection Flows
//!
//! Secure on one service, unsecure on another:
//!
//! ```text
//! [Sender] ──secure_outgoing──→ header ∥ aux ∥ body ∥ MIC ──unsecure_incoming──→ [Receiver]
//!                                                                                    │
//!                                                              FrameAccepted / FrameRejected
//! ```

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use proptest::prelude::*;
    use tokio::sync::broadcast::error::TryRecvError;
    use zb_crypto::CcmStar;
    use zb_security::domain::nonce::build_nonce;
    use zb_security::{
        CounterScope, EncryptType, IncomingFrame, KeyEntry, KeyId, NoopEventSink, OutgoingFrame,
        SecurityConfig, SecurityError, SecurityEvent, SecurityLevel, SecurityService,
    };

    fn network_frame() -> OutgoingFrame {
        OutgoingFrame::network(bytes(NWK_HEADER), payload(), SENDER)
    }

    // =========================================================================
    // PINNED VECTORS
    // =========================================================================

    #[test]
    fn test_end_to_end_network_frame_vector() {
        let mut sender = service_with_network_key(1);

        let out = sender.secure_outgoing(network_frame()).unwrap();

        let expected = format!("{NWK_HEADER}{AUX_HEADER_ON_AIR}{CIPHERTEXT}{MIC32}");
        assert_eq!(hex::encode(&out), expected);
    }

    #[test]
    fn test_vector_matches_raw_ccm_star() {
        let nonce = build_nonce(SENDER, 1, 0x2D);
        assert_eq!(hex::encode(nonce), NONCE);

        let ccm = CcmStar::new(&network_key(), 4).unwrap();
        let aad = [bytes(NWK_HEADER), bytes(AUX_HEADER)].concat();
        let (body, mic) = ccm.seal(&nonce, &aad, &payload(), true).unwrap();

        assert_eq!(hex::encode(body), CIPHERTEXT);
        assert_eq!(hex::encode(mic.as_slice()), MIC32);
    }

    // =========================================================================
    // ROUND TRIPS
    // =========================================================================

    #[test]
    fn test_round_trip_every_level_and_length() {
        let config = SecurityConfig::default().with_zero_level_on_air(false);
        let mut sender = SecurityService::new(config.clone(), NoopEventSink).unwrap();
        let mut receiver = SecurityService::new(config, NoopEventSink).unwrap();
        for service in [&mut sender, &mut receiver] {
            service.install_key(KeyEntry::network(0, network_key()));
        }

        for level in 0u8..8 {
            let level = SecurityLevel::from_bits(level);
            for len in [0usize, 1, 15, 16, 17, 64, 127, 256] {
                let body: Vec<u8> = (0..len).map(|i| i as u8).collect();
                let frame = OutgoingFrame::network(bytes(NWK_HEADER), body.clone(), SENDER)
                    .with_level(level);
                let data = sender.secure_outgoing(frame).unwrap();
                assert_eq!(
                    data.len(),
                    8 + 14 + len + level.mic_length(),
                    "level {level:?}, length {len}"
                );

                let result = receiver.unsecure_incoming(&IncomingFrame::new(data, 8));
                if !level.protects_as(SecurityLevel::EncMic32) {
                    assert_eq!(result, Err(SecurityError::AuthFailure), "level {level:?}");
                    continue;
                }
                let unsecured = result.unwrap();
                assert_eq!(unsecured.payload, body, "level {level:?}, length {len}");
                assert_eq!(unsecured.level, level);
            }
        }
    }

    #[test]
    fn test_events_for_accept_and_reject() {
        let mut sender = service_with_network_key(10);
        let mut receiver = service_with_network_key(0);
        let mut events = receiver.events().subscribe();

        let data = sender.secure_outgoing(network_frame()).unwrap();
        let frame = IncomingFrame::new(data, 8);
        receiver.unsecure_incoming(&frame).unwrap();
        let _ = receiver.unsecure_incoming(&frame);

        assert_eq!(
            events.try_recv().unwrap(),
            SecurityEvent::FrameAccepted {
                source: SENDER,
                key_id: KeyId::Network,
                frame_counter: 10,
                encrypt_type: EncryptType::StandardNetwork,
            }
        );
        assert_eq!(
            events.try_recv().unwrap(),
            SecurityEvent::FrameRejected {
                source: Some(SENDER),
                error: SecurityError::Replay {
                    frame_counter: 10,
                    last_accepted: 10,
                },
            }
        );
        assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
    }

    // =========================================================================
    // REPLAY PROTECTION
    // =========================================================================

    #[test]
    fn test_replay_window() {
        let mut receiver = service_with_network_key(0);
        let frames: Vec<IncomingFrame> = [5u32, 4, 5, 6]
            .iter()
            .map(|&counter| {
                let mut sender = service_with_network_key(counter);
                IncomingFrame::new(sender.secure_outgoing(network_frame()).unwrap(), 8)
            })
            .collect();

        assert!(receiver.unsecure_incoming(&frames[0]).is_ok());
        assert!(matches!(
            receiver.unsecure_incoming(&frames[1]),
            Err(SecurityError::Replay { frame_counter: 4, last_accepted: 5 })
        ));
        assert!(matches!(
            receiver.unsecure_incoming(&frames[2]),
            Err(SecurityError::Replay { frame_counter: 5, last_accepted: 5 })
        ));
        assert_eq!(receiver.unsecure_incoming(&frames[3]).unwrap().frame_counter, 6);
    }

    #[test]
    fn test_authorized_reset_is_single_use() {
        let mut receiver = service_with_network_key(0);
        let high = service_with_network_key(5000)
            .secure_outgoing(network_frame())
            .unwrap();
        receiver.unsecure_incoming(&IncomingFrame::new(high, 8)).unwrap();

        let mut rebooted = service_with_network_key(255);
        let first = IncomingFrame::new(rebooted.secure_outgoing(network_frame()).unwrap(), 8);
        let second = IncomingFrame::new(rebooted.secure_outgoing(network_frame()).unwrap(), 8);

        assert!(receiver.authorize_counter_reset(SENDER, KeyId::Network));
        assert_eq!(receiver.unsecure_incoming(&first).unwrap().frame_counter, 255);
        // 256 is above the stored 255, so it passes as an ordinary increment
        assert_eq!(receiver.unsecure_incoming(&second).unwrap().frame_counter, 256);

        let mut again = service_with_network_key(3);
        let stale = IncomingFrame::new(again.secure_outgoing(network_frame()).unwrap(), 8);
        assert!(matches!(
            receiver.unsecure_incoming(&stale),
            Err(SecurityError::Replay { .. })
        ));
    }

    #[test]
    fn test_reset_outside_window_rejected() {
        let mut receiver = service_with_network_key(0);
        let high = service_with_network_key(5000)
            .secure_outgoing(network_frame())
            .unwrap();
        receiver.unsecure_incoming(&IncomingFrame::new(high, 8)).unwrap();

        let restarted = service_with_network_key(256)
            .secure_outgoing(network_frame())
            .unwrap();
        assert!(receiver.authorize_counter_reset(SENDER, KeyId::Network));
        assert!(matches!(
            receiver.unsecure_incoming(&IncomingFrame::new(restarted, 8)),
            Err(SecurityError::Replay { frame_counter: 256, last_accepted: 5000 })
        ));
    }

    #[test]
    fn test_replay_across_network_key_switch() {
        let next_key = zb_crypto::SecretKey::from_bytes([0x3C; 16]);
        let mut sender = service_with_network_key(100);
        sender.install_key(KeyEntry::network(1, next_key.clone()));
        let mut receiver = service_with_network_key(0);
        receiver.install_key(KeyEntry::network(1, next_key));

        let captured = IncomingFrame::new(sender.secure_outgoing(network_frame()).unwrap(), 8);
        receiver.unsecure_incoming(&captured).unwrap();

        receiver.switch_network_key(1).unwrap();
        assert_eq!(
            receiver.unsecure_incoming(&captured),
            Err(SecurityError::Replay {
                frame_counter: 100,
                last_accepted: 100
            })
        );

        // A straggler still under the old key moves on normally
        let straggler = IncomingFrame::new(sender.secure_outgoing(network_frame()).unwrap(), 8);
        assert_eq!(receiver.unsecure_incoming(&straggler).unwrap().frame_counter, 101);
    }

    #[test]
    fn test_unauthenticated_level_cannot_advance_counter() {
        let config = SecurityConfig::default().with_zero_level_on_air(false);
        let mut receiver = SecurityService::new(config, NoopEventSink).unwrap();
        receiver.install_key(KeyEntry::network(0, network_key()));

        // Level 0 header with a counter one below exhaustion, no key used
        let mut forged = bytes(NWK_HEADER);
        forged.extend_from_slice(&[0x28, 0xFE, 0xFF, 0xFF, 0xFF]);
        forged.extend_from_slice(&SENDER.to_le_bytes());
        forged.push(0x00);
        forged.extend_from_slice(b"forged payload");

        assert_eq!(
            receiver.unsecure_incoming(&IncomingFrame::new(forged, 8)),
            Err(SecurityError::AuthFailure)
        );
        assert_eq!(receiver.counters().stored(SENDER, CounterScope::network(0)), None);

        let mut sender = SecurityService::new(
            SecurityConfig::default().with_zero_level_on_air(false),
            NoopEventSink,
        )
        .unwrap();
        sender.install_key(KeyEntry::network(0, network_key()).with_counter(7));
        let genuine = sender.secure_outgoing(network_frame()).unwrap();
        assert_eq!(
            receiver
                .unsecure_incoming(&IncomingFrame::new(genuine, 8))
                .unwrap()
                .frame_counter,
            7
        );
    }

    #[test]
    fn test_authorize_unknown_peer() {
        let mut receiver = service_with_network_key(0);
        assert!(!receiver.authorize_counter_reset(SENDER, KeyId::Network));
    }

    // =========================================================================
    // TAMPERING
    // =========================================================================

    #[test]
    fn test_every_single_bit_flip_rejected() {
        let mut sender = service_with_network_key(1);
        let data = sender.secure_outgoing(network_frame()).unwrap();
        let mut receiver = service_with_network_key(0);

        // Skip the control octet: its level bits are replaced on receive
        let protected = (0..data.len()).filter(|&i| i != 8);
        for byte in protected {
            for bit in 0..8 {
                let mut tampered = data.clone();
                tampered[byte] ^= 1 << bit;
                assert!(
                    receiver
                        .unsecure_incoming(&IncomingFrame::new(tampered, 8))
                        .is_err(),
                    "flip at byte {byte} bit {bit} accepted"
                );
            }
        }
        assert!(receiver.unsecure_incoming(&IncomingFrame::new(data, 8)).is_ok());
    }

    #[test]
    fn test_wrong_network_key_rejected() {
        let mut sender = service_with_network_key(1);
        let mut receiver = service();
        receiver.install_key(KeyEntry::network(
            0,
            zb_crypto::SecretKey::from_bytes([0xEE; 16]),
        ));

        let data = sender.secure_outgoing(network_frame()).unwrap();
        assert_eq!(
            receiver.unsecure_incoming(&IncomingFrame::new(data, 8)),
            Err(SecurityError::AuthFailure)
        );
        assert_eq!(receiver.counters().stored(SENDER, CounterScope::network(0)), None);
    }

    #[test]
    fn test_unknown_key_sequence() {
        let mut sender = service();
        sender.install_key(KeyEntry::network(7, network_key()));
        let mut receiver = service_with_network_key(0);

        let data = sender.secure_outgoing(network_frame()).unwrap();
        assert_eq!(
            receiver.unsecure_incoming(&IncomingFrame::new(data, 8)),
            Err(SecurityError::KeyNotFound {
                key_id: KeyId::Network
            })
        );
    }

    #[test]
    fn test_lenient_reserved_bits() {
        let config = SecurityConfig::default().with_strict_reserved_bits(false);
        let mut receiver = SecurityService::new(config, NoopEventSink).unwrap();
        receiver.install_key(KeyEntry::network(0, network_key()));

        let mut data = service_with_network_key(1)
            .secure_outgoing(network_frame())
            .unwrap();
        data[8] |= 0x80;

        // Reserved bits are authenticated, so the MIC no longer matches
        assert_eq!(
            receiver.unsecure_incoming(&IncomingFrame::new(data, 8)),
            Err(SecurityError::AuthFailure)
        );
    }

    proptest! {
        #[test]
        fn prop_any_header_and_payload_round_trip(
            header in proptest::collection::vec(any::<u8>(), 0..24),
            body in proptest::collection::vec(any::<u8>(), 0..96),
            counter in 0u32..u32::MAX - 1,
        ) {
            let mut sender = service_with_network_key(counter);
            let mut receiver = service_with_network_key(0);
            let header_len = header.len();

            let data = sender
                .secure_outgoing(OutgoingFrame::network(header.clone(), body.clone(), SENDER))
                .unwrap();
            let unsecured = receiver
                .unsecure_incoming(&IncomingFrame::new(data, header_len))
                .unwrap();

            prop_assert_eq!(unsecured.header, header);
            prop_assert_eq!(unsecured.payload, body);
            prop_assert_eq!(unsecured.frame_counter, counter);
        }
    }
}
