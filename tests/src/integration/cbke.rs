//! # Key Establishment Flows
//!
//! Two parties holding CA-issued implicit certificates agree on a shared
//! secret, statically (ECDH) or with ephemeral keys (ECMQV).

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use tokio::sync::broadcast::error::TryRecvError;
    use zb_crypto::{PrivateKey, Sect163k1, Sect283k1, ZigbeeCurve};
    use zb_security::{
        Cbke2Certificate, Cbke2Private, CbkeCertificate, CbkeKeys, CbkePrivate, CredentialKind,
        EphemeralKeyPair, KeyAgreementScheme, SecurityError, SecurityEvent,
    };

    fn v1_keys(private: &str) -> CbkePrivate {
        CbkeKeys::from_bytes(&bytes(private), &bytes(V1_CA_PUBLIC)).expect("valid v1 keys")
    }

    fn v2_keys(private: &str) -> Cbke2Private {
        CbkeKeys::from_bytes(&bytes(private), &bytes(V2_CA_PUBLIC)).expect("valid v2 keys")
    }

    fn ephemeral<C: ZigbeeCurve>(private: &str) -> EphemeralKeyPair<C> {
        EphemeralKeyPair::from_private(
            PrivateKey::from_bytes(&bytes(private)).expect("valid scalar"),
        )
    }

    // =========================================================================
    // SUITE 1
    // =========================================================================

    #[test]
    fn test_v1_ecdh_between_services() {
        let initiator = service();
        let responder = service();
        let mut events = initiator.events().subscribe();

        let z_a = initiator
            .cbke_shared_secret::<CbkeCertificate>(&bytes(V1_CERT_B), &v1_keys(V1_PRIVATE_A))
            .unwrap();
        let z_b = responder
            .cbke_shared_secret::<CbkeCertificate>(&bytes(V1_CERT_A), &v1_keys(V1_PRIVATE_B))
            .unwrap();

        assert_eq!(z_a, z_b);
        assert_eq!(hex::encode(z_a.as_bytes()), V1_ECDH_SECRET);
        assert_eq!(
            events.try_recv().unwrap(),
            SecurityEvent::KeyEstablished {
                suite: "cbke1",
                scheme: KeyAgreementScheme::Ecdh,
                peer: CERT_B_SUBJECT,
            }
        );
    }

    #[test]
    fn test_v1_mqv_pinned() {
        let e_a = ephemeral::<Sect163k1>(V1_EPHEMERAL_A);
        let e_b = ephemeral::<Sect163k1>(V1_EPHEMERAL_B);
        assert_eq!(hex::encode(e_a.public_bytes().unwrap()), V1_EPHEMERAL_PUBLIC_A);
        assert_eq!(hex::encode(e_b.public_bytes().unwrap()), V1_EPHEMERAL_PUBLIC_B);

        let service = service();
        let z_a = service
            .cbke_mqv_shared_secret::<CbkeCertificate>(
                &bytes(V1_CERT_B),
                &bytes(V1_EPHEMERAL_PUBLIC_B),
                &v1_keys(V1_PRIVATE_A),
                &e_a,
            )
            .unwrap();
        let z_b = service
            .cbke_mqv_shared_secret::<CbkeCertificate>(
                &bytes(V1_CERT_A),
                &bytes(V1_EPHEMERAL_PUBLIC_A),
                &v1_keys(V1_PRIVATE_B),
                &e_b,
            )
            .unwrap();

        assert_eq!(z_a, z_b);
        assert_eq!(hex::encode(z_a.as_bytes()), V1_MQV_SECRET);
        assert_ne!(hex::encode(z_a.as_bytes()), V1_ECDH_SECRET);
    }

    #[test]
    fn test_v1_mqv_fresh_ephemerals() {
        let service = service();
        let e_a = EphemeralKeyPair::<Sect163k1>::generate();
        let e_b = EphemeralKeyPair::<Sect163k1>::generate();

        let z_a = service
            .cbke_mqv_shared_secret::<CbkeCertificate>(
                &bytes(V1_CERT_B),
                &e_b.public_bytes().unwrap(),
                &v1_keys(V1_PRIVATE_A),
                &e_a,
            )
            .unwrap();
        let z_b = service
            .cbke_mqv_shared_secret::<CbkeCertificate>(
                &bytes(V1_CERT_A),
                &e_a.public_bytes().unwrap(),
                &v1_keys(V1_PRIVATE_B),
                &e_b,
            )
            .unwrap();

        assert_eq!(z_a, z_b);
        assert_eq!(z_a.len(), 21);
    }

    // =========================================================================
    // SUITE 2
    // =========================================================================

    #[test]
    fn test_v2_ecdh_between_services() {
        let service = service();
        let z_a = service
            .cbke_shared_secret::<Cbke2Certificate>(&bytes(V2_CERT_B), &v2_keys(V2_PRIVATE_A))
            .unwrap();
        let z_b = service
            .cbke_shared_secret::<Cbke2Certificate>(&bytes(V2_CERT_A), &v2_keys(V2_PRIVATE_B))
            .unwrap();

        assert_eq!(z_a, z_b);
        assert_eq!(z_a.len(), 36);
        assert_eq!(hex::encode(z_a.as_bytes()), V2_ECDH_SECRET);
    }

    #[test]
    fn test_v2_mqv_pinned() {
        let e_a = ephemeral::<Sect283k1>(V2_EPHEMERAL_A);
        let e_b = ephemeral::<Sect283k1>(V2_EPHEMERAL_B);
        let service = service();
        let mut events = service.events().subscribe();

        let z_a = service
            .cbke_mqv_shared_secret::<Cbke2Certificate>(
                &bytes(V2_CERT_B),
                &bytes(V2_EPHEMERAL_PUBLIC_B),
                &v2_keys(V2_PRIVATE_A),
                &e_a,
            )
            .unwrap();
        let z_b = service
            .cbke_mqv_shared_secret::<Cbke2Certificate>(
                &bytes(V2_CERT_A),
                &bytes(V2_EPHEMERAL_PUBLIC_A),
                &v2_keys(V2_PRIVATE_B),
                &e_b,
            )
            .unwrap();

        assert_eq!(z_a, z_b);
        assert_eq!(hex::encode(z_a.as_bytes()), V2_MQV_SECRET);

        let peers: Vec<_> = std::iter::from_fn(|| events.try_recv().ok())
            .map(|event| match event {
                SecurityEvent::KeyEstablished {
                    suite: "cbke2",
                    scheme: KeyAgreementScheme::Ecmqv,
                    peer,
                } => peer,
                other => panic!("unexpected event {other:?}"),
            })
            .collect();
        assert_eq!(peers, vec![CERT_B_SUBJECT, CERT_A_SUBJECT]);
    }

    // =========================================================================
    // REJECTED CREDENTIALS
    // =========================================================================

    #[test]
    fn test_suite_mismatch_rejected() {
        let service = service();
        let mut events = service.events().subscribe();

        assert_eq!(
            service
                .cbke_shared_secret::<CbkeCertificate>(&bytes(V2_CERT_B), &v1_keys(V1_PRIVATE_A)),
            Err(SecurityError::CurveMismatch)
        );
        assert_eq!(
            service
                .cbke_shared_secret::<Cbke2Certificate>(&bytes(V1_CERT_B), &v2_keys(V2_PRIVATE_A)),
            Err(SecurityError::CurveMismatch)
        );

        for _ in 0..2 {
            assert_eq!(
                events.try_recv().unwrap(),
                SecurityEvent::CredentialRejected {
                    kind: CredentialKind::Certificate,
                    error: SecurityError::CurveMismatch,
                }
            );
        }
        assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn test_malformed_certificates_rejected() {
        let service = service();
        let keys = v1_keys(V1_PRIVATE_A);

        let mut cert = bytes(V1_CERT_B);
        cert.pop();
        assert!(matches!(
            service.cbke_shared_secret::<CbkeCertificate>(&cert, &keys),
            Err(SecurityError::CertificateInvalid(_))
        ));

        // Compressed point prefix must be 0x02 or 0x03
        let mut cert = bytes(V1_CERT_B);
        cert[0] = 0x05;
        assert!(matches!(
            service.cbke_shared_secret::<CbkeCertificate>(&cert, &keys),
            Err(SecurityError::CertificateInvalid(_))
        ));
    }

    #[test]
    fn test_bad_peer_ephemeral_rejected() {
        let service = service();
        let e_a = ephemeral::<Sect163k1>(V1_EPHEMERAL_A);

        let result = service.cbke_mqv_shared_secret::<CbkeCertificate>(
            &bytes(V1_CERT_B),
            &bytes(V1_EPHEMERAL_PUBLIC_B)[..21],
            &v1_keys(V1_PRIVATE_A),
            &e_a,
        );
        assert!(matches!(result, Err(SecurityError::MalformedInput(_))));
    }
}
