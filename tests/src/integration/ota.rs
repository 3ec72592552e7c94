//! # Upgrade Image Validation Flows
//!
//! An OTA server hands the client an image digest, the signer certificate
//! and the signature; the client checks them against the CA key it trusts.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use zb_crypto::aes_mmo_hash;
    use zb_security::{
        CredentialKind, EcdsaSignatureSuite, SecurityError, SecurityEvent, StatusCode,
        ZigbeeSecurityApi,
    };

    struct Bundle {
        suite: u8,
        ca: Vec<u8>,
        certificate: Vec<u8>,
        signature: Vec<u8>,
        image_digest: Vec<u8>,
        cert_digest: Vec<u8>,
    }

    impl Bundle {
        fn suite1() -> Self {
            Self {
                suite: 1,
                ca: bytes(V1_CA_PUBLIC),
                certificate: bytes(V1_CERT_A),
                signature: bytes(V1_SIGNATURE),
                image_digest: bytes(IMAGE_DIGEST),
                cert_digest: bytes(V1_CERT_DIGEST),
            }
        }

        fn suite2() -> Self {
            Self {
                suite: 2,
                ca: bytes(V2_CA_PUBLIC),
                certificate: bytes(V2_CERT_A),
                signature: bytes(V2_SIGNATURE),
                image_digest: bytes(IMAGE_DIGEST),
                cert_digest: bytes(V2_CERT_DIGEST),
            }
        }

        fn status(&self) -> StatusCode {
            service().ecdsa_validate(
                self.suite,
                &self.ca,
                &self.certificate,
                &self.signature,
                &self.image_digest,
                &self.cert_digest,
            )
        }
    }

    #[test]
    fn test_digests_computed_locally() {
        assert_eq!(
            hex::encode(aes_mmo_hash(b"zigbee ota image payload")),
            IMAGE_DIGEST
        );
        assert_eq!(hex::encode(aes_mmo_hash(&bytes(V1_CERT_A))), V1_CERT_DIGEST);
        assert_eq!(hex::encode(aes_mmo_hash(&bytes(V2_CERT_A))), V2_CERT_DIGEST);
    }

    #[test]
    fn test_valid_signatures() {
        assert_eq!(Bundle::suite1().status(), StatusCode::Success);
        assert_eq!(Bundle::suite2().status(), StatusCode::Success);
    }

    #[test]
    fn test_validated_event_names_signer() {
        let service = service();
        let mut events = service.events().subscribe();
        let bundle = Bundle::suite2();

        let signer = service
            .validate_image(
                bundle.suite,
                &bundle.ca,
                &bundle.certificate,
                &bundle.signature,
                &bundle.image_digest,
                &bundle.cert_digest,
            )
            .unwrap();

        assert_eq!(signer, CERT_A_SUBJECT);
        assert_eq!(
            events.try_recv().unwrap(),
            SecurityEvent::ImageValidated {
                suite: EcdsaSignatureSuite::Suite2,
                signer: CERT_A_SUBJECT,
            }
        );
    }

    #[test]
    fn test_modified_image_rejected() {
        for mut bundle in [Bundle::suite1(), Bundle::suite2()] {
            bundle.image_digest = aes_mmo_hash(b"zigbee ota image payloaD").to_vec();
            assert_eq!(bundle.status(), StatusCode::SecurityFail);
        }
    }

    #[test]
    fn test_signature_from_other_device_rejected() {
        // Suite 1 signature presented with the certificate of device B
        let mut bundle = Bundle::suite1();
        bundle.certificate = bytes(V1_CERT_B);
        bundle.cert_digest = aes_mmo_hash(&bundle.certificate).to_vec();
        assert_eq!(bundle.status(), StatusCode::SecurityFail);

        // Signer field rewritten to device B
        let mut bundle = Bundle::suite2();
        bundle.signature[..8].copy_from_slice(&CERT_B_SUBJECT.to_le_bytes());
        assert_eq!(bundle.status(), StatusCode::SecurityFail);
    }

    #[test]
    fn test_wrong_ca_rejected() {
        let mut bundle = Bundle::suite1();
        let mut ca = bytes(V1_CA_PUBLIC);
        ca[0] ^= 0x01;
        bundle.ca = ca;
        assert_eq!(bundle.status(), StatusCode::SecurityFail);
    }

    #[test]
    fn test_length_boundaries() {
        for len in [73usize, 75] {
            let mut bundle = Bundle::suite2();
            bundle.certificate.resize(len, 0);
            assert_eq!(bundle.status(), StatusCode::InvalidParameter, "length {len}");
        }

        let mut bundle = Bundle::suite1();
        bundle.signature.push(0);
        assert_eq!(bundle.status(), StatusCode::InvalidParameter);

        let mut bundle = Bundle::suite1();
        bundle.image_digest.truncate(15);
        assert_eq!(bundle.status(), StatusCode::InvalidParameter);

        // Suite 2 material under suite 1
        let mut bundle = Bundle::suite2();
        bundle.suite = 1;
        assert_eq!(bundle.status(), StatusCode::InvalidParameter);
    }

    #[test]
    fn test_unknown_suite() {
        let service = service();
        let mut events = service.events().subscribe();
        let mut bundle = Bundle::suite1();
        bundle.suite = 3;

        assert_eq!(
            service.ecdsa_validate(
                bundle.suite,
                &bundle.ca,
                &bundle.certificate,
                &bundle.signature,
                &bundle.image_digest,
                &bundle.cert_digest,
            ),
            StatusCode::NotSupported
        );
        assert_eq!(
            events.try_recv().unwrap(),
            SecurityEvent::CredentialRejected {
                kind: CredentialKind::Signature,
                error: SecurityError::UnsupportedSuite(3),
            }
        );
    }
}
