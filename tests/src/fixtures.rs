//! # Pinned Test Vectors
//!
//! Certificates and keys were issued by a test CA on each curve; the
//! expected secrets and signatures were computed independently.

use zb_crypto::SecretKey;
use zb_security::{
    BroadcastEventSink, ExtendedAddress, KeyEntry, SecurityConfig, SecurityService,
};

// =============================================================================
// FRAME PROTECTION
// =============================================================================

/// Extended address of the sending device.
pub const SENDER: ExtendedAddress = 0x0011_2233_4455_6677;

/// Extended address of the trust center.
pub const TRUST_CENTER: ExtendedAddress = 0x000D_6F00_0000_0001;

/// Unsecured network header of the end-to-end frame.
pub const NWK_HEADER: &str = "4802fcff00001e11";

/// Auxiliary header as authenticated (level 5, network key, extended nonce).
pub const AUX_HEADER: &str = "2d01000000776655443322110000";

/// Auxiliary header as transmitted, level bits zeroed.
pub const AUX_HEADER_ON_AIR: &str = "2801000000776655443322110000";

/// Nonce for frame counter 1 from [`SENDER`].
pub const NONCE: &str = "7766554433221100010000002d";

/// Encrypted payload for the end-to-end frame.
pub const CIPHERTEXT: &str = "4c89776a93e79802a4be25b31daea0d78ade24a8";

/// MIC-32 of the end-to-end frame.
pub const MIC32: &str = "9c4da00d";

// =============================================================================
// INSTALL CODES
// =============================================================================

/// 16-byte install code with CRC.
pub const INSTALL_CODE_16: &str = "83fed3407a939723a5c639b26916d505c3b5";

/// Link key derived from [`INSTALL_CODE_16`].
pub const INSTALL_CODE_16_KEY: &str = "66b6900981e1ee3ca4206b6b861c02bb";

// =============================================================================
// CBKE SUITE 1 (sect163k1)
// =============================================================================

pub const V1_CA_PUBLIC: &str = "02011617df2edf7bb924d94d829fd7e8c596d7383537";
pub const V1_CERT_A: &str = "0201e288cf8b120614264affbc9870402569c6139734000d6f000000000a544553545345434100010203040506070809";
pub const V1_PRIVATE_A: &str = "00e1e38dafb44b4ca9e82a53ec899076dab1c803c9";
pub const V1_CERT_B: &str = "0307e7fc4a8c93c917c86e5b84919857c9010926d59e000d6f000000000b54455354534543410a0b0c0d0e0f10111213";
pub const V1_PRIVATE_B: &str = "00bb1b20ad90d12fddd8d4c44cda9415fe86e4c9fd";
pub const V1_ECDH_SECRET: &str = "02e0af3b8d4854399292b1669cca2b9f9ae851de70";
pub const V1_EPHEMERAL_A: &str = "000000000000000000007777777777777777777777";
pub const V1_EPHEMERAL_B: &str = "000000000000000000009999999999999999999999";
pub const V1_EPHEMERAL_PUBLIC_A: &str = "0205dc607f522bad5ffc98b8450769a995f359625ead";
pub const V1_EPHEMERAL_PUBLIC_B: &str = "030102a74a665c991c51c1ccaf8375dc4cb926bb46bd";
pub const V1_MQV_SECRET: &str = "012578b253334c90e422085a8a85f8152ba60d1db8";
pub const V1_CERT_DIGEST: &str = "8baeee226e4d9137c0076026da5166c2";
pub const V1_SIGNATURE: &str = "0a000000006f0d00022bb338bae897b22bc3b638f8f50a78aa000553130153deb358c23ae96ca7068ae225e9a7402001330f";

// =============================================================================
// CBKE SUITE 2 (sect283k1)
// =============================================================================

pub const V2_CA_PUBLIC: &str = "020579c241e6b47c751264e312261c3650735366cdee574207baa9a258f4a561fb0e5b0429";
pub const V2_CERT_A: &str = "0001020304050607080d0854455354534543410052d3f700ffffffff000d6f000000000a8803030b1ae80f56d69b8cfd13b7d67d91c14af80cd10adbde6c3d9e1cf54ad4d0020cd64978";
pub const V2_PRIVATE_A: &str = "0000000000000000325b4133aef17ff175fddae4a62e546a4f0c7e0c88002344509f938b";
pub const V2_CERT_B: &str = "0011121314151617180d0854455354534543410052d3f700ffffffff000d6f000000000b8802034b6197386c50419fbec8dc3d4fa96227ae27f743096d72ac226e12f18f060e3197b30c";
pub const V2_PRIVATE_B: &str = "000000000000003b799462bb9547f7feccaf6f46df4e2e4ff71d6abab3e6034396c3161b";
pub const V2_ECDH_SECRET: &str = "0295632625d4f5b959be7486008bb60f562c4bad24e8292298e7db4fc8f681cdd1bcd906";
pub const V2_EPHEMERAL_A: &str = "000000000000000000000000000000000000000000000000007777777777777777777777";
pub const V2_EPHEMERAL_B: &str = "000000000000000000000000000000000000000000000000009999999999999999999999";
pub const V2_EPHEMERAL_PUBLIC_A: &str = "0305c771e363dedf15f4b095a0a00e9e1475879505ba608c3865cf71bfa90d157a5715b3aa";
pub const V2_EPHEMERAL_PUBLIC_B: &str = "03046dc61caa572b2e1b3d6f5154596db9f2050107cbdf0db1dad4e93cd93f3ff107d710bf";
pub const V2_MQV_SECRET: &str = "04631ff88e80f825bbf3b9ffa55ec91a53a335db49b57b6c8b7a86e0ec5e45f403e6e0ba";
pub const V2_CERT_DIGEST: &str = "d603d51ba7825fc23576e19520d14468";
pub const V2_SIGNATURE: &str = "0a000000006f0d00003450d39e29a0854104dda54f8a8251785e077b5f7d7a3a386beb40d3e8d8f020a3d27500fbd94b62b1cb943300938c4ed4ff16b189698cb2e3e80a9e7e97d55abdf983e445bd68";

/// Subject of both `CERT_A` certificates.
pub const CERT_A_SUBJECT: ExtendedAddress = 0x000D_6F00_0000_000A;

/// Subject of both `CERT_B` certificates.
pub const CERT_B_SUBJECT: ExtendedAddress = 0x000D_6F00_0000_000B;

/// AES-MMO of "zigbee ota image payload", signed by both `SIGNATURE`s.
pub const IMAGE_DIGEST: &str = "6dd5318de2c3ab5355e3b29a09ca055a";

// =============================================================================
// HELPERS
// =============================================================================

/// Decode a hex fixture.
pub fn bytes(hex_str: &str) -> Vec<u8> {
    hex::decode(hex_str).expect("fixture is valid hex")
}

/// Network key `C0 C1 .. CF`.
pub fn network_key() -> SecretKey {
    SecretKey::from_bytes(core::array::from_fn(|i| 0xC0 + i as u8))
}

/// 20-byte payload `40 41 .. 53`.
pub fn payload() -> Vec<u8> {
    (0x40..0x54).collect()
}

/// Service with default configuration and a broadcast sink.
pub fn service() -> SecurityService<BroadcastEventSink> {
    SecurityService::new(SecurityConfig::default(), BroadcastEventSink::new())
        .expect("default config is valid")
}

/// Service holding network key 0 with its outgoing counter at `counter`.
pub fn service_with_network_key(counter: u32) -> SecurityService<BroadcastEventSink> {
    let mut service = service();
    service.install_key(KeyEntry::network(0, network_key()).with_counter(counter));
    service
}
