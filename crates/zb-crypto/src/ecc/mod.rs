//! # Elliptic Curve Cryptography on Koblitz Curves
//!
//! The Smart Energy key establishment suites run over binary Koblitz curves:
//! suite 1 on sect163k1, suite 2 on sect283k1. This module carries the
//! whole stack from field arithmetic to key agreement.
//!
//! | Module | Contents |
//! |--------|----------|
//! | `field` | GF(2^m) polynomial-basis arithmetic |
//! | `curve` | Curve parameters, affine points, SEC1 compression |
//! | `scalar` | Integers mod n, private keys |
//! | `ecqv` | Implicit-certificate public key reconstruction and issuance |
//! | `agreement` | Cofactor ECDH and ECMQV |

pub mod agreement;
pub mod curve;
pub mod ecqv;
pub mod field;
pub mod scalar;

pub use agreement::{ecdh, ecmqv, SharedSecret};
pub use curve::{Point, Sect163k1, Sect283k1, ZigbeeCurve};
pub use ecqv::{certificate_scalar, reconstruct_public_key};
pub use field::{FieldElement, FieldSpec, F163, F283};
pub use scalar::{PrivateKey, Scalar};
