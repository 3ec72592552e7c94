//! # Zigbee Security Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/          # Criterion benchmarks (CCM*, AES-MMO, CBKE, ECDSA)
//! └── src/
//!     ├── fixtures.rs   # Pinned vectors shared by tests and benches
//!     └── integration/  # Service-level flows
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p zb-tests
//!
//! # By flow
//! cargo test -p zb-tests integration::frames::
//! cargo test -p zb-tests integration::cbke::
//!
//! # Benchmarks
//! cargo bench -p zb-tests
//! ```

pub mod fixtures;
pub mod integration;
