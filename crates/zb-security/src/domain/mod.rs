//! # Domain Layer
//!
//! Frame security rules, key management and credential validation with no
//! I/O dependencies. This is the inner layer of the hexagonal architecture.

pub mod cbke;
pub mod config;
pub mod entities;
pub mod errors;
pub mod frame_counter;
pub mod header;
pub mod image;
pub mod install_code;
pub mod key_store;
pub mod nonce;
pub mod transform;
