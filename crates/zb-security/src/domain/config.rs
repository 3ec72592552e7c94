//! Security subsystem configuration and validation.
//!
//! # Example
//!
//! ```ignore
//! use zb_security::domain::config::SecurityConfig;
//!
//! let config = SecurityConfig::default()
//!     .with_strict_reserved_bits(false)
//!     .with_frame_counter_reset_max(128);
//! config.validate().expect("valid config");
//! ```

use crate::domain::entities::{SecurityLevel, FRAME_COUNTER_RESET_MAX};
use crate::domain::errors::SecurityError;
use serde::{Deserialize, Serialize};
use std::env;

/// Tunables of the security service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Reject received control octets with reserved bits set
    pub strict_reserved_bits: bool,
    /// Exclusive upper bound for an authorized frame counter reset (1..=256)
    pub frame_counter_reset_max: u32,
    /// Level applied to network frames and substituted on receive
    pub network_security_level: SecurityLevel,
    /// Transmit the level bits as zero
    pub zero_level_on_air: bool,
    /// Install the ZigBeeAlliance09 preconfigured link key at startup
    pub preconfigured_global_link_key: bool,
    /// Try global link keys after the per-peer link keys
    pub global_link_fallback: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            strict_reserved_bits: true,
            frame_counter_reset_max: FRAME_COUNTER_RESET_MAX,
            network_security_level: SecurityLevel::EncMic32,
            zero_level_on_air: true,
            preconfigured_global_link_key: true,
            global_link_fallback: true,
        }
    }
}

impl SecurityConfig {
    /// Validate ranges.
    pub fn validate(&self) -> Result<(), SecurityError> {
        if self.frame_counter_reset_max == 0
            || self.frame_counter_reset_max > FRAME_COUNTER_RESET_MAX
        {
            return Err(SecurityError::InvalidConfig(format!(
                "frame_counter_reset_max must be in 1..={FRAME_COUNTER_RESET_MAX}, got {}",
                self.frame_counter_reset_max
            )));
        }

        // Network frames are always encrypted and authenticated
        if !self.network_security_level.is_encrypted()
            || self.network_security_level.mic_length() == 0
        {
            return Err(SecurityError::InvalidConfig(format!(
                "network security level {:?} must encrypt and authenticate",
                self.network_security_level
            )));
        }

        Ok(())
    }

    /// Load from `ZB_SEC_*` environment variables over the defaults.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `ZB_SEC_STRICT_RESERVED_BITS` | `strict_reserved_bits` |
    /// | `ZB_SEC_RESET_MAX` | `frame_counter_reset_max` |
    /// | `ZB_SEC_NETWORK_LEVEL` | `network_security_level` (0-7) |
    /// | `ZB_SEC_ZERO_LEVEL_ON_AIR` | `zero_level_on_air` |
    /// | `ZB_SEC_PRECONFIGURED_KEY` | `preconfigured_global_link_key` |
    /// | `ZB_SEC_GLOBAL_FALLBACK` | `global_link_fallback` |
    pub fn from_env() -> Result<Self, SecurityError> {
        let mut config = Self::default();

        if let Some(v) = read_env("ZB_SEC_STRICT_RESERVED_BITS") {
            config.strict_reserved_bits = parse_bool("ZB_SEC_STRICT_RESERVED_BITS", &v)?;
        }
        if let Some(v) = read_env("ZB_SEC_RESET_MAX") {
            config.frame_counter_reset_max = v.parse().map_err(|_| {
                SecurityError::InvalidConfig(format!("ZB_SEC_RESET_MAX: not a number: {v}"))
            })?;
        }
        if let Some(v) = read_env("ZB_SEC_NETWORK_LEVEL") {
            let level: u8 = v.parse().map_err(|_| {
                SecurityError::InvalidConfig(format!("ZB_SEC_NETWORK_LEVEL: not a number: {v}"))
            })?;
            config.network_security_level = SecurityLevel::try_from(level)
                .map_err(|e| SecurityError::InvalidConfig(e.to_string()))?;
        }
        if let Some(v) = read_env("ZB_SEC_ZERO_LEVEL_ON_AIR") {
            config.zero_level_on_air = parse_bool("ZB_SEC_ZERO_LEVEL_ON_AIR", &v)?;
        }
        if let Some(v) = read_env("ZB_SEC_PRECONFIGURED_KEY") {
            config.preconfigured_global_link_key = parse_bool("ZB_SEC_PRECONFIGURED_KEY", &v)?;
        }
        if let Some(v) = read_env("ZB_SEC_GLOBAL_FALLBACK") {
            config.global_link_fallback = parse_bool("ZB_SEC_GLOBAL_FALLBACK", &v)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Builder-style method to set reserved-bit strictness
    pub fn with_strict_reserved_bits(mut self, strict: bool) -> Self {
        self.strict_reserved_bits = strict;
        self
    }

    /// Builder-style method to set the reset window
    pub fn with_frame_counter_reset_max(mut self, reset_max: u32) -> Self {
        self.frame_counter_reset_max = reset_max;
        self
    }

    /// Builder-style method to set the network security level
    pub fn with_network_security_level(mut self, level: SecurityLevel) -> Self {
        self.network_security_level = level;
        self
    }

    /// Builder-style method to send the real level on air
    pub fn with_zero_level_on_air(mut self, zero: bool) -> Self {
        self.zero_level_on_air = zero;
        self
    }

    /// Builder-style method to skip the preconfigured global link key
    pub fn with_preconfigured_global_link_key(mut self, install: bool) -> Self {
        self.preconfigured_global_link_key = install;
        self
    }

    /// Builder-style method to toggle global link key fallback
    pub fn with_global_link_fallback(mut self, enabled: bool) -> Self {
        self.global_link_fallback = enabled;
        self
    }
}

fn read_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

fn parse_bool(name: &str, value: &str) -> Result<bool, SecurityError> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(SecurityError::InvalidConfig(format!(
            "{name}: expected a boolean, got {other}"
        ))),
    }
}
