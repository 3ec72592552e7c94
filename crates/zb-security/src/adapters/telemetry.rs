//! # Telemetry Event Adapter
//!
//! Turns security events into Prometheus counter increments and structured
//! log lines. Accepted frames and key installs log at debug, rejections at
//! warn.

use crate::ports::outbound::{SecurityEvent, SecurityEventSink};
use zb_telemetry::{
    log_event, log_frame_event, log_key_event, metric_inc, CREDENTIALS_REJECTED,
    FRAMES_ACCEPTED, FRAMES_REJECTED, FRAMES_SECURED, IMAGES_VALIDATED, KEYS_INSTALLED,
    KEY_ESTABLISHMENTS,
};

/// Records every event in metrics and logs, optionally forwarding it.
#[derive(Debug, Default)]
pub struct TelemetryEventSink<S = crate::adapters::noop::NoopEventSink> {
    inner: S,
}

impl TelemetryEventSink {
    /// Metrics and logs only.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: SecurityEventSink> TelemetryEventSink<S> {
    /// Record, then hand each event on to `inner`.
    pub fn forwarding(inner: S) -> Self {
        Self { inner }
    }

    /// The wrapped sink.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn record(event: &SecurityEvent) {
        match event {
            SecurityEvent::FrameSecured {
                destination,
                key_id,
                frame_counter,
            } => {
                metric_inc!(FRAMES_SECURED, &[key_id.label()]);
                log_frame_event!(
                    trace,
                    "frame secured",
                    destination.unwrap_or_default(),
                    *frame_counter,
                    key_id = key_id.label()
                );
            }
            SecurityEvent::FrameAccepted {
                source,
                key_id,
                frame_counter,
                encrypt_type,
            } => {
                metric_inc!(FRAMES_ACCEPTED, &[encrypt_type.label()]);
                log_frame_event!(
                    debug,
                    "frame accepted",
                    *source,
                    *frame_counter,
                    key_id = key_id.label(),
                    encrypt_type = encrypt_type.label()
                );
            }
            SecurityEvent::FrameRejected { source, error } => {
                metric_inc!(FRAMES_REJECTED, &[error.reason_label()]);
                log_event!(
                    warn,
                    "frame",
                    "frame rejected",
                    peer = ?source.map(|s| format!("{s:016X}")),
                    reason = error.reason_label(),
                    error = %error
                );
            }
            SecurityEvent::KeyInstalled { key_type, peer } => {
                metric_inc!(KEYS_INSTALLED, &[key_type.label()]);
                log_key_event!(
                    debug,
                    "key installed",
                    peer.unwrap_or_default(),
                    key_type = key_type.label()
                );
            }
            SecurityEvent::DeviceRemoved {
                device,
                keys_removed,
            } => {
                log_key_event!(info, "device removed", *device, keys_removed = *keys_removed);
            }
            SecurityEvent::NetworkKeySwitched { sequence } => {
                log_event!(info, "keys", "network key switched", sequence = *sequence);
            }
            SecurityEvent::CounterResetAuthorized { peer, key_id } => {
                log_key_event!(
                    info,
                    "frame counter reset authorized",
                    *peer,
                    key_id = key_id.label()
                );
            }
            SecurityEvent::CredentialRejected { kind, error } => {
                metric_inc!(CREDENTIALS_REJECTED, &[kind.label()]);
                log_event!(
                    warn,
                    "keys",
                    "credential rejected",
                    kind = kind.label(),
                    reason = error.reason_label(),
                    error = %error
                );
            }
            SecurityEvent::ImageValidated { suite, signer } => {
                metric_inc!(IMAGES_VALIDATED, &[suite.label(), "valid"]);
                log_event!(
                    info,
                    "ota",
                    "image signature valid",
                    suite = suite.label(),
                    signer = %format!("{signer:016X}")
                );
            }
            SecurityEvent::KeyEstablished {
                suite,
                scheme,
                peer,
            } => {
                metric_inc!(KEY_ESTABLISHMENTS, &[*suite, scheme.label()]);
                log_event!(
                    debug,
                    "cbke",
                    "shared secret derived",
                    suite = *suite,
                    scheme = scheme.label(),
                    peer = %format!("{peer:016X}")
                );
            }
        }
    }
}

impl<S: SecurityEventSink> SecurityEventSink for TelemetryEventSink<S> {
    fn publish(&self, event: SecurityEvent) {
        Self::record(&event);
        self.inner.publish(event);
    }
}
