//! Prometheus metrics for the Zigbee security subsystem.
//!
//! All metrics follow the naming convention: `zb_security_<metric>_<unit>`
//!
//! Counters are incremented whether or not [`register_metrics`] has run;
//! registration only makes them visible to [`encode_metrics`].

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // FRAME METRICS
    // =========================================================================

    /// Outgoing frames secured, by key identifier
    pub static ref FRAMES_SECURED: CounterVec = CounterVec::new(
        Opts::new("zb_security_frames_secured_total", "Total outgoing frames secured"),
        &["key_id"]
    ).expect("metric creation failed");

    /// Incoming frames authenticated, by the key class that matched
    pub static ref FRAMES_ACCEPTED: CounterVec = CounterVec::new(
        Opts::new("zb_security_frames_accepted_total", "Total incoming frames accepted"),
        &["encrypt_type"]
    ).expect("metric creation failed");

    /// Incoming frames rejected, by reason
    pub static ref FRAMES_REJECTED: CounterVec = CounterVec::new(
        Opts::new("zb_security_frames_rejected_total", "Total incoming frames rejected"),
        &["reason"]  // reason: replay/auth_failure/malformed/...
    ).expect("metric creation failed");

    // =========================================================================
    // KEY MANAGEMENT METRICS
    // =========================================================================

    /// Keys installed into the key store, by key type
    pub static ref KEYS_INSTALLED: CounterVec = CounterVec::new(
        Opts::new("zb_security_keys_installed_total", "Total keys installed"),
        &["key_type"]
    ).expect("metric creation failed");

    /// Credentials rejected at the API boundary
    pub static ref CREDENTIALS_REJECTED: CounterVec = CounterVec::new(
        Opts::new("zb_security_credentials_rejected_total", "Total rejected install codes, certificates and signatures"),
        &["kind"]  // kind: install_code/certificate/signature
    ).expect("metric creation failed");

    // =========================================================================
    // PUBLIC-KEY METRICS
    // =========================================================================

    /// Key establishment computations, by suite and scheme
    pub static ref KEY_ESTABLISHMENTS: CounterVec = CounterVec::new(
        Opts::new("zb_security_key_establishments_total", "Total CBKE shared secret derivations"),
        &["suite", "scheme"]  // scheme: ecdh/ecmqv
    ).expect("metric creation failed");

    /// Duration of elliptic-curve operations
    pub static ref EC_OPERATION_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "zb_security_ec_operation_duration_seconds",
            "Time spent in elliptic-curve operations"
        ).buckets(exponential_buckets(0.0005, 2.0, 14).expect("bucket layout")),
        &["operation"]  // operation: ecdh/ecmqv/ecdsa_verify
    ).expect("metric creation failed");

    /// Upgrade image signature validations, by suite and outcome
    pub static ref IMAGES_VALIDATED: CounterVec = CounterVec::new(
        Opts::new("zb_security_images_validated_total", "Total upgrade image signature checks"),
        &["suite", "outcome"]
    ).expect("metric creation failed");
}

/// Handle to the registered metrics.
#[derive(Clone)]
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register all metrics with the global registry.
///
/// Calling this more than once is harmless.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Frames
        Box::new(FRAMES_SECURED.clone()),
        Box::new(FRAMES_ACCEPTED.clone()),
        Box::new(FRAMES_REJECTED.clone()),
        // Keys
        Box::new(KEYS_INSTALLED.clone()),
        Box::new(CREDENTIALS_REJECTED.clone()),
        // Public key
        Box::new(KEY_ESTABLISHMENTS.clone()),
        Box::new(EC_OPERATION_DURATION.clone()),
        Box::new(IMAGES_VALIDATED.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: prometheus::Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a timer for one labelled series of `histogram`.
    pub fn start(histogram: &HistogramVec, operation: &str) -> Self {
        Self {
            histogram: histogram.with_label_values(&[operation]),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}
