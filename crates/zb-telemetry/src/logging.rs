//! Structured logging helpers.
//!
//! Every security log line carries a `component` field (`frame`, `keys`,
//! `cbke`, `ota`) so the JSON output can be filtered per concern.

/// Emit a log line with a `component` field.
#[macro_export]
macro_rules! log_event {
    (info, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::info!(
            component = $component,
            $($($field)*,)?
            $msg
        )
    };

    (warn, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::warn!(
            component = $component,
            $($($field)*,)?
            $msg
        )
    };

    (error, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::error!(
            component = $component,
            $($($field)*,)?
            $msg
        )
    };

    (debug, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::debug!(
            component = $component,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a frame event with the peer address and frame counter.
#[macro_export]
macro_rules! log_frame_event {
    ($level:ident, $msg:expr, $peer:expr, $frame_counter:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = "frame",
            peer = %format!("{:016X}", $peer),
            frame_counter = $frame_counter,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a key-store event for one device.
#[macro_export]
macro_rules! log_key_event {
    ($level:ident, $msg:expr, $device:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = "keys",
            device = %format!("{:016X}", $device),
            $($($field)*,)?
            $msg
        )
    };
}
