//! # Telemetry Flows
//!
//! A service wired to the telemetry sink counts what it does and still
//! forwards every event to the broadcast channel behind it.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use zb_security::{
        BroadcastEventSink, IncomingFrame, KeyEntry, OutgoingFrame, SecurityConfig,
        SecurityEvent, SecurityService, TelemetryEventSink,
    };
    use zb_telemetry::{encode_metrics, register_metrics, FRAMES_ACCEPTED, FRAMES_REJECTED};

    fn instrumented() -> SecurityService<TelemetryEventSink<BroadcastEventSink>> {
        let mut service = SecurityService::new(
            SecurityConfig::default(),
            TelemetryEventSink::forwarding(BroadcastEventSink::new()),
        )
        .unwrap();
        service.install_key(KeyEntry::network(0, network_key()));
        service
    }

    #[test]
    fn test_metrics_follow_traffic() {
        register_metrics().unwrap();
        let accepted = FRAMES_ACCEPTED.with_label_values(&["network"]);
        let replayed = FRAMES_REJECTED.with_label_values(&["replay"]);
        let (accepted_before, replayed_before) = (accepted.get(), replayed.get());

        let mut sender = service_with_network_key(3);
        let mut receiver = instrumented();
        let mut events = receiver.events().inner().subscribe();

        let data = sender
            .secure_outgoing(OutgoingFrame::network(bytes(NWK_HEADER), payload(), SENDER))
            .unwrap();
        let frame = IncomingFrame::new(data, 8);
        receiver.unsecure_incoming(&frame).unwrap();
        assert!(receiver.unsecure_incoming(&frame).is_err());

        assert!(accepted.get() >= accepted_before + 1.0);
        assert!(replayed.get() >= replayed_before + 1.0);
        assert!(matches!(
            events.try_recv().unwrap(),
            SecurityEvent::FrameAccepted { frame_counter: 3, .. }
        ));
        assert!(matches!(
            events.try_recv().unwrap(),
            SecurityEvent::FrameRejected { .. }
        ));

        let text = encode_metrics().unwrap();
        assert!(text.contains("zb_security_frames_accepted_total"));
        assert!(text.contains("zb_security_frames_rejected_total{reason=\"replay\"}"));
    }
}
