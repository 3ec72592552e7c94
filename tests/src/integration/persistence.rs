//! # Persistence and Sharing Flows
//!
//! State survives a restart through a JSON snapshot; a shared service is
//! driven from several threads while an async task watches its events.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use std::collections::HashSet;
    use std::thread;
    use zb_security::{
        BroadcastEventSink, CounterScope, IncomingFrame, OutgoingFrame, SecurityConfig,
        SecurityError, SecurityEvent, SecurityService, SecuritySnapshot,
    };

    fn network_frame() -> OutgoingFrame {
        OutgoingFrame::network(bytes(NWK_HEADER), payload(), SENDER)
    }

    fn reboot(
        service: &SecurityService<BroadcastEventSink>,
    ) -> SecurityService<BroadcastEventSink> {
        let json = service.snapshot().to_json().unwrap();
        let snapshot = SecuritySnapshot::from_json(&json).unwrap();
        SecurityService::restore(SecurityConfig::default(), &snapshot, BroadcastEventSink::new())
            .unwrap()
    }

    // =========================================================================
    // SNAPSHOTS
    // =========================================================================

    #[test]
    fn test_restart_keeps_counters() {
        let mut sender = service_with_network_key(40);
        let mut receiver = service_with_network_key(0);
        receiver.install_link_key(SENDER, &[0x11; 16]).unwrap();

        let first = sender.secure_outgoing(network_frame()).unwrap();
        receiver
            .unsecure_incoming(&IncomingFrame::new(first.clone(), 8))
            .unwrap();

        let mut sender = reboot(&sender);
        let mut receiver = reboot(&receiver);

        // The replayed frame is still rejected after the restart
        assert!(matches!(
            receiver.unsecure_incoming(&IncomingFrame::new(first, 8)),
            Err(SecurityError::Replay {
                frame_counter: 40,
                last_accepted: 40
            })
        ));

        // The sender does not reuse a counter
        let next = sender.secure_outgoing(network_frame()).unwrap();
        assert_eq!(
            receiver
                .unsecure_incoming(&IncomingFrame::new(next, 8))
                .unwrap()
                .frame_counter,
            41
        );
        assert_eq!(receiver.keys().len(), 3);
        assert_eq!(receiver.keys().active_network_sequence(), Some(0));
    }

    #[test]
    fn test_snapshot_json_shape() {
        let service = service_with_network_key(7);
        let value: serde_json::Value =
            serde_json::from_str(&service.snapshot().to_json().unwrap()).unwrap();

        assert!(value["keys"]["entries"].is_array());
        assert_eq!(value["keys"]["active_network_sequence"], 0);
        assert!(value["counters"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_snapshot_rejected() {
        assert!(matches!(
            SecuritySnapshot::from_json("{\"keys\": 5}"),
            Err(SecurityError::MalformedInput(_))
        ));
        assert!(matches!(
            SecuritySnapshot::from_json("not json"),
            Err(SecurityError::MalformedInput(_))
        ));
    }

    // =========================================================================
    // SHARED SERVICE
    // =========================================================================

    #[test]
    fn test_shared_sender_never_repeats_counter() {
        const THREADS: usize = 4;
        const FRAMES: usize = 25;

        let shared = service_with_network_key(0).into_shared();
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let shared = shared.clone();
                thread::spawn(move || {
                    (0..FRAMES)
                        .map(|_| shared.lock().secure_outgoing(network_frame()).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let frames: Vec<Vec<u8>> = handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();
        let counters: HashSet<u32> = frames
            .iter()
            .map(|frame| u32::from_le_bytes([frame[9], frame[10], frame[11], frame[12]]))
            .collect();

        assert_eq!(counters.len(), THREADS * FRAMES);
        assert_eq!(counters.iter().max(), Some(&((THREADS * FRAMES - 1) as u32)));
    }

    #[tokio::test]
    async fn test_async_subscriber_sees_traffic() {
        let mut sender = service_with_network_key(0);
        let receiver = service_with_network_key(0).into_shared();
        let mut events = receiver.lock().events().subscribe();

        let watcher = tokio::spawn(async move {
            let mut accepted = Vec::new();
            while accepted.len() < 3 {
                match events.recv().await {
                    Ok(SecurityEvent::FrameAccepted { frame_counter, .. }) => {
                        accepted.push(frame_counter)
                    }
                    Ok(_) => {}
                    Err(e) => panic!("event stream closed: {e}"),
                }
            }
            accepted
        });

        for _ in 0..3 {
            let data = sender.secure_outgoing(network_frame()).unwrap();
            receiver
                .lock()
                .unsecure_incoming(&IncomingFrame::new(data, 8))
                .unwrap();
        }

        assert_eq!(watcher.await.unwrap(), vec![0, 1, 2]);
        assert_eq!(
            receiver.lock().counters().stored(SENDER, CounterScope::network(0)),
            Some(2)
        );
    }
}
