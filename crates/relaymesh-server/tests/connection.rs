#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;

use relaymesh_core::protocol::{decode_package, FrameKind, MAX_PAYLOAD_LEN};
use relaymesh_core::{ErrorClass, RelayError};
use relaymesh_server::obs::ServerMetrics;
use relaymesh_server::transport::Connection;

#[test]
fn ids_are_unique_and_clones_share_identity() {
    let (a, _ra) = Connection::new("127.0.0.1:1", 4);
    let (b, _rb) = Connection::new("127.0.0.1:2", 4);
    assert_ne!(a.id(), b.id());
    let a2 = a.clone();
    assert!(a.same_as(&a2));
    assert!(!a.same_as(&b));
    assert_eq!(a2.remote_addr(), "127.0.0.1:1");
}

#[test]
fn full_queue_fails_fast_without_touching_others() {
    let metrics = Arc::new(ServerMetrics::default());
    let (slow, _slow_rx) = Connection::with_metrics("10.0.0.1:1", 2, Arc::clone(&metrics));
    let (fast, mut fast_rx) = Connection::new("10.0.0.2:1", 2);

    slow.send(&b"1"[..]).unwrap();
    slow.send(&b"2"[..]).unwrap();
    let err = slow.send(&b"3"[..]).unwrap_err();
    assert!(matches!(err, RelayError::Backpressure));
    assert_eq!(err.class(), ErrorClass::Backpressure);
    assert!(!err.is_fatal());
    assert_eq!(metrics.send_backpressure.get(&[]), 1);

    fast.send(&b"ok"[..]).unwrap();
    let frame = fast_rx.try_recv().unwrap();
    assert_eq!(frame.kind, FrameKind::Raw);
    assert_eq!(&frame.payload[..], b"ok");
    assert!(!slow.is_closed());
}

#[test]
fn close_is_idempotent_and_blocks_sends() {
    let (conn, _rx) = Connection::new("10.0.0.1:1", 4);
    conn.close();
    conn.close();
    assert!(conn.is_closed());
    assert!(matches!(conn.send(&b"x"[..]), Err(RelayError::ConnectionClosed)));
}

#[test]
fn dropped_writer_reports_connection_closed() {
    let (conn, rx) = Connection::new("10.0.0.1:1", 4);
    drop(rx);
    let err = conn.send(&b"x"[..]).unwrap_err();
    assert!(matches!(err, RelayError::ConnectionClosed));
    assert!(err.is_fatal());
}

#[test]
fn oversize_payload_is_rejected_before_queueing() {
    let (conn, mut rx) = Connection::new("10.0.0.1:1", 4);
    let err = conn.send(vec![b'a'; MAX_PAYLOAD_LEN]).unwrap_err();
    assert!(matches!(err, RelayError::MessageTooLarge(n) if n == MAX_PAYLOAD_LEN));
    assert!(rx.try_recv().is_err());
    conn.send(vec![b'a'; MAX_PAYLOAD_LEN - 1]).unwrap();
}

#[test]
fn write_json_queues_an_envelope() {
    let (conn, mut rx) = Connection::new("10.0.0.1:1", 4);
    conn.write_json("S2C_GetServerAddr", &serde_json::json!({"ServerAddr": "1.2.3.4:5"}))
        .unwrap();
    let frame = rx.try_recv().unwrap();
    let pkg = decode_package(&frame.payload).unwrap();
    assert_eq!(pkg.id, "S2C_GetServerAddr");
    assert_eq!(pkg.body.unwrap().get(), r#"{"ServerAddr":"1.2.3.4:5"}"#);
}
