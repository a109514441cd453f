mod common;

use chrono::NaiveDateTime;
use common::{Server, assert_quiet, exchange};
use std::io::{Read, Write};
use timeserver::codec::TIME_FORMAT;
use timeserver::{BAD_ORDER, QUERY_TIME_ORDER, TimeProtocol};

/// Length of a formatted time reply, e.g. `Sun Feb 16 09:30:05 UTC 2014`.
const TIME_LEN: usize = 28;

fn assert_time(reply: &[u8]) {
    let reply = std::str::from_utf8(reply).expect("reply is UTF-8");
    assert!(
        NaiveDateTime::parse_from_str(reply, TIME_FORMAT).is_ok(),
        "not a time reply: {reply:?}"
    );
}

#[test]
fn test_query_then_bad_order_then_reconnect() {
    let server = Server::start(TimeProtocol::new());

    let mut stream = server.connect();
    assert_time(&exchange(&mut stream, QUERY_TIME_ORDER.as_bytes(), TIME_LEN));
    assert_eq!(
        exchange(&mut stream, b"anything else", BAD_ORDER.len()),
        BAD_ORDER.as_bytes()
    );
    assert_quiet(&mut stream);
    drop(stream);

    let mut stream = server.connect();
    assert_time(&exchange(&mut stream, b"query time order", TIME_LEN));

    server.shutdown();
}

#[test]
fn test_connection_stays_open_across_requests() {
    let server = Server::start(TimeProtocol::new());
    let mut stream = server.connect();

    for _ in 0..5 {
        assert_time(&exchange(&mut stream, QUERY_TIME_ORDER.as_bytes(), TIME_LEN));
        assert_eq!(
            exchange(&mut stream, b"QUERY TIME", BAD_ORDER.len()),
            BAD_ORDER.as_bytes()
        );
    }

    server.shutdown();
}

#[test]
fn test_interleaved_connections_get_their_own_replies() {
    let server = Server::start(TimeProtocol::new());
    let mut a = server.connect();
    let mut b = server.connect();

    a.write_all(QUERY_TIME_ORDER.as_bytes()).unwrap();
    b.write_all(b"nope").unwrap();

    let mut reply = vec![0; BAD_ORDER.len()];
    b.read_exact(&mut reply).unwrap();
    assert_eq!(reply, BAD_ORDER.as_bytes());

    let mut reply = vec![0; TIME_LEN];
    a.read_exact(&mut reply).unwrap();
    assert_time(&reply);

    assert_eq!(exchange(&mut a, b"nope", BAD_ORDER.len()), BAD_ORDER.as_bytes());
    assert_time(&exchange(&mut b, QUERY_TIME_ORDER.as_bytes(), TIME_LEN));

    assert_quiet(&mut a);
    assert_quiet(&mut b);

    server.shutdown();
}

#[test]
fn test_invalid_utf8_closes_only_that_connection() {
    let server = Server::start(TimeProtocol::new());
    let mut bad = server.connect();
    let mut good = server.connect();

    bad.write_all(&[0x51, 0xff, 0xfe]).unwrap();
    let mut buf = [0u8; 16];
    assert_eq!(bad.read(&mut buf).unwrap(), 0);

    assert_time(&exchange(&mut good, QUERY_TIME_ORDER.as_bytes(), TIME_LEN));

    server.shutdown();
}

#[test]
fn test_order_with_line_terminator_is_rejected() {
    let server = Server::start(TimeProtocol::new());
    let mut stream = server.connect();

    for order in [&b"QUERY TIME ORDER\r\n"[..], b"QUERY TIME ORDER\n"] {
        assert_eq!(
            exchange(&mut stream, order, BAD_ORDER.len()),
            BAD_ORDER.as_bytes(),
            "{:?}",
            String::from_utf8_lossy(order)
        );
    }
    assert_quiet(&mut stream);

    server.shutdown();
}
