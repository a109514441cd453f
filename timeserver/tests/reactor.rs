mod common;

use common::{Echo, FLOOD_LEN, Server, assert_quiet, exchange, flood_byte};
use std::io::{Read, Write};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_concurrent_clients_each_get_exactly_their_reply() {
    const CLIENTS: usize = 32;

    let server = Server::start(Echo);
    let barrier = Arc::new(Barrier::new(CLIENTS));

    let handles: Vec<_> = (0..CLIENTS)
        .map(|i| {
            let mut stream = server.connect();
            let barrier = barrier.clone();

            thread::spawn(move || {
                let request = format!("client-{i}");
                let expected = format!("echo:{request}");

                barrier.wait();
                let reply = exchange(&mut stream, request.as_bytes(), expected.len());

                assert_eq!(reply, expected.as_bytes());
                assert_quiet(&mut stream);
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Client thread panicked");
    }

    server.shutdown();
}

#[test]
fn test_large_reply_arrives_complete_and_in_order() {
    let server = Server::start(Echo);
    let mut stream = server.connect();

    stream.write_all(b"flood").unwrap();

    let mut received = vec![0u8; FLOOD_LEN];
    stream.read_exact(&mut received).unwrap();

    let first_bad = received
        .iter()
        .enumerate()
        .position(|(i, b)| *b != flood_byte(i));
    assert_eq!(first_bad, None);

    assert_eq!(exchange(&mut stream, b"after", 10), b"echo:after");

    server.shutdown();
}

#[test]
fn test_peer_closing_mid_write_does_not_disturb_others() {
    let server = Server::start(Echo);
    let mut bystander = server.connect();
    let mut doomed = server.connect();

    doomed.write_all(b"flood").unwrap();

    // Take a little of the reply so the server is certainly mid-write.
    let mut head = [0u8; 1024];
    doomed.read_exact(&mut head).unwrap();
    drop(doomed);

    assert_eq!(exchange(&mut bystander, b"still here", 15), b"echo:still here");

    let mut newcomer = server.connect();
    assert_eq!(exchange(&mut newcomer, b"hi", 7), b"echo:hi");

    server.shutdown();
}

#[test]
fn test_stop_closes_connections_and_ends_the_loop() {
    let server = Server::start(Echo);
    let mut stream = server.connect();
    assert_eq!(exchange(&mut stream, b"ping", 9), b"echo:ping");

    let started = Instant::now();
    server.shutdown();
    assert!(started.elapsed() < Duration::from_secs(2));

    let mut buf = [0u8; 8];
    assert_eq!(stream.read(&mut buf).unwrap(), 0);
}
