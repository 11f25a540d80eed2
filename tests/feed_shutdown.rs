use std::net::TcpListener;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use matchboard::backoff::ReconnectConfig;
use matchboard::config::Config;
use matchboard::feed;
use matchboard::push::spawn_push_channel;
use matchboard::state::{ChannelStatus, Delta, FeedSource};

#[test]
fn feed_reports_unreachable_backend_and_stops() {
    let config = Config {
        api_base: "http://127.0.0.1:1/api/v1".to_string(),
        push_enabled: false,
        ..Config::default()
    };
    let (tx, rx) = mpsc::channel();
    let handle = feed::spawn_feed(&config, tx);

    let mut saw_disabled = false;
    let mut saw_failure = false;
    let deadline = Instant::now() + Duration::from_secs(10);
    while !(saw_disabled && saw_failure) && Instant::now() < deadline {
        match rx.recv_timeout(Duration::from_millis(200)) {
            Ok(Delta::Channel(ChannelStatus::Disabled)) => saw_disabled = true,
            Ok(Delta::FetchFailed {
                source: FeedSource::Matches,
                ..
            }) => saw_failure = true,
            _ => {}
        }
    }
    assert!(saw_disabled);
    assert!(saw_failure);

    let started = Instant::now();
    handle.shutdown();
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[test]
fn shutdown_returns_while_server_never_answers_the_handshake() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind local listener");
    let addr = listener.local_addr().expect("local addr");

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, _cmd_rx) = mpsc::channel();
    let stop = Arc::new(AtomicBool::new(false));
    let push = spawn_push_channel(
        format!("ws://{addr}/ws/live"),
        ReconnectConfig::default(),
        tx,
        stop.clone(),
    );
    let handle = feed::handle_from_parts(cmd_tx, stop, vec![push]);

    // Accept the connection and then stay silent.
    let (_silent, _) = listener.accept().expect("client connects");
    assert_eq!(
        rx.recv_timeout(Duration::from_secs(5)),
        Ok(Delta::Channel(ChannelStatus::Connecting))
    );
    std::thread::sleep(Duration::from_millis(300));

    let started = Instant::now();
    handle.shutdown();
    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(
        !rx.try_iter()
            .any(|d| d == Delta::Channel(ChannelStatus::Connected))
    );
}
