use super::*;
use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use tokio::net::UnixListener;
use tokio::time::timeout;

use crate::protocol::Operation;

/// Atomic counter for generating unique socket paths across parallel tests.
static TEST_COUNTER: AtomicUsize = AtomicUsize::new(0);

const FAST_RETRY: Duration = Duration::from_millis(50);
const EVENT_TIMEOUT: Duration = Duration::from_secs(2);

const UPDATE_FRAME: &str = r#"{"type":"update","session":{"session_id":"s1","slug":"api","status":"Working","last_activity":"2026-03-01T12:30:45Z"}}"#;

/// Creates a TempDir in /tmp, bypassing TMPDIR, which may point at a relative
/// or overly long path.
fn create_temp_dir() -> TempDir {
    TempDir::new_in("/tmp").expect("Failed to create temp directory in /tmp")
}

/// Generates a unique socket path within a temporary directory.
fn unique_socket_path(temp_dir: &TempDir, prefix: &str) -> PathBuf {
    let count = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    temp_dir.path().join(format!("{}_{}.sock", prefix, count))
}

async fn next_event(rx: &mut mpsc::UnboundedReceiver<ClientEvent>) -> ClientEvent {
    timeout(EVENT_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for client event")
        .expect("event channel closed")
}

/// Accepts one client and checks that it subscribed.
async fn accept_subscriber(listener: &UnixListener) -> UnixStream {
    let (mut stream, _) = timeout(EVENT_TIMEOUT, listener.accept())
        .await
        .expect("timed out waiting for client to connect")
        .expect("accept failed");
    let mut request = vec![0u8; SUBSCRIBE_REQUEST.len()];
    stream
        .read_exact(&mut request)
        .await
        .expect("failed to read subscribe request");
    assert_eq!(request, SUBSCRIBE_REQUEST.as_bytes());
    stream
}

async fn join(task: JoinHandle<()>) {
    timeout(EVENT_TIMEOUT, task)
        .await
        .expect("client did not stop in time")
        .expect("client task panicked");
}

#[test]
fn test_client_error_display() {
    let io_err = io::Error::new(io::ErrorKind::NotFound, "no such file");
    let err = ClientError::Connect {
        path: PathBuf::from("/tmp/missing.sock"),
        source: io_err,
    };
    assert_eq!(err.to_string(), "failed to connect to /tmp/missing.sock");
    assert!(err.source().is_some());

    let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe");
    let err = ClientError::Subscribe {
        path: PathBuf::from("/tmp/x.sock"),
        source: io_err,
    };
    assert!(err.to_string().contains("subscribe request"));
}

#[test]
fn test_stop_handle_is_idempotent() {
    let (client, stop) = StreamClient::new("/tmp/unused.sock", FAST_RETRY);
    assert!(!stop.is_stopped());
    stop.stop();
    stop.stop();
    assert!(stop.is_stopped());
    assert!(client.stop.is_stopped());
}

#[test]
fn test_accessors() {
    let (client, _stop) = StreamClient::new("/tmp/a.sock", DEFAULT_RETRY_INTERVAL);
    assert_eq!(client.socket_path(), Path::new("/tmp/a.sock"));
    assert_eq!(client.retry_interval(), Duration::from_secs(5));
}

#[tokio::test]
async fn test_stop_before_run_emits_nothing() {
    let temp_dir = create_temp_dir();
    let path = unique_socket_path(&temp_dir, "early_stop");
    let _listener = UnixListener::bind(&path).expect("bind");

    let (client, stop) = StreamClient::new(&path, FAST_RETRY);
    stop.stop();
    let (tx, mut rx) = mpsc::unbounded_channel();
    join(client.spawn(tx)).await;
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn test_delivers_operations_split_across_writes() {
    let temp_dir = create_temp_dir();
    let path = unique_socket_path(&temp_dir, "split");
    let listener = UnixListener::bind(&path).expect("bind");

    let (client, stop) = StreamClient::new(&path, FAST_RETRY);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let task = client.spawn(tx);

    let mut server = accept_subscriber(&listener).await;
    assert_eq!(next_event(&mut rx).await, ClientEvent::Connectivity(true));

    let frame = format!("{}\n", UPDATE_FRAME);
    let (head, tail) = frame.split_at(20);
    server.write_all(head.as_bytes()).await.unwrap();
    server.flush().await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    server.write_all(tail.as_bytes()).await.unwrap();
    server
        .write_all(b"{\"type\":\"remove\",\"session_id\":\"s1\"}\n")
        .await
        .unwrap();

    match next_event(&mut rx).await {
        ClientEvent::Operation(Operation::Upsert(session)) => assert_eq!(session.id, "s1"),
        other => panic!("expected Upsert, got {:?}", other),
    }
    assert_eq!(
        next_event(&mut rx).await,
        ClientEvent::Operation(Operation::Delete("s1".to_string()))
    );

    stop.stop();
    assert_eq!(next_event(&mut rx).await, ClientEvent::Connectivity(false));
    join(task).await;
}

#[tokio::test]
async fn test_malformed_frame_is_skipped() {
    let temp_dir = create_temp_dir();
    let path = unique_socket_path(&temp_dir, "malformed");
    let listener = UnixListener::bind(&path).expect("bind");

    let (client, stop) = StreamClient::new(&path, FAST_RETRY);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let task = client.spawn(tx);

    let mut server = accept_subscriber(&listener).await;
    assert_eq!(next_event(&mut rx).await, ClientEvent::Connectivity(true));

    let payload = format!("not json\n{{\"type\":\"bogus\"}}\n{}\n", UPDATE_FRAME);
    server.write_all(payload.as_bytes()).await.unwrap();

    match next_event(&mut rx).await {
        ClientEvent::Operation(op) => assert_eq!(op.kind(), "update"),
        other => panic!("expected an operation, got {:?}", other),
    }

    stop.stop();
    assert_eq!(next_event(&mut rx).await, ClientEvent::Connectivity(false));
    join(task).await;
}

#[tokio::test]
async fn test_reconnects_after_producer_disconnect() {
    let temp_dir = create_temp_dir();
    let path = unique_socket_path(&temp_dir, "reconnect");
    let listener = UnixListener::bind(&path).expect("bind");

    let (client, stop) = StreamClient::new(&path, FAST_RETRY);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let task = client.spawn(tx);

    let server = accept_subscriber(&listener).await;
    assert_eq!(next_event(&mut rx).await, ClientEvent::Connectivity(true));

    drop(server);
    assert_eq!(next_event(&mut rx).await, ClientEvent::Connectivity(false));

    let _server = accept_subscriber(&listener).await;
    assert_eq!(next_event(&mut rx).await, ClientEvent::Connectivity(true));

    stop.stop();
    assert_eq!(next_event(&mut rx).await, ClientEvent::Connectivity(false));
    join(task).await;
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn test_reconnect_waits_for_retry_interval() {
    const RETRY: Duration = Duration::from_millis(300);
    // Slack for the gap between the client sending `false` and us seeing it.
    const SLACK: Duration = Duration::from_millis(20);

    let temp_dir = create_temp_dir();
    let path = unique_socket_path(&temp_dir, "retry_gap");
    let listener = UnixListener::bind(&path).expect("bind");

    let (client, stop) = StreamClient::new(&path, RETRY);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let task = client.spawn(tx);

    let server = accept_subscriber(&listener).await;
    assert_eq!(next_event(&mut rx).await, ClientEvent::Connectivity(true));

    drop(server);
    assert_eq!(next_event(&mut rx).await, ClientEvent::Connectivity(false));
    let disconnected_at = tokio::time::Instant::now();

    let _server = accept_subscriber(&listener).await;
    let gap = disconnected_at.elapsed();
    assert!(
        gap + SLACK >= RETRY,
        "reconnected after {:?}, retry interval is {:?}",
        gap,
        RETRY
    );

    // Exactly one `true` follows the single `false`.
    assert_eq!(next_event(&mut rx).await, ClientEvent::Connectivity(true));
    assert!(rx.try_recv().is_err());

    stop.stop();
    assert_eq!(next_event(&mut rx).await, ClientEvent::Connectivity(false));
    join(task).await;
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn test_connect_failures_emit_no_connectivity_events() {
    let temp_dir = create_temp_dir();
    let path = unique_socket_path(&temp_dir, "late_listener");

    let (client, stop) = StreamClient::new(&path, FAST_RETRY);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let task = client.spawn(tx);

    // Several attempts fail against the missing socket.
    tokio::time::sleep(FAST_RETRY * 3).await;
    assert!(rx.try_recv().is_err());

    let listener = UnixListener::bind(&path).expect("bind");
    let _server = accept_subscriber(&listener).await;
    assert_eq!(next_event(&mut rx).await, ClientEvent::Connectivity(true));

    stop.stop();
    assert_eq!(next_event(&mut rx).await, ClientEvent::Connectivity(false));
    join(task).await;
}

#[tokio::test]
async fn test_stop_interrupts_retry_wait() {
    let temp_dir = create_temp_dir();
    let path = unique_socket_path(&temp_dir, "backoff");

    let (client, stop) = StreamClient::new(&path, Duration::from_secs(60));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let task = client.spawn(tx);

    tokio::time::sleep(Duration::from_millis(20)).await;
    stop.stop();
    join(task).await;
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn test_stop_unblocks_pending_read() {
    let temp_dir = create_temp_dir();
    let path = unique_socket_path(&temp_dir, "pending_read");
    let listener = UnixListener::bind(&path).expect("bind");

    let (client, stop) = StreamClient::new(&path, FAST_RETRY);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let task = client.spawn(tx);

    let mut server = accept_subscriber(&listener).await;
    assert_eq!(next_event(&mut rx).await, ClientEvent::Connectivity(true));

    stop.stop();
    assert_eq!(next_event(&mut rx).await, ClientEvent::Connectivity(false));
    join(task).await;

    // The client closed its end.
    let mut buf = [0u8; 16];
    let n = timeout(EVENT_TIMEOUT, server.read(&mut buf))
        .await
        .expect("timed out waiting for close")
        .expect("read failed");
    assert_eq!(n, 0);
}

#[tokio::test]
async fn test_dropped_receiver_ends_loop() {
    let temp_dir = create_temp_dir();
    let path = unique_socket_path(&temp_dir, "no_receiver");
    let listener = UnixListener::bind(&path).expect("bind");

    let (client, _stop) = StreamClient::new(&path, FAST_RETRY);
    let (tx, rx) = mpsc::unbounded_channel();
    drop(rx);
    let task = client.spawn(tx);

    let mut server = accept_subscriber(&listener).await;
    let _ = server.write_all(format!("{}\n", UPDATE_FRAME).as_bytes()).await;
    join(task).await;
}
