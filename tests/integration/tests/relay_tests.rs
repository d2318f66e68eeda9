//! Relay Integration Tests
//!
//! Each test starts its own relay on an ephemeral port and talks to it over
//! real sockets.
//!
//! Run with: cargo test -p integration-tests --test relay_tests

use std::time::Duration;

use anyhow::Result;
use integration_tests::{ObservedError, TestServer};
use reqwest::StatusCode;

const SILENCE: Duration = Duration::from_millis(150);

// ============================================================================
// HTTP Routes
// ============================================================================

#[tokio::test]
async fn test_health_check() -> Result<()> {
    let server = TestServer::start().await?;

    let response = server.get("/health").await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await?, "OK");

    Ok(())
}

#[tokio::test]
async fn test_static_files_served() -> Result<()> {
    let server = TestServer::start().await?;
    server.write_static("index.html", "<html>relay</html>")?;

    let response = server.get("/index.html").await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await?, "<html>relay</html>");

    let missing = server.get("/missing.js").await?;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    Ok(())
}

// ============================================================================
// Relay Tests
// ============================================================================

#[tokio::test]
async fn test_message_reaches_all_other_clients() -> Result<()> {
    let server = TestServer::start().await?;
    let mut a = server.connect().await?;
    let mut b = server.connect().await?;
    let mut c = server.connect().await?;

    a.send(b"hello").await?;

    assert_eq!(b.recv().await?, b"hello");
    assert_eq!(c.recv().await?, b"hello");

    // Exactly once, and never echoed back
    a.expect_silence(SILENCE).await?;
    b.expect_silence(SILENCE).await?;
    c.expect_silence(SILENCE).await?;

    Ok(())
}

#[tokio::test]
async fn test_single_client_gets_no_echo() -> Result<()> {
    let server = TestServer::start().await?;
    let mut a = server.connect().await?;

    a.send(b"anyone?").await?;
    a.expect_silence(SILENCE).await?;

    Ok(())
}

#[tokio::test]
async fn test_per_sender_order_preserved() -> Result<()> {
    let server = TestServer::start().await?;
    let mut a = server.connect().await?;
    let mut b = server.connect().await?;

    for payload in [&b"M1"[..], b"M2", b"M3"] {
        a.send(payload).await?;
    }

    assert_eq!(b.recv().await?, b"M1");
    assert_eq!(b.recv().await?, b"M2");
    assert_eq!(b.recv().await?, b"M3");

    Ok(())
}

#[tokio::test]
async fn test_text_frames_relayed() -> Result<()> {
    let server = TestServer::start().await?;
    let mut a = server.connect().await?;
    let mut b = server.connect().await?;

    a.send_text("plain text").await?;
    assert_eq!(b.recv().await?, b"plain text");

    Ok(())
}

#[tokio::test]
async fn test_disconnect_unregisters_session() -> Result<()> {
    let server = TestServer::start().await?;
    let mut a = server.connect().await?;
    let b = server.connect().await?;
    let mut c = server.connect().await?;
    assert_eq!(server.state.directory().len(), 3);

    b.close().await?;
    server.wait_for_sessions(2).await?;
    assert_eq!(server.state.directory().len(), 2);

    a.send(b"after").await?;
    assert_eq!(c.recv().await?, b"after");
    a.expect_silence(SILENCE).await?;

    Ok(())
}

#[tokio::test]
async fn test_dropped_socket_unregisters_session() -> Result<()> {
    let server = TestServer::start().await?;
    let a = server.connect().await?;
    let _b = server.connect().await?;

    drop(a);
    server.wait_for_sessions(1).await?;

    Ok(())
}

#[tokio::test]
async fn test_oversized_message_closes_connection() -> Result<()> {
    let mut server = TestServer::start_with(&[("RELAY_MAX_PAYLOAD_BYTES", "16")]).await?;
    let mut big = server.connect().await?;
    let mut other = server.connect().await?;

    big.send(&[b'x'; 64]).await?;
    assert_eq!(big.closed().await?, Some(1009));
    assert_eq!(
        server.next_error().await?,
        ObservedError::PayloadTooLarge { size: 64, limit: 16 }
    );
    server.wait_for_sessions(1).await?;

    // Nothing from the rejected frame leaks to other clients
    other.expect_silence(SILENCE).await?;

    Ok(())
}

#[tokio::test]
async fn test_client_close_reported_as_peer_closed() -> Result<()> {
    let mut server = TestServer::start().await?;
    let a = server.connect().await?;

    a.close().await?;
    assert_eq!(server.next_error().await?, ObservedError::PeerClosed);
    server.wait_for_sessions(0).await?;

    Ok(())
}
