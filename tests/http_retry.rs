//! End-to-end retry behavior: the Session Manager must retry a 5xx response
//! and return the eventual 2xx, without retrying on a 4xx.

use reqwest::Method;
use streamgate::session::{SessionConfig, SessionManager};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

fn retry_friendly_config() -> SessionConfig {
    SessionConfig {
        retry_count: 3,
        retry_base_delay_secs: 0.01,
        retry_backoff_multiplier: 1.0,
        auto_cleanup: false,
        ..SessionConfig::default()
    }
}

async fn serve_responses(listener: TcpListener, statuses: Vec<u16>) {
    for status in statuses {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 1024];
        let _ = stream.read(&mut buf).await;
        let body = "";
        let response = format!(
            "HTTP/1.1 {status} {reason}\r\ncontent-length: {len}\r\nconnection: close\r\n\r\n{body}",
            reason = reason_phrase(status),
            len = body.len(),
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.unwrap();
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

#[tokio::test]
async fn retries_on_server_error_then_succeeds() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve_responses(listener, vec![500, 500, 200]));

    let manager = SessionManager::new(retry_friendly_config());
    let url = format!("http://{addr}/ticker");
    let response = manager
        .request_with_retry(Method::GET, &url, "test")
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    let stats = manager.stats();
    assert_eq!(stats.requests_sent, 3);
    manager.close_all();
}

#[tokio::test]
async fn does_not_retry_client_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve_responses(listener, vec![400]));

    let manager = SessionManager::new(retry_friendly_config());
    let url = format!("http://{addr}/bad");
    let response = manager
        .request_with_retry(Method::GET, &url, "test")
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
    assert_eq!(manager.stats().requests_sent, 1);
    manager.close_all();
}
