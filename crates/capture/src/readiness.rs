//! Waiting for the application under capture to accept connections

use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{info, warn};

use routeshot_common::{Error, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Poll `url` until the server answers with any HTTP status.
///
/// A dev server that was just started refuses connections for a while; that
/// is expected and not logged. Gives up with [`Error::Connection`] after
/// `timeout_duration`.
pub async fn wait_for_app(url: &str, timeout_duration: Duration) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()
        .map_err(|e| Error::Connection {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let start = Instant::now();
    let mut attempts = 0usize;
    let mut last_error = String::from("no attempt made");

    while start.elapsed() < timeout_duration {
        attempts += 1;

        match client.get(url).send().await {
            Ok(resp) => {
                info!("{} answered with {} after {} attempt(s)", url, resp.status(), attempts);
                return Ok(());
            }
            Err(e) => {
                if attempts == 1 {
                    info!("Waiting for {} to accept connections...", url);
                }
                if !e.is_connect() {
                    warn!("Readiness check error: {}", e);
                }
                last_error = e.to_string();
            }
        }

        sleep(POLL_INTERVAL).await;
    }

    Err(Error::Connection {
        url: url.to_string(),
        reason: format!("no response after {} attempt(s): {}", attempts, last_error),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_unreachable_app_times_out() {
        // Bind then drop to get a port nothing listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let url = format!("http://127.0.0.1:{}/", port);
        let err = wait_for_app(&url, Duration::from_millis(600)).await.unwrap_err();
        assert!(matches!(err, Error::Connection { url: u, .. } if u == url));
    }

    #[tokio::test]
    async fn test_any_status_counts_as_ready() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            socket
                .write_all(b"HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                .await
                .unwrap();
        });

        wait_for_app(&format!("http://127.0.0.1:{}/", port), Duration::from_secs(5))
            .await
            .unwrap();
        server.await.unwrap();
    }
}
