use anyhow::{Context, Result};
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use crate::mesh::MessageRegistry;

use super::controller::log_message;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

const MAX_DATAGRAM: usize = 2048;

/// Collection point: logs every report that reaches `addr`.
pub async fn run_collector(addr: &str, cancel_token: CancellationToken) -> Result<u64> {
    let socket = UdpSocket::bind(addr)
        .await
        .with_context(|| format!("failed to bind collector on {addr}"))?;
    serve(socket, cancel_token).await
}

/// Returns how many datagrams decoded to a known message.
async fn serve(socket: UdpSocket, cancel_token: CancellationToken) -> Result<u64> {
    let registry = MessageRegistry::default();
    let mut buf = vec![0u8; MAX_DATAGRAM];
    let mut received = 0u64;

    log_info!("collector listening on {}", socket.local_addr()?);

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                log_info!("collector shutting down after {received} message(s)");
                break;
            }
            recv = socket.recv_from(&mut buf) => {
                let (len, peer) = recv.context("collector receive failed")?;
                match registry.decode(&buf[..len]) {
                    Ok(message) => {
                        received += 1;
                        log_message(&message);
                    }
                    Err(err) => log_warn!("ignoring datagram from {peer}: {err}"),
                }
            }
        }
    }

    Ok(received)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PictureReport, ReportPackage, Score};
    use std::time::Duration;

    #[tokio::test(flavor = "current_thread")]
    async fn counts_decoded_reports_until_cancelled() {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        let cancel_token = CancellationToken::new();
        let collector = tokio::spawn(serve(socket, cancel_token.clone()));

        let report = PictureReport::new(2153, 4, Score::new(0.7));
        let package = ReportPackage::new(3_177_562_153, 1, &report);
        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender
            .send_to(&package.to_bytes().unwrap(), addr)
            .await
            .unwrap();
        sender.send_to(b"not a report", addr).await.unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        cancel_token.cancel();
        assert_eq!(collector.await.unwrap().unwrap(), 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn bind_failure_is_reported() {
        let err = run_collector("not-an-address", CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to bind collector"));
    }
}
