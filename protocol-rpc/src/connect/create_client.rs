//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0

use std::io;
use std::time::Duration;

use tokio::net::TcpStream;

pub const CONNECT_ATTEMPTS: u32 = 10;
pub const RETRY_DELAY: Duration = Duration::from_millis(3000);

/// Connects to the active party, retrying while it is not listening yet
pub async fn connect(host: &str) -> io::Result<TcpStream> {
    connect_with_retry(host, CONNECT_ATTEMPTS, RETRY_DELAY).await
}

/// Only a refused connection is retried, `attempts` counts the first try
pub async fn connect_with_retry(
    host: &str,
    attempts: u32,
    delay: Duration,
) -> io::Result<TcpStream> {
    let mut delays = retry::delay::Fixed::from_millis(delay.as_millis() as u64)
        .take(attempts.saturating_sub(1) as usize);
    let mut retry_count: u32 = 0;
    loop {
        if retry_count == 0 {
            info!("Connecting to host: {}", host);
        } else {
            info!("Connecting to host: {} [retry: {}]", host, retry_count);
        }
        match TcpStream::connect(host).await {
            Ok(stream) => {
                stream.set_nodelay(true)?;
                return Ok(stream);
            }
            Err(e) if e.kind() == io::ErrorKind::ConnectionRefused => match delays.next() {
                Some(wait) => {
                    warn!("Connection to {} refused: {}", host, e);
                    retry_count += 1;
                    tokio::time::sleep(wait).await;
                }
                None => {
                    error!(
                        "Cannot connect to {} after {} attempts: {}",
                        host,
                        retry_count + 1,
                        e
                    );
                    return Err(e);
                }
            },
            Err(e) => {
                error!("Cannot connect to {}: {}", host, e);
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use tokio::net::TcpListener;

    async fn closed_port() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);
        addr
    }

    #[tokio::test]
    async fn refused_connections_are_retried_then_reported() {
        let addr = closed_port().await;
        let start = Instant::now();
        let err = connect_with_retry(&addr, 3, Duration::from_millis(20))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionRefused);
        // two waits between three attempts
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn single_attempt_does_not_wait() {
        let addr = closed_port().await;
        let start = Instant::now();
        assert!(connect_with_retry(&addr, 1, Duration::from_secs(5))
            .await
            .is_err());
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn late_listener_is_reached() {
        let addr = closed_port().await;
        let bind_addr = addr.clone();
        let server = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let listener = TcpListener::bind(&bind_addr).await.unwrap();
            listener.accept().await.unwrap();
        });
        let stream = connect_with_retry(&addr, 20, Duration::from_millis(25))
            .await
            .unwrap();
        assert!(stream.nodelay().unwrap());
        server.await.unwrap();
    }
}
