// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Background OpenSky client.
//!
//! HTTP requests run on a dedicated Tokio runtime thread so the frame loop
//! never blocks. The engine's rate gate decides when a request is sent;
//! [`OpenSkyFeed::fetch_snapshot`] only starts one when none is in flight and
//! hands back a finished snapshot whole on a later frame.

use std::thread::JoinHandle;
use std::time::Duration;

use log::{debug, error, info, warn};
use skywatch_core::feed::{opensky, Feed, FeedError, RawRecord};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio_util::sync::CancellationToken;

type SnapshotResult = Result<Vec<RawRecord>, FeedError>;

/// [`Feed`] backed by a worker thread polling an OpenSky-compatible endpoint
pub struct OpenSkyFeed {
    url: String,
    request_tx: mpsc::UnboundedSender<()>,
    result_rx: mpsc::UnboundedReceiver<SnapshotResult>,
    cancel_token: CancellationToken,
    in_flight: bool,
    worker: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for OpenSkyFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenSkyFeed")
            .field("url", &self.url)
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}

impl OpenSkyFeed {
    /// Start the worker thread. No request is sent until the first
    /// [`Feed::fetch_snapshot`] call.
    pub fn spawn(url: String, timeout: Duration) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FeedError::Request(e.to_string()))?;

        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (result_tx, result_rx) = mpsc::unbounded_channel();
        let cancel_token = CancellationToken::new();

        let worker_url = url.clone();
        let worker_token = cancel_token.clone();
        let worker = std::thread::Builder::new()
            .name("opensky-feed".to_string())
            .spawn(move || {
                let rt = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        error!("Failed to start feed runtime: {}", e);
                        return;
                    }
                };
                rt.block_on(run_worker(client, worker_url, request_rx, result_tx, worker_token));
            })
            .map_err(|e| FeedError::Request(e.to_string()))?;

        info!("Started OpenSky feed worker for {}", url);

        Ok(Self {
            url,
            request_tx,
            result_rx,
            cancel_token,
            in_flight: false,
            worker: Some(worker),
        })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Cancel any in-flight request and wait for the worker to exit.
    /// A result that was still pending is discarded.
    pub fn shutdown(&mut self) {
        self.cancel_token.cancel();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Feed worker panicked during shutdown");
            }
            info!("OpenSky feed worker stopped");
        }
        self.in_flight = false;
    }
}

impl Drop for OpenSkyFeed {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Feed for OpenSkyFeed {
    fn fetch_snapshot(&mut self) -> Result<Vec<RawRecord>, FeedError> {
        match self.result_rx.try_recv() {
            Ok(result) => {
                self.in_flight = false;
                return result;
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => return Err(FeedError::Closed),
        }

        if !self.in_flight {
            if self.cancel_token.is_cancelled() {
                return Err(FeedError::Closed);
            }
            self.request_tx
                .send(())
                .map_err(|_closed| FeedError::Closed)?;
            self.in_flight = true;
        }
        Err(FeedError::NotReady)
    }
}

async fn run_worker(
    client: reqwest::Client,
    url: String,
    mut request_rx: mpsc::UnboundedReceiver<()>,
    result_tx: mpsc::UnboundedSender<SnapshotResult>,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            () = cancel_token.cancelled() => {
                debug!("Feed worker cancelled while idle");
                return;
            }
            request = request_rx.recv() => {
                if request.is_none() {
                    return;
                }
                let result = tokio::select! {
                    () = cancel_token.cancelled() => {
                        debug!("Feed worker cancelled with a request in flight");
                        return;
                    }
                    result = fetch_states(&client, &url) => result,
                };
                if result_tx.send(result).is_err() {
                    return;
                }
            }
        }
    }
}

async fn fetch_states(client: &reqwest::Client, url: &str) -> SnapshotResult {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| FeedError::Request(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FeedError::Status(status.as_u16()));
    }

    let body = response
        .text()
        .await
        .map_err(|e| FeedError::Request(e.to_string()))?;
    let records = opensky::parse_states(&body)?;
    debug!("Received {} state vectors ({} bytes)", records.len(), body.len());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::time::Instant;

    /// Serve a single canned HTTP response on a random local port.
    fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf);
                let response = format!(
                    "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });
        format!("http://{addr}/api/states/all")
    }

    fn wait_for_result(feed: &mut OpenSkyFeed) -> SnapshotResult {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            match feed.fetch_snapshot() {
                Err(FeedError::NotReady) if Instant::now() < deadline => {
                    std::thread::sleep(Duration::from_millis(10));
                }
                other => return other,
            }
        }
    }

    #[test]
    fn test_fetches_snapshot_in_background() {
        let url = serve_once(
            "HTTP/1.1 200 OK",
            r#"{"time":1700000000,"states":[["84c0b1","JAL006  ","Japan",null,null,139.76,35.68,10972.8,false,250.5,45.0,0.0]]}"#,
        );
        let mut feed = OpenSkyFeed::spawn(url, Duration::from_secs(5)).unwrap();

        assert!(matches!(feed.fetch_snapshot(), Err(FeedError::NotReady)));
        let records = wait_for_result(&mut feed).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].identity.as_deref(), Some("84c0b1"));
        assert!(!feed.in_flight);
    }

    #[test]
    fn test_http_error_status_is_reported() {
        let url = serve_once("HTTP/1.1 429 Too Many Requests", "");
        let mut feed = OpenSkyFeed::spawn(url, Duration::from_secs(5)).unwrap();

        assert!(matches!(wait_for_result(&mut feed), Err(FeedError::Status(429))));
    }

    #[test]
    fn test_malformed_body_is_parse_error() {
        let url = serve_once("HTTP/1.1 200 OK", "<html>maintenance</html>");
        let mut feed = OpenSkyFeed::spawn(url, Duration::from_secs(5)).unwrap();

        assert!(matches!(wait_for_result(&mut feed), Err(FeedError::Parse(_))));
    }

    #[test]
    fn test_closed_after_shutdown() {
        let url = serve_once("HTTP/1.1 200 OK", r#"{"states":null}"#);
        let mut feed = OpenSkyFeed::spawn(url, Duration::from_secs(5)).unwrap();
        feed.shutdown();

        assert!(matches!(feed.fetch_snapshot(), Err(FeedError::Closed)));
    }
}
