//! Count-window delivery.
//!
//! One POST per window to `{backend}/counts`, at-most-once: the caller
//! logs a failed delivery and drops the window. No retry queue, no
//! persistence.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::aggregate::CountWindow;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Wire record for one aggregated window.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CountRecord<'a> {
    stream_id: &'a str,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    avg_count: f64,
}

/// Delivers count windows to the backend.
pub struct Reporter {
    agent: ureq::Agent,
    endpoint: String,
    stream_id: String,
}

impl Reporter {
    pub fn new(backend_url: &str, stream_id: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        let endpoint = format!("{}/counts", backend_url.trim_end_matches('/'));
        Self {
            agent,
            endpoint,
            stream_id: stream_id.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST one window. Non-2xx statuses and transport failures are errors;
    /// the caller decides to drop the window.
    pub fn send(&self, window: &CountWindow) -> Result<()> {
        let record = CountRecord {
            stream_id: &self.stream_id,
            window_start: window.window_start,
            window_end: window.window_end,
            avg_count: window.avg_count,
        };
        let response = self
            .agent
            .post(&self.endpoint)
            .send_json(&record)
            .with_context(|| format!("POST {}", self.endpoint))?;
        log::info!(
            "reported avg {:.2} for window ending {} (status {})",
            window.avg_count,
            window.window_end.to_rfc3339(),
            response.status()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;

    /// One-shot HTTP server capturing the request it receives.
    fn capture_server(status: &'static str) -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut request = Vec::new();
                let mut buf = [0u8; 4096];
                loop {
                    let n = stream.read(&mut buf).unwrap_or(0);
                    if n == 0 {
                        break;
                    }
                    request.extend_from_slice(&buf[..n]);
                    if let Some(body_start) = header_end(&request) {
                        let body_len = content_length(&request[..body_start]);
                        if request.len() >= body_start + body_len {
                            break;
                        }
                    }
                }
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                    status
                );
                let _ = stream.write_all(response.as_bytes());
                let _ = tx.send(String::from_utf8_lossy(&request).into_owned());
            }
        });
        (format!("http://{}", addr), rx)
    }

    fn header_end(request: &[u8]) -> Option<usize> {
        request
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .map(|pos| pos + 4)
    }

    fn content_length(headers: &[u8]) -> usize {
        String::from_utf8_lossy(headers)
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                if name.eq_ignore_ascii_case("content-length") {
                    value.trim().parse().ok()
                } else {
                    None
                }
            })
            .unwrap_or(0)
    }

    fn sample_window() -> CountWindow {
        let window_end = Utc::now();
        CountWindow {
            window_start: window_end - chrono::Duration::seconds(15),
            window_end,
            avg_count: 3.5,
        }
    }

    #[test]
    fn posts_camel_case_record_to_counts_endpoint() {
        let (base, rx) = capture_server("201 Created");
        let reporter = Reporter::new(&base, "stream1");

        reporter.send(&sample_window()).unwrap();

        let request = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(request.starts_with("POST /counts HTTP/1.1"));
        assert!(request.contains(r#""streamId":"stream1""#));
        assert!(request.contains(r#""avgCount":3.5"#));
        assert!(request.contains(r#""windowStart""#));
        assert!(request.contains(r#""windowEnd""#));
    }

    #[test]
    fn server_error_is_reported_as_failure() {
        let (base, _rx) = capture_server("500 Internal Server Error");
        let reporter = Reporter::new(&base, "stream1");
        assert!(reporter.send(&sample_window()).is_err());
    }

    #[test]
    fn endpoint_normalizes_trailing_slash() {
        let reporter = Reporter::new("http://backend:3000/", "s");
        assert_eq!(reporter.endpoint(), "http://backend:3000/counts");
    }

    #[test]
    fn unreachable_backend_is_an_error_not_a_panic() {
        // Port 9 (discard) is almost certainly closed; connection refused.
        let reporter = Reporter::new("http://127.0.0.1:9", "s");
        assert!(reporter.send(&sample_window()).is_err());
    }
}
