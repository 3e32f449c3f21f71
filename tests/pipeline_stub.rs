//! End-to-end pipeline over the synthetic source and stub detector:
//! frames in, one aggregated JSON count window out.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use clap::Parser;

use streamcount::config::{Args, Config};
use streamcount::{select_backend, CountService, PersonCounter, ShutdownFlag};

/// One-shot HTTP server; hands back the full request it captured.
fn capture_server() -> (String, mpsc::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
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
                    if request.len() >= body_start + content_length(&request[..body_start]) {
                        break;
                    }
                }
            }
            let _ = stream.write_all(
                b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            );
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

fn body_json(request: &str) -> serde_json::Value {
    let body = request
        .split_once("\r\n\r\n")
        .map(|(_, body)| body)
        .unwrap_or("");
    serde_json::from_str(body).expect("JSON body")
}

fn pipeline_config(backend_url: &str, interval_secs: &str) -> Config {
    let args = Args::try_parse_from([
        "countd",
        "--stream-url",
        "stub://pipeline",
        "--stream-id",
        "pipeline",
        "--backend-url",
        backend_url,
        "--aggregation-interval",
        interval_secs,
        "--proc-width",
        "320",
        "--proc-height",
        "240",
    ])
    .expect("parse args");
    Config::from_args(args).expect("validate config")
}

fn service_for(cfg: &Config) -> CountService {
    let backend = select_backend(
        &cfg.detector,
        &cfg.model_path,
        cfg.proc_width,
        cfg.proc_height,
        cfg.confidence_threshold,
    )
    .expect("backend");
    let counter = PersonCounter::new(backend, cfg.confidence_threshold);
    CountService::connect(cfg, counter, ShutdownFlag::new()).expect("connect")
}

#[test]
fn finalize_reports_buffered_counts() {
    let (base, rx) = capture_server();
    // Long window: nothing flushes mid-run, finalize delivers the rest.
    let cfg = pipeline_config(&base, "3600");
    let mut service = service_for(&cfg);

    for _ in 0..5 {
        service.tick().expect("tick");
    }
    service.finalize().expect("finalize");

    let request = rx.recv_timeout(Duration::from_secs(5)).expect("request");
    assert!(request.starts_with("POST /counts HTTP/1.1"));

    let record = body_json(&request);
    assert_eq!(record["streamId"], "pipeline");
    // The stub detector yields 0-3 people per frame.
    let avg = record["avgCount"].as_f64().expect("avgCount");
    assert!((0.0..=3.0).contains(&avg), "avg out of range: {avg}");
    assert!(record["windowStart"].as_str().is_some_and(|s| s.contains('T')));
    assert!(record["windowEnd"].as_str().is_some_and(|s| s.contains('T')));
}

#[test]
fn due_window_is_delivered_mid_run() {
    let (base, rx) = capture_server();
    let cfg = pipeline_config(&base, "1");
    let mut service = service_for(&cfg);

    service.tick().expect("tick");
    thread::sleep(Duration::from_millis(1100));
    // The window is past due; this tick records one more count and flushes.
    service.tick().expect("tick");

    let request = rx.recv_timeout(Duration::from_secs(5)).expect("request");
    let record = body_json(&request);
    assert_eq!(record["streamId"], "pipeline");
    assert!(record["avgCount"].is_number());
}
