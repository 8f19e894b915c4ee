use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use urlsaver::prelude::{ErrorCode, ShortenerClient};

#[derive(Clone)]
struct ResponseSpec {
    status: u16,
    body: String,
}

impl ResponseSpec {
    fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

fn find_header_end(raw: &[u8]) -> Option<usize> {
    raw.windows(4).position(|window| window == b"\r\n\r\n")
}

fn parse_content_length(raw_headers: &[u8]) -> usize {
    let text = String::from_utf8_lossy(raw_headers);
    for line in text.split("\r\n") {
        if let Some((name, value)) = line.split_once(':')
            && name.trim().eq_ignore_ascii_case("content-length")
            && let Ok(parsed) = value.trim().parse::<usize>()
        {
            return parsed;
        }
    }
    0
}

fn read_http_request(stream: &mut TcpStream) -> std::io::Result<Vec<u8>> {
    stream.set_read_timeout(Some(Duration::from_secs(2)))?;

    let mut raw = Vec::new();
    loop {
        let mut chunk = [0_u8; 1024];
        let read = stream.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        raw.extend_from_slice(&chunk[..read]);

        if let Some(header_end) = find_header_end(&raw) {
            let content_length = parse_content_length(&raw[..header_end]);
            if raw.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }

    Ok(raw)
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "Unknown",
    }
}

fn write_http_response(stream: &mut TcpStream, response: &ResponseSpec) -> std::io::Result<()> {
    let raw = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        response.status,
        status_text(response.status),
        response.body.len(),
        response.body
    );
    stream.write_all(raw.as_bytes())?;
    stream.flush()
}

struct StubUpstream {
    base_url: String,
    served: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl StubUpstream {
    fn start(responses: Vec<ResponseSpec>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub upstream");
        let base_url = format!("http://{}", listener.local_addr().expect("stub upstream addr"));
        let served = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let served_in_thread = served.clone();
        let requests_in_thread = requests.clone();
        thread::spawn(move || {
            for response in responses {
                let Ok((mut stream, _)) = listener.accept() else {
                    return;
                };
                let Ok(raw) = read_http_request(&mut stream) else {
                    return;
                };
                requests_in_thread
                    .lock()
                    .expect("requests lock")
                    .push(raw);
                served_in_thread.fetch_add(1, Ordering::SeqCst);
                let _ = write_http_response(&mut stream, &response);
            }
        });

        Self {
            base_url,
            served,
            requests,
        }
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn served(&self) -> usize {
        self.served.load(Ordering::SeqCst)
    }

    fn requests_text(&self) -> Vec<String> {
        self.requests
            .lock()
            .expect("requests lock")
            .iter()
            .map(|raw| String::from_utf8_lossy(raw).into_owned())
            .collect()
    }
}

fn client_for(upstream: &StubUpstream, max_retries: usize) -> ShortenerClient {
    ShortenerClient::builder(upstream.base_url())
        .timeout(Duration::from_millis(500))
        .max_retries(max_retries)
        .try_build()
        .expect("client should build")
}

#[tokio::test]
async fn shorten_url_round_trip() {
    let upstream = StubUpstream::start(vec![ResponseSpec::new(
        200,
        r#"{"url":"http://example.com","alias":"abc"}"#,
    )]);
    let client = client_for(&upstream, 3);

    let shortened = client
        .shorten_url(CancellationToken::new(), "http://example.com", "abc")
        .await
        .expect("round trip should succeed");

    assert_eq!(shortened.url, "http://example.com");
    assert_eq!(shortened.alias, "abc");
    assert_eq!(upstream.served(), 1);

    let requests = upstream.requests_text();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert!(request.starts_with("POST "), "unexpected request line: {request}");
    assert!(
        request.to_ascii_lowercase().contains("content-type: application/json"),
        "missing content type: {request}"
    );
    assert!(request.contains(r#"{"url":"http://example.com","alias":"abc"}"#));
}

#[tokio::test]
async fn retryable_statuses_are_retried_until_success() {
    let ok_body = r#"{"url":"http://example.com","alias":"abc"}"#;
    let upstream = StubUpstream::start(vec![
        ResponseSpec::new(503, "try later"),
        ResponseSpec::new(429, "slow down"),
        ResponseSpec::new(200, ok_body),
    ]);
    let client = client_for(&upstream, 2);

    let shortened = client
        .shorten_url(CancellationToken::new(), "http://example.com", "abc")
        .await
        .expect("third attempt should succeed");

    assert_eq!(shortened.alias, "abc");
    assert_eq!(upstream.served(), 3);

    // every retry attempt carries a full request body
    for request in upstream.requests_text() {
        assert!(request.contains(r#""url":"http://example.com""#));
    }
}

#[tokio::test]
async fn exhausted_retries_surface_the_final_upstream_response() {
    let upstream = StubUpstream::start(vec![
        ResponseSpec::new(503, "upstream unavailable"),
        ResponseSpec::new(503, "upstream unavailable"),
        ResponseSpec::new(503, "upstream unavailable"),
    ]);
    let client = client_for(&upstream, 2);

    let error = client
        .shorten_url(CancellationToken::new(), "http://example.com", "abc")
        .await
        .expect_err("all attempts return 503");

    assert_eq!(upstream.served(), 3);
    assert_eq!(error.code(), ErrorCode::HttpStatus);
    let text = error.to_string();
    assert!(text.contains("503"), "missing status: {text}");
    assert!(
        text.contains("upstream unavailable"),
        "missing upstream body: {text}"
    );
}

#[tokio::test]
async fn non_retryable_status_uses_a_single_attempt() {
    let upstream = StubUpstream::start(vec![ResponseSpec::new(404, "no such alias")]);
    let client = client_for(&upstream, 5);

    let error = client
        .shorten_url(CancellationToken::new(), "http://example.com", "abc")
        .await
        .expect_err("404 is terminal");

    assert_eq!(upstream.served(), 1);
    assert_eq!(error.code(), ErrorCode::HttpStatus);
    assert!(error.to_string().contains("404"));
}

#[tokio::test]
async fn unreachable_upstream_exhausts_every_attempt() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind probe listener");
        listener.local_addr().expect("probe addr").port()
    };

    let client = ShortenerClient::builder(format!("http://127.0.0.1:{port}"))
        .timeout(Duration::from_millis(200))
        .max_retries(2)
        .try_build()
        .expect("client should build");

    let error = client
        .shorten_url(CancellationToken::new(), "http://example.com", "abc")
        .await
        .expect_err("nothing is listening on the probe port");

    assert_eq!(error.code(), ErrorCode::AttemptsExhausted);
    assert!(
        error.to_string().contains("all 3 attempts failed"),
        "unexpected message: {error}"
    );
}

#[tokio::test]
async fn malformed_success_body_fails_without_retrying() {
    let upstream = StubUpstream::start(vec![ResponseSpec::new(200, "definitely not json")]);
    let client = client_for(&upstream, 3);

    let error = client
        .shorten_url(CancellationToken::new(), "http://example.com", "abc")
        .await
        .expect_err("undecodable success body is terminal");

    assert_eq!(upstream.served(), 1);
    assert_eq!(error.code(), ErrorCode::Deserialize);
}
