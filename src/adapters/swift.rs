//! Swift HTTP object store
//!
//! Talks to an OpenStack Swift compatible endpoint over blocking HTTP. The
//! storage URL and token are supplied up front; acquiring them is left to the
//! caller. Every request carries `X-Auth-Token`.
//!
//! Transient failures (no response, 408, 429, 5xx) are retried with
//! exponential backoff under [`RetryConfig`]. Other statuses are returned to
//! the engine as-is.

use std::time::Duration;

use bytes::Bytes;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use tracing::{debug, instrument, warn};

use crate::config::{RetryConfig, StoreConfig};
use crate::domain::ports::{ObjectStore, Status};
use crate::error::{Error, Result};

const AUTH_HEADER: &str = "X-Auth-Token";
const COPY_FROM_HEADER: &str = "X-Copy-From";
const DIRECTORY_CONTENT_TYPE: &str = "application/directory";
const USER_AGENT: &str = concat!("cloudchunk/", env!("CARGO_PKG_VERSION"));

/// HTTP [`ObjectStore`] for Swift endpoints
pub struct SwiftStore {
    client: Client,
    storage_url: String,
    token: String,
    retry: RetryConfig,
}

impl std::fmt::Debug for SwiftStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwiftStore")
            .field("storage_url", &self.storage_url)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl SwiftStore {
    /// Create a client for `storage_url` authenticated by `token`.
    pub fn new(
        storage_url: &str,
        token: &str,
        verify_tls: bool,
        connect_timeout: Duration,
        retry: RetryConfig,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(connect_timeout)
            .danger_accept_invalid_certs(!verify_tls)
            .build()?;

        Ok(Self {
            client,
            storage_url: storage_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            retry,
        })
    }

    /// Build from a `StoreConfig::Swift` section.
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        match config {
            StoreConfig::Swift {
                storage_url,
                token,
                verify_tls,
                connect_timeout_secs,
                retry,
            } => Self::new(
                storage_url,
                token,
                *verify_tls,
                Duration::from_secs(*connect_timeout_secs),
                retry.clone(),
            ),
            other => Err(Error::Config(format!(
                "expected a swift store section, got {:?}",
                other
            ))),
        }
    }

    /// Full URL of `key`: each path segment percent-encoded, separators kept.
    pub fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.storage_url, encode_path(key))
    }

    /// Send a request built by `build`, retrying transient failures.
    fn send(&self, op: &'static str, key: &str, build: impl Fn() -> RequestBuilder) -> (Bytes, Status) {
        let attempts = self.retry.max_attempts.max(1);
        let mut last = Status::NO_RESPONSE;

        for attempt in 0..attempts {
            match build().header(AUTH_HEADER, self.token.as_str()).send() {
                Ok(response) => {
                    let status = Status(response.status().as_u16());
                    if status.is_success() {
                        match response.bytes() {
                            Ok(body) => return (body, status),
                            Err(e) => {
                                warn!(op, key, error = %e, "failed to read response body");
                                last = Status::NO_RESPONSE;
                            }
                        }
                    } else {
                        last = status;
                        if !is_retryable(status) {
                            debug!(op, key, status = %status, "request rejected");
                            return (Bytes::new(), status);
                        }
                    }
                }
                Err(e) => {
                    warn!(op, key, error = %e, "request failed");
                    last = Status::NO_RESPONSE;
                }
            }

            if attempt + 1 < attempts {
                let delay = self.retry.backoff(attempt);
                warn!(
                    op,
                    key,
                    status = %last,
                    "transient failure (attempt {}/{}), retrying in {:?}",
                    attempt + 1,
                    attempts,
                    delay
                );
                std::thread::sleep(delay);
            }
        }

        (Bytes::new(), last)
    }
}

/// Percent-encode each segment of `key`, without a leading slash.
fn encode_path(key: &str) -> String {
    key.trim_start_matches('/')
        .split('/')
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join("/")
}

/// `X-Copy-From` value for `src`
fn copy_source(src: &str) -> String {
    format!("/{}", encode_path(src))
}

/// Whether a status is worth another attempt
fn is_retryable(status: Status) -> bool {
    matches!(status.code(), 0 | 408 | 429) || status.code() >= 500
}

impl ObjectStore for SwiftStore {
    #[instrument(skip(self, body), fields(len = body.len()))]
    fn put(&self, key: &str, body: &[u8]) -> Status {
        let url = self.object_url(key);
        let body = Bytes::copy_from_slice(body);
        self.send("PUT", key, || self.client.put(&url).body(body.clone()))
            .1
    }

    #[instrument(skip(self))]
    fn get(&self, key: &str) -> (Bytes, Status) {
        let url = self.object_url(key);
        self.send("GET", key, || self.client.get(&url))
    }

    #[instrument(skip(self))]
    fn delete(&self, key: &str) -> Status {
        let url = self.object_url(key);
        self.send("DELETE", key, || self.client.delete(&url)).1
    }

    #[instrument(skip(self))]
    fn copy(&self, src: &str, dst: &str) -> Status {
        let url = self.object_url(dst);
        let from = copy_source(src);
        self.send("COPY", dst, || {
            self.client
                .put(&url)
                .header(COPY_FROM_HEADER, from.as_str())
                .header(CONTENT_LENGTH, 0)
        })
        .1
    }

    #[instrument(skip(self))]
    fn create_directory(&self, key: &str) -> Status {
        let url = self.object_url(key);
        self.send("MKDIR", key, || {
            self.client
                .put(&url)
                .header(CONTENT_TYPE, DIRECTORY_CONTENT_TYPE)
                .header(CONTENT_LENGTH, 0)
        })
        .1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread::JoinHandle;

    /// One request as seen by the loopback server: request line, lowercased
    /// headers, body.
    #[derive(Debug)]
    struct Seen {
        line: String,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
    }

    impl Seen {
        fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str())
        }
    }

    /// Serve one connection per scripted `(status, body)` reply, then hand
    /// back every request received.
    fn serve(replies: Vec<(u16, &'static str)>) -> (String, JoinHandle<Vec<Seen>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = std::thread::spawn(move || {
            let mut seen = Vec::new();
            for (status, body) in replies {
                let (stream, _) = listener.accept().unwrap();
                let mut reader = BufReader::new(stream);

                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                let mut headers = Vec::new();
                loop {
                    let mut header = String::new();
                    reader.read_line(&mut header).unwrap();
                    let header = header.trim_end();
                    if header.is_empty() {
                        break;
                    }
                    if let Some((name, value)) = header.split_once(':') {
                        headers.push((name.trim().to_lowercase(), value.trim().to_string()));
                    }
                }
                let len = headers
                    .iter()
                    .find(|(n, _)| n == "content-length")
                    .map_or(0, |(_, v)| v.parse::<usize>().unwrap());
                let mut request_body = vec![0u8; len];
                reader.read_exact(&mut request_body).unwrap();

                let reply = format!(
                    "HTTP/1.1 {} Scripted\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let mut stream = reader.into_inner();
                stream.write_all(reply.as_bytes()).unwrap();
                stream.flush().unwrap();

                seen.push(Seen {
                    line: line.trim_end().to_string(),
                    headers,
                    body: request_body,
                });
            }
            seen
        });

        (format!("http://{}/v1/AUTH_test", addr), handle)
    }

    fn loopback_store(url: &str, attempts: u32) -> SwiftStore {
        SwiftStore::new(
            url,
            "tok",
            true,
            Duration::from_secs(2),
            RetryConfig::immediate(attempts),
        )
        .unwrap()
    }

    #[test]
    fn test_copy_retries_transient_statuses() {
        let (url, server) = serve(vec![(503, ""), (503, ""), (201, "")]);
        let store = loopback_store(&url, 3);

        assert_eq!(store.copy("/c/.DT_Store/a.0.", "/d/.DT_Store/b.0."), Status(201));

        let seen = server.join().unwrap();
        assert_eq!(seen.len(), 3);
        for request in &seen {
            assert_eq!(request.line, "PUT /v1/AUTH_test/d/.DT_Store/b.0. HTTP/1.1");
            assert_eq!(request.header("x-copy-from"), Some("/c/.DT_Store/a.0."));
            assert_eq!(request.header("x-auth-token"), Some("tok"));
            assert_eq!(request.header("content-length"), Some("0"));
        }
    }

    #[test]
    fn test_retries_stop_at_max_attempts() {
        let (url, server) = serve(vec![(500, ""), (502, "")]);
        let store = loopback_store(&url, 2);

        assert_eq!(store.delete("/c/obj."), Status(502));
        let seen = server.join().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|r| r.line.starts_with("DELETE ")));
    }

    #[test]
    fn test_client_errors_are_not_retried() {
        let (url, server) = serve(vec![(404, "")]);
        let store = loopback_store(&url, 4);

        let (body, status) = store.get("/c/missing.");
        assert_eq!(status, Status::NOT_FOUND);
        assert!(body.is_empty());
        assert_eq!(server.join().unwrap().len(), 1);
    }

    #[test]
    fn test_create_directory_sends_directory_marker() {
        let (url, server) = serve(vec![(201, "")]);
        let store = loopback_store(&url, 1);

        assert!(store.create_directory("/c/sub").is_success());

        let seen = server.join().unwrap();
        assert_eq!(seen[0].line, "PUT /v1/AUTH_test/c/sub HTTP/1.1");
        assert_eq!(seen[0].header("content-type"), Some(DIRECTORY_CONTENT_TYPE));
        assert_eq!(seen[0].header("x-auth-token"), Some("tok"));
        assert!(seen[0].body.is_empty());
    }

    #[test]
    fn test_put_and_get_carry_body_and_token() {
        let (url, server) = serve(vec![(201, ""), (200, "payload")]);
        let store = loopback_store(&url, 1);

        assert_eq!(store.put("/c/obj.", b"3"), Status(201));
        let (body, status) = store.get("/c/obj.");
        assert_eq!(status, Status(200));
        assert_eq!(body.as_ref(), b"payload");

        let seen = server.join().unwrap();
        assert_eq!(seen[0].line, "PUT /v1/AUTH_test/c/obj. HTTP/1.1");
        assert_eq!(seen[0].body, b"3");
        assert_eq!(seen[1].line, "GET /v1/AUTH_test/c/obj. HTTP/1.1");
        assert!(seen.iter().all(|r| r.header("x-auth-token") == Some("tok")));
    }

    #[test]
    fn test_copy_source_is_encoded() {
        assert_eq!(copy_source("/c/.DT_Store/a.0."), "/c/.DT_Store/a.0.");
        assert_eq!(copy_source("/c/100% é?.0."), "/c/100%25%20%C3%A9%3F.0.");

        let (url, server) = serve(vec![(201, "")]);
        let store = loopback_store(&url, 1);
        assert!(store.copy("/c/a?b.", "/c/a b.").is_success());

        let seen = server.join().unwrap();
        assert_eq!(seen[0].line, "PUT /v1/AUTH_test/c/a%20b. HTTP/1.1");
        assert_eq!(seen[0].header("x-copy-from"), Some("/c/a%3Fb."));
    }

    fn store() -> SwiftStore {
        SwiftStore::new(
            "https://swift.example.com/v1/AUTH_test/",
            "tok",
            true,
            Duration::from_secs(1),
            RetryConfig::immediate(2),
        )
        .unwrap()
    }

    #[test]
    fn test_object_url_encodes_segments() {
        let store = store();
        assert_eq!(
            store.object_url("/photos/.DT_Store/trip.mov.0."),
            "https://swift.example.com/v1/AUTH_test/photos/.DT_Store/trip.mov.0."
        );
        assert_eq!(
            store.object_url("c/my file#1."),
            "https://swift.example.com/v1/AUTH_test/c/my%20file%231."
        );
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable(Status::NO_RESPONSE));
        assert!(is_retryable(Status(503)));
        assert!(is_retryable(Status(429)));
        assert!(!is_retryable(Status::NOT_FOUND));
        assert!(!is_retryable(Status(401)));
    }

    #[test]
    fn test_from_config_requires_swift_section() {
        assert_matches!(
            SwiftStore::from_config(&StoreConfig::Memory),
            Err(Error::Config(_))
        );
        let config = StoreConfig::Swift {
            storage_url: "http://127.0.0.1:1/v1/AUTH_x".into(),
            token: "t".into(),
            verify_tls: true,
            connect_timeout_secs: 1,
            retry: RetryConfig::immediate(1),
        };
        assert!(SwiftStore::from_config(&config).is_ok());
    }

    #[test]
    fn test_unreachable_endpoint_reports_no_response() {
        // Port 1 on loopback refuses connections.
        let store = SwiftStore::new(
            "http://127.0.0.1:1/v1/AUTH_x",
            "t",
            true,
            Duration::from_millis(200),
            RetryConfig::immediate(2),
        )
        .unwrap();
        let (body, status) = store.get("c/obj.");
        assert_eq!(status, Status::NO_RESPONSE);
        assert!(body.is_empty());
        assert!(!store.put("c/obj.", b"1").is_success());
    }
}
