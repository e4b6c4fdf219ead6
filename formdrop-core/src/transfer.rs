//! WebDAV-style transfer client.
//!
//! [`WebDavClient`] performs one authenticated `PUT` per call. The HTTP session
//! (a `reqwest::Client` and its connection pool) is opened right before the request
//! and held by a [`TransferSession`] guard, so it is released on every exit path,
//! including failures while the request is still being assembled.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

/// Bytes of an error response body kept for the log.
const ERROR_BODY_LIMIT: usize = 512;
use tracing::{debug, error, info, warn};

use crate::contract::{PutRequest, Transfer, TransferOutcome, TransportErrorKind};

/// Sees every transfer session the client opens and releases.
pub trait SessionObserver: Send + Sync {
    fn opened(&self, url: &str);
    fn released(&self, url: &str);
}

/// Default observer: session lifecycle as debug events.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl SessionObserver for TracingObserver {
    fn opened(&self, url: &str) {
        debug!(url, "Transfer session opened");
    }

    fn released(&self, url: &str) {
        debug!(url, "Transfer session released");
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransferOptions {
    /// Whole-request timeout. `None` keeps the transport default.
    pub timeout: Option<Duration>,
}

/// Owns the HTTP session for a single upload and releases it when dropped.
pub struct TransferSession {
    client: Client,
    url: String,
    observer: Arc<dyn SessionObserver>,
}

impl TransferSession {
    fn open(
        options: &TransferOptions,
        url: &str,
        observer: Arc<dyn SessionObserver>,
    ) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder()
            .user_agent(concat!("formdrop/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        observer.opened(url);
        Ok(TransferSession {
            client,
            url: url.to_string(),
            observer,
        })
    }
}

impl Drop for TransferSession {
    fn drop(&mut self) {
        self.observer.released(&self.url);
    }
}

pub struct WebDavClient {
    options: TransferOptions,
    observer: Arc<dyn SessionObserver>,
}

impl WebDavClient {
    pub fn new(options: TransferOptions) -> Self {
        WebDavClient {
            options,
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    async fn send(session: &TransferSession, request: PutRequest) -> TransferOutcome {
        let body_len = request.body.len();
        let built = session
            .client
            .put(&request.url)
            .basic_auth(&request.username, Some(&request.password))
            .header(CONTENT_TYPE, request.content_type.as_str())
            .body(request.body)
            .build();

        let http_request = match built {
            Ok(r) => r,
            Err(e) => return transport_failure(&request.url, &e),
        };

        debug!(url = %request.url, body_len, "Sending PUT");

        let response = match session.client.execute(http_request).await {
            Ok(resp) => resp,
            Err(e) => return transport_failure(&request.url, &e),
        };

        let status = response.status();
        let code = status.as_u16();

        if status.is_success() {
            info!(url = %request.url, status = code, "PUT accepted by storage endpoint");
            TransferOutcome::Success { status: code }
        } else {
            let body = body_prefix(response, ERROR_BODY_LIMIT).await;
            warn!(
                url = %request.url,
                status = code,
                body = %body,
                "Storage endpoint answered PUT with non-success status"
            );
            TransferOutcome::HttpFailure { status: code }
        }
    }
}

impl Default for WebDavClient {
    fn default() -> Self {
        WebDavClient::new(TransferOptions::default())
    }
}

#[async_trait]
impl Transfer for WebDavClient {
    async fn put(&self, request: PutRequest) -> TransferOutcome {
        let session = match TransferSession::open(&self.options, &request.url, self.observer.clone()) {
            Ok(session) => session,
            Err(e) => return transport_failure(&request.url, &e),
        };
        Self::send(&session, request).await
    }
}

fn transport_failure(url: &str, err: &reqwest::Error) -> TransferOutcome {
    let code = classify(err);
    let message = error_chain(err);
    error!(url, code = code.code(), error = %message, "Transfer failed");
    TransferOutcome::TransportFailure { code, message }
}

fn classify(err: &reqwest::Error) -> TransportErrorKind {
    if err.is_builder() {
        TransportErrorKind::InvalidRequest
    } else if err.is_timeout() {
        TransportErrorKind::Timeout
    } else if err.is_connect() {
        TransportErrorKind::Connect
    } else if err.is_redirect() {
        TransportErrorKind::Redirect
    } else if err.is_body() {
        TransportErrorKind::Body
    } else if err.is_request() {
        TransportErrorKind::Request
    } else {
        TransportErrorKind::Other
    }
}

// reqwest's top-level message hides the cause (refused, DNS, TLS), so walk the chain.
fn error_chain(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

// Reads chunks only until `limit` bytes are held; the rest of the body is never buffered.
async fn body_prefix(mut response: Response, limit: usize) -> String {
    let mut buf = Vec::with_capacity(limit);
    while buf.len() < limit {
        match response.chunk().await {
            Ok(Some(chunk)) => append_bounded(&mut buf, &chunk, limit),
            Ok(None) => break,
            Err(e) => {
                debug!(error = %e, "Could not read error response body");
                break;
            }
        }
    }
    lossy_prefix(&buf)
}

fn append_bounded(buf: &mut Vec<u8>, chunk: &[u8], limit: usize) {
    let take = limit.saturating_sub(buf.len()).min(chunk.len());
    buf.extend_from_slice(&chunk[..take]);
}

// A cut may split the last character; drop it instead of printing a replacement mark.
fn lossy_prefix(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(e) if e.error_len().is_none() => {
            String::from_utf8_lossy(&bytes[..e.valid_up_to()]).into_owned()
        }
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}
