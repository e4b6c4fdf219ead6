//! # contract: data model and the transport seam of the upload pipeline
//!
//! Everything the pipeline passes between its stages lives here:
//! - [`IntegrationConfig`], [`SubmissionRecord`] and [`FormSchema`] come in from the host.
//! - [`RenderedDocument`] and [`ResolvedDestination`] are produced per upload and never persisted.
//! - [`TransferOutcome`] is what the [`Transfer`] seam hands back; it is a value, not an error.
//! - [`OutcomeReport`] is what the host receives once an upload is done.
//!
//! ## Mocking & Testing
//! [`Transfer`] is annotated for `mockall`, so consumers can drive the orchestrator
//! without a network (`MockTransfer`, exported with the `test-export-mocks` feature).

use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::config::Protocol;

/// Content type of every rendered document.
pub const HTML_CONTENT_TYPE: &str = "text/html";

/// Resolved destination and templates for one integration, immutable for one upload.
#[derive(Clone, PartialEq, Eq)]
pub struct IntegrationConfig {
    pub protocol: Protocol,
    pub endpoint_host: String,
    pub username: String,
    pub password: String,
    pub folder_path: String,
    pub filename_template: String,
    pub header_template: String,
    pub footer_template: String,
}

impl std::fmt::Debug for IntegrationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntegrationConfig")
            .field("protocol", &self.protocol)
            .field("endpoint_host", &self.endpoint_host)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("folder_path", &self.folder_path)
            .field("filename_template", &self.filename_template)
            .finish_non_exhaustive()
    }
}

/// One form submission, read-only to the core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmissionRecord {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub form_id: Option<String>,
    #[serde(default)]
    pub date_created: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    /// Submitted values keyed by field id (`"1"`, `"2.3"`).
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

/// A single input of the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub label: String,
}

/// The form context merge tags are resolved against.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormSchema {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub fields: Vec<FormField>,
}

/// The document produced for one upload attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Where the document goes: full URL plus the sanitised filename it ends with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedDestination {
    pub url: String,
    pub filename: String,
}

/// Why a transfer never produced an HTTP response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorKind {
    /// The request could not be assembled (bad URL, bad header value, client setup).
    InvalidRequest,
    /// DNS, TCP or TLS failure while connecting.
    Connect,
    Timeout,
    Redirect,
    /// The request failed after the connection was made.
    Request,
    Body,
    Other,
}

impl TransportErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            TransportErrorKind::InvalidRequest => "invalid_request",
            TransportErrorKind::Connect => "connect",
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Redirect => "redirect",
            TransportErrorKind::Request => "request",
            TransportErrorKind::Body => "body",
            TransportErrorKind::Other => "other",
        }
    }
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Result of one PUT. Transport problems are values here, never panics or `Err`s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Success { status: u16 },
    TransportFailure { code: TransportErrorKind, message: String },
    HttpFailure { status: u16 },
}

impl TransferOutcome {
    /// The captured HTTP status, if a response arrived at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransferOutcome::Success { status } | TransferOutcome::HttpFailure { status } => {
                Some(*status)
            }
            TransferOutcome::TransportFailure { .. } => None,
        }
    }
}

/// Everything the transfer client needs for one authenticated PUT.
#[derive(Clone, PartialEq, Eq)]
pub struct PutRequest {
    pub url: String,
    pub username: String,
    pub password: String,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl std::fmt::Debug for PutRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PutRequest")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("content_type", &self.content_type)
            .field("body_len", &self.body.len())
            .finish()
    }
}

/// Sends a rendered document to remote storage.
///
/// Implementations must contain every failure in the returned [`TransferOutcome`]
/// and release whatever connection they acquired before returning.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Transfer: Send + Sync {
    async fn put(&self, request: PutRequest) -> TransferOutcome;
}

/// Why an upload did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UploadFailure {
    /// Destination settings are unusable; nothing was sent.
    Configuration { message: String },
    Transport { code: TransportErrorKind, message: String },
    /// Non-2xx status under the strict status policy.
    Http { status: u16 },
}

impl std::fmt::Display for UploadFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadFailure::Configuration { message } => write!(f, "configuration error: {message}"),
            UploadFailure::Transport { code, message } => {
                write!(f, "transfer failed with error #{code}: {message}")
            }
            UploadFailure::Http { status } => write!(f, "storage endpoint answered HTTP {status}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum UploadStatus {
    Uploaded { status: u16 },
    /// The endpoint answered with a non-2xx status but the advisory policy let it through.
    UploadedWithWarning { status: u16 },
    Failed { failure: UploadFailure },
}

/// One step of an upload. Uploads walk these in order; any failure jumps to `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStage {
    Idle,
    Rendering,
    Resolving,
    Transferring,
    Done,
}

impl UploadStage {
    pub fn as_str(self) -> &'static str {
        match self {
            UploadStage::Idle => "idle",
            UploadStage::Rendering => "rendering",
            UploadStage::Resolving => "resolving",
            UploadStage::Transferring => "transferring",
            UploadStage::Done => "done",
        }
    }
}

/// What the host receives for one feed and one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeReport {
    pub feed: String,
    pub submission_id: String,
    pub destination: Option<ResolvedDestination>,
    pub status: UploadStatus,
    /// Every stage the upload entered, from `Idle` to `Done`.
    pub stages: Vec<UploadStage>,
}

impl OutcomeReport {
    pub fn is_success(&self) -> bool {
        !matches!(self.status, UploadStatus::Failed { .. })
    }

    pub fn http_status(&self) -> Option<u16> {
        match &self.status {
            UploadStatus::Uploaded { status } | UploadStatus::UploadedWithWarning { status } => {
                Some(*status)
            }
            UploadStatus::Failed {
                failure: UploadFailure::Http { status },
            } => Some(*status),
            UploadStatus::Failed { .. } => None,
        }
    }

    pub fn failure(&self) -> Option<&UploadFailure> {
        match &self.status {
            UploadStatus::Failed { failure } => Some(failure),
            _ => None,
        }
    }
}

/// Host ids arrive as JSON numbers or strings; both become strings.
pub fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(u64),
        Text(String),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Number(n) => n.to_string(),
        RawId::Text(s) => s,
    })
}

pub fn deserialize_optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrapper(#[serde(deserialize_with = "deserialize_id")] String);

    Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|w| w.0))
}
