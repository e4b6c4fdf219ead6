use thiserror::Error;

/// Destination settings that make an upload impossible. Surfaced to the
/// integration administrator; no transfer is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("storage endpoint is not configured")]
    MissingEndpoint,

    #[error("invalid destination URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}
