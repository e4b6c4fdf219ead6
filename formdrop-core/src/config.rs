//! Plugin-level and per-feed configuration records.
//!
//! These are owned by the host's configuration store and handed to the core
//! already resolved. [`IntegrationConfig::from_feed`] flattens them into the
//! immutable record one upload works from.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::contract::IntegrationConfig;

/// Scheme used to reach the storage endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[serde(alias = "HTTP", alias = "http://")]
    Http,
    #[default]
    #[serde(alias = "HTTPS", alias = "https://")]
    Https,
}

impl Protocol {
    /// The literal prefix placed in front of the endpoint host.
    pub fn prefix(self) -> &'static str {
        match self {
            Protocol::Http => "http://",
            Protocol::Https => "https://",
        }
    }
}

/// How a non-2xx answer from the storage endpoint is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusPolicy {
    /// The status is logged and reported as a warning; the upload still counts as done.
    #[default]
    Advisory,
    /// Any non-2xx status marks the upload as failed.
    Strict,
}

/// Settings shared by every feed of the add-on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginSettings {
    #[serde(default)]
    pub protocol: Protocol,
    /// Host (and optional base path) of the WebDAV endpoint, e.g.
    /// `cloud.example.org/remote.php/dav/files`.
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub http_status: StatusPolicy,
    /// Request timeout; `None` leaves the transport default in place.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl PluginSettings {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn trace_loaded(&self) {
        info!(
            protocol = self.protocol.prefix(),
            endpoint = %self.endpoint,
            http_status = ?self.http_status,
            "Loaded plugin settings"
        );
    }
}

/// Pairs a form field id with the label used for it in `{all_fields}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub name: String,
    pub field_id: String,
}

/// Raw, template-bearing settings of one feed. Every string may contain merge tags.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct FeedMeta {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub folder: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub header: String,
    #[serde(default)]
    pub footer: String,
    #[serde(default)]
    pub mapped_fields: Vec<FieldMapping>,
}

impl std::fmt::Debug for FeedMeta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedMeta")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("folder", &self.folder)
            .field("filename", &self.filename)
            .field("header", &self.header)
            .field("footer", &self.footer)
            .field("mapped_fields", &self.mapped_fields)
            .finish()
    }
}

/// A named integration attached to one form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feed {
    #[serde(default, deserialize_with = "crate::contract::deserialize_optional_id")]
    pub id: Option<String>,
    #[serde(deserialize_with = "crate::contract::deserialize_id")]
    pub form_id: String,
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
    pub meta: FeedMeta,
}

fn default_active() -> bool {
    true
}

impl Feed {
    pub fn trace_loaded(&self) {
        info!(
            feed = %self.name,
            form_id = %self.form_id,
            active = self.active,
            "Loaded feed"
        );
        debug!(?self, "Feed loaded (full debug)");
    }
}

impl IntegrationConfig {
    /// Flattens plugin settings and one feed's meta into the record an upload uses.
    pub fn from_feed(settings: &PluginSettings, meta: &FeedMeta) -> Self {
        IntegrationConfig {
            protocol: settings.protocol,
            endpoint_host: settings.endpoint.clone(),
            username: meta.username.clone(),
            password: meta.password.clone(),
            folder_path: meta.folder.clone(),
            filename_template: meta.filename.clone(),
            header_template: meta.header.clone(),
            footer_template: meta.footer.clone(),
        }
    }
}
