//! The surface the host form engine calls.
//!
//! [`FeedAddon`] lists what the host needs from a feed add-on: identity, settings
//! schemas, feed list columns and feed processing. [`CloudStorageAddon`] implements it
//! for WebDAV cloud storage on top of an [`UploadOrchestrator`].

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{info, warn};

use crate::config::{Feed, PluginSettings};
use crate::contract::{FormSchema, IntegrationConfig, OutcomeReport, SubmissionRecord, Transfer};
use crate::merge_tags::escape_html;
use crate::orchestrator::UploadOrchestrator;
use crate::schema::{self, SettingsSection};
use crate::transfer::{TransferOptions, WebDavClient};

pub const SLUG: &str = "formdrop-cloud-storage";
pub const DEFAULT_PROVIDER: &str = "Nextcloud";

#[async_trait]
pub trait FeedAddon: Send + Sync {
    fn slug(&self) -> &str;
    fn title(&self) -> &str;
    /// Whether the host should allow new feeds to be created.
    fn can_create_feed(&self) -> bool;
    fn plugin_settings_fields(&self) -> Vec<SettingsSection>;
    fn feed_settings_fields(&self) -> Vec<SettingsSection>;
    /// `(column key, column title)` pairs for the feed list.
    fn feed_list_columns(&self) -> Vec<(String, String)>;
    fn column_value(&self, feed: &Feed, column: &str) -> Option<String>;
    /// Runs one feed for one submission. Never fails the submission.
    async fn process_feed(
        &self,
        feed: &Feed,
        submission: &SubmissionRecord,
        form: &FormSchema,
    ) -> OutcomeReport;
}

pub struct CloudStorageAddon<T> {
    settings: PluginSettings,
    provider: String,
    orchestrator: UploadOrchestrator<T>,
}

impl CloudStorageAddon<WebDavClient> {
    /// Add-on backed by the real WebDAV client, configured from the plugin settings.
    pub fn from_settings(settings: PluginSettings) -> Self {
        let client = WebDavClient::new(TransferOptions {
            timeout: settings.timeout(),
        });
        CloudStorageAddon::new(settings, client)
    }
}

impl<T> CloudStorageAddon<T>
where
    T: Transfer,
{
    pub fn new(settings: PluginSettings, transfer: T) -> Self {
        let orchestrator = UploadOrchestrator::new(transfer, settings.http_status);
        CloudStorageAddon {
            settings,
            provider: DEFAULT_PROVIDER.to_string(),
            orchestrator,
        }
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    pub fn settings(&self) -> &PluginSettings {
        &self.settings
    }

    /// Runs every active feed attached to the submission's form, concurrently.
    pub async fn process_submission(
        &self,
        feeds: &[Feed],
        submission: &SubmissionRecord,
        form: &FormSchema,
    ) -> Vec<OutcomeReport> {
        let form_id = submission.form_id.as_deref().unwrap_or(form.id.as_str());
        let selected: Vec<&Feed> = feeds
            .iter()
            .filter(|f| f.active && f.form_id == form_id)
            .collect();

        if selected.is_empty() {
            warn!(form_id, submission_id = %submission.id, "No active feeds for form");
            return Vec::new();
        }
        info!(
            form_id,
            submission_id = %submission.id,
            feeds = selected.len(),
            "Processing feeds for submission"
        );

        join_all(
            selected
                .into_iter()
                .map(|feed| self.upload(feed, submission, form)),
        )
        .await
    }

    async fn upload(
        &self,
        feed: &Feed,
        submission: &SubmissionRecord,
        form: &FormSchema,
    ) -> OutcomeReport {
        let config = IntegrationConfig::from_feed(&self.settings, &feed.meta);
        self.orchestrator
            .upload_submission(&config, feed, submission, form)
            .await
    }
}

#[async_trait]
impl<T> FeedAddon for CloudStorageAddon<T>
where
    T: Transfer,
{
    fn slug(&self) -> &str {
        SLUG
    }

    fn title(&self) -> &str {
        "Cloud Storage"
    }

    fn can_create_feed(&self) -> bool {
        !self.settings.endpoint.trim().is_empty()
    }

    fn plugin_settings_fields(&self) -> Vec<SettingsSection> {
        schema::plugin_settings_fields()
    }

    fn feed_settings_fields(&self) -> Vec<SettingsSection> {
        schema::feed_settings_fields(&self.provider)
    }

    fn feed_list_columns(&self) -> Vec<(String, String)> {
        vec![("storage_name".to_string(), "Integration Name".to_string())]
    }

    fn column_value(&self, feed: &Feed, column: &str) -> Option<String> {
        match column {
            "storage_name" => Some(format!("<b>{}</b>", escape_html(&feed.name))),
            _ => None,
        }
    }

    async fn process_feed(
        &self,
        feed: &Feed,
        submission: &SubmissionRecord,
        form: &FormSchema,
    ) -> OutcomeReport {
        self.upload(feed, submission, form).await
    }
}
