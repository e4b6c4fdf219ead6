/// `load_config` module: loads the YAML storage configuration, plus the JSON form and entry
/// files, into the core's strongly-typed records.
///
/// This is the only place where user-supplied files are parsed.
///
/// # Responsibilities
/// - Parse the YAML config (plugin `settings` plus a list of `feeds`) into core types
/// - Inject feed passwords from the environment when a feed names a `password_env` variable,
///   so secrets never have to live in the YAML file
/// - Read the form schema and the submitted entry from JSON
///
/// # Errors
/// All errors use `anyhow::Error` with the offending path or variable in the message and are
/// surfaced at the CLI boundary.
use anyhow::{Context, Result};
use formdrop_core::config::{Feed, FeedMeta, FieldMapping, PluginSettings};
use formdrop_core::contract::{deserialize_id, deserialize_optional_id, FormSchema, SubmissionRecord};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{error, info};

/// Fully resolved configuration for one CLI run.
#[derive(Debug)]
pub struct CliConfig {
    pub settings: PluginSettings,
    pub feeds: Vec<Feed>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    settings: PluginSettings,
    #[serde(default)]
    feeds: Vec<RawFeed>,
}

#[derive(Deserialize)]
struct RawFeed {
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    id: Option<String>,
    #[serde(deserialize_with = "deserialize_id")]
    form_id: String,
    name: String,
    #[serde(default = "default_active")]
    active: bool,
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    /// Name of an environment variable holding the password.
    #[serde(default)]
    password_env: Option<String>,
    #[serde(default)]
    folder: String,
    #[serde(default)]
    filename: String,
    #[serde(default)]
    header: String,
    #[serde(default)]
    footer: String,
    #[serde(default)]
    mapped_fields: Vec<FieldMapping>,
}

impl std::fmt::Debug for RawFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawFeed")
            .field("name", &self.name)
            .field("form_id", &self.form_id)
            .field("password_env", &self.password_env)
            .finish_non_exhaustive()
    }
}

fn default_active() -> bool {
    true
}

impl RawFeed {
    fn into_feed(self) -> Result<Feed> {
        let password = match &self.password_env {
            Some(var) => match std::env::var(var) {
                Ok(secret) => {
                    info!(feed = %self.name, var = %var, "Feed password injected from env");
                    secret
                }
                Err(e) => {
                    error!(error = ?e, feed = %self.name, var = %var, "Feed password variable not set");
                    anyhow::bail!(
                        "{var} environment variable not set (password for feed '{}'): {e}",
                        self.name
                    );
                }
            },
            None => self.password,
        };

        Ok(Feed {
            id: self.id,
            form_id: self.form_id,
            name: self.name,
            active: self.active,
            meta: FeedMeta {
                username: self.username,
                password,
                folder: self.folder,
                filename: self.filename,
                header: self.header,
                footer: self.footer,
                mapped_fields: self.mapped_fields,
            },
        })
    }
}

/// Loads the YAML config file and injects env secrets.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let raw: RawConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    raw.settings.trace_loaded();
    let feeds = raw
        .feeds
        .into_iter()
        .map(RawFeed::into_feed)
        .collect::<Result<Vec<_>>>()?;
    for feed in &feeds {
        feed.trace_loaded();
    }

    info!(feeds = feeds.len(), "Config loaded and merged successfully");

    Ok(CliConfig {
        settings: raw.settings,
        feeds,
    })
}

pub fn load_form<P: AsRef<Path>>(path: P) -> Result<FormSchema> {
    read_json(path.as_ref(), "form")
}

pub fn load_entry<P: AsRef<Path>>(path: P) -> Result<SubmissionRecord> {
    read_json(path.as_ref(), "entry")
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {what} file {path:?}"))?;
    let value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {what} JSON in {path:?}"))?;
    info!(path = ?path, what, "Loaded JSON input");
    Ok(value)
}
