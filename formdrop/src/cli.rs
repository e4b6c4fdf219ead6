///
/// This module implements the CLI for formdrop: command parsing, argument handling and the
/// `run` entrypoint shared by `main()` and the integration tests.
///
/// The CLI stands in for the host form engine. It loads the storage config, the form and one
/// submitted entry, hands them to the core add-on and prints one JSON report per feed.
///
/// All upload logic lives in [`formdrop-core`]; keep it there when adding subcommands.
///
/// [`formdrop-core`]: ../../formdrop-core/
use crate::load_config::{load_config, load_entry, load_form};
use anyhow::Result;
use clap::{Parser, Subcommand};
use formdrop_core::addon::{CloudStorageAddon, DEFAULT_PROVIDER};
use formdrop_core::schema;
use std::path::PathBuf;

/// CLI for formdrop: upload form submissions to WebDAV cloud storage.
#[derive(Parser)]
#[clap(
    name = "formdrop",
    version,
    about = "Render form submissions to HTML and upload them to WebDAV cloud storage"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload one submitted entry through every active feed of its form
    Submit {
        /// Path to the YAML storage config file
        #[clap(long)]
        config: PathBuf,
        /// Path to the form schema JSON
        #[clap(long)]
        form: PathBuf,
        /// Path to the submitted entry JSON
        #[clap(long)]
        entry: PathBuf,
        /// Exit non-zero when any upload failed
        #[clap(long)]
        fail_on_error: bool,
    },
    /// Print the plugin and feed settings schema as JSON
    Schema {
        /// Provider name shown in the feed settings
        #[clap(long, default_value = DEFAULT_PROVIDER)]
        provider: String,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Submit {
            config,
            form,
            entry,
            fail_on_error,
        } => {
            let config = load_config(config)?;
            let form = load_form(form)?;
            let entry = load_entry(entry)?;
            tracing::info!(
                command = "submit",
                form_id = %form.id,
                entry_id = %entry.id,
                "Processing submission"
            );

            let addon = CloudStorageAddon::from_settings(config.settings);
            let reports = addon
                .process_submission(&config.feeds, &entry, &form)
                .await;

            println!("{}", serde_json::to_string_pretty(&reports)?);

            let failed = reports.iter().filter(|r| !r.is_success()).count();
            if failed > 0 {
                tracing::error!(command = "submit", failed, total = reports.len(), "Some uploads failed");
                if fail_on_error {
                    anyhow::bail!("{failed} of {} uploads failed", reports.len());
                }
            } else {
                tracing::info!(command = "submit", total = reports.len(), "Submission processed");
            }
            Ok(())
        }
        Commands::Schema { provider } => {
            let document = serde_json::json!({
                "plugin": schema::plugin_settings_fields(),
                "feed": schema::feed_settings_fields(&provider),
            });
            println!("{}", serde_json::to_string_pretty(&document)?);
            Ok(())
        }
    }
}
