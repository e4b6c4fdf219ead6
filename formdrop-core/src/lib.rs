#![doc = "formdrop-core: renders form submissions to HTML and uploads them to WebDAV storage."]

//! The pipeline for one submission and one feed:
//! [`merge_tags`] → [`render`] → [`destination`] → [`transfer`], sequenced by
//! [`orchestrator`]. [`addon`] is the surface a host form engine calls.
//!
//! # Usage
//! Build a [`addon::CloudStorageAddon`] from [`config::PluginSettings`] and call
//! `process_submission` with the form's feeds. Upload failures come back as
//! [`contract::OutcomeReport`] values, never as errors.

pub mod addon;
pub mod config;
pub mod contract;
pub mod destination;
pub mod error;
pub mod merge_tags;
pub mod orchestrator;
pub mod render;
pub mod schema;
pub mod transfer;
