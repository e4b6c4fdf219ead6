//! Destination resolution: where a rendered submission is PUT and under which name.
//!
//! The URL is `protocol + host / username / folder / filename`. Username and folder
//! are merge-tag templates; each path segment is percent-encoded on its own so a
//! submitted value can never add query strings, fragments or `..` hops. The filename
//! embeds the submission id, so it is unique per submission and stable across retries.

use reqwest::Url;
use tracing::debug;

use crate::contract::{FormSchema, IntegrationConfig, ResolvedDestination, SubmissionRecord};
use crate::error::ConfigurationError;
use crate::merge_tags::MergeTags;

/// Extension of every uploaded document.
pub const FILE_EXTENSION: &str = ".html";

const RESERVED: &[char] = &[
    '?', '[', ']', '/', '\\', '=', '<', '>', ':', ';', ',', '\'', '"', '&', '$', '#', '*', '(',
    ')', '|', '~', '`', '!', '{', '}', '%', '+', '’', '«', '»', '”', '“',
];

pub fn resolve(
    config: &IntegrationConfig,
    submission: &SubmissionRecord,
    form: &FormSchema,
) -> Result<ResolvedDestination, ConfigurationError> {
    resolve_with_tags(config, &submission.id, &MergeTags::new(form, submission))
}

pub fn resolve_with_tags(
    config: &IntegrationConfig,
    submission_id: &str,
    tags: &MergeTags,
) -> Result<ResolvedDestination, ConfigurationError> {
    let host = normalise_host(&config.endpoint_host);
    if host.is_empty() {
        return Err(ConfigurationError::MissingEndpoint);
    }

    let base = format!("{}{}", config.protocol.prefix(), host);
    let mut url = Url::parse(&base).map_err(|e| ConfigurationError::InvalidUrl {
        url: base.clone(),
        reason: e.to_string(),
    })?;

    let username = tags.expand(&config.username);
    let folder = tags.expand(&config.folder_path);
    let filename = file_name(&tags.expand(&config.filename_template), submission_id);

    url.path_segments_mut()
        .map_err(|_| ConfigurationError::InvalidUrl {
            url: base.clone(),
            reason: "endpoint cannot carry a path".to_string(),
        })?
        .pop_if_empty()
        .extend(path_segments(&username))
        .extend(path_segments(&folder))
        .push(&filename);

    debug!(url = %url, filename = %filename, "Resolved upload destination");

    Ok(ResolvedDestination {
        url: url.to_string(),
        filename,
    })
}

/// `template-id.html`. Only the template is sanitised; the id is escaped reversibly so
/// distinct ids always give distinct names.
pub fn file_name(expanded_template: &str, submission_id: &str) -> String {
    let stem = clean_file_name(expanded_template);
    let id = encode_id(submission_id);
    let base = match (stem.is_empty(), id.is_empty()) {
        (true, true) => "unnamed-file".to_string(),
        (true, false) => id,
        (false, true) => stem,
        (false, false) => format!("{stem}-{id}"),
    };
    format!("{base}{FILE_EXTENSION}")
}

/// Strips characters that are unsafe in a file name or URL path segment.
///
/// Reserved punctuation and control characters are dropped, whitespace and hyphen
/// runs collapse into a single `-`, and leading/trailing `.`, `-`, `_` are trimmed so
/// the file can never be hidden. An empty result becomes `unnamed-file`.
pub fn sanitize_file_name(raw: &str) -> String {
    let clean = clean_file_name(raw);
    if clean.is_empty() {
        "unnamed-file".to_string()
    } else {
        clean
    }
}

fn clean_file_name(raw: &str) -> String {
    let raw = raw.replace("%20", " ");
    let mut out = String::with_capacity(raw.len());
    let mut pending_dash = false;

    for c in raw.chars() {
        if c.is_whitespace() || c == '-' {
            pending_dash = true;
        } else if c.is_control() || RESERVED.contains(&c) {
            continue;
        } else {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c);
        }
    }

    out.trim_matches(|c| c == '.' || c == '-' || c == '_')
        .to_string()
}

// ASCII alphanumerics pass through; every other byte becomes `_xx` (lowercase hex).
// `_` is itself escaped, so the mapping is injective and never emits `-`.
fn encode_id(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for b in id.bytes() {
        if b.is_ascii_alphanumeric() {
            out.push(b as char);
        } else {
            out.push_str(&format!("_{b:02x}"));
        }
    }
    out
}

// The protocol setting decides the scheme, so one typed into the host is dropped.
fn normalise_host(raw: &str) -> &str {
    let host = raw.trim();
    let lower = host.to_ascii_lowercase();
    let host = if lower.starts_with("https://") {
        &host["https://".len()..]
    } else if lower.starts_with("http://") {
        &host["http://".len()..]
    } else {
        host
    };
    host.trim_end_matches('/')
}

fn path_segments(expanded: &str) -> impl Iterator<Item = &str> {
    expanded
        .split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
}
