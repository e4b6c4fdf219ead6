//! Renders a submission into the HTML document that gets uploaded.

use tracing::debug;

use crate::contract::{FormSchema, RenderedDocument, SubmissionRecord, HTML_CONTENT_TYPE};
use crate::merge_tags::MergeTags;

/// The document body is never user-editable: it is always a dump of the submitted fields.
pub const BODY_TEMPLATE: &str = "{all_fields}";

/// User-supplied wrappers around the fixed body. Both may contain raw HTML.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Templates {
    pub header: String,
    pub footer: String,
}

impl Templates {
    pub fn new(header: impl Into<String>, footer: impl Into<String>) -> Self {
        Templates {
            header: header.into(),
            footer: footer.into(),
        }
    }
}

pub fn render(templates: &Templates, form: &FormSchema, submission: &SubmissionRecord) -> RenderedDocument {
    render_with_tags(templates, &MergeTags::new(form, submission))
}

/// Header, body and footer expanded independently and joined without separators.
pub fn render_with_tags(templates: &Templates, tags: &MergeTags) -> RenderedDocument {
    let header = tags.expand(&templates.header);
    let body = tags.expand(BODY_TEMPLATE);
    let footer = tags.expand(&templates.footer);

    debug!(
        header_len = header.len(),
        body_len = body.len(),
        footer_len = footer.len(),
        "Rendered document parts"
    );

    let mut document = String::with_capacity(header.len() + body.len() + footer.len());
    document.push_str(&header);
    document.push_str(&body);
    document.push_str(&footer);

    RenderedDocument {
        content_type: HTML_CONTENT_TYPE.to_string(),
        bytes: document.into_bytes(),
    }
}
