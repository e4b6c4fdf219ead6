//! Merge-tag expansion.
//!
//! A merge tag is a `{...}` token in a template: `{entry_id}`, `{all_fields}`,
//! `{Email:3}`, `{Name:1.3:value}`. [`MergeTags`] is a plain name → value mapping
//! computed once per upload; [`MergeTags::expand`] substitutes it into a template.
//! A bare `{name}` is a tag only when `name` is one of [`STANDARD_TAGS`] or a value the
//! mapping carries, so CSS such as `p{color:red}` in a header is left alone. Field tags
//! always expand, to the empty string when the field was not submitted. Field ids start
//! at 1, which keeps `h1{margin:0}` out of the field form too.

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::config::FieldMapping;
use crate::contract::{FormSchema, SubmissionRecord};

/// Named tags every submission provides.
pub const STANDARD_TAGS: &[&str] = &[
    "entry_id",
    "form_id",
    "form_title",
    "date_created",
    "embed_url",
    "all_fields",
];

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"\{(?:(?P<label>[^{}:\r\n]*):(?P<field>[1-9]\d*(?:\.\d+)?)|(?P<name>[A-Za-z_][A-Za-z0-9_]*))(?::[^{}\r\n]*)?\}",
        )
        .expect("merge tag pattern compiles")
    })
}

/// Resolved values for every merge tag a template may reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeTags {
    named: HashMap<String, String>,
    fields: HashMap<String, String>,
}

impl MergeTags {
    /// Computes the standard tags for one submission of `form`.
    pub fn new(form: &FormSchema, submission: &SubmissionRecord) -> Self {
        let mut rows = Vec::new();
        for field in &form.fields {
            if let Some(value) = submission.values.get(&field.id) {
                rows.push((field.label.clone(), value.clone()));
            }
        }
        for (id, value) in &submission.values {
            if form.fields.iter().any(|f| &f.id == id) {
                continue;
            }
            rows.push((label_for(form, id), value.clone()));
        }

        let mut named = HashMap::new();
        named.insert("entry_id".to_string(), submission.id.clone());
        named.insert(
            "form_id".to_string(),
            submission.form_id.clone().unwrap_or_else(|| form.id.clone()),
        );
        named.insert("form_title".to_string(), form.title.clone());
        named.insert(
            "date_created".to_string(),
            submission.date_created.clone().unwrap_or_default(),
        );
        named.insert(
            "embed_url".to_string(),
            submission.source_url.clone().unwrap_or_default(),
        );
        named.insert("all_fields".to_string(), fields_table(&rows));

        MergeTags {
            named,
            fields: submission
                .values
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    /// Builds a mapping from explicit named values only.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        MergeTags {
            named: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            fields: HashMap::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.named.insert(name.into(), value.into());
        self
    }

    pub fn with_field(mut self, id: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(id.into(), value.into());
        self
    }

    /// Restricts `{all_fields}` to the mapped fields, labelled with the mapping names.
    /// An empty mapping keeps every field.
    pub fn with_field_map(mut self, mapping: &[FieldMapping]) -> Self {
        if mapping.is_empty() {
            return self;
        }
        let rows: Vec<(String, String)> = mapping
            .iter()
            .filter_map(|m| {
                self.fields
                    .get(&m.field_id)
                    .map(|v| (m.name.clone(), v.clone()))
            })
            .collect();
        self.named
            .insert("all_fields".to_string(), fields_table(&rows));
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.named.get(name).map(String::as_str)
    }

    pub fn field(&self, id: &str) -> Option<&str> {
        self.fields.get(id).map(String::as_str)
    }

    /// Substitutes every tag in `template`. Tags without a value become the empty string;
    /// braces naming nothing known stay as written.
    pub fn expand(&self, template: &str) -> String {
        if template.is_empty() {
            return String::new();
        }
        tag_pattern()
            .replace_all(template, |caps: &Captures| {
                if let Some(id) = caps.name("field") {
                    return self.field(id.as_str()).unwrap_or("").to_string();
                }
                let name = caps.name("name").map_or("", |n| n.as_str());
                match self.get(name) {
                    Some(value) => value.to_string(),
                    None if STANDARD_TAGS.contains(&name) => String::new(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}

// Sub-inputs ("1.3") borrow their parent's label.
fn label_for(form: &FormSchema, id: &str) -> String {
    let parent = id.split('.').next().unwrap_or(id);
    form.fields
        .iter()
        .find(|f| f.id == parent)
        .map(|f| f.label.clone())
        .unwrap_or_else(|| id.to_string())
}

fn fields_table(rows: &[(String, String)]) -> String {
    let rows: Vec<&(String, String)> = rows.iter().filter(|(_, v)| !v.trim().is_empty()).collect();
    if rows.is_empty() {
        return String::new();
    }
    let mut html = String::from("<table class=\"formdrop-fields\" cellspacing=\"0\" cellpadding=\"4\">\n");
    for (label, value) in rows {
        html.push_str("<tr><th align=\"left\">");
        html.push_str(&escape_html(label));
        html.push_str("</th><td>");
        html.push_str(&escape_html(value).replace("\r\n", "<br />").replace('\n', "<br />"));
        html.push_str("</td></tr>\n");
    }
    html.push_str("</table>\n");
    html
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}
