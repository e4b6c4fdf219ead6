//! Settings schema handed to the host so it can draw the add-on and feed settings pages.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Textarea,
    Select,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingField {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub tooltip: String,
    /// The host should offer its merge-tag picker for this field.
    pub merge_tags: bool,
    pub allow_html: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
}

impl SettingField {
    fn new(name: &str, label: impl Into<String>, kind: FieldKind) -> Self {
        SettingField {
            name: name.to_string(),
            label: label.into(),
            kind,
            tooltip: String::new(),
            merge_tags: false,
            allow_html: false,
            choices: Vec::new(),
        }
    }

    fn tooltip(mut self, tooltip: &str) -> Self {
        self.tooltip = tooltip.to_string();
        self
    }

    fn merge_tags(mut self) -> Self {
        self.merge_tags = true;
        self
    }

    fn allow_html(mut self) -> Self {
        self.allow_html = true;
        self
    }

    fn choice(mut self, label: &str, value: &str) -> Self {
        self.choices.push(Choice {
            label: label.to_string(),
            value: value.to_string(),
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingsSection {
    pub title: String,
    pub fields: Vec<SettingField>,
}

pub fn plugin_settings_fields() -> Vec<SettingsSection> {
    vec![SettingsSection {
        title: "Cloud Storage Settings".to_string(),
        fields: vec![
            SettingField::new("storage_protocol", "Protocol", FieldKind::Select)
                .tooltip("Is the endpoint secure?")
                .choice("HTTP", "http")
                .choice("HTTPS", "https"),
            SettingField::new("storage_endpoint", "API Endpoint", FieldKind::Text).tooltip(
                "Host and base path of the WebDAV endpoint, e.g. cloud.example.org/remote.php/dav/files",
            ),
            SettingField::new("storage_http_status", "HTTP Status Handling", FieldKind::Select)
                .tooltip("Whether an error status from the endpoint fails the upload or is only reported.")
                .choice("Report only", "advisory")
                .choice("Fail upload", "strict"),
        ],
    }]
}

pub fn feed_settings_fields(provider: &str) -> Vec<SettingsSection> {
    vec![SettingsSection {
        title: format!("{provider} Integration Settings"),
        fields: vec![
            SettingField::new("storage_name", "Name This Integration", FieldKind::Text)
                .tooltip("Especially useful for multiple cloud storage integrations."),
            SettingField::new("storage_username", format!("{provider} Username"), FieldKind::Text)
                .tooltip("Your username for the cloud storage provider.")
                .merge_tags(),
            SettingField::new("storage_password", format!("{provider} Password"), FieldKind::Text)
                .tooltip("Your password for the cloud storage provider.")
                .merge_tags(),
            SettingField::new("storage_folder", format!("{provider} Folder"), FieldKind::Text)
                .tooltip("Path the file is saved in. Default: \"/\"")
                .merge_tags(),
            SettingField::new("storage_filename", format!("{provider} Filename"), FieldKind::Text)
                .tooltip("Name of the file; the entry id and .html are appended.")
                .merge_tags(),
            SettingField::new("storage_fileheader", "Document Header", FieldKind::Textarea)
                .tooltip("HTML Header")
                .merge_tags()
                .allow_html(),
            SettingField::new("storage_filefooter", "Document Footer", FieldKind::Textarea)
                .tooltip("HTML Footer")
                .merge_tags()
                .allow_html(),
        ],
    }]
}
