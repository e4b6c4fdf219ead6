use formdrop_core::config::{Feed, FeedMeta, PluginSettings, Protocol, StatusPolicy};
use formdrop_core::contract::{
    FormField, FormSchema, IntegrationConfig, MockTransfer, PutRequest, SubmissionRecord,
    TransferOutcome, TransportErrorKind, UploadFailure, UploadStage, UploadStatus,
};
use formdrop_core::orchestrator::UploadOrchestrator;
use formdrop_core::transfer::WebDavClient;
use std::collections::BTreeMap;

fn form() -> FormSchema {
    FormSchema {
        id: "1".into(),
        title: "Contact".into(),
        fields: vec![
            FormField { id: "1".into(), label: "Name".into() },
            FormField { id: "2".into(), label: "Email".into() },
        ],
    }
}

fn submission(id: &str) -> SubmissionRecord {
    let mut values = BTreeMap::new();
    values.insert("1".to_string(), "Ada Lovelace".to_string());
    values.insert("2".to_string(), "ada@example.org".to_string());
    SubmissionRecord {
        id: id.into(),
        form_id: Some("1".into()),
        values,
        ..Default::default()
    }
}

fn feed(meta: FeedMeta) -> Feed {
    Feed {
        id: Some("10".into()),
        form_id: "1".into(),
        name: "Archive".into(),
        active: true,
        meta,
    }
}

fn meta() -> FeedMeta {
    FeedMeta {
        username: "alice".into(),
        password: "secret".into(),
        folder: "forms".into(),
        filename: "entry".into(),
        header: "<html><body>".into(),
        footer: "</body></html>".into(),
        mapped_fields: Vec::new(),
    }
}

fn settings(endpoint: &str) -> PluginSettings {
    PluginSettings {
        protocol: Protocol::Https,
        endpoint: endpoint.into(),
        ..Default::default()
    }
}

#[tokio::test]
async fn uploads_rendered_document_to_resolved_url() {
    let mut transfer = MockTransfer::new();
    transfer
        .expect_put()
        .withf(|req: &PutRequest| {
            let body = String::from_utf8_lossy(&req.body);
            req.url == "https://cloud.example.org/alice/forms/entry-42.html"
                && req.username == "alice"
                && req.password == "secret"
                && req.content_type == "text/html"
                && body.starts_with("<html><body><table")
                && body.contains("Ada Lovelace")
                && body.ends_with("</table>\n</body></html>")
        })
        .times(1)
        .returning(|_| TransferOutcome::Success { status: 201 });

    let orchestrator = UploadOrchestrator::new(transfer, StatusPolicy::Advisory);
    let feed = feed(meta());
    let config = IntegrationConfig::from_feed(&settings("cloud.example.org"), &feed.meta);

    let report = orchestrator
        .upload_submission(&config, &feed, &submission("42"), &form())
        .await;

    assert!(report.is_success());
    assert_eq!(report.status, UploadStatus::Uploaded { status: 201 });
    assert_eq!(report.feed, "Archive");
    assert_eq!(report.submission_id, "42");
    assert_eq!(
        report.stages,
        vec![
            UploadStage::Idle,
            UploadStage::Rendering,
            UploadStage::Resolving,
            UploadStage::Transferring,
            UploadStage::Done,
        ]
    );
    let destination = report.destination.expect("destination resolved");
    assert_eq!(destination.filename, "entry-42.html");
}

#[tokio::test]
async fn missing_endpoint_short_circuits_without_transfer() {
    let mut transfer = MockTransfer::new();
    transfer.expect_put().times(0);

    let orchestrator = UploadOrchestrator::new(transfer, StatusPolicy::Advisory);
    let feed = feed(meta());
    let config = IntegrationConfig::from_feed(&settings(""), &feed.meta);

    let report = orchestrator
        .upload_submission(&config, &feed, &submission("1"), &form())
        .await;

    assert!(!report.is_success());
    assert!(report.destination.is_none());
    assert!(matches!(
        report.failure(),
        Some(UploadFailure::Configuration { .. })
    ));
    assert_eq!(
        report.stages,
        vec![
            UploadStage::Idle,
            UploadStage::Rendering,
            UploadStage::Resolving,
            UploadStage::Done,
        ]
    );
}

#[tokio::test]
async fn transport_failure_is_reported_not_raised() {
    let mut transfer = MockTransfer::new();
    transfer.expect_put().times(1).returning(|_| {
        TransferOutcome::TransportFailure {
            code: TransportErrorKind::Connect,
            message: "dns error: failed to lookup address".into(),
        }
    });

    let orchestrator = UploadOrchestrator::new(transfer, StatusPolicy::Advisory);
    let feed = feed(meta());
    let config = IntegrationConfig::from_feed(&settings("cloud.example.org"), &feed.meta);

    let report = orchestrator
        .upload_submission(&config, &feed, &submission("3"), &form())
        .await;

    assert!(!report.is_success());
    assert_eq!(report.http_status(), None);
    match report.failure() {
        Some(UploadFailure::Transport { code, message }) => {
            assert_eq!(*code, TransportErrorKind::Connect);
            assert!(message.contains("dns error"));
        }
        other => panic!("expected transport failure, got {other:?}"),
    }
}

#[tokio::test]
async fn error_status_is_advisory_by_default() {
    let mut transfer = MockTransfer::new();
    transfer
        .expect_put()
        .returning(|_| TransferOutcome::HttpFailure { status: 507 });

    let orchestrator = UploadOrchestrator::new(transfer, StatusPolicy::default());
    let feed = feed(meta());
    let config = IntegrationConfig::from_feed(&settings("cloud.example.org"), &feed.meta);

    let report = orchestrator
        .upload_submission(&config, &feed, &submission("4"), &form())
        .await;

    assert!(report.is_success());
    assert_eq!(report.status, UploadStatus::UploadedWithWarning { status: 507 });
}

#[tokio::test]
async fn error_status_fails_under_strict_policy() {
    let mut transfer = MockTransfer::new();
    transfer
        .expect_put()
        .returning(|_| TransferOutcome::HttpFailure { status: 401 });

    let orchestrator = UploadOrchestrator::new(transfer, StatusPolicy::Strict);
    let feed = feed(meta());
    let config = IntegrationConfig::from_feed(&settings("cloud.example.org"), &feed.meta);

    let report = orchestrator
        .upload_submission(&config, &feed, &submission("5"), &form())
        .await;

    assert!(!report.is_success());
    assert_eq!(report.http_status(), Some(401));
    assert_eq!(report.failure(), Some(&UploadFailure::Http { status: 401 }));
}

#[tokio::test]
async fn credentials_and_folder_expand_merge_tags() {
    let mut transfer = MockTransfer::new();
    transfer
        .expect_put()
        .withf(|req: &PutRequest| {
            req.username == "ada@example.org"
                && req.password == "pw-7"
                && req.url == "https://dav.local/ada@example.org/Contact/Ada-Lovelace-7.html"
        })
        .times(1)
        .returning(|_| TransferOutcome::Success { status: 201 });

    let orchestrator = UploadOrchestrator::new(transfer, StatusPolicy::Strict);
    let feed = feed(FeedMeta {
        username: "{Email:2}".into(),
        password: "pw-{entry_id}".into(),
        folder: "{form_title}".into(),
        filename: "{Name:1}".into(),
        ..meta()
    });
    let config = IntegrationConfig::from_feed(&settings("dav.local"), &feed.meta);

    let report = orchestrator
        .upload_submission(&config, &feed, &submission("7"), &form())
        .await;

    assert!(report.is_success());
}

#[tokio::test]
async fn mapped_fields_limit_the_document_body() {
    let mut transfer = MockTransfer::new();
    transfer
        .expect_put()
        .withf(|req: &PutRequest| {
            let body = String::from_utf8_lossy(&req.body);
            body.contains("Reply to") && body.contains("ada@example.org") && !body.contains("Ada Lovelace")
        })
        .times(1)
        .returning(|_| TransferOutcome::Success { status: 201 });

    let orchestrator = UploadOrchestrator::new(transfer, StatusPolicy::Advisory);
    let feed = feed(FeedMeta {
        mapped_fields: vec![formdrop_core::config::FieldMapping {
            name: "Reply to".into(),
            field_id: "2".into(),
        }],
        ..meta()
    });
    let config = IntegrationConfig::from_feed(&settings("cloud.example.org"), &feed.meta);

    let report = orchestrator
        .upload_submission(&config, &feed, &submission("8"), &form())
        .await;

    assert!(report.is_success());
}

#[tokio::test]
async fn unreachable_endpoint_through_real_client_is_non_fatal() {
    let orchestrator = UploadOrchestrator::new(WebDavClient::default(), StatusPolicy::Advisory);
    let feed = feed(meta());
    let mut plugin = settings("127.0.0.1:1");
    plugin.protocol = Protocol::Http;
    let config = IntegrationConfig::from_feed(&plugin, &feed.meta);

    let report = orchestrator
        .upload_submission(&config, &feed, &submission("9"), &form())
        .await;

    assert!(!report.is_success());
    assert!(matches!(
        report.failure(),
        Some(UploadFailure::Transport { .. })
    ));
    assert_eq!(
        report.destination.map(|d| d.url).as_deref(),
        Some("http://127.0.0.1:1/alice/forms/entry-9.html")
    );
}
