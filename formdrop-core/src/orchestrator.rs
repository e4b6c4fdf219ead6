//! Upload orchestration: render → resolve → transfer for one submission and one feed.
//!
//! The orchestrator is built with its collaborators (a [`Transfer`] implementation and
//! the status policy) instead of reaching for shared state, so concurrent uploads share
//! nothing mutable. Each call walks `Idle → Rendering → Resolving → Transferring → Done`;
//! any failure jumps straight to `Done` with a failed [`OutcomeReport`]. The report's
//! `stages` record the path taken. Nothing here ever returns an error to the host: the
//! submission itself is always accepted.

use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

use crate::config::{Feed, StatusPolicy};
use crate::contract::{
    FormSchema, IntegrationConfig, OutcomeReport, PutRequest, ResolvedDestination, SubmissionRecord,
    Transfer, TransferOutcome, UploadFailure, UploadStage, UploadStatus,
};
use crate::destination::resolve_with_tags;
use crate::merge_tags::MergeTags;
use crate::render::{render_with_tags, Templates};

pub struct UploadOrchestrator<T> {
    transfer: T,
    policy: StatusPolicy,
}

impl<T> UploadOrchestrator<T>
where
    T: Transfer,
{
    pub fn new(transfer: T, policy: StatusPolicy) -> Self {
        UploadOrchestrator { transfer, policy }
    }

    pub fn policy(&self) -> StatusPolicy {
        self.policy
    }

    /// Uploads one submission for one feed and reports the outcome.
    pub async fn upload_submission(
        &self,
        config: &IntegrationConfig,
        feed: &Feed,
        submission: &SubmissionRecord,
        form: &FormSchema,
    ) -> OutcomeReport {
        let span = tracing::info_span!(
            "upload",
            upload_id = %Uuid::new_v4(),
            feed = %feed.name,
            submission_id = %submission.id,
        );
        self.run(config, feed, submission, form)
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        config: &IntegrationConfig,
        feed: &Feed,
        submission: &SubmissionRecord,
        form: &FormSchema,
    ) -> OutcomeReport {
        let mut stages = vec![UploadStage::Idle];
        let report = |stages: Vec<UploadStage>,
                      destination: Option<ResolvedDestination>,
                      status: UploadStatus| OutcomeReport {
            feed: feed.name.clone(),
            submission_id: submission.id.clone(),
            destination,
            status,
            stages,
        };

        let tags = MergeTags::new(form, submission).with_field_map(&feed.meta.mapped_fields);

        advance(&mut stages, UploadStage::Rendering);
        let templates = Templates::new(
            config.header_template.as_str(),
            config.footer_template.as_str(),
        );
        let document = render_with_tags(&templates, &tags);

        advance(&mut stages, UploadStage::Resolving);
        let destination = match resolve_with_tags(config, &submission.id, &tags) {
            Ok(d) => d,
            Err(e) => {
                error!(error = %e, "[UPLOAD][ERROR] Destination could not be resolved; nothing sent");
                advance(&mut stages, UploadStage::Done);
                return report(
                    stages,
                    None,
                    UploadStatus::Failed {
                        failure: UploadFailure::Configuration {
                            message: e.to_string(),
                        },
                    },
                );
            }
        };

        advance(&mut stages, UploadStage::Transferring);
        let request = PutRequest {
            url: destination.url.clone(),
            username: tags.expand(&config.username),
            password: tags.expand(&config.password),
            content_type: document.content_type,
            body: document.bytes,
        };
        info!(url = %destination.url, "[UPLOAD] Sending document");
        let outcome = self.transfer.put(request).await;
        advance(&mut stages, UploadStage::Done);

        let status = match outcome {
            TransferOutcome::Success { status } => {
                info!(status, filename = %destination.filename, "[UPLOAD] Upload complete");
                UploadStatus::Uploaded { status }
            }
            TransferOutcome::HttpFailure { status } => match self.policy {
                StatusPolicy::Advisory => {
                    warn!(status, "[UPLOAD] Storage endpoint returned an error status; reported as warning");
                    UploadStatus::UploadedWithWarning { status }
                }
                StatusPolicy::Strict => {
                    error!(status, "[UPLOAD][ERROR] Storage endpoint rejected the upload");
                    UploadStatus::Failed {
                        failure: UploadFailure::Http { status },
                    }
                }
            },
            TransferOutcome::TransportFailure { code, message } => {
                error!(
                    code = code.code(),
                    error = %message,
                    "[UPLOAD][ERROR] Transfer failed with error #{}: {}",
                    code,
                    message
                );
                UploadStatus::Failed {
                    failure: UploadFailure::Transport { code, message },
                }
            }
        };

        report(stages, Some(destination), status)
    }
}

fn advance(stages: &mut Vec<UploadStage>, to: UploadStage) {
    let from = stages.last().copied().unwrap_or(UploadStage::Idle);
    debug!(from = from.as_str(), to = to.as_str(), "[UPLOAD] Stage transition");
    stages.push(to);
}
