//! Task execution orchestration.
//!
//! [`TaskExecutor`] wires the pipeline together: payload assembly,
//! submission, optional job polling, and artifact download. It never panics
//! and never returns `Err`; every failure is folded into an
//! [`ExecutionResult`] with a localized message, a machine-readable code,
//! and truncated diagnostic detail, because the workflow engine persists
//! the result as-is.

use std::path::PathBuf;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};

use crate::client::{
    ClientError, HttpClient, JobHandle, JobPoller, JobSubmitter, ResultFetcher,
};
use crate::messages::LocalizedMessages;
use crate::payload::PayloadBuilder;
use crate::request::{ExecutionResult, NotificationSettings, TaskRequest};
use crate::settings::{ExecutionSettings, PluginConfig, SettingsError};

/// Pipeline stage a failure occurred in, used to pick the user-facing
/// message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Submit,
    Poll,
    Download,
}

/// Runs geodata extraction tasks against a remote geoprocessing service.
pub struct TaskExecutor<C: HttpClient> {
    http: C,
    settings: ExecutionSettings,
    config: PluginConfig,
    messages: LocalizedMessages,
    payload: PayloadBuilder,
    cancel: CancellationToken,
}

impl<C: HttpClient> TaskExecutor<C> {
    /// Creates an executor with the platform default tunables and English
    /// messages.
    pub fn new(http: C, settings: ExecutionSettings) -> Self {
        Self {
            http,
            settings,
            config: PluginConfig::default(),
            messages: LocalizedMessages::default(),
            payload: PayloadBuilder::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Overrides the behavioral tunables.
    pub fn with_config(mut self, config: PluginConfig) -> Self {
        self.config = config;
        self
    }

    /// Overrides the message language.
    pub fn with_messages(mut self, messages: LocalizedMessages) -> Self {
        self.messages = messages;
        self
    }

    /// Overrides the payload property keys.
    pub fn with_payload_builder(mut self, payload: PayloadBuilder) -> Self {
        self.payload = payload;
        self
    }

    /// Token an enclosing scheduler can fire to abort an in-flight
    /// execution at the next backoff or poll tick.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs one extraction end to end and reports the outcome.
    ///
    /// `notifications` rides along from the workflow engine; this core does
    /// not send mail itself.
    pub async fn execute(
        &self,
        request: &TaskRequest,
        notifications: &NotificationSettings,
    ) -> ExecutionResult {
        let span = info_span!("task_execution", request_id = request.id);
        let started = Instant::now();

        let outcome = self.run(request).instrument(span).await;

        let mut result = match outcome {
            Ok(file_path) => {
                info!(
                    request_id = request.id,
                    path = %file_path.display(),
                    notify = notifications.enabled,
                    "extraction completed"
                );
                ExecutionResult::success(
                    request.clone(),
                    self.messages.get("execution.success"),
                    file_path,
                )
            }
            Err((stage, error)) => {
                warn!(
                    request_id = request.id,
                    code = error.code(),
                    error = %error,
                    "extraction failed"
                );
                ExecutionResult::error(
                    request.clone(),
                    self.failure_message(stage, &error),
                    error.code(),
                    error.to_string(),
                )
            }
        };
        result.processing_duration = started.elapsed();
        result
    }

    async fn run(&self, request: &TaskRequest) -> Result<PathBuf, (Stage, ClientError)> {
        let payload = self.payload.build(request);

        let submitter = JobSubmitter::new(&self.http, &self.config, &self.cancel);
        let handle = submitter
            .submit(
                &self.settings.service_url,
                &self.settings.auth,
                &payload,
                &self.settings.geojson_parameter,
                self.settings.mode,
            )
            .await
            .map_err(|e| (Stage::Submit, e))?;

        let result_url = match handle {
            JobHandle::Direct(url) => url,
            JobHandle::Job { id, status_url } => {
                let poller = JobPoller::new(&self.http, &self.config, &self.cancel);
                poller
                    .poll(&id, &status_url, &self.settings.auth)
                    .await
                    .map_err(|e| (Stage::Poll, e))?
            }
        };

        let fetcher = ResultFetcher::new(&self.http, &self.config);
        fetcher
            .download(&result_url, &self.settings.auth, &request.folder_out)
            .await
            .map_err(|e| (Stage::Download, e))
    }

    /// Picks the localized summary for a stage failure.
    fn failure_message(&self, stage: Stage, error: &ClientError) -> String {
        let key = match (stage, error) {
            (_, ClientError::Cancelled) => "error.cancelled",
            (_, ClientError::SizeExceeded { .. }) => "error.download.toolarge",
            (Stage::Submit, ClientError::ResponseParse(_)) => "error.response.nourl",
            (Stage::Submit, _) => "error.submit.failed",
            (Stage::Poll, ClientError::PollTimeout { .. }) => "error.poll.timeout",
            (Stage::Poll, ClientError::JobFailed(_)) => "error.poll.jobfailed",
            (Stage::Poll, _) => {
                return self
                    .messages
                    .format("error.process.failed", &[&error.to_string()]);
            }
            (Stage::Download, _) => "error.download.failed",
        };
        self.messages.get(key)
    }
}

/// Folds a settings validation failure into a result, so callers decoding
/// the raw settings map report it the same way as a pipeline failure.
pub fn settings_failure(
    request: TaskRequest,
    error: &SettingsError,
    messages: &LocalizedMessages,
) -> ExecutionResult {
    let key = match error {
        SettingsError::Empty => "error.settings.none",
        SettingsError::MissingServiceUrl => "error.settings.serviceurl.missing",
        SettingsError::InvalidServiceUrl => "error.settings.serviceurl.invalid",
        SettingsError::MissingAuth => "error.settings.auth.missing",
        SettingsError::InvalidMode(_) => "error.settings.mode.invalid",
    };
    ExecutionResult::error(request, messages.get(key), error.code(), error.to_string())
}
