//! Job submission with bounded retry.
//!
//! Submits the payload to the Data Download endpoint as one URL-encoded form
//! field and interprets the response as either a direct result URL (sync
//! mode) or a job id to poll (async mode).
//!
//! Transport failures and 5xx responses are retried with `2^attempt` seconds
//! of exponential backoff up to the configured attempt cap; 4xx responses
//! and unparseable bodies are fatal on the first occurrence.

use reqwest::Url;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::http::{HttpClient, HttpResponse};
use super::types::{Auth, ClientError, ExecutionMode, JobHandle};
use super::wait_or_cancel;
use crate::request::truncate_details;
use crate::settings::PluginConfig;

/// Path segment of the Data Download service, used to locate the REST API
/// root for job status queries.
const DATA_DOWNLOAD_SEGMENT: &str = "/fmedatadownload";

/// REST path template for job status queries.
const JOB_STATUS_PATH: &str = "/fmerest/v3/transformations/jobs/id/";

/// Submits extraction jobs to the geoprocessing service.
pub struct JobSubmitter<'a, C: HttpClient> {
    http: &'a C,
    config: &'a PluginConfig,
    cancel: &'a CancellationToken,
}

impl<'a, C: HttpClient> JobSubmitter<'a, C> {
    pub fn new(http: &'a C, config: &'a PluginConfig, cancel: &'a CancellationToken) -> Self {
        Self {
            http,
            config,
            cancel,
        }
    }

    /// Submits `payload` and returns how to obtain the result.
    ///
    /// The payload travels as a single form field named `geojson_parameter`,
    /// with `opt_responseformat=json` and `opt_servicemode` appended to the
    /// service URL.
    pub async fn submit(
        &self,
        service_url: &str,
        auth: &Auth,
        payload: &Value,
        geojson_parameter: &str,
        mode: ExecutionMode,
    ) -> Result<JobHandle, ClientError> {
        let url = build_submit_url(service_url, mode)?;
        let form = vec![(geojson_parameter.to_string(), payload.to_string())];

        let max_attempts = self.config.max_retry_attempts.max(1);
        let mut last_error: Option<ClientError> = None;

        for attempt in 1..=max_attempts {
            info!(attempt, max_attempts, "submitting job");
            match self.http.post_form(&url, auth, &form).await {
                Ok(response) => match interpret_response(service_url, &response, mode) {
                    Ok(handle) => return Ok(handle),
                    Err(e) if e.is_retryable() => {
                        warn!(attempt, error = %e, "submission failed with a retryable error");
                        last_error = Some(e);
                    }
                    Err(e) => return Err(e),
                },
                Err(e) if e.is_retryable() => {
                    warn!(attempt, error = %e, "submission failed at the transport level");
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }

            if attempt < max_attempts {
                let delay = self.config.backoff_base * 2u32.saturating_pow(attempt);
                debug!(delay_ms = delay.as_millis() as u64, "backing off before retry");
                wait_or_cancel(self.cancel, delay).await?;
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ClientError::Transient("submission failed with no recorded error".to_string())
        }))
    }
}

/// Appends the Data Download protocol parameters to the service URL.
fn build_submit_url(service_url: &str, mode: ExecutionMode) -> Result<String, ClientError> {
    let mut url = Url::parse(service_url)
        .map_err(|e| ClientError::UrlRejected(format!("{}: {}", service_url, e)))?;
    url.query_pairs_mut()
        .append_pair("opt_responseformat", "json")
        .append_pair("opt_servicemode", mode.service_mode());
    Ok(url.to_string())
}

/// Derives the REST status URL for a job id from the Data Download service
/// URL: everything before the `fmedatadownload` segment, or the URL origin
/// when that segment is absent.
pub fn job_status_url(service_url: &str, job_id: &str) -> Result<String, ClientError> {
    let url = Url::parse(service_url)
        .map_err(|e| ClientError::UrlRejected(format!("{}: {}", service_url, e)))?;

    let base = match service_url.find(DATA_DOWNLOAD_SEGMENT) {
        Some(index) => service_url[..index].to_string(),
        None => {
            let origin = url.origin().ascii_serialization();
            origin
        }
    };

    Ok(format!("{}{}{}", base, JOB_STATUS_PATH, job_id))
}

/// Interprets the submission response body.
fn interpret_response(
    service_url: &str,
    response: &HttpResponse,
    mode: ExecutionMode,
) -> Result<JobHandle, ClientError> {
    match response.status {
        200 | 201 => {}
        status @ 400..=499 => {
            return Err(ClientError::ClientStatus {
                status,
                body: error_detail(response),
            });
        }
        status => {
            return Err(ClientError::ServerStatus {
                status,
                body: error_detail(response),
            });
        }
    }

    let body = response.body_text();

    if let Ok(json) = serde_json::from_str::<Value>(&body) {
        // Checked in a fixed priority order; the first hit wins.
        let url_candidates = [
            &json["serviceResponse"]["url"],
            &json["url"],
            &json["downloadUrl"],
        ];
        for candidate in url_candidates {
            if let Some(url) = candidate.as_str() {
                debug!("submission response carries a direct result URL");
                return Ok(JobHandle::Direct(url.to_string()));
            }
        }

        if mode == ExecutionMode::Async {
            let job_id = match &json["jobId"] {
                Value::String(id) => Some(id.clone()),
                Value::Number(id) => Some(id.to_string()),
                _ => None,
            };
            if let Some(id) = job_id {
                debug!(job_id = %id, "submission response carries an async job id");
                let status_url = job_status_url(service_url, &id)?;
                return Ok(JobHandle::Job { id, status_url });
            }
        }
    } else if body.trim().starts_with("http") {
        // Some service configurations answer with the bare URL.
        return Ok(JobHandle::Direct(body.trim().to_string()));
    }

    Err(ClientError::ResponseParse(format!(
        "no download URL or job id in response: {}",
        truncate_details(body)
    )))
}

/// Mines an error body for the service's own message text, falling back to
/// the truncated raw body.
fn error_detail(response: &HttpResponse) -> String {
    let body = response.body_text();

    if let Ok(json) = serde_json::from_str::<Value>(&body) {
        let mut parts = Vec::new();
        if let Some(message) = json["message"].as_str() {
            parts.push(message.to_string());
        }
        if let Some(message) = json["serviceResponse"]["statusInfo"]["message"].as_str() {
            parts.push(message.to_string());
        }
        if !parts.is_empty() {
            return truncate_details(parts.join(" - "));
        }
    }

    truncate_details(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::http::tests::{MockHttpClient, Scripted};
    use std::time::Duration;

    fn fast_config() -> PluginConfig {
        PluginConfig {
            backoff_base: Duration::from_millis(1),
            ..PluginConfig::default()
        }
    }

    fn token_auth() -> Auth {
        Auth::Token("t0ken".to_string())
    }

    const SERVICE_URL: &str = "https://fme.example.org/fmedatadownload/repo/ws.fmw";

    async fn run_submit(
        mock: &MockHttpClient,
        config: &PluginConfig,
        mode: ExecutionMode,
    ) -> Result<JobHandle, ClientError> {
        let cancel = CancellationToken::new();
        let submitter = JobSubmitter::new(mock, config, &cancel);
        submitter
            .submit(SERVICE_URL, &token_auth(), &serde_json::json!({}), "GEOJSON_INPUT", mode)
            .await
    }

    #[tokio::test]
    async fn test_direct_url_from_service_response() {
        let mock = MockHttpClient::new(vec![Scripted::json(
            200,
            r#"{"serviceResponse":{"url":"http://ok.example/file.zip"}}"#,
        )]);
        let handle = run_submit(&mock, &fast_config(), ExecutionMode::Sync)
            .await
            .unwrap();
        assert_eq!(
            handle,
            JobHandle::Direct("http://ok.example/file.zip".to_string())
        );
    }

    #[tokio::test]
    async fn test_url_field_priority_order() {
        // serviceResponse.url wins over the flat url field.
        let mock = MockHttpClient::new(vec![Scripted::json(
            200,
            r#"{"url":"http://second.example/b.zip","serviceResponse":{"url":"http://first.example/a.zip"}}"#,
        )]);
        let handle = run_submit(&mock, &fast_config(), ExecutionMode::Sync)
            .await
            .unwrap();
        assert_eq!(
            handle,
            JobHandle::Direct("http://first.example/a.zip".to_string())
        );
    }

    #[tokio::test]
    async fn test_download_url_field() {
        let mock = MockHttpClient::new(vec![Scripted::json(
            201,
            r#"{"downloadUrl":"http://ok.example/dl.zip"}"#,
        )]);
        let handle = run_submit(&mock, &fast_config(), ExecutionMode::Sync)
            .await
            .unwrap();
        assert_eq!(handle, JobHandle::Direct("http://ok.example/dl.zip".to_string()));
    }

    #[tokio::test]
    async fn test_raw_url_body() {
        let mock =
            MockHttpClient::new(vec![Scripted::json(200, "http://ok.example/raw.zip\n")]);
        let handle = run_submit(&mock, &fast_config(), ExecutionMode::Sync)
            .await
            .unwrap();
        assert_eq!(handle, JobHandle::Direct("http://ok.example/raw.zip".to_string()));
    }

    #[tokio::test]
    async fn test_async_job_id() {
        let mock = MockHttpClient::new(vec![Scripted::json(200, r#"{"jobId":"J1"}"#)]);
        let handle = run_submit(&mock, &fast_config(), ExecutionMode::Async)
            .await
            .unwrap();
        match handle {
            JobHandle::Job { id, status_url } => {
                assert_eq!(id, "J1");
                assert_eq!(
                    status_url,
                    "https://fme.example.org/fmerest/v3/transformations/jobs/id/J1"
                );
            }
            other => panic!("expected Job handle, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_numeric_job_id() {
        let mock = MockHttpClient::new(vec![Scripted::json(200, r#"{"jobId":4711}"#)]);
        let handle = run_submit(&mock, &fast_config(), ExecutionMode::Async)
            .await
            .unwrap();
        assert!(matches!(handle, JobHandle::Job { id, .. } if id == "4711"));
    }

    #[tokio::test]
    async fn test_job_id_ignored_in_sync_mode() {
        let mock = MockHttpClient::repeating(Scripted::json(200, r#"{"jobId":"J1"}"#));
        let err = run_submit(&mock, &fast_config(), ExecutionMode::Sync)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::ResponseParse(_)));
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_no_url_is_an_error_not_empty_success() {
        let mock = MockHttpClient::new(vec![Scripted::json(200, r#"{"ok":true}"#)]);
        let err = run_submit(&mock, &fast_config(), ExecutionMode::Sync)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::ResponseParse(_)));
    }

    #[tokio::test]
    async fn test_transport_errors_retried_to_the_cap() {
        let mock = MockHttpClient::repeating(Scripted::TransportError(
            "connection refused".to_string(),
        ));
        let err = run_submit(&mock, &fast_config(), ExecutionMode::Sync)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Transient(_)));
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_client_error_not_retried() {
        let mock = MockHttpClient::repeating(Scripted::json(404, "not found"));
        let err = run_submit(&mock, &fast_config(), ExecutionMode::Sync)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::ClientStatus { status: 404, .. }));
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_server_error_retried_then_succeeds() {
        let mock = MockHttpClient::new(vec![
            Scripted::json(503, "busy"),
            Scripted::json(200, r#"{"url":"http://ok.example/x.zip"}"#),
        ]);
        let handle = run_submit(&mock, &fast_config(), ExecutionMode::Sync)
            .await
            .unwrap();
        assert_eq!(handle, JobHandle::Direct("http://ok.example/x.zip".to_string()));
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_error_detail_mined_from_body() {
        let mock = MockHttpClient::new(vec![Scripted::json(
            400,
            r#"{"message":"bad perimeter","serviceResponse":{"statusInfo":{"message":"workspace rejected input"}}}"#,
        )]);
        let err = run_submit(&mock, &fast_config(), ExecutionMode::Sync)
            .await
            .unwrap_err();
        match err {
            ClientError::ClientStatus { body, .. } => {
                assert_eq!(body, "bad perimeter - workspace rejected input");
            }
            other => panic!("expected ClientStatus, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_submit_url_carries_protocol_parameters() {
        let mock = MockHttpClient::new(vec![Scripted::json(
            200,
            r#"{"url":"http://ok.example/x.zip"}"#,
        )]);
        run_submit(&mock, &fast_config(), ExecutionMode::Async)
            .await
            .unwrap();
        let calls = mock.recorded_calls();
        assert!(calls[0].url.contains("opt_responseformat=json"));
        assert!(calls[0].url.contains("opt_servicemode=async"));
    }

    #[tokio::test]
    async fn test_existing_query_parameters_preserved() {
        let mock = MockHttpClient::new(vec![Scripted::json(
            200,
            r#"{"url":"http://ok.example/x.zip"}"#,
        )]);
        let cancel = CancellationToken::new();
        let config = fast_config();
        let submitter = JobSubmitter::new(&mock, &config, &cancel);
        submitter
            .submit(
                "https://fme.example.org/fmedatadownload/ws.fmw?custom=1",
                &token_auth(),
                &serde_json::json!({}),
                "GEOJSON_INPUT",
                ExecutionMode::Sync,
            )
            .await
            .unwrap();
        let url = &mock.recorded_calls()[0].url;
        assert!(url.contains("custom=1"));
        assert!(url.contains("opt_responseformat=json"));
    }

    #[test]
    fn test_status_url_falls_back_to_origin() {
        let status_url =
            job_status_url("https://fme.example.org:8443/other/service.fmw", "J9").unwrap();
        assert_eq!(
            status_url,
            "https://fme.example.org:8443/fmerest/v3/transformations/jobs/id/J9"
        );
    }

    #[tokio::test]
    async fn test_cancelled_backoff_aborts_retry_loop() {
        let mock = MockHttpClient::repeating(Scripted::TransportError("down".to_string()));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let config = PluginConfig {
            backoff_base: Duration::from_secs(60),
            ..PluginConfig::default()
        };
        let submitter = JobSubmitter::new(&mock, &config, &cancel);
        let err = submitter
            .submit(
                SERVICE_URL,
                &token_auth(),
                &serde_json::json!({}),
                "GEOJSON_INPUT",
                ExecutionMode::Sync,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Cancelled));
        assert_eq!(mock.call_count(), 1);
    }
}
