//! Async job status polling.
//!
//! Sync-mode submissions return the result URL directly; async submissions
//! return a job id that must be watched. The poller queries the job status
//! endpoint at a fixed interval until the job reaches a terminal state or
//! the poll budget runs out. Polling blocks the calling execution; there is
//! no background task.

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::http::HttpClient;
use super::types::{Auth, ClientError};
use super::wait_or_cancel;
use crate::request::truncate_details;
use crate::settings::PluginConfig;

/// Watches an async job until it yields a result URL.
pub struct JobPoller<'a, C: HttpClient> {
    http: &'a C,
    config: &'a PluginConfig,
    cancel: &'a CancellationToken,
}

impl<'a, C: HttpClient> JobPoller<'a, C> {
    pub fn new(http: &'a C, config: &'a PluginConfig, cancel: &'a CancellationToken) -> Self {
        Self {
            http,
            config,
            cancel,
        }
    }

    /// Polls `status_url` until the job completes and returns its result URL.
    ///
    /// `SUCCESS`/`COMPLETED` is terminal success, `FAILED`/`ERROR` is a
    /// terminal [`ClientError::JobFailed`], anything else (including a
    /// transient query failure) spends one unit of the poll budget and waits
    /// for the next tick. An exhausted budget is
    /// [`ClientError::PollTimeout`], distinct from a job failure.
    pub async fn poll(&self, job_id: &str, status_url: &str, auth: &Auth) -> Result<String, ClientError> {
        let max_polls = self.config.max_polls.max(1);

        for attempt in 1..=max_polls {
            debug!(job_id, attempt, max_polls, "querying job status");

            match self.query(status_url, auth).await {
                Ok(Some(result_url)) => {
                    info!(job_id, attempt, "job completed");
                    return Ok(result_url);
                }
                Ok(None) => {}
                Err(e @ ClientError::JobFailed(_)) | Err(e @ ClientError::ResponseParse(_)) => {
                    return Err(e);
                }
                Err(e @ ClientError::ClientStatus { .. }) => return Err(e),
                Err(ClientError::Cancelled) => return Err(ClientError::Cancelled),
                Err(e) => {
                    // Transient query failures spend a poll, same as RUNNING.
                    warn!(job_id, attempt, error = %e, "status query failed, will retry");
                }
            }

            if attempt < max_polls {
                wait_or_cancel(self.cancel, self.config.poll_interval).await?;
            }
        }

        warn!(job_id, max_polls, "job did not complete within the poll budget");
        Err(ClientError::PollTimeout {
            attempts: max_polls,
        })
    }

    /// One status query. `Ok(Some(url))` is terminal success, `Ok(None)`
    /// means keep polling.
    async fn query(&self, status_url: &str, auth: &Auth) -> Result<Option<String>, ClientError> {
        let response = self.http.post(status_url, auth).await?;

        match response.status {
            200 => {}
            status @ 400..=499 => {
                return Err(ClientError::ClientStatus {
                    status,
                    body: truncate_details(response.body_text()),
                });
            }
            status => {
                return Err(ClientError::ServerStatus {
                    status,
                    body: truncate_details(response.body_text()),
                });
            }
        }

        let body = response.body_text();
        let json: Value = serde_json::from_str(&body).map_err(|e| {
            ClientError::ResponseParse(format!("invalid job status body: {}", e))
        })?;

        let status = json["status"].as_str().unwrap_or("").to_ascii_uppercase();
        debug!(job_status = %status, "job status received");

        match status.as_str() {
            "SUCCESS" | "COMPLETED" => match json["result"]["url"].as_str() {
                Some(url) => Ok(Some(url.to_string())),
                None => Err(ClientError::ResponseParse(
                    "completed job carries no result URL".to_string(),
                )),
            },
            "FAILED" | "ERROR" => {
                let detail = json["statusMessage"]
                    .as_str()
                    .or_else(|| json["result"]["statusMessage"].as_str())
                    .unwrap_or(&body);
                Err(ClientError::JobFailed(truncate_details(detail.to_string())))
            }
            _ => Ok(None),
        }
    }
}
