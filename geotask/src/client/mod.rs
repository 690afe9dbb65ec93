//! HTTP client for the remote geoprocessing service.
//!
//! The client is split along the three network stages of an extraction:
//! [`submit::JobSubmitter`] posts the payload, [`poll::JobPoller`] watches an
//! async job until it yields a result URL, and [`download::ResultFetcher`]
//! streams the artifact to disk. All three talk through the
//! [`http::HttpClient`] trait and honor a shared cancellation token.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

pub mod download;
pub mod http;
pub mod poll;
pub mod submit;
pub mod types;

pub use download::ResultFetcher;
pub use http::{HttpClient, HttpResponse, ReqwestHttpClient, StreamingResponse};
pub use poll::JobPoller;
pub use submit::JobSubmitter;
pub use types::{Auth, ClientError, ExecutionMode, JobHandle};

/// Sleeps for `delay` unless the token fires first.
pub(crate) async fn wait_or_cancel(
    cancel: &CancellationToken,
    delay: Duration,
) -> Result<(), ClientError> {
    tokio::select! {
        _ = cancel.cancelled() => Err(ClientError::Cancelled),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}
