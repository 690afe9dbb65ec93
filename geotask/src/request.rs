//! Task request and execution result types.
//!
//! A [`TaskRequest`] is assembled by the surrounding order-workflow engine
//! and is read-only to this crate. The executor hands back an
//! [`ExecutionResult`] that the engine persists or displays; nothing is
//! stored here.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

/// Longest error-detail string kept on a result. Raw remote bodies and
/// exception text are truncated to this length before storage.
pub const MAX_ERROR_DETAIL_LEN: usize = 1000;

/// One geodata extraction order step, fully populated by the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskRequest {
    /// Internal identifier of the order step.
    pub id: i64,

    /// Globally unique order identifier.
    pub order_guid: String,

    /// Human-readable order label.
    pub order_label: String,

    /// Globally unique identifier of the ordering customer.
    pub client_guid: String,

    /// Display name of the ordering customer.
    pub client_name: String,

    /// Globally unique identifier of the customer's organisation.
    pub organism_guid: String,

    /// Display name of the customer's organisation.
    pub organism_name: String,

    /// Globally unique identifier of the ordered product.
    pub product_guid: String,

    /// Human-readable product label.
    pub product_label: String,

    /// WKT perimeter of the ordered extraction, if any.
    pub perimeter: Option<String>,

    /// JSON-encoded map of product-specific parameters, if any.
    pub parameters: Option<String>,

    /// Directory holding input documents for this step.
    pub folder_in: PathBuf,

    /// Directory the produced artifact must be written to. Must exist and be
    /// writable before the download stage runs.
    pub folder_out: PathBuf,

    /// When the order entered the system.
    pub start_date: Option<DateTime<Utc>>,

    /// Deadline for the order, if one was set.
    pub end_date: Option<DateTime<Utc>>,
}

/// Notification settings handed through from the workflow engine.
///
/// This core never sends mail itself; the settings ride along so a task
/// implementation could surface them to the remote job if needed.
#[derive(Debug, Clone, Default)]
pub struct NotificationSettings {
    /// Sender address configured on the platform.
    pub sender: Option<String>,

    /// Addresses of the operators watching this order.
    pub recipients: Vec<String>,

    /// Whether notifications are enabled at all.
    pub enabled: bool,
}

/// Final state of one task execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The task produced its artifact.
    Success,

    /// The task failed; see message/error fields.
    Error,

    /// The task is waiting on an external actor and should be retried later.
    Standby,
}

/// The outcome of [`TaskExecutor::execute`](crate::executor::TaskExecutor::execute).
///
/// Immutable once returned; owned by the caller.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Final status of the execution.
    pub status: Status,

    /// Localized, user-facing summary of the outcome.
    pub message: String,

    /// Machine-readable error code, present on failures.
    pub error_code: Option<String>,

    /// Diagnostic detail (cause text, truncated), present on failures.
    /// Never shown as the sole user-facing message.
    pub error_details: Option<String>,

    /// Path of the downloaded artifact on success.
    pub result_file_path: Option<PathBuf>,

    /// The request this result belongs to.
    pub request: TaskRequest,

    /// Wall-clock duration of the execution.
    pub processing_duration: std::time::Duration,
}

impl ExecutionResult {
    /// Builds a success result pointing at the downloaded artifact.
    pub fn success(request: TaskRequest, message: String, file_path: PathBuf) -> Self {
        Self {
            status: Status::Success,
            message,
            error_code: None,
            error_details: None,
            result_file_path: Some(file_path),
            request,
            processing_duration: std::time::Duration::ZERO,
        }
    }

    /// Builds an error result with a machine code and truncated detail text.
    pub fn error(
        request: TaskRequest,
        message: String,
        code: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            status: Status::Error,
            message,
            error_code: Some(code.into()),
            error_details: Some(truncate_details(details.into())),
            result_file_path: None,
            request,
            processing_duration: std::time::Duration::ZERO,
        }
    }
}

/// Caps detail text at [`MAX_ERROR_DETAIL_LEN`], appending an ellipsis marker
/// when anything was cut.
pub fn truncate_details(details: String) -> String {
    if details.len() <= MAX_ERROR_DETAIL_LEN {
        return details;
    }
    let mut cut = MAX_ERROR_DETAIL_LEN;
    while !details.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &details[..cut])
}
