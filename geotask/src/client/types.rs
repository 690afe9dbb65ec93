//! Shared types for the remote-service client.

use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use thiserror::Error;

/// How the remote service executes a submitted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// The submission response carries the result URL directly.
    #[default]
    Sync,

    /// The submission response carries a job id that must be polled.
    Async,
}

impl ExecutionMode {
    /// The `opt_servicemode` query value for this mode.
    pub fn service_mode(&self) -> &'static str {
        match self {
            ExecutionMode::Sync => "sync",
            ExecutionMode::Async => "async",
        }
    }
}

impl std::str::FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sync" => Ok(ExecutionMode::Sync),
            "async" => Ok(ExecutionMode::Async),
            other => Err(format!("unknown execution mode '{}'", other)),
        }
    }
}

/// Credentials for the remote service. Exactly one scheme is configured per
/// task; the token form wins when both are present in the settings map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    /// Opaque service token (`Authorization: fmetoken token={token}`).
    Token(String),

    /// Username/password pair (`Authorization: Basic {base64}`).
    Basic {
        username: String,
        password: String,
    },
}

impl Auth {
    /// Renders the `Authorization` header value for this scheme.
    pub fn header_value(&self) -> String {
        match self {
            Auth::Token(token) => format!("fmetoken token={}", token),
            Auth::Basic { username, password } => {
                let encoded = BASE64.encode(format!("{}:{}", username, password));
                format!("Basic {}", encoded)
            }
        }
    }
}

/// What a successful submission yielded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobHandle {
    /// The artifact is ready at this URL.
    Direct(String),

    /// The job runs asynchronously; poll `status_url` until terminal.
    Job {
        /// Remote job identifier.
        id: String,
        /// Fully built status endpoint for this job.
        status_url: String,
    },
}

/// Failures raised by the submit/poll/download stages.
///
/// The split between transient and fatal variants drives the retry policy:
/// [`ClientError::Transient`] and [`ClientError::ServerStatus`] are retried
/// by the submitter, everything else fails the stage immediately.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The target URL failed the outbound-URL guard.
    #[error("URL rejected by the outbound guard: {0}")]
    UrlRejected(String),

    /// Transport-level failure (connect, timeout, broken stream).
    #[error("network failure: {0}")]
    Transient(String),

    /// The service answered with a 4xx status. Not retried.
    #[error("HTTP {status} from the service")]
    ClientStatus {
        status: u16,
        /// Truncated response body for diagnostics.
        body: String,
    },

    /// The service answered with a 5xx status. Retried like a transport
    /// failure.
    #[error("HTTP {status} from the service")]
    ServerStatus {
        status: u16,
        /// Truncated response body for diagnostics.
        body: String,
    },

    /// A response body could not be interpreted.
    #[error("unparseable service response: {0}")]
    ResponseParse(String),

    /// The remote job reported failure.
    #[error("remote job failed: {0}")]
    JobFailed(String),

    /// The poll budget ran out before the job reached a terminal state.
    #[error("job still running after {attempts} status polls")]
    PollTimeout { attempts: u32 },

    /// The artifact exceeds the configured size cap.
    #[error("download of {actual} bytes exceeds the {max} byte limit")]
    SizeExceeded { actual: u64, max: u64 },

    /// The output path would escape the request's output directory.
    #[error("output path escapes the output directory: {}", .0.display())]
    PathTraversal(PathBuf),

    /// Local file I/O failure while writing the artifact.
    #[error("file I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// The enclosing scheduler cancelled the execution.
    #[error("execution cancelled")]
    Cancelled,
}

impl ClientError {
    /// Stable machine-readable code for the result record.
    pub fn code(&self) -> &'static str {
        match self {
            ClientError::UrlRejected(_) => "URL_REJECTED",
            ClientError::Transient(_) => "NETWORK_FAILURE",
            ClientError::ClientStatus { .. } => "HTTP_CLIENT_ERROR",
            ClientError::ServerStatus { .. } => "HTTP_SERVER_ERROR",
            ClientError::ResponseParse(_) => "RESPONSE_PARSE_FAILED",
            ClientError::JobFailed(_) => "JOB_FAILED",
            ClientError::PollTimeout { .. } => "POLL_TIMEOUT",
            ClientError::SizeExceeded { .. } => "DOWNLOAD_TOO_LARGE",
            ClientError::PathTraversal(_) => "PATH_TRAVERSAL",
            ClientError::Io(_) => "FILE_IO_FAILED",
            ClientError::Cancelled => "CANCELLED",
        }
    }

    /// Whether the submitter may retry after this failure.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::Transient(_) | ClientError::ServerStatus { .. }
        )
    }
}
