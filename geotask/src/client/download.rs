//! Result artifact download.
//!
//! The result URL comes from a remote response and is treated as untrusted:
//! it is revalidated against the outbound-URL guard, and the target path is
//! normalized and checked to stay under the output directory. The body is
//! streamed to disk with a running byte count so an oversized or misreported
//! artifact is cut off without buffering it in memory.

use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use bytes::Bytes;
use chrono::Utc;
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::http::HttpClient;
use super::types::{Auth, ClientError};
use crate::guard;
use crate::request::truncate_details;
use crate::settings::PluginConfig;

/// Downloads extraction results to the order's output directory.
pub struct ResultFetcher<'a, C: HttpClient> {
    http: &'a C,
    config: &'a PluginConfig,
}

impl<'a, C: HttpClient> ResultFetcher<'a, C> {
    pub fn new(http: &'a C, config: &'a PluginConfig) -> Self {
        Self { http, config }
    }

    /// Streams the artifact at `url` into `output_dir` and returns the
    /// written file path.
    pub async fn download(
        &self,
        url: &str,
        auth: &Auth,
        output_dir: &Path,
    ) -> Result<PathBuf, ClientError> {
        if !guard::is_allowed(url) {
            return Err(ClientError::UrlRejected(url.to_string()));
        }

        let file_name = result_file_name();
        let target = contained_join(output_dir, &file_name)?;

        let response = self.http.get_stream(url, auth).await?;
        match response.status {
            200 => {}
            status @ 400..=499 => {
                return Err(ClientError::ClientStatus {
                    status,
                    body: String::new(),
                });
            }
            status => {
                return Err(ClientError::ServerStatus {
                    status,
                    body: String::new(),
                });
            }
        }

        let max = self.config.max_download_size;
        if let Some(declared) = response.content_length {
            if declared > max {
                warn!(url, declared, max, "declared artifact size exceeds the cap");
                return Err(ClientError::SizeExceeded {
                    actual: declared,
                    max,
                });
            }
        }

        debug!(url, target = %target.display(), "downloading result artifact");
        tokio::fs::create_dir_all(output_dir).await?;
        let mut file = tokio::fs::File::create(&target).await?;

        // Any failure past this point must not leave a partial file behind.
        let outcome = write_capped(&mut file, response.body, max, url).await;
        drop(file);
        match outcome {
            Ok(written) => {
                info!(url, bytes = written, path = %target.display(), "result artifact downloaded");
                Ok(target)
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&target).await;
                Err(e)
            }
        }
    }
}

/// Streams `body` into `file`, enforcing the byte cap as chunks arrive.
async fn write_capped(
    file: &mut tokio::fs::File,
    mut body: BoxStream<'static, Result<Bytes, ClientError>>,
    max: u64,
    url: &str,
) -> Result<u64, ClientError> {
    let mut written: u64 = 0;

    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        written += chunk.len() as u64;
        if written > max {
            warn!(url, written, max, "artifact exceeded the size cap mid-stream");
            return Err(ClientError::SizeExceeded {
                actual: written,
                max,
            });
        }
        file.write_all(&chunk).await?;
    }

    file.flush().await?;
    Ok(written)
}

/// Process-wide sequence number appended to artifact names.
static NAME_SEQUENCE: AtomicU32 = AtomicU32::new(0);

/// Collision-resistant artifact name: timestamp plus a sequence number, so
/// two downloads landing in the same millisecond cannot clobber each other.
fn result_file_name() -> String {
    let sequence = NAME_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!(
        "fme_result_{}_{}.zip",
        Utc::now().timestamp_millis(),
        sequence
    )
}

/// Joins `name` onto `dir` and verifies the lexically normalized result
/// stays under `dir`.
fn contained_join(dir: &Path, name: &str) -> Result<PathBuf, ClientError> {
    let base = normalize(dir);
    let joined = normalize(&dir.join(name));
    if joined.starts_with(&base) && joined != base {
        Ok(joined)
    } else {
        Err(ClientError::PathTraversal(joined))
    }
}

/// Lexical path normalization: resolves `.` and `..` without touching the
/// filesystem. A `..` that would climb past the root is kept out of the
/// result, which makes the containment check fail as intended.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}
