//! Build Server Client
//!
//! Starts remote builds and polls for their results. A build request
//! uploads the project's source archive together with a callback URL; the
//! build server later writes `build/<target>/build.out` into project
//! storage through that callback. Nothing is retried.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use aibuild_core::{BuildResultFile, BuildServerConfig};
use parking_lot::Mutex;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use tracing::{debug, error, info, warn};

use crate::archive::{export_source_archive, ExportError};
use crate::callback::{CallbackError, CallbackToken};
use crate::endpoint::{build_url, callback_url};
use crate::storage::{ProjectId, ProjectStorage, StorageError, User};

/// Build request errors
///
/// Every variant renders as the message shown to the user.
#[derive(Debug, thiserror::Error)]
pub enum BuildRequestError {
    #[error("Sorry, can't package projects larger than {limit_mb}MB. Yours is {size} bytes.")]
    ArchiveTooLarge { size: u64, limit_mb: u64 },
    #[error("Sorry, project was too large to package ({size} bytes)")]
    RequestTooLarge { size: u64 },
    #[error("{message}")]
    ServerStatus { status: u16, message: String },
    #[error("Can not contact the BuildServer at {host}")]
    Unreachable {
        host: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Invalid build server URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Callback(#[from] CallbackError),
}

impl BuildRequestError {
    /// HTTP-like status code for the failure
    pub fn status(&self) -> u16 {
        match self {
            BuildRequestError::ServerStatus { status, .. } => *status,
            BuildRequestError::ArchiveTooLarge { .. } | BuildRequestError::RequestTooLarge { .. } => 413,
            BuildRequestError::Unreachable { .. } => 503,
            BuildRequestError::Storage(StorageError::UnknownProject { .. }) => 404,
            _ => 500,
        }
    }
}

/// A build the server accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildAccepted {
    pub message: String,
}

/// What polling found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
    /// No result yet; last progress the build server reported
    InProgress { progress: u32 },
    Succeeded { output: String },
    Failed { code: i32, output: String, error: String },
}

impl BuildStatus {
    /// `-1` while running, otherwise the `result` code of `build.out`
    pub fn result_code(&self) -> i32 {
        match self {
            BuildStatus::InProgress { .. } => -1,
            BuildStatus::Succeeded { .. } => 0,
            BuildStatus::Failed { code, .. } => *code,
        }
    }

    pub fn is_finished(&self) -> bool {
        !matches!(self, BuildStatus::InProgress { .. })
    }
}

type ProgressKey = (String, ProjectId, String);

/// Client for the remote build server
pub struct BuildServerClient {
    http: Client,
    config: BuildServerConfig,
    storage: Arc<dyn ProjectStorage>,
    progress: Mutex<HashMap<ProgressKey, u32>>,
}

impl BuildServerClient {
    /// Create a new client
    pub fn new(config: BuildServerConfig, storage: Arc<dyn ProjectStorage>) -> Result<Self, BuildRequestError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self::with_http_client(config, storage, http))
    }

    /// Create a client around an already configured HTTP client
    pub fn with_http_client(config: BuildServerConfig, storage: Arc<dyn ProjectStorage>, http: Client) -> Self {
        Self {
            http,
            config,
            storage,
            progress: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &BuildServerConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn ProjectStorage> {
        &self.storage
    }

    /// Ask the build server to build a project
    ///
    /// Old build outputs are deleted first so a later poll cannot pick up a
    /// stale result.
    pub async fn request_build(
        &self,
        user: &User,
        project: ProjectId,
        target: &str,
    ) -> Result<BuildAccepted, BuildRequestError> {
        let name = self.storage.project_name(&user.id, project)?;

        for output in self.storage.output_files(&user.id, project)? {
            debug!("Deleting old output {}", output);
            self.storage.delete_file(&user.id, project, &output)?;
        }
        self.progress
            .lock()
            .remove(&(user.id.clone(), project, target.to_string()));

        let url = self.request_url(user, project, target)?;
        let archive = export_source_archive(self.storage.as_ref(), user, project, true)?;
        let size = archive.len();
        if size >= self.config.max_archive_bytes {
            return Err(BuildRequestError::ArchiveTooLarge {
                size,
                limit_mb: self.config.max_archive_bytes / (1024 * 1024),
            });
        }

        info!("Requesting {} build of {} ({} bytes)", target, archive.file_name, size);
        let response = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/zip")
            .body(archive.content)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        let status = response.status();
        if status == StatusCode::OK {
            return Ok(BuildAccepted {
                message: format!("Building {}", name),
            });
        }
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            return Err(BuildRequestError::RequestTooLarge { size });
        }

        let mut message = format!("Build server responded with response code {}.", status.as_u16());
        match response.text().await {
            Ok(body) if !body.is_empty() => {
                message.push('\n');
                message.push_str(&body);
            }
            Ok(_) => {}
            Err(e) => debug!("No response body: {}", e),
        }

        if status == StatusCode::CONFLICT {
            // The build server is incompatible with this instance.
            error!("{}", message);
        } else {
            warn!("{}", message);
        }
        Err(BuildRequestError::ServerStatus {
            status: status.as_u16(),
            message,
        })
    }

    /// Check whether a build result has arrived
    pub async fn poll_build_result(
        &self,
        user: &User,
        project: ProjectId,
        target: &str,
    ) -> Result<BuildStatus, StorageError> {
        let progress = self.poll_build_progress(user, project, target).await;

        let result_path = BuildResultFile::storage_path(target);
        let outputs = self.storage.output_files(&user.id, project)?;
        if !outputs.contains(&result_path) {
            return Ok(BuildStatus::InProgress { progress });
        }

        let bytes = self.storage.read_file(&user.id, project, &result_path)?;
        let status = match BuildResultFile::from_json(&String::from_utf8_lossy(&bytes)) {
            Ok(file) if file.is_success() => BuildStatus::Succeeded { output: file.output },
            Ok(file) => BuildStatus::Failed {
                code: file.result,
                output: file.output,
                error: file.error,
            },
            Err(e) => {
                warn!("Unreadable {}: {}", result_path, e);
                BuildStatus::Failed {
                    code: 1,
                    output: String::new(),
                    error: String::new(),
                }
            }
        };
        Ok(status)
    }

    /// Ask the build server how far along a build is
    ///
    /// Failures are swallowed and leave the last known value in place.
    pub async fn poll_build_progress(&self, user: &User, project: ProjectId, target: &str) -> u32 {
        let key = (user.id.clone(), project, target.to_string());
        match self.fetch_progress(user, project, target).await {
            Ok(Some(percent)) => {
                info!("The current progress is {}%.", percent);
                self.progress.lock().insert(key, percent);
                percent
            }
            Ok(None) => self.progress(&key),
            Err(e) => {
                debug!("Progress check failed: {}", e);
                self.progress(&key)
            }
        }
    }

    fn progress(&self, key: &ProgressKey) -> u32 {
        self.progress.lock().get(key).copied().unwrap_or(0)
    }

    async fn fetch_progress(
        &self,
        user: &User,
        project: ProjectId,
        target: &str,
    ) -> Result<Option<u32>, BuildRequestError> {
        let url = self.request_url(user, project, target)?;
        let response = self.http.post(url).send().await?;
        if response.status() != StatusCode::OK {
            return Ok(None);
        }
        let body = response.text().await?;
        Ok(body.trim().parse().ok())
    }

    fn request_url(&self, user: &User, project: ProjectId, target: &str) -> Result<url::Url, BuildRequestError> {
        let token = CallbackToken::new(&user.id, project).sign(&self.config.callback_secret)?;
        let callback = callback_url(&self.config, &token, target);
        Ok(build_url(&self.config, &user.email, &callback)?)
    }

    fn send_error(&self, e: reqwest::Error) -> BuildRequestError {
        if e.is_connect() || e.is_timeout() {
            // Host name only, without the port
            let host = e
                .url()
                .and_then(|url| url.host_str())
                .map(str::to_string)
                .unwrap_or_else(|| self.config.host.clone());
            BuildRequestError::Unreachable { host, source: e }
        } else {
            BuildRequestError::Http(e)
        }
    }
}
