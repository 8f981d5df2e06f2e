//! Staging area - local files exchanged with remote services
//!
//! Inputs are written under the uploads directory with a per-request unique
//! name, so concurrent requests never share a staged file. Results are
//! published into the public directory under a timestamped name and are
//! never overwritten.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Upper bound on same-second publications of one logical name
const MAX_PUBLISH_COUNTER: u32 = 10_000;

/// Errors from staging or publishing a file
#[derive(Debug, Error)]
pub enum StagingError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No free name for {0} in the public directory")]
    NameExhausted(String),

    #[error("Download failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download returned status {0}")]
    Status(u16),
}

impl StagingError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        StagingError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A file staged for one request
#[derive(Debug, PartialEq, Eq)]
pub struct StagedFile {
    path: PathBuf,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A value per managed directory, as reported by `/health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryReport<T> {
    pub public: T,
    pub uploads: T,
}

/// Owns the uploads and public directories
#[derive(Debug, Clone)]
pub struct StagingArea {
    uploads_dir: PathBuf,
    public_dir: PathBuf,
    base_image: PathBuf,
    http: reqwest::Client,
}

impl StagingArea {
    pub fn new(
        uploads_dir: impl Into<PathBuf>,
        public_dir: impl Into<PathBuf>,
        base_image: impl Into<PathBuf>,
    ) -> Self {
        Self {
            uploads_dir: uploads_dir.into(),
            public_dir: public_dir.into(),
            base_image: base_image.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Use a preconfigured HTTP client for `stage_download`
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    pub fn public_dir(&self) -> &Path {
        &self.public_dir
    }

    /// Fixed person image used by plain try-on requests
    pub fn base_image(&self) -> &Path {
        &self.base_image
    }

    /// Create both directories if missing
    pub async fn ensure_directories(&self) -> Result<(), StagingError> {
        for dir in [&self.uploads_dir, &self.public_dir] {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| StagingError::io(dir, e))?;
        }
        Ok(())
    }

    pub fn directories(&self) -> DirectoryReport<String> {
        DirectoryReport {
            public: self.public_dir.display().to_string(),
            uploads: self.uploads_dir.display().to_string(),
        }
    }

    pub fn directories_exist(&self) -> DirectoryReport<bool> {
        DirectoryReport {
            public: self.public_dir.is_dir(),
            uploads: self.uploads_dir.is_dir(),
        }
    }

    /// Write uploaded bytes to a fresh file in the uploads directory
    pub async fn stage_upload(&self, bytes: &[u8]) -> Result<StagedFile, StagingError> {
        let path = self.unique_upload_path("upload");
        let mut file = create_new(&path).await?;
        file.write_all(bytes)
            .await
            .map_err(|e| StagingError::io(&path, e))?;
        file.flush().await.map_err(|e| StagingError::io(&path, e))?;

        debug!(path = %path.display(), size = bytes.len(), "Staged upload");
        Ok(StagedFile { path })
    }

    /// Fetch `url` into a fresh file in the uploads directory.
    ///
    /// Returns `None` on a non-200 status or any transport or IO failure;
    /// partial files are removed.
    pub async fn stage_download(&self, url: &str) -> Option<StagedFile> {
        let url = url.trim();
        let path = self.unique_upload_path("downloaded");

        match self.download_to(url, &path).await {
            Ok(size) => {
                info!(url = %url, path = %path.display(), size, "Image downloaded");
                Some(StagedFile { path })
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Failed to download image");
                if let Err(remove_err) = fs::remove_file(&path).await {
                    debug!(path = %path.display(), error = %remove_err, "No partial download to remove");
                }
                None
            }
        }
    }

    async fn download_to(&self, url: &str, path: &Path) -> Result<u64, StagingError> {
        let mut response = self.http.get(url).send().await?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(StagingError::Status(response.status().as_u16()));
        }

        let mut file = create_new(path).await?;
        let mut size = 0u64;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk)
                .await
                .map_err(|e| StagingError::io(path, e))?;
            size += chunk.len() as u64;
        }
        file.flush().await.map_err(|e| StagingError::io(path, e))?;

        Ok(size)
    }

    /// Copy `source` into the public directory as `YYYYMMDD_HHMMSS_<logical_name>`.
    ///
    /// Returns the published file name. An existing file is never replaced:
    /// on collision a counter is inserted after the timestamp.
    pub async fn publish_result(
        &self,
        source: &Path,
        logical_name: &str,
    ) -> Result<String, StagingError> {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        self.publish_with_stamp(source, logical_name, &stamp).await
    }

    async fn publish_with_stamp(
        &self,
        source: &Path,
        logical_name: &str,
        stamp: &str,
    ) -> Result<String, StagingError> {
        let mut input = File::open(source)
            .await
            .map_err(|e| StagingError::io(source, e))?;

        for counter in 0..MAX_PUBLISH_COUNTER {
            let name = if counter == 0 {
                format!("{}_{}", stamp, logical_name)
            } else {
                format!("{}_{}_{}", stamp, counter, logical_name)
            };
            let destination = self.public_dir.join(&name);

            let mut output = match create_new(&destination).await {
                Ok(file) => file,
                Err(StagingError::Io { source: err, .. })
                    if err.kind() == std::io::ErrorKind::AlreadyExists =>
                {
                    continue;
                }
                Err(e) => return Err(e),
            };

            if let Err(e) = tokio::io::copy(&mut input, &mut output).await {
                let _ = fs::remove_file(&destination).await;
                return Err(StagingError::io(&destination, e));
            }
            output
                .flush()
                .await
                .map_err(|e| StagingError::io(&destination, e))?;

            info!(
                source = %source.display(),
                filename = %name,
                "Published result"
            );
            return Ok(name);
        }

        Err(StagingError::NameExhausted(logical_name.to_string()))
    }

    /// Remove a staged input once the remote call is done
    pub async fn discard(&self, staged: StagedFile) {
        if let Err(e) = fs::remove_file(&staged.path).await {
            debug!(path = %staged.path.display(), error = %e, "Could not remove staged file");
        }
    }

    fn unique_upload_path(&self, prefix: &str) -> PathBuf {
        self.uploads_dir
            .join(format!("{}_{}.png", prefix, uuid::Uuid::new_v4()))
    }
}

async fn create_new(path: &Path) -> Result<File, StagingError> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map_err(|e| StagingError::io(path, e))
}
