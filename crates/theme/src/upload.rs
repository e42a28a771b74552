//! Multipart upload receiver.
//!
//! Streams a `multipart/form-data` body to disk part by part. Only file
//! parts whose declared name is a valid archive name are kept, under
//! `<upload_dir>/<name>`; every other part is drained into an anonymous
//! temp file and forgotten.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures_util::Stream;
use multer::{Constraints, Field, Multipart, SizeLimit};
use tokio::io::AsyncWriteExt;

use shopfront_protocol::ArchiveName;

use crate::archive::ArchiveRef;
use crate::error::UploadError;

/// An archive persisted by a finished upload session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    pub name: ArchiveName,
    pub size: u64,
    pub path: PathBuf,
}

impl StoredUpload {
    pub fn archive_ref(&self) -> ArchiveRef {
        ArchiveRef::in_dir(
            self.path.parent().unwrap_or_else(|| Path::new("")),
            self.name.clone(),
        )
    }
}

/// Receives theme archive uploads into a fixed directory.
#[derive(Debug, Clone)]
pub struct UploadReceiver {
    upload_dir: PathBuf,
    max_bytes: Option<u64>,
}

impl UploadReceiver {
    /// Creates a receiver storing archives in `upload_dir`.
    ///
    /// A relative directory is resolved against the working directory on
    /// every [`receive`](Self::receive) call.
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            max_bytes: None,
        }
    }

    /// Caps the size of the whole request body.
    pub fn with_max_bytes(mut self, max_bytes: Option<u64>) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Extracts the multipart boundary from a `Content-Type` header value.
    pub fn boundary(content_type: Option<&str>) -> Result<String, UploadError> {
        let content_type =
            content_type.ok_or_else(|| UploadError::NotMultipart("missing content type".into()))?;
        multer::parse_boundary(content_type)
            .map_err(|_| UploadError::NotMultipart(content_type.to_string()))
    }

    /// Runs one upload session over `body`.
    ///
    /// Resolves exactly once: with the last archive part written, with
    /// [`UploadError::NoArchive`] if the body held none, or with the
    /// first stream or I/O error, after which nothing more is read.
    pub async fn receive<S, O, E>(
        &self,
        body: S,
        boundary: impl Into<String>,
    ) -> Result<StoredUpload, UploadError>
    where
        S: Stream<Item = Result<O, E>> + Send + 'static,
        O: Into<Bytes> + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
    {
        let upload_dir = self.resolve_upload_dir().await?;
        let mut multipart = Multipart::with_constraints(body, boundary, self.constraints());
        let mut session = UploadSession::default();

        while let Some(mut field) = multipart.next_field().await? {
            let Some(file_name) = field.file_name().map(str::to_owned) else {
                drain(&mut field).await?;
                continue;
            };

            match ArchiveName::parse(file_name) {
                Ok(name) => {
                    let path = upload_dir.join(name.as_str());
                    let size = write_to_file(&mut field, &path).await?;
                    tracing::debug!(archive = %name, size, "archive part stored");
                    session.record(StoredUpload { name, size, path }).await;
                }
                Err(reason) => {
                    tracing::debug!("ignoring upload part: {reason}");
                    spool_to_temp(&mut field).await?;
                }
            }
        }

        session.finish()
    }

    async fn resolve_upload_dir(&self) -> Result<PathBuf, UploadError> {
        let dir_error = |source| UploadError::UploadDir {
            path: self.upload_dir.clone(),
            source,
        };
        let dir = std::path::absolute(&self.upload_dir).map_err(dir_error)?;
        tokio::fs::create_dir_all(&dir).await.map_err(dir_error)?;
        Ok(dir)
    }

    fn constraints(&self) -> Constraints {
        let constraints = Constraints::new();
        match self.max_bytes {
            Some(max) => constraints.size_limit(SizeLimit::new().whole_stream(max)),
            None => constraints,
        }
    }
}

/// Per-request state: the archive part that currently wins.
#[derive(Debug, Default)]
struct UploadSession {
    candidate: Option<StoredUpload>,
}

impl UploadSession {
    /// Records a fully written archive part; the last one wins.
    ///
    /// A superseded archive stored under a different name is removed so
    /// only the winning file stays in the upload directory.
    async fn record(&mut self, upload: StoredUpload) {
        if let Some(previous) = self.candidate.replace(upload) {
            let current = self.candidate.as_ref().map(|c| c.path.as_path());
            if current != Some(previous.path.as_path()) {
                tracing::debug!(archive = %previous.name, "archive part superseded");
                if let Err(e) = tokio::fs::remove_file(&previous.path).await {
                    tracing::warn!(path = %previous.path.display(), "failed to remove superseded upload: {e}");
                }
            }
        }
    }

    fn finish(self) -> Result<StoredUpload, UploadError> {
        self.candidate.ok_or(UploadError::NoArchive)
    }
}

async fn write_to_file(field: &mut Field<'_>, path: &Path) -> Result<u64, UploadError> {
    let mut file = tokio::fs::File::create(path).await?;
    let size = copy_field(field, &mut file).await?;
    file.flush().await?;
    Ok(size)
}

async fn spool_to_temp(field: &mut Field<'_>) -> Result<(), UploadError> {
    let temp = tokio::task::spawn_blocking(tempfile::tempfile)
        .await
        .map_err(std::io::Error::other)??;
    let mut file = tokio::fs::File::from_std(temp);
    copy_field(field, &mut file).await?;
    Ok(())
}

async fn copy_field(
    field: &mut Field<'_>,
    file: &mut tokio::fs::File,
) -> Result<u64, UploadError> {
    let mut size = 0u64;
    while let Some(chunk) = field.chunk().await? {
        file.write_all(&chunk).await?;
        size += chunk.len() as u64;
    }
    Ok(size)
}

async fn drain(field: &mut Field<'_>) -> Result<(), UploadError> {
    while field.chunk().await?.is_some() {}
    Ok(())
}
