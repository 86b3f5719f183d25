// src/uploader.rs
use std::path::Path;
use tracing::{error, info, warn};

use crate::config::MAX_UPLOAD_BYTES;
use crate::core::service_client::MatchBackend;
use crate::error::{ClientError, ValidationError};

const PDF_SIGNATURE: &[u8] = b"%PDF-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadStatus {
    #[default]
    Idle,
    Uploading,
    Success,
    Failed,
}

#[derive(Debug, Clone)]
pub struct UploadTask {
    pub file_name: String,
    pub content: Vec<u8>,
    pub size_bytes: u64,
    pub status: UploadStatus,
}

/// Validates and sends one résumé at a time. There is no queue: selecting a
/// new file replaces the previous task.
#[derive(Debug, Default)]
pub struct ResumeUploader {
    task: Option<UploadTask>,
    last_error: Option<String>,
}

impl ResumeUploader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> UploadStatus {
        self.task
            .as_ref()
            .map(|task| task.status)
            .unwrap_or_default()
    }

    pub fn task(&self) -> Option<&UploadTask> {
        self.task.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// The upload trigger is disabled while a transfer is running.
    pub fn can_upload(&self) -> bool {
        self.task
            .as_ref()
            .is_some_and(|task| task.status != UploadStatus::Uploading)
    }

    /// Validate an in-memory file. Rejected files never leave `Idle`.
    pub fn select_file(
        &mut self,
        file_name: &str,
        content: Vec<u8>,
    ) -> Result<&UploadTask, ClientError> {
        self.ensure_not_uploading()?;
        let size_bytes = content.len() as u64;

        if let Err(e) = validate_resume(file_name, size_bytes, Some(&content)) {
            return Err(self.reject(e));
        }

        self.last_error = None;
        Ok(&*self.task.insert(UploadTask {
            file_name: file_name.to_string(),
            content,
            size_bytes,
            status: UploadStatus::Idle,
        }))
    }

    /// Validate a file on disk. The size is checked from metadata before the
    /// file is read.
    pub async fn select_path(&mut self, path: &Path) -> Result<&UploadTask, ClientError> {
        self.ensure_not_uploading()?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
            .to_string();

        let metadata = tokio::fs::metadata(path).await.map_err(|e| {
            ClientError::Storage(format!("Cannot read {}: {}", path.display(), e))
        })?;

        if let Err(e) = validate_resume(&file_name, metadata.len(), None) {
            return Err(self.reject(e));
        }

        let content = tokio::fs::read(path).await.map_err(|e| {
            ClientError::Storage(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        self.select_file(&file_name, content)
    }

    /// Send the selected file: `Idle → Uploading → {Success, Failed}`.
    pub async fn upload(
        &mut self,
        token: &str,
        backend: &dyn MatchBackend,
    ) -> Result<(), ClientError> {
        self.ensure_not_uploading()?;
        let task = self
            .task
            .as_mut()
            .ok_or(ClientError::Validation(ValidationError::EmptyField("file")))?;

        let file_name = task.file_name.clone();
        let content = task.content.clone();

        let mut in_flight = InFlight::start(&mut task.status);
        let outcome = backend.upload_resume(token, &file_name, content).await;

        match outcome {
            Ok(response) => {
                in_flight.finish(UploadStatus::Success);
                self.last_error = None;
                info!(
                    "Résumé {} uploaded{}",
                    file_name,
                    response
                        .file_url
                        .map(|url| format!(" ({})", url))
                        .unwrap_or_default()
                );
                Ok(())
            }
            Err(e) => {
                in_flight.finish(UploadStatus::Failed);
                error!("Upload of {} failed: {}", file_name, e);
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    fn ensure_not_uploading(&self) -> Result<(), ClientError> {
        if self.status() == UploadStatus::Uploading {
            return Err(ClientError::Busy("Upload"));
        }
        Ok(())
    }

    fn reject(&mut self, e: ValidationError) -> ClientError {
        warn!("Résumé rejected before upload: {}", e);
        self.task = None;
        self.last_error = Some(e.to_string());
        ClientError::Validation(e)
    }
}

/// Keeps a task `Uploading` while the transfer runs. A transfer abandoned
/// before it finishes (the future was dropped) ends as `Failed`.
struct InFlight<'a> {
    status: &'a mut UploadStatus,
}

impl<'a> InFlight<'a> {
    fn start(status: &'a mut UploadStatus) -> Self {
        *status = UploadStatus::Uploading;
        Self { status }
    }

    fn finish(&mut self, outcome: UploadStatus) {
        *self.status = outcome;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if *self.status == UploadStatus::Uploading {
            warn!("Upload abandoned before completion");
            *self.status = UploadStatus::Failed;
        }
    }
}

/// Size first, then type: extension and, when the bytes are at hand, the PDF
/// signature.
pub fn validate_resume(
    file_name: &str,
    size_bytes: u64,
    content: Option<&[u8]>,
) -> Result<(), ValidationError> {
    if size_bytes > MAX_UPLOAD_BYTES {
        return Err(ValidationError::FileTooLarge {
            size: size_bytes,
            max: MAX_UPLOAD_BYTES,
        });
    }

    if !file_name.to_lowercase().ends_with(".pdf") {
        return Err(ValidationError::UnsupportedType {
            file_name: file_name.to_string(),
        });
    }

    if size_bytes == 0 {
        return Err(ValidationError::EmptyFile);
    }

    if let Some(content) = content {
        if !content.starts_with(PDF_SIGNATURE) {
            return Err(ValidationError::UnsupportedType {
                file_name: file_name.to_string(),
            });
        }
    }

    Ok(())
}
