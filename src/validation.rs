//! Client-side input checks. They spare the user a round trip; the backend's
//! own policies remain the authority.

use std::path::Path;

use bytes::Bytes;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

pub mod limits {
    pub const FULL_NAME: usize = 100;
    pub const USERNAME: usize = 50;
    pub const PHONE: usize = 20;
    pub const ADDRESS: usize = 500;
    pub const BIO: usize = 2000;
    pub const URL: usize = 200;
    pub const COMPANY_NAME: usize = 200;
    pub const VISION: usize = 1000;
    pub const MISSION: usize = 1000;
    pub const METADATA_FIELD: usize = 100;

    pub const JOB_TITLE: usize = 200;
    pub const JOB_TEXT: usize = 5000;
    pub const JOB_FIELD: usize = 100;

    pub const CAREER_FIELD: usize = 100;
    pub const CAREER_DESCRIPTION: usize = 2000;
    pub const INSTITUTION: usize = 200;
    pub const DEGREE_FIELD: usize = 100;
    pub const EDUCATION_DESCRIPTION: usize = 1000;
    pub const LICENSE_NAME: usize = 200;
    pub const CREDENTIAL_ID: usize = 100;

    pub const COVER_LETTER: usize = 5000;
    pub const NOTES: usize = 1000;
}

/// A file picked for upload, held in memory.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl UploadFile {
    pub fn new(
        file_name: impl Into<String>,
        content_type: Option<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type,
            bytes: bytes.into(),
        }
    }

    /// Reads a local file, refusing oversized files before loading them.
    pub async fn from_path(path: &Path) -> AppResult<Self> {
        let metadata = tokio::fs::metadata(path).await?;
        if metadata.len() > MAX_UPLOAD_BYTES as u64 {
            return Err(too_large(&path.display().to_string()));
        }
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.pdf".to_string());
        let content_type = mime_guess::from_path(path)
            .first()
            .map(|mime| mime.essence_str().to_string());
        Ok(Self::new(file_name, content_type, bytes))
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn extension(&self) -> String {
        Path::new(&self.file_name)
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .filter(|ext| !ext.is_empty())
            .unwrap_or_else(|| "pdf".to_string())
    }
}

fn too_large(label: &str) -> AppError {
    AppError::bad_request(format!("{label} is larger than the 5 MB limit"))
}

/// PDF only, at most 5 MB. A missing content type falls back to the extension.
pub fn validate_pdf(file: &UploadFile, label: &str) -> AppResult<()> {
    if file.size() == 0 {
        return Err(AppError::bad_request(format!("{label} is empty")));
    }
    if file.size() > MAX_UPLOAD_BYTES {
        return Err(too_large(label));
    }
    let is_pdf = match file.content_type.as_deref() {
        Some(PDF_CONTENT_TYPE) => true,
        None | Some("application/octet-stream") => file.extension() == "pdf",
        Some(_) => false,
    };
    if !is_pdf {
        return Err(AppError::bad_request(format!("{label} must be a PDF file")));
    }
    Ok(())
}

/// Object key for an uploaded document, e.g. `cvs/<user>_cv_<millis>.pdf`.
pub fn storage_key(folder: &str, user_id: Uuid, kind: &str, millis: i64, extension: &str) -> String {
    format!("{folder}/{user_id}_{kind}_{millis}.{extension}")
}

pub fn required(field: &str, value: &str, max: usize) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::bad_request(format!("{field} is required")));
    }
    check_len(field, trimmed, max)?;
    Ok(trimmed.to_string())
}

/// Trims an optional value; blank becomes `None`.
pub fn optional(field: &str, value: Option<&str>, max: usize) -> AppResult<Option<String>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(trimmed) => {
            check_len(field, trimmed, max)?;
            Ok(Some(trimmed.to_string()))
        }
        None => Ok(None),
    }
}

pub fn check_len(field: &str, value: &str, max: usize) -> AppResult<()> {
    if value.chars().count() > max {
        return Err(AppError::bad_request(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}
