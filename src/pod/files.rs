//! POD file storage on local disk
//!
//! Layout: `{upload_dir}/{order_id}/{millis}_{rand6}{ext}`, served back under
//! `{public_base}/{order_id}/{file_name}`.

use std::path::{Path, PathBuf};

use chrono::Utc;
use rand::Rng;
use rand::distributions::Alphanumeric;
use tracing::{debug, info, warn};

use crate::core_types::EntityId;
use crate::lifecycle::LifecycleError;

/// 10 MiB
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Scans, photos and office documents
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

/// Where and how a file was stored
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    pub file_name: String,
    pub original_name: String,
    pub file_path: String,
    pub file_url: String,
    pub file_size: i64,
    pub mime_type: String,
    /// MD5, lowercase hex
    pub checksum: String,
}

pub struct PodFileStore {
    root: PathBuf,
    public_base: String,
}

impl PodFileStore {
    pub fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Size and MIME checks, no I/O
    pub fn validate(bytes: &[u8], mime_type: &str) -> Result<(), LifecycleError> {
        if bytes.is_empty() {
            return Err(LifecycleError::InvalidFile("file is empty".to_string()));
        }
        if bytes.len() > MAX_FILE_SIZE {
            return Err(LifecycleError::InvalidFile(format!(
                "file is {} bytes, limit is {} bytes",
                bytes.len(),
                MAX_FILE_SIZE
            )));
        }
        if !ALLOWED_MIME_TYPES.contains(&mime_type) {
            return Err(LifecycleError::InvalidFile(format!(
                "unsupported file type: {mime_type}"
            )));
        }
        Ok(())
    }

    /// Validate and write the file for `order_id`
    pub async fn save(
        &self,
        order_id: EntityId,
        original_name: &str,
        mime_type: &str,
        bytes: &[u8],
    ) -> Result<StoredFile, LifecycleError> {
        Self::validate(bytes, mime_type)?;

        let file_name = format!(
            "{}_{}{}",
            Utc::now().timestamp_millis(),
            random_tag(),
            extension(original_name)
        );
        let dir = self.root.join(order_id.to_string());
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(&file_name);
        tokio::fs::write(&path, bytes).await?;

        let checksum = format!("{:x}", md5::compute(bytes));
        info!(
            order_id = %order_id,
            file = %file_name,
            size = bytes.len(),
            checksum = %checksum,
            "POD file stored"
        );

        Ok(StoredFile {
            file_url: format!("{}/{}/{}", self.public_base, order_id, file_name),
            file_path: path.to_string_lossy().into_owned(),
            file_name,
            original_name: original_name.to_string(),
            file_size: bytes.len() as i64,
            mime_type: mime_type.to_string(),
            checksum,
        })
    }

    /// Best-effort removal, used when the database write after a save fails
    pub async fn discard(&self, file: &StoredFile) {
        match tokio::fs::remove_file(&file.file_path).await {
            Ok(()) => debug!(path = %file.file_path, "Discarded POD file"),
            Err(e) => warn!(path = %file.file_path, error = %e, "Failed to discard POD file"),
        }
    }
}

fn random_tag() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect::<String>()
        .to_lowercase()
}

/// `.ext` of `name` (lowercased), or empty
fn extension(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default()
}
