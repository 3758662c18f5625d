// Local filesystem adapter - File system operations over tokio::fs

use std::io::ErrorKind;
use std::path::Path;

use async_trait::async_trait;

use crate::domain::errors::*;
use crate::ports::*;

/// Local filesystem adapter
pub struct FsLocalAdapter;

impl FsLocalAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FsLocalAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FsPort for FsLocalAdapter {
    async fn file_exists(&self, file_path: &Path) -> Result<bool, DomainError> {
        match tokio::fs::metadata(file_path).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(DomainError::FsFail(format!(
                "Failed to stat {}: {}",
                file_path.display(),
                e
            ))),
        }
    }

    async fn create_directory(&self, dir_path: &Path) -> Result<(), DomainError> {
        tokio::fs::create_dir_all(dir_path)
            .await
            .map_err(|e| DomainError::FsFail(format!("Failed to create directory: {}", e)))
    }

    async fn get_file_size(&self, file_path: &Path) -> Result<u64, DomainError> {
        let metadata = tokio::fs::metadata(file_path)
            .await
            .map_err(|e| DomainError::FsFail(format!("Failed to get file size: {}", e)))?;
        Ok(metadata.len())
    }
}
