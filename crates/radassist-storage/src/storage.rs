//! 上传影像存储

use radassist_core::utils::stored_upload_name;
use radassist_core::{Result, UploadedImage};
use std::path::{Path, PathBuf};
use tracing::debug;

/// 上传影像存储管理器
#[derive(Debug, Clone)]
pub struct UploadStore {
    base_path: PathBuf,
}

impl UploadStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// 存储上传的影像文件
    pub async fn store(
        &self,
        original_name: &str,
        content_type: Option<String>,
        data: &[u8],
    ) -> Result<UploadedImage> {
        tokio::fs::create_dir_all(&self.base_path).await?;

        let stored_name = stored_upload_name(original_name);
        let full_path = self.base_path.join(&stored_name);
        tokio::fs::write(&full_path, data).await?;

        debug!("Stored upload {} ({} bytes)", full_path.display(), data.len());

        Ok(UploadedImage {
            path: full_path,
            stored_name,
            original_name: original_name.to_string(),
            content_type,
            size: data.len() as u64,
        })
    }
}
