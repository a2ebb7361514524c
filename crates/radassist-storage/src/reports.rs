//! 初步报告记录存储
//!
//! 每条记录一个文件 `<id>.json`，只创建不覆盖。

use radassist_core::utils::generate_report_id;
use radassist_core::{AssistError, ReportRecord, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// 生成ID时的最大重试次数
const MAX_ID_ATTEMPTS: usize = 8;

/// 报告记录存储
#[derive(Debug, Clone)]
pub struct ReportStore {
    base_path: PathBuf,
}

impl ReportStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// 记录文件路径
    pub fn record_path(&self, id: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", id))
    }

    /// 分配一个当前未被占用的报告ID
    pub async fn allocate_id(&self) -> Result<String> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = generate_report_id();
            if !tokio::fs::try_exists(self.record_path(&id)).await? {
                return Ok(id);
            }
            warn!("Report id collision on {}, drawing a new one", id);
        }

        Err(AssistError::Internal(
            "无法分配唯一的报告ID".to_string(),
        ))
    }

    /// 持久化报告记录，要么完整写入，要么不留文件
    pub async fn persist(&self, record: &ReportRecord) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.base_path).await?;

        let path = self.record_path(&record.id);
        let payload = serde_json::to_vec_pretty(record)?;

        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(AssistError::Internal(format!(
                    "报告记录已存在: {}",
                    record.id
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let written = async {
            file.write_all(&payload).await?;
            file.flush().await?;
            file.sync_all().await
        }
        .await;

        if let Err(e) = written {
            drop(file);
            let _ = tokio::fs::remove_file(&path).await;
            return Err(e.into());
        }

        debug!("Persisted report record {}", path.display());
        Ok(path)
    }

    /// 读取报告记录
    pub async fn load(&self, id: &str) -> Result<ReportRecord> {
        let data = tokio::fs::read(self.record_path(id)).await?;
        let record = serde_json::from_slice(&data)?;
        Ok(record)
    }
}
