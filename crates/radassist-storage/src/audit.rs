//! 审计日志
//!
//! 追加写入的行式日志，每行格式为 `<ISO时间戳> <事件JSON>`。

use chrono::{DateTime, Utc};
use radassist_core::utils::audit_timestamp;
use radassist_core::{AssistError, AuditEntry, AuditEvent, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

/// 审计日志
#[derive(Debug)]
pub struct AuditLog {
    path: PathBuf,
    // 进程内串行化追加，保证行不交错
    write_lock: Mutex<()>,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 追加一条审计事件
    pub async fn append(&self, event: AuditEvent) -> Result<AuditEntry> {
        let entry = AuditEntry {
            timestamp: Utc::now(),
            event,
        };
        let line = format_line(&entry)?;

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        debug!("Audit event appended: {}", entry.event.kind());
        Ok(entry)
    }

    /// 读取全部审计条目（按追加顺序）
    pub async fn entries(&self) -> Result<Vec<AuditEntry>> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(parse_line)
            .collect()
    }
}

/// 格式化一行审计日志
pub fn format_line(entry: &AuditEntry) -> Result<String> {
    let body = serde_json::to_string(&entry.event)?;
    Ok(format!("{} {}\n", audit_timestamp(&entry.timestamp), body))
}

/// 解析一行审计日志
pub fn parse_line(line: &str) -> Result<AuditEntry> {
    let (ts, body) = line
        .split_once(' ')
        .ok_or_else(|| AssistError::Internal(format!("无效的审计日志行: {}", line)))?;

    let timestamp = DateTime::parse_from_rfc3339(ts)
        .map_err(|e| AssistError::Internal(format!("无效的审计时间戳 {}: {}", ts, e)))?
        .with_timezone(&Utc);
    let event = serde_json::from_str(body)?;

    Ok(AuditEntry { timestamp, event })
}
