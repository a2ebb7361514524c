//! 通用工具函数

use chrono::{DateTime, SecondsFormat, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;

/// 随机后缀长度
const SUFFIX_LEN: usize = 6;

fn random_suffix() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

/// 生成报告ID：毫秒时间戳 + 随机后缀
pub fn generate_report_id() -> String {
    format!("{}-{}", Utc::now().timestamp_millis(), random_suffix())
}

/// 清理客户端提供的文件名，只保留安全字符
pub fn sanitize_file_name(name: &str) -> String {
    // 只取最后一段，去掉客户端路径
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or("");
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

/// 上传文件的存储名
pub fn stored_upload_name(original: &str) -> String {
    format!(
        "{}-{}-{}",
        Utc::now().timestamp_millis(),
        random_suffix(),
        sanitize_file_name(original)
    )
}

/// 审计日志使用的ISO时间戳（毫秒精度）
pub fn audit_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}
