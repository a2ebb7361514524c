//! 核心数据模型定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 分析失败时的占位发现
pub const DEGRADED_FINDING: &str = "AI error — see admin logs";

/// 模拟分析的模型标识
pub const MOCK_MODEL: &str = "mock";

/// 上传影像引用
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedImage {
    pub path: PathBuf,              // 磁盘上的存储路径
    pub stored_name: String,        // 存储文件名（时间戳+随机串+原始名）
    pub original_name: String,      // 客户端提交的文件名
    pub content_type: Option<String>,
    pub size: u64,
}

/// 患者元数据，全部为自由文本，不做类型或范围校验
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// 影像分析结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub findings: Vec<String>,
    pub differentials: Vec<String>,
    pub urgency: String,
    pub report: String,
    pub confidence: f64,
    pub used_model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_model_output: Option<serde_json::Value>,
}

impl AnalysisResult {
    /// 固定的模拟分析结果
    pub fn mock() -> Self {
        Self {
            findings: vec![
                "No acute cardiopulmonary abnormality identified.".to_string(),
                "Mild degenerative changes noted.".to_string(),
            ],
            differentials: vec![
                "Normal study".to_string(),
                "Early degenerative disease".to_string(),
            ],
            urgency: "routine".to_string(),
            report: "DRAFT REPORT (mock analysis)\n\
                     Findings: No acute cardiopulmonary abnormality identified. \
                     Mild degenerative changes noted.\n\
                     Impression: No acute findings. Radiologist confirmation required before release."
                .to_string(),
            confidence: 0.78,
            used_model: MOCK_MODEL.to_string(),
            raw_model_output: None,
        }
    }

    /// 无法解析出结构时，以原始文本作为报告正文
    pub fn unstructured(
        raw_text: impl Into<String>,
        model: impl Into<String>,
        raw_output: Option<serde_json::Value>,
    ) -> Self {
        Self {
            findings: vec!["See draft report text".to_string()],
            differentials: vec!["See draft report text".to_string()],
            urgency: "unspecified".to_string(),
            report: raw_text.into(),
            confidence: 0.6,
            used_model: model.into(),
            raw_model_output: raw_output,
        }
    }

    /// 分析失败时的降级结果，保证记录仍可落盘
    pub fn degraded(error: &dyn std::fmt::Display, model: impl Into<String>) -> Self {
        Self {
            findings: vec![DEGRADED_FINDING.to_string()],
            differentials: Vec::new(),
            urgency: "unknown".to_string(),
            report: format!("AI analysis failed: {}", error),
            confidence: 0.0,
            used_model: model.into(),
            raw_model_output: None,
        }
    }

    /// 置信度限定在 [0, 1]，非数值按 0 处理
    pub fn clamp_confidence(value: f64) -> f64 {
        if value.is_nan() {
            0.0
        } else {
            value.clamp(0.0, 1.0)
        }
    }
}

/// 初步报告记录，每个非紧急请求写入一次，之后不再修改
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRecord {
    pub id: String,
    pub file: String, // 上传影像的存储文件名
    pub created_at: DateTime<Utc>,
    pub patient_meta: PatientMetadata,
    pub analysis: AnalysisResult,
}

/// 审计事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    #[serde(rename_all = "camelCase")]
    LifeThreatDetected {
        patient_name: Option<String>,
        notes: Option<String>,
        file: String,
    },
    #[serde(rename_all = "camelCase")]
    DraftReady {
        report_id: String,
        file: String,
        urgency: String,
        used_model: String,
        confidence: f64,
    },
    #[serde(rename_all = "camelCase")]
    ClinicianAction {
        report_id: String,
        clinician_id: String,
        action: String,
        notes: Option<String>,
    },
}

impl AuditEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LifeThreatDetected { .. } => "life_threat_detected",
            Self::DraftReady { .. } => "draft_ready",
            Self::ClinicianAction { .. } => "clinician_action",
        }
    }
}

/// 审计日志条目，按追加顺序全序
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub event: AuditEvent,
}

/// 分析完成后返回给调用方的摘要
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub report_id: String,
    pub findings: Vec<String>,
    pub differentials: Vec<String>,
    pub urgency: String,
    pub draft_report: String,
    pub confidence: f64,
    pub next: String,
}

/// 医生操作
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicianAction {
    pub report_id: String,
    pub clinician_id: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}
