//! 医生操作记录
//!
//! 只追加审计事件，不读取也不修改对应的报告记录。

use radassist_core::{AssistError, AuditEvent, ClinicianAction, Result};
use radassist_storage::AuditLog;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

/// 医生操作请求，字段均可缺省，由记录器校验
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicianActionRequest {
    pub report_id: Option<String>,
    pub clinician_id: Option<String>,
    pub action: Option<String>,
    pub notes: Option<String>,
}

/// 取出非空字段
fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl ClinicianActionRequest {
    /// 校验必填字段
    pub fn validate(self) -> Result<ClinicianAction> {
        match (
            required(self.report_id),
            required(self.clinician_id),
            required(self.action),
        ) {
            (Some(report_id), Some(clinician_id), Some(action)) => Ok(ClinicianAction {
                report_id,
                clinician_id,
                action,
                notes: self.notes,
            }),
            _ => Err(AssistError::Validation("Missing fields".to_string())),
        }
    }
}

/// 医生操作记录器
pub struct ClinicianActionLogger {
    audit: Arc<AuditLog>,
}

impl ClinicianActionLogger {
    pub fn new(audit: Arc<AuditLog>) -> Self {
        Self { audit }
    }

    /// 校验并记录一次医生操作
    pub async fn record(&self, request: ClinicianActionRequest) -> Result<ClinicianAction> {
        let action = match request.validate() {
            Ok(action) => action,
            Err(e) => {
                warn!("Rejected clinician action: {}", e);
                return Err(e);
            }
        };

        self.audit
            .append(AuditEvent::ClinicianAction {
                report_id: action.report_id.clone(),
                clinician_id: action.clinician_id.clone(),
                action: action.action.clone(),
                notes: action.notes.clone(),
            })
            .await?;

        info!(
            "Clinician {} recorded '{}' on report {}",
            action.clinician_id, action.action, action.report_id
        );
        Ok(action)
    }
}
