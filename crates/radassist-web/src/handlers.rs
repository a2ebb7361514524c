//! HTTP处理器

use axum::{
    body::Bytes,
    extract::{multipart::MultipartRejection, Multipart, State},
    response::{IntoResponse, Json},
};
use radassist_workflow::{ClinicianActionRequest, PipelineOutcome};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::intake::read_form;
use crate::server::AppState;

/// API根路径处理器
pub async fn api_root() -> impl IntoResponse {
    Json(json!({
        "service": "RadAssist draft report API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": {
            "health": "/health",
            "analyze": "/analyze",
            "clinician": "/clinician/approve"
        }
    }))
}

/// 健康检查处理器
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "ok": true,
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// 影像上传分析处理器
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("analyze", %request_id);

    async move {
        let form = read_form(multipart).await?;
        let (image_part, metadata) = form.require_image()?;

        let image = state
            .uploads
            .store(
                &image_part.file_name,
                image_part.content_type.clone(),
                &image_part.bytes,
            )
            .await?;
        info!("Received image {} ({} bytes)", image.stored_name, image.size);

        let response = match state.pipeline.run(&image, metadata).await? {
            PipelineOutcome::Emergency { message, matched } => {
                warn!("Emergency short-circuit on phrase '{}'", matched);
                json!({
                    "emergency": true,
                    "message": message
                })
            }
            PipelineOutcome::Drafted(summary) => json!({
                "success": true,
                "reportId": summary.report_id,
                "findings": summary.findings,
                "differentials": summary.differentials,
                "urgency": summary.urgency,
                "draftReport": summary.draft_report,
                "confidence": summary.confidence,
                "next": summary.next,
                "sampleUploadedFilePath": image.path.display().to_string()
            }),
        };

        Ok::<_, ApiError>(Json(response))
    }
    .instrument(span)
    .await
}

/// 医生操作记录处理器
///
/// 请求体无法解析时按缺少字段处理。
pub async fn clinician_approve(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let request: ClinicianActionRequest = if body.is_empty() {
        ClinicianActionRequest::default()
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|e| {
            warn!("Unparseable clinician action body: {}", e);
            ClinicianActionRequest::default()
        })
    };

    let action = state.clinician.record(request).await?;

    Ok(Json(json!({
        "ok": true,
        "reportId": action.report_id,
        "clinicianId": action.clinician_id,
        "action": action.action
    })))
}
