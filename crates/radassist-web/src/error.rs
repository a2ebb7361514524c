//! HTTP错误映射

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use radassist_core::AssistError;
use serde_json::json;
use tracing::{error, warn};

/// 接口错误
#[derive(Debug)]
pub enum ApiError {
    /// 请求校验失败
    BadRequest(String),
    /// 请求被框架层拒绝（如请求体过大）
    Rejected(StatusCode, String),
    /// 其他未预期的错误
    Server(AssistError),
}

impl From<AssistError> for ApiError {
    fn from(err: AssistError) -> Self {
        match err {
            AssistError::Validation(msg) => ApiError::BadRequest(msg),
            other => ApiError::Server(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => {
                warn!("Bad request: {}", msg);
                (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
            }
            ApiError::Rejected(status, msg) => {
                warn!("Request rejected with {}: {}", status, msg);
                (status, Json(json!({ "error": msg }))).into_response()
            }
            ApiError::Server(err) => {
                error!("Unhandled server error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "error": "Server error",
                        "details": err.to_string()
                    })),
                )
                    .into_response()
            }
        }
    }
}
