//! Web服务器

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use radassist_core::{AssistError, Result};
use radassist_integration::ImageAnalyzer;
use radassist_storage::{AuditLog, ReportStore, UploadStore};
use radassist_workflow::{AnalysisPipeline, ClinicianActionLogger};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::handlers::{analyze, api_root, clinician_approve, health};

/// 请求间共享的服务状态
pub struct AppState {
    pub pipeline: AnalysisPipeline,
    pub clinician: ClinicianActionLogger,
    pub uploads: UploadStore,
}

impl AppState {
    pub fn new(
        analyzer: Arc<dyn ImageAnalyzer>,
        uploads: UploadStore,
        reports: ReportStore,
        audit: Arc<AuditLog>,
    ) -> Self {
        Self {
            pipeline: AnalysisPipeline::new(analyzer, reports, audit.clone()),
            clinician: ClinicianActionLogger::new(audit),
            uploads,
        }
    }
}

/// 创建路由
pub fn create_app(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        // 根路径
        .route("/", get(api_root))
        // 健康检查
        .route("/health", get(health))
        // 影像分析
        .route("/analyze", post(analyze))
        // 医生操作记录
        .route("/clinician/approve", post(clinician_approve))
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        // 全局中间件
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
}

pub struct WebServer {
    addr: SocketAddr,
    app: Router,
}

impl WebServer {
    pub fn new(addr: SocketAddr, state: Arc<AppState>, max_upload_bytes: usize) -> Self {
        let app = create_app(state, max_upload_bytes);
        Self { addr, app }
    }

    pub async fn run(self) -> Result<()> {
        info!("Starting web server on {}", self.addr);

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        axum::serve(listener, self.app)
            .await
            .map_err(|e| AssistError::Internal(format!("Web服务器运行失败: {}", e)))?;

        Ok(())
    }
}
