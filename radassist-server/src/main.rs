//! RadAssist服务器主程序

use anyhow::Context;
use clap::Parser;
use radassist_admin::{init_logging, AppConfig, CliOverrides};
use radassist_integration::build_analyzer;
use radassist_storage::{AuditLog, ReportStore, UploadStore};
use radassist_web::{AppState, WebServer};
use std::sync::Arc;
use tracing::{error, info};

/// RadAssist服务器命令行参数
#[derive(Parser, Debug)]
#[command(name = "radassist-server")]
#[command(about = "影像初步报告助手 HTTP 服务")]
struct Args {
    /// 配置文件路径
    #[arg(short, long)]
    config: Option<String>,

    /// 监听主机
    #[arg(long)]
    host: Option<String>,

    /// 服务器端口
    #[arg(short, long)]
    port: Option<u16>,

    /// 日志级别
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = AppConfig::load(
        args.config.as_deref(),
        CliOverrides {
            host: args.host,
            port: args.port,
            log_level: args.log_level,
        },
    )
    .context("加载配置失败")?;

    // 初始化日志
    init_logging(&config.logging.level).context("初始化日志失败")?;

    info!("启动RadAssist服务器...");
    config.prepare_storage().await.context("创建存储目录失败")?;

    info!("RadAssist服务器配置:");
    info!("  监听地址: {}:{}", config.server.host, config.server.port);
    info!(
        "  分析模式: {}",
        if config.provider.is_mock() {
            "mock".to_string()
        } else {
            format!("remote ({})", config.provider.model)
        }
    );
    info!("  上传目录: {}", config.storage.uploads_dir.display());
    info!("  报告目录: {}", config.storage.reports_dir.display());
    info!("  审计日志: {}", config.storage.audit_log.display());

    let state = Arc::new(AppState::new(
        build_analyzer(&config.provider),
        UploadStore::new(&config.storage.uploads_dir),
        ReportStore::new(&config.storage.reports_dir),
        Arc::new(AuditLog::new(&config.storage.audit_log)),
    ));

    let server = WebServer::new(config.listen_addr()?, state, config.server.max_upload_bytes);

    if let Err(e) = server.run().await {
        error!("服务器运行失败: {}", e);
        return Err(e.into());
    }

    Ok(())
}
