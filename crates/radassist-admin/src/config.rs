//! 配置管理
//!
//! 配置来源按优先级从低到高：内置默认值、配置文件、
//! `RADASSIST_` 前缀的环境变量、命令行参数。
//! 例如 `RADASSIST_PROVIDER__API_KEY`、`RADASSIST_SERVER__PORT`。

use ::config::{Config, Environment, File};
use radassist_core::{AssistError, Result};
use radassist_integration::ProviderConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

/// 环境变量前缀
pub const ENV_PREFIX: &str = "RADASSIST";

/// 系统完整配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 服务器配置
    pub server: ServerConfig,
    /// 分析服务配置
    pub provider: ProviderConfig,
    /// 存储配置
    pub storage: StorageConfig,
    /// 日志配置
    pub logging: LoggingConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 监听主机
    pub host: String,
    /// 监听端口
    pub port: u16,
    /// 请求体大小上限（字节）
    pub max_upload_bytes: usize,
}

/// 存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// 上传影像目录
    pub uploads_dir: PathBuf,
    /// 报告记录目录
    pub reports_dir: PathBuf,
    /// 审计日志文件
    pub audit_log: PathBuf,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别或过滤表达式
    pub level: String,
}

/// 命令行覆盖项
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
}

impl AppConfig {
    /// 加载配置
    pub fn load(config_path: Option<&str>, overrides: CliOverrides) -> Result<Self> {
        Self::load_with_env(config_path, overrides, None)
    }

    /// 加载配置，可指定环境变量来源（测试用）
    pub fn load_with_env(
        config_path: Option<&str>,
        overrides: CliOverrides,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .source(env),
        );

        builder = builder
            .set_override_option("server.host", overrides.host)
            .and_then(|b| b.set_override_option("server.port", overrides.port.map(i64::from)))
            .and_then(|b| b.set_override_option("logging.level", overrides.log_level))
            .map_err(|e| AssistError::Config(e.to_string()))?;

        let config: AppConfig = builder
            .build()
            .and_then(|settings| settings.try_deserialize())
            .map_err(|e| AssistError::Config(e.to_string()))?;

        config.validate()?;

        match config_path {
            Some(path) => info!("Configuration loaded from {} and environment", path),
            None => info!("Configuration loaded from defaults and environment"),
        }
        Ok(config)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(AssistError::Config("server.port 不能为 0".to_string()));
        }
        if self.server.max_upload_bytes == 0 {
            return Err(AssistError::Config(
                "server.max_upload_bytes 必须大于 0".to_string(),
            ));
        }
        if self.provider.model.trim().is_empty() {
            return Err(AssistError::Config("provider.model 不能为空".to_string()));
        }
        if !self.provider.is_mock() && self.provider.endpoint.trim().is_empty() {
            return Err(AssistError::Config("provider.endpoint 不能为空".to_string()));
        }
        for (key, path) in [
            ("storage.uploads_dir", &self.storage.uploads_dir),
            ("storage.reports_dir", &self.storage.reports_dir),
            ("storage.audit_log", &self.storage.audit_log),
        ] {
            if path.as_os_str().is_empty() {
                return Err(AssistError::Config(format!("{} 不能为空", key)));
            }
        }
        Ok(())
    }

    /// 监听地址
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| AssistError::Config(format!("无效的监听地址: {}", e)))
    }

    /// 创建存储目录
    pub async fn prepare_storage(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.storage.uploads_dir).await?;
        tokio::fs::create_dir_all(&self.storage.reports_dir).await?;
        if let Some(parent) = self.storage.audit_log.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            uploads_dir: PathBuf::from("./data/uploads"),
            reports_dir: PathBuf::from("./data/reports"),
            audit_log: PathBuf::from("./data/audit.log"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
