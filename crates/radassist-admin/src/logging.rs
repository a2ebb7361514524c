//! 日志初始化

use radassist_core::{AssistError, Result};
use tracing_subscriber::EnvFilter;

/// 构造日志过滤器，`RUST_LOG` 优先于配置的级别
pub fn build_filter(level: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level)
        .map_err(|e| AssistError::Config(format!("无效的日志级别 {}: {}", level, e)))
}

/// 初始化全局日志订阅器
pub fn init_logging(level: &str) -> Result<()> {
    let filter = build_filter(level)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| AssistError::Internal(format!("日志初始化失败: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter() {
        assert!(build_filter("info").is_ok());
        assert!(build_filter("radassist_web=debug,tower_http=info").is_ok());
    }
}
