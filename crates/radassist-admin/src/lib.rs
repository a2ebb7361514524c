//! # RadAssist管理模块
//!
//! 提供配置加载与日志初始化等运维功能

pub mod config;
pub mod logging;

pub use crate::config::{AppConfig, CliOverrides, LoggingConfig, ServerConfig, StorageConfig};
pub use logging::init_logging;
