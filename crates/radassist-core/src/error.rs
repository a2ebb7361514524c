//! 错误定义模块

use thiserror::Error;

/// 系统统一错误类型
#[derive(Error, Debug)]
pub enum AssistError {
    #[error("验证错误: {0}")]
    Validation(String),

    #[error("远程分析错误: 状态 {status}: {body}")]
    RemoteAnalysis { status: u16, body: String },

    #[error("分析服务调用失败: {0}")]
    Provider(String),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("系统内部错误: {0}")]
    Internal(String),
}

impl AssistError {
    /// 是否为分析服务侧的错误（流水线内部可降级处理）
    pub fn is_analysis_failure(&self) -> bool {
        matches!(
            self,
            AssistError::RemoteAnalysis { .. } | AssistError::Provider(_)
        )
    }
}

/// 系统统一结果类型
pub type Result<T> = std::result::Result<T, AssistError>;
