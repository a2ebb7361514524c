//! # RadAssist集成模块
//!
//! 影像分析适配层，统一封装两种分析实现：
//! - 模拟分析：未配置服务凭据时返回固定结果
//! - 远程分析：调用兼容 chat-completions 的视觉大模型接口

pub mod analyzer;
pub mod parsing;
pub mod remote;

pub use analyzer::{build_analyzer, ImageAnalyzer, MockAnalyzer, ProviderConfig};
pub use parsing::ParsedAnalysis;
pub use remote::RemoteAnalyzer;
