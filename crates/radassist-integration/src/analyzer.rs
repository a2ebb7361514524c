//! 影像分析接口

use async_trait::async_trait;
use radassist_core::{AnalysisResult, PatientMetadata, Result, UploadedImage, MOCK_MODEL};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::remote::RemoteAnalyzer;

/// 默认的chat-completions接口地址
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// 默认模型
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// 分析服务配置
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// 服务凭据，为空时使用模拟分析
    pub api_key: String,
    /// 模型标识
    pub model: String,
    /// 接口地址
    pub endpoint: String,
}

impl ProviderConfig {
    pub fn is_mock(&self) -> bool {
        self.api_key.trim().is_empty()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

// 凭据不进日志
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &if self.is_mock() { "<empty>" } else { "<redacted>" })
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// 影像分析能力接口
#[async_trait]
pub trait ImageAnalyzer: Send + Sync {
    /// 使用的模型标识
    fn model_name(&self) -> &str;

    /// 分析一张影像
    async fn analyze(
        &self,
        image: &UploadedImage,
        patient: &PatientMetadata,
    ) -> Result<AnalysisResult>;
}

/// 模拟分析器，无IO，结果固定
#[derive(Debug, Default, Clone)]
pub struct MockAnalyzer;

impl MockAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ImageAnalyzer for MockAnalyzer {
    fn model_name(&self) -> &str {
        MOCK_MODEL
    }

    async fn analyze(
        &self,
        _image: &UploadedImage,
        _patient: &PatientMetadata,
    ) -> Result<AnalysisResult> {
        Ok(AnalysisResult::mock())
    }
}

/// 根据配置选择分析实现
pub fn build_analyzer(config: &ProviderConfig) -> Arc<dyn ImageAnalyzer> {
    if config.is_mock() {
        info!("No provider credential configured, using mock analysis");
        Arc::new(MockAnalyzer::new())
    } else {
        info!("Using remote analysis with model {}", config.model);
        Arc::new(RemoteAnalyzer::new(config.clone()))
    }
}
