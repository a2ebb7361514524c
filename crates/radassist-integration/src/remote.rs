//! 远程视觉模型分析
//!
//! 通过兼容 chat-completions 的接口发送影像和患者信息，
//! 不设置超时，不重试。

use async_trait::async_trait;
use base64::Engine as _;
use radassist_core::{AnalysisResult, AssistError, PatientMetadata, Result, UploadedImage};
use serde_json::{json, Value};
use tracing::{debug, error, info};

use crate::analyzer::{ImageAnalyzer, ProviderConfig};
use crate::parsing::ParsedAnalysis;

/// 系统提示词
pub const SYSTEM_PROMPT: &str = "You are a clinical decision-support assistant for radiology. \
Given a medical image and patient metadata, produce: (1) key imaging findings, \
(2) a list of differential diagnoses, (3) an urgency classification \
(emergent, urgent or routine), (4) a structured draft report for a radiologist \
to review, and (5) a confidence score between 0 and 1. \
If you are uncertain, say so explicitly and recommend confirmation by a radiologist. \
Reply with a single JSON object with the keys \
\"findings\", \"differentials\", \"urgency\", \"report\" and \"confidence\".";

/// 远程分析器
pub struct RemoteAnalyzer {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl RemoteAnalyzer {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// 构造请求体
    pub fn build_request(
        &self,
        image_bytes: &[u8],
        mime: &str,
        patient: &PatientMetadata,
    ) -> Result<Value> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(image_bytes);
        let metadata = serde_json::to_string(patient)?;

        Ok(json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": format!("Patient metadata: {}", metadata) },
                        {
                            "type": "image_url",
                            "image_url": { "url": format!("data:{};base64,{}", mime, encoded) }
                        }
                    ]
                }
            ]
        }))
    }

    fn mime_for(image: &UploadedImage) -> String {
        image
            .content_type
            .clone()
            .filter(|ct| ct.starts_with("image/"))
            .unwrap_or_else(|| {
                mime_guess::from_path(&image.original_name)
                    .first_or_octet_stream()
                    .to_string()
            })
    }
}

#[async_trait]
impl ImageAnalyzer for RemoteAnalyzer {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn analyze(
        &self,
        image: &UploadedImage,
        patient: &PatientMetadata,
    ) -> Result<AnalysisResult> {
        let bytes = tokio::fs::read(&image.path).await?;
        let body = self.build_request(&bytes, &Self::mime_for(image), patient)?;

        info!(
            "Sending {} ({} bytes) to {} with model {}",
            image.stored_name,
            bytes.len(),
            self.config.endpoint,
            self.config.model
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AssistError::Provider(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AssistError::Provider(e.to_string()))?;

        if !status.is_success() {
            error!("Provider returned status {}", status);
            return Err(AssistError::RemoteAnalysis {
                status: status.as_u16(),
                body: text,
            });
        }

        let raw: Option<Value> = serde_json::from_str(&text).ok();
        let content = raw
            .as_ref()
            .and_then(message_content)
            .unwrap_or_else(|| text.clone());

        let parsed = ParsedAnalysis::parse(&content, &self.config.model);
        debug!("Provider reply structured: {}", parsed.is_structured());

        Ok(parsed.into_result(&self.config.model, raw))
    }
}

/// 取出第一条回复的文本内容，兼容字符串和分段数组两种格式
fn message_content(response: &Value) -> Option<String> {
    let content = response.pointer("/choices/0/message/content")?;
    match content {
        Value::String(s) => Some(s.clone()),
        Value::Array(parts) => {
            let text: Vec<&str> = parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect();
            if text.is_empty() {
                None
            } else {
                Some(text.join("\n"))
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use radassist_core::DEGRADED_FINDING;
    use std::net::SocketAddr;
    use std::path::Path;

    /// 启动一个本地的假模型服务
    async fn spawn_provider(router: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    async fn write_image(dir: &Path) -> UploadedImage {
        let path = dir.join("1-abc123-knee.png");
        tokio::fs::write(&path, b"fake png bytes").await.unwrap();
        UploadedImage {
            path,
            stored_name: "1-abc123-knee.png".to_string(),
            original_name: "knee.png".to_string(),
            content_type: None,
            size: 14,
        }
    }

    fn analyzer_for(addr: SocketAddr) -> RemoteAnalyzer {
        RemoteAnalyzer::new(ProviderConfig {
            api_key: "sk-test".to_string(),
            model: "vision-test".to_string(),
            endpoint: format!("http://{}/v1/chat/completions", addr),
        })
    }

    #[test]
    fn test_build_request() {
        let analyzer = RemoteAnalyzer::new(ProviderConfig {
            api_key: "sk-test".to_string(),
            ..Default::default()
        });
        let patient = PatientMetadata {
            patient_name: Some("Ann".to_string()),
            ..Default::default()
        };
        let body = analyzer.build_request(b"abc", "image/png", &patient).unwrap();

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert!(body["messages"][0]["content"]
            .as_str()
            .unwrap()
            .contains("radiologist"));
        assert_eq!(
            body["messages"][1]["content"][1]["image_url"]["url"],
            "data:image/png;base64,YWJj"
        );
        assert!(body["messages"][1]["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("\"patientName\":\"Ann\""));
    }

    #[tokio::test]
    async fn test_structured_reply() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|headers: axum::http::HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(headers["authorization"], "Bearer sk-test");
                assert_eq!(body["model"], "vision-test");
                Json(json!({
                    "choices": [{
                        "message": {
                            "role": "assistant",
                            "content": "{\"findings\":[\"Joint effusion\"],\"differentials\":[\"Meniscal tear\"],\"urgency\":\"routine\",\"report\":\"Draft knee report\",\"confidence\":0.7}"
                        }
                    }]
                }))
            }),
        );
        let addr = spawn_provider(router).await;
        let tmp = tempfile::tempdir().unwrap();

        let result = analyzer_for(addr)
            .analyze(&write_image(tmp.path()).await, &PatientMetadata::default())
            .await
            .unwrap();

        assert_eq!(result.findings, vec!["Joint effusion"]);
        assert_eq!(result.report, "Draft knee report");
        assert_eq!(result.confidence, 0.7);
        assert_eq!(result.used_model, "vision-test");
        assert!(result.raw_model_output.is_some());
    }

    #[tokio::test]
    async fn test_unstructured_reply() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                Json(json!({
                    "choices": [{ "message": { "content": "Possible effusion; please confirm." } }]
                }))
            }),
        );
        let addr = spawn_provider(router).await;
        let tmp = tempfile::tempdir().unwrap();

        let result = analyzer_for(addr)
            .analyze(&write_image(tmp.path()).await, &PatientMetadata::default())
            .await
            .unwrap();

        assert_eq!(result.report, "Possible effusion; please confirm.");
        assert_eq!(result.confidence, 0.6);
        assert_eq!(result.used_model, "vision-test");
        assert_ne!(result.findings, vec![DEGRADED_FINDING.to_string()]);
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "quota exceeded") }),
        );
        let addr = spawn_provider(router).await;
        let tmp = tempfile::tempdir().unwrap();

        let err = analyzer_for(addr)
            .analyze(&write_image(tmp.path()).await, &PatientMetadata::default())
            .await
            .unwrap_err();

        match err {
            AssistError::RemoteAnalysis { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "quota exceeded");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_provider() {
        // 绑定后立即释放端口，保证无人监听
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let tmp = tempfile::tempdir().unwrap();

        let err = analyzer_for(addr)
            .analyze(&write_image(tmp.path()).await, &PatientMetadata::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AssistError::Provider(_)));
    }

    #[test]
    fn test_message_content_parts() {
        let response = json!({
            "choices": [{ "message": { "content": [
                { "type": "text", "text": "line one" },
                { "type": "text", "text": "line two" }
            ] } }]
        });
        assert_eq!(message_content(&response).unwrap(), "line one\nline two");
        assert!(message_content(&json!({"error": "x"})).is_none());
    }
}
