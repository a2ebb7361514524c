//! 模型输出解析
//!
//! 模型回复可能是JSON对象，也可能是纯文本。先尝试结构化解析，
//! 失败时按固定规则把原始文本包装成报告。

use radassist_core::AnalysisResult;
use serde_json::Value;

/// 结构化结果缺失置信度时的默认值
const DEFAULT_CONFIDENCE: f64 = 0.6;

/// 模型输出解析结果
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedAnalysis {
    /// 回复中包含可识别的JSON结构
    Structured(AnalysisResult),
    /// 无法识别结构，保留原始文本
    Unstructured(String),
}

impl ParsedAnalysis {
    /// 解析模型回复文本
    pub fn parse(text: &str, model: &str) -> Self {
        match extract_object(text) {
            Some(object) => Self::Structured(structured_result(&object, text, model)),
            None => Self::Unstructured(text.to_string()),
        }
    }

    /// 转换为统一的分析结果
    pub fn into_result(self, model: &str, raw_output: Option<Value>) -> AnalysisResult {
        match self {
            Self::Structured(mut result) => {
                result.raw_model_output = raw_output;
                result
            }
            Self::Unstructured(text) => AnalysisResult::unstructured(text, model, raw_output),
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Structured(_))
    }
}

/// 在文本中查找带有分析字段的JSON对象
fn extract_object(text: &str) -> Option<serde_json::Map<String, Value>> {
    let trimmed = text.trim();
    let mut candidates = vec![trimmed];

    if let Some(block) = fenced_block(trimmed) {
        candidates.push(block);
    }
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            candidates.push(&trimmed[start..=end]);
        }
    }

    candidates.into_iter().find_map(|candidate| {
        match serde_json::from_str::<Value>(candidate) {
            Ok(Value::Object(map))
                if map.contains_key("findings") || map.contains_key("report") =>
            {
                Some(map)
            }
            _ => None,
        }
    })
}

/// 取出 ``` 代码块中的内容
fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let rest = &text[start + 3..];
    // 跳过语言标记，如 ```json
    let body_start = rest.find('\n')? + 1;
    let body = &rest[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

fn structured_result(
    object: &serde_json::Map<String, Value>,
    raw_text: &str,
    model: &str,
) -> AnalysisResult {
    let report = ["report", "draftReport", "draft_report"]
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| raw_text.trim().to_string());

    let urgency = object
        .get("urgency")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unspecified".to_string());

    let confidence = object
        .get("confidence")
        .and_then(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
        .map(AnalysisResult::clamp_confidence)
        .unwrap_or(DEFAULT_CONFIDENCE);

    AnalysisResult {
        findings: string_list(object.get("findings")),
        differentials: string_list(object.get("differentials")),
        urgency,
        report,
        confidence,
        used_model: model.to_string(),
        raw_model_output: None,
    }
}

/// 字段可能是字符串数组或单个字符串
fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}
