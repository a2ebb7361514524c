//! 紧急情况筛查
//!
//! 对备注做大小写无关的子串匹配。不做否定或上下文判断，
//! 误报和漏报都在预期之内。

use tracing::warn;

/// 紧急关键词
pub const EMERGENCY_PHRASES: [&str; 6] = [
    "chest pain",
    "shortness of breath",
    "sudden weakness",
    "slurred speech",
    "severe bleeding",
    "unconscious",
];

/// 命中关键词时返回给调用方的提示
pub const EMERGENCY_MESSAGE: &str = "Possible medical emergency detected in the notes. \
Call your local emergency number or go to the nearest emergency department now. \
AI analysis was not performed.";

/// 紧急情况筛查器
#[derive(Debug, Clone)]
pub struct EmergencyScreener {
    phrases: Vec<String>,
}

impl EmergencyScreener {
    pub fn new() -> Self {
        Self::with_phrases(EMERGENCY_PHRASES.iter().copied())
    }

    /// 使用自定义关键词
    pub fn with_phrases<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            phrases: phrases
                .into_iter()
                .map(|p| p.as_ref().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// 返回第一个命中的关键词
    pub fn screen(&self, notes: Option<&str>) -> Option<&str> {
        let text = notes.unwrap_or("").to_lowercase();
        let matched = self
            .phrases
            .iter()
            .find(|phrase| text.contains(phrase.as_str()))
            .map(String::as_str);

        if let Some(phrase) = matched {
            warn!("Emergency phrase matched in notes: {}", phrase);
        }
        matched
    }

    pub fn is_emergency(&self, notes: Option<&str>) -> bool {
        self.screen(notes).is_some()
    }
}

impl Default for EmergencyScreener {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_phrase_matches_in_any_case() {
        let screener = EmergencyScreener::new();
        for phrase in EMERGENCY_PHRASES {
            let upper = format!("Patient reports {} today", phrase.to_uppercase());
            assert_eq!(screener.screen(Some(upper.as_str())), Some(phrase));
            assert!(screener.is_emergency(Some(phrase)));
        }
    }

    #[test]
    fn test_no_match() {
        let screener = EmergencyScreener::new();
        assert_eq!(screener.screen(None), None);
        assert_eq!(screener.screen(Some("")), None);
        assert_eq!(screener.screen(Some("mild knee pain after running")), None);
        assert_eq!(screener.screen(Some("chest  pain")), None);
    }

    #[test]
    fn test_no_negation_handling() {
        // 纯子串匹配，否定语句同样命中
        let screener = EmergencyScreener::new();
        assert!(screener.is_emergency(Some("Denies chest pain.")));
        assert!(screener.is_emergency(Some("was UNCONSCIOUSLY tapping")));
    }

    #[test]
    fn test_custom_phrases() {
        let screener = EmergencyScreener::with_phrases(["Stroke", ""]);
        assert_eq!(screener.screen(Some("possible stroke")), Some("stroke"));
        assert!(!screener.is_emergency(Some("chest pain")));
    }
}
