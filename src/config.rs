use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://api.siliconflow.cn/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "deepseek-ai/DeepSeek-V3.1-Terminus";
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// Settings for the reasoning backend, injected where a request is made.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisConfig {
    pub endpoint: String,
    pub model: String,
    pub timeout_ms: u64,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl AnalysisConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        self.api_key = (!api_key.trim().is_empty()).then_some(api_key);
        self
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            model: DEFAULT_MODEL.to_owned(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            api_key: None,
            temperature: 0.7,
            max_tokens: 2048,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_api_key_counts_as_missing() {
        let config = AnalysisConfig::default().with_api_key("   ");
        assert_eq!(config.api_key, None);

        let config = AnalysisConfig::default().with_api_key("sk-test");
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.timeout(), Duration::from_secs(60));
    }
}
