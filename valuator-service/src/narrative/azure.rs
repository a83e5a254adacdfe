//! Azure OpenAI chat-completions narrator.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use valuator_common::util::sanitize_for_log;
use valuator_common::{Error, NarrativeConfig, Result};

use super::{NarrativeGenerator, EMPTY_COMPLETION, SYSTEM_PROMPT};

const SERVICE: &str = "azure-openai";

/// Narrative generator backed by an Azure OpenAI deployment.
pub struct AzureOpenAiNarrator {
    client: reqwest::Client,
    config: NarrativeConfig,
}

impl AzureOpenAiNarrator {
    pub fn new(config: NarrativeConfig) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { client, config }
    }

    /// Chat-completions URL for the configured deployment.
    fn completions_url(&self) -> Result<String> {
        let endpoint = self
            .config
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| Error::Config("narrative endpoint is not set".into()))?;

        Ok(format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            endpoint.trim_end_matches('/'),
            self.config.deployment,
            self.config.api_version
        ))
    }

    /// Try a single completion call.
    async fn try_generate(
        &self,
        url: &str,
        api_key: &str,
        body: &ChatRequest<'_>,
    ) -> Result<String> {
        debug!(deployment = %self.config.deployment, "Sending narrative request");

        let response = self
            .client
            .post(url)
            .header("api-key", api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout
                } else {
                    Error::external(SERVICE, None, e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::external(
                SERVICE,
                Some(status.as_u16()),
                sanitize_for_log(&text),
            ));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::external(SERVICE, None, format!("unreadable response: {e}")))?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| EMPTY_COMPLETION.to_string()))
    }
}

#[async_trait]
impl NarrativeGenerator for AzureOpenAiNarrator {
    fn name(&self) -> &str {
        SERVICE
    }

    fn is_configured(&self) -> bool {
        self.config.enabled && self.config.has_credentials()
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = self.completions_url()?;
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| Error::Config("narrative api key is not set".into()))?;

        let body = ChatRequest {
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let max_attempts = self.config.max_retries.saturating_add(1);
        let backoff = Duration::from_millis(self.config.retry_backoff_ms);

        for attempt in 1..=max_attempts {
            match self.try_generate(&url, api_key, &body).await {
                Ok(text) => {
                    info!(attempt, "Narrative request successful");
                    return Ok(text);
                }
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    warn!(
                        attempt,
                        max_attempts,
                        error = %e,
                        "Narrative request failed, retrying..."
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Narrative request failed");
                    return Err(e);
                }
            }
        }

        Err(Error::Internal("narrative retries exhausted".into()))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(endpoint: &str) -> NarrativeConfig {
        NarrativeConfig {
            endpoint: Some(endpoint.to_string()),
            api_key: Some("test-key".into()),
            deployment: "valuation-gpt".into(),
            timeout_secs: 5,
            max_retries: 1,
            retry_backoff_ms: 0,
            ..NarrativeConfig::default()
        }
    }

    #[tokio::test]
    async fn test_generate_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/deployments/valuation-gpt/chat/completions"))
            .and(query_param("api-version", "2024-02-15-preview"))
            .and(header("api-key", "test-key"))
            .and(body_partial_json(json!({
                "max_tokens": 1500,
                "temperature": 0.3
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "Solid fundamentals."}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let narrator = AzureOpenAiNarrator::new(config(&server.uri()));
        assert!(narrator.is_configured());
        let text = narrator.generate("Analyze Acme").await.unwrap();
        assert_eq!(text, "Solid fundamentals.");
    }

    #[tokio::test]
    async fn test_empty_choices_yield_placeholder() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let narrator = AzureOpenAiNarrator::new(config(&server.uri()));
        let text = narrator.generate("Analyze Acme").await.unwrap();
        assert_eq!(text, EMPTY_COMPLETION);
    }

    #[tokio::test]
    async fn test_server_error_is_retried_then_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
            .expect(2)
            .mount(&server)
            .await;

        let narrator = AzureOpenAiNarrator::new(config(&server.uri()));
        let err = narrator.generate("Analyze Acme").await.unwrap_err();
        assert!(matches!(err, Error::External { status: Some(500), .. }));
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(401).set_body_string("api-key: 0123456789abcdef invalid"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let narrator = AzureOpenAiNarrator::new(config(&server.uri()));
        let err = narrator.generate("Analyze Acme").await.unwrap_err();
        assert!(matches!(err, Error::External { status: Some(401), .. }));
        assert!(!err.to_string().contains("0123456789abcdef"));
    }

    #[tokio::test]
    async fn test_missing_endpoint_is_config_error() {
        let narrator = AzureOpenAiNarrator::new(NarrativeConfig::default());
        assert!(!narrator.is_configured());
        let err = narrator.generate("Analyze Acme").await.unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_disabled_is_not_configured() {
        let mut cfg = config("http://localhost:1");
        cfg.enabled = false;
        assert!(!AzureOpenAiNarrator::new(cfg).is_configured());
    }

    #[test]
    fn test_completions_url_trims_trailing_slash() {
        let narrator = AzureOpenAiNarrator::new(config("https://acme.openai.azure.com/"));
        assert_eq!(
            narrator.completions_url().unwrap(),
            "https://acme.openai.azure.com/openai/deployments/valuation-gpt/chat/completions?api-version=2024-02-15-preview"
        );
    }
}
