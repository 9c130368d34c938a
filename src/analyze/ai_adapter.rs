//! Summarization adapter: provider abstraction over Gemini / OpenAI plus mock and
//! disabled clients. Every provider call is a single attempt; failures are returned
//! to the caller, which decides how to record them.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::{AiConfig, HttpConfig};
use crate::error::{Error, Result};
use crate::ingest::{build_http_client, map_http_error};

const SOURCE: &str = "gemini";
const MAX_SUMMARY_CHARS: usize = 600;

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

/// Which summary the model is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryKind {
    Sentiment,
    Trend,
}

impl SummaryKind {
    pub fn prompt(self, snippets: &str) -> String {
        match self {
            SummaryKind::Sentiment => format!(
                "Analyze the following brand-related text snippets and provide a concise \
                 1 or 2 sentence summary of the overall public sentiment. Be direct and \
                 avoid exaggeration. Base your answer strictly on the text provided.\n\
                 Text:\n\n{snippets}"
            ),
            SummaryKind::Trend => format!(
                "Summarize the major news or emerging trends about this brand in 1 or 2 \
                 sentences based strictly on the text below. Keep the tone neutral and \
                 avoid adding assumptions.\n\nText:\n{snippets}"
            ),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SummaryKind::Sentiment => "sentiment",
            SummaryKind::Trend => "trend",
        }
    }
}

/// Trait object used by the aggregator (and faked in tests).
pub trait Summarizer: Send + Sync {
    /// Ask the model for a short summary of `text`.
    fn summarize<'a>(
        &'a self,
        kind: SummaryKind,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynSummarizer = Arc<dyn Summarizer>;

/// Factory: build a client according to config and environment variables.
///
/// * If `AI_TEST_MODE=mock`, returns a deterministic mock client.
/// * "disabled" returns a client that always reports a configuration error.
/// * Unknown providers are rejected at startup.
pub fn build_summarizer(config: &AiConfig, http: &HttpConfig) -> Result<DynSummarizer> {
    if std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Ok(Arc::new(MockProvider::default()));
    }

    match config.provider_normalized().as_str() {
        "gemini" => Ok(Arc::new(GeminiProvider::new(config.clone(), http)?)),
        "openai" => Ok(Arc::new(OpenAiProvider::new(config.clone(), http)?)),
        "mock" => Ok(Arc::new(MockProvider::default())),
        "disabled" | "" => Ok(Arc::new(DisabledClient)),
        other => Err(Error::Configuration(format!("unsupported ai.provider: {other}"))),
    }
}

// ------------------------------------------------------------
// Concrete providers
// ------------------------------------------------------------

/// Google Gemini via the `generateContent` REST endpoint. Requires `GEMINI_API_KEY`.
pub struct GeminiProvider {
    http: reqwest::Client,
    cfg: AiConfig,
    model: String,
    base_url: String,
    timeout_secs: u64,
}

impl GeminiProvider {
    pub const DEFAULT_MODEL: &'static str = "gemini-2.5-flash";
    pub const BASE_URL: &'static str = "https://generativelanguage.googleapis.com/v1beta";

    pub fn new(cfg: AiConfig, http: &HttpConfig) -> Result<Self> {
        let model = cfg
            .model
            .clone()
            .unwrap_or_else(|| Self::DEFAULT_MODEL.to_string());
        Ok(Self {
            http: build_http_client(http)?,
            cfg,
            model,
            base_url: Self::BASE_URL.to_string(),
            timeout_secs: http.timeout_secs,
        })
    }

    /// Point at a different endpoint (local proxy, test server).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    async fn call(&self, prompt: String) -> Result<String> {
        let api_key = self.cfg.resolve_api_key()?;

        #[derive(Serialize)]
        struct Part<'a> {
            text: &'a str,
        }
        #[derive(Serialize)]
        struct Content<'a> {
            parts: Vec<Part<'a>>,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            contents: Vec<Content<'a>>,
        }
        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            candidates: Vec<Candidate>,
        }
        #[derive(Deserialize)]
        struct Candidate {
            content: Option<CandidateContent>,
        }
        #[derive(Deserialize)]
        struct CandidateContent {
            #[serde(default)]
            parts: Vec<RespPart>,
        }
        #[derive(Deserialize)]
        struct RespPart {
            text: Option<String>,
        }

        tracing::info!(
            target: "analyze",
            model = %self.model,
            prompt_chars = prompt.len(),
            "calling gemini"
        );

        let req = Req {
            contents: vec![Content {
                parts: vec![Part { text: &prompt }],
            }],
        };
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let resp = self
            .http
            .post(url)
            .header("x-goog-api-key", api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| map_http_error(SOURCE, self.timeout_secs, e))?;
        let resp = resp
            .error_for_status()
            .map_err(|e| Error::fetch(SOURCE, e))?;
        let body: Resp = resp
            .json()
            .await
            .map_err(|e| Error::fetch(SOURCE, format!("parse: {e}")))?;

        let text = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default();
        non_empty(clean_summary(&text))
    }
}

impl Summarizer for GeminiProvider {
    fn summarize<'a>(
        &'a self,
        kind: SummaryKind,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(self.call(kind.prompt(text)))
    }
    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}

/// OpenAI provider (Chat Completions API). Requires `OPENAI_API_KEY`.
pub struct OpenAiProvider {
    http: reqwest::Client,
    cfg: AiConfig,
    model: String,
    timeout_secs: u64,
}

impl OpenAiProvider {
    pub fn new(cfg: AiConfig, http: &HttpConfig) -> Result<Self> {
        let model = cfg.model.clone().unwrap_or_else(|| "gpt-4o-mini".to_string());
        Ok(Self {
            http: build_http_client(http)?,
            cfg,
            model,
            timeout_secs: http.timeout_secs,
        })
    }

    async fn call(&self, prompt: String) -> Result<String> {
        let api_key = self.cfg.resolve_api_key()?;

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let req = Req {
            model: &self.model,
            messages: vec![Msg {
                role: "user",
                content: &prompt,
            }],
            temperature: 0.2,
            max_tokens: 160,
        };

        let resp = self
            .http
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| map_http_error(SOURCE, self.timeout_secs, e))?;
        let resp = resp
            .error_for_status()
            .map_err(|e| Error::fetch(SOURCE, e))?;
        let body: Resp = resp
            .json()
            .await
            .map_err(|e| Error::fetch(SOURCE, format!("parse: {e}")))?;
        let content = body
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or("");
        non_empty(clean_summary(content))
    }
}

impl Summarizer for OpenAiProvider {
    fn summarize<'a>(
        &'a self,
        kind: SummaryKind,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(self.call(kind.prompt(text)))
    }
    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

/// Always fails with a configuration error; used when summarization is switched off.
pub struct DisabledClient;

impl Summarizer for DisabledClient {
    fn summarize<'a>(
        &'a self,
        _kind: SummaryKind,
        _text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async {
            Err(Error::Configuration(
                "summarization provider is disabled".to_string(),
            ))
        })
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Deterministic provider for tests/local runs.
#[derive(Clone)]
pub struct MockProvider {
    pub sentiment: String,
    pub trend: String,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            sentiment: "Neutral sentiment (mock).".to_string(),
            trend: "No notable trend (mock).".to_string(),
        }
    }
}

impl Summarizer for MockProvider {
    fn summarize<'a>(
        &'a self,
        kind: SummaryKind,
        _text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        let out = match kind {
            SummaryKind::Sentiment => self.sentiment.clone(),
            SummaryKind::Trend => self.trend.clone(),
        };
        Box::pin(async move { Ok(out) })
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

// ------------------------------------------------------------
// Sanitization
// ------------------------------------------------------------

/// Single line, collapsed whitespace, capped length.
pub fn clean_summary(input: &str) -> String {
    let joined = input.split_whitespace().collect::<Vec<_>>().join(" ");
    if joined.chars().count() > MAX_SUMMARY_CHARS {
        joined.chars().take(MAX_SUMMARY_CHARS).collect()
    } else {
        joined
    }
}

fn non_empty(s: String) -> Result<String> {
    if s.is_empty() {
        Err(Error::fetch(SOURCE, "model returned an empty summary"))
    } else {
        Ok(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_summary_flattens_lines() {
        assert_eq!(
            clean_summary("  Mostly positive.\n\nSome shipping   complaints. "),
            "Mostly positive. Some shipping complaints."
        );
        assert_eq!(clean_summary(&"x ".repeat(1000)).chars().count(), MAX_SUMMARY_CHARS);
    }

    #[test]
    fn prompts_embed_the_snippets() {
        let p = SummaryKind::Sentiment.prompt("Post 1:\nTitle: t\nText: b");
        assert!(p.contains("public sentiment"));
        assert!(p.ends_with("Post 1:\nTitle: t\nText: b"));
        let t = SummaryKind::Trend.prompt("blob");
        assert!(t.contains("emerging trends"));
        assert!(t.ends_with("blob"));
    }

    #[tokio::test]
    async fn disabled_client_reports_configuration_error() {
        let err = DisabledClient
            .summarize(SummaryKind::Trend, "x")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn gemini_without_key_fails_before_any_request() {
        std::env::remove_var("GEMINI_API_KEY");
        let p = GeminiProvider::new(AiConfig::default(), &HttpConfig::default())
            .unwrap()
            .with_base_url("http://127.0.0.1:9");
        let err = p.summarize(SummaryKind::Sentiment, "x").await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)), "got {err:?}");
    }

    #[serial_test::serial]
    #[test]
    fn factory_rejects_unknown_provider() {
        std::env::remove_var("AI_TEST_MODE");
        let cfg = AiConfig {
            provider: "claude".into(),
            ..AiConfig::default()
        };
        assert!(build_summarizer(&cfg, &HttpConfig::default()).is_err());

        let cfg = AiConfig {
            provider: "Mock".into(),
            ..AiConfig::default()
        };
        let s = build_summarizer(&cfg, &HttpConfig::default()).unwrap();
        assert_eq!(s.provider_name(), "mock");
    }
}
