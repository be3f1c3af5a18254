use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use paperbot_core::ConfigPatch;
use paperbot_service::TraceId;

use crate::error::{GeminiFailure, MarketSummaryError, NewsError, SuggestionError};
use crate::types::{GroundingSource, MarketCoin, MarketSummary, NewsArticle, NewsDigest};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

const MARKET_PROMPT: &str = "Give a current snapshot of the top 5 cryptocurrencies by market cap. \
    Respond with a JSON array only, each element an object with keys \"name\", \"symbol\", \
    \"price\" (USD number) and \"change24h\" (signed percent number).";

const NEWS_PROMPT: &str = "List the 5 most significant cryptocurrency news stories right now. \
    Respond with a JSON array only, each element an object with keys \"title\", \"summary\", \
    \"source\" and \"url\".";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AdvisorSettings {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for AdvisorSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Clone)]
pub struct GeminiClient {
    base_url: String,
    model: String,
    api_key: String,
    http_client: Arc<reqwest::Client>,
}

impl GeminiClient {
    pub fn new(settings: &AdvisorSettings) -> Result<Self> {
        let api_key = settings
            .api_key
            .clone()
            .ok_or_else(|| anyhow!("advisor api key not configured"))?;
        let http_client = reqwest::Client::builder()
            .user_agent("paperbot-advisor/0.1")
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            api_key,
            http_client: Arc::new(http_client),
        })
    }

    /// Asks the model for a bot configuration matching a free-form request.
    /// The response is constrained to JSON by a response schema, so it
    /// deserializes straight into a `ConfigPatch`.
    pub async fn suggest_strategy(&self, request: &str) -> Result<ConfigPatch, SuggestionError> {
        let trace_id = TraceId::new();
        debug!(%trace_id, "requesting strategy suggestion");

        let body = json!({
            "contents": [{ "parts": [{ "text": suggestion_prompt(request) }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": suggestion_schema()
            }
        });

        let response = self.generate_content(&body).await?;
        let text = first_text(&response).ok_or(GeminiFailure::EmptyResponse)?;
        let patch: ConfigPatch =
            serde_json::from_str(text.trim()).map_err(GeminiFailure::from)?;

        info!(%trace_id, strategy = ?patch.strategy, "strategy suggestion received");
        Ok(patch)
    }

    /// Search-grounded market snapshot. The payload arrives as model text,
    /// so the JSON array is carved out of it before parsing.
    pub async fn market_summary(&self) -> Result<MarketSummary, MarketSummaryError> {
        let trace_id = TraceId::new();
        debug!(%trace_id, "requesting market summary");

        let body = json!({
            "contents": [{ "parts": [{ "text": MARKET_PROMPT }] }],
            "tools": [{ "googleSearch": {} }]
        });

        let response = self.generate_content(&body).await?;
        let text = first_text(&response).ok_or(GeminiFailure::EmptyResponse)?;
        let payload = extract_json_payload(&text).ok_or(GeminiFailure::MissingPayload)?;
        let coins: Vec<MarketCoin> = serde_json::from_str(payload).map_err(GeminiFailure::from)?;
        let sources = grounding_sources(&response);

        info!(%trace_id, coins = coins.len(), sources = sources.len(), "market summary received");
        Ok(MarketSummary { coins, sources })
    }

    pub async fn crypto_news(&self) -> Result<NewsDigest, NewsError> {
        let trace_id = TraceId::new();
        debug!(%trace_id, "requesting news digest");

        let body = json!({
            "contents": [{ "parts": [{ "text": NEWS_PROMPT }] }],
            "tools": [{ "googleSearch": {} }]
        });

        let response = self.generate_content(&body).await?;
        let text = first_text(&response).ok_or(GeminiFailure::EmptyResponse)?;
        let payload = extract_json_payload(&text).ok_or(GeminiFailure::MissingPayload)?;
        let articles: Vec<NewsArticle> =
            serde_json::from_str(payload).map_err(GeminiFailure::from)?;
        let sources = grounding_sources(&response);

        info!(%trace_id, articles = articles.len(), "news digest received");
        Ok(NewsDigest { articles, sources })
    }

    async fn generate_content(
        &self,
        body: &serde_json::Value,
    ) -> Result<GenerateContentResponse, GeminiFailure> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let resp = self
            .http_client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GeminiFailure::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp.json().await?)
    }
}

fn suggestion_prompt(request: &str) -> String {
    format!(
        "You are an expert crypto trading advisor. Recommend a bot configuration \
         for the following request: \"{request}\""
    )
}

fn suggestion_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "strategy": { "type": "STRING", "enum": ["Grid", "DCA", "RSI"] },
            "tradingPair": { "type": "STRING" },
            "investment": { "type": "NUMBER" },
            "gridLevels": { "type": "INTEGER" },
            "gridStep": { "type": "NUMBER" },
            "takeProfit": { "type": "NUMBER" },
            "stopLoss": { "type": "NUMBER" }
        },
        "required": ["strategy", "tradingPair", "investment"]
    })
}

fn first_text(response: &GenerateContentResponse) -> Option<String> {
    let content = response.candidates.first()?.content.as_ref()?;
    let text = content
        .parts
        .iter()
        .filter_map(|part| part.text.as_deref())
        .collect::<Vec<_>>()
        .join("");
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Grounded answers wrap the payload in a ```json fence or inline a bare
/// bracketed array amid prose.
fn extract_json_payload(text: &str) -> Option<&str> {
    if let Some(start) = text.find("```json") {
        let rest = &text[start + "```json".len()..];
        let rest = rest.strip_prefix('\n').unwrap_or(rest);
        if let Some(end) = rest.find("```") {
            return Some(rest[..end].trim());
        }
    }

    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end > start {
        Some(text[start..=end].trim())
    } else {
        None
    }
}

fn grounding_sources(response: &GenerateContentResponse) -> Vec<GroundingSource> {
    let mut sources = Vec::new();
    let metadata = response
        .candidates
        .first()
        .and_then(|c| c.grounding_metadata.as_ref());
    if let Some(metadata) = metadata {
        for chunk in &metadata.grounding_chunks {
            if let Some(web) = &chunk.web {
                if let (Some(uri), Some(title)) = (&web.uri, &web.title) {
                    sources.push(GroundingSource {
                        uri: uri.clone(),
                        title: title.clone(),
                    });
                }
            }
        }
    }
    sources
}

#[derive(Clone, Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct GroundingChunk {
    #[serde(default)]
    web: Option<WebSource>,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct WebSource {
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_fenced_json_payload() {
        let text = "Here is the data:\n```json\n[{\"title\":\"t\"}]\n```\nEnjoy.";
        assert_eq!(extract_json_payload(text), Some("[{\"title\":\"t\"}]"));
    }

    #[test]
    fn extracts_bare_bracketed_payload() {
        let text = "Top coins: [1, 2, 3] as of today.";
        assert_eq!(extract_json_payload(text), Some("[1, 2, 3]"));
    }

    #[test]
    fn unterminated_fence_falls_back_to_brackets() {
        let text = "```json\n[\"a\"] and that is all";
        assert_eq!(extract_json_payload(text), Some("[\"a\"]"));
    }

    #[test]
    fn missing_payload_yields_none() {
        assert_eq!(extract_json_payload("no structured data here"), None);
        assert_eq!(extract_json_payload("mismatched ] then ["), None);
    }

    #[test]
    fn reads_text_and_sources_from_envelope() {
        let raw = r#"{
            "candidates": [{
                "content": { "parts": [{ "text": "hello " }, { "text": "world" }] },
                "groundingMetadata": {
                    "groundingChunks": [
                        { "web": { "uri": "https://a", "title": "A" } },
                        { "web": { "uri": "https://b" } },
                        {}
                    ]
                }
            }]
        }"#;
        let response: GenerateContentResponse = serde_json::from_str(raw).unwrap();

        assert_eq!(first_text(&response).as_deref(), Some("hello world"));

        let sources = grounding_sources(&response);
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].uri, "https://a");
        assert_eq!(sources[0].title, "A");
    }

    #[test]
    fn empty_candidates_have_no_text() {
        let response = GenerateContentResponse::default();
        assert!(first_text(&response).is_none());
        assert!(grounding_sources(&response).is_empty());
    }

    #[test]
    fn market_payload_parses_into_coins() {
        let payload = r#"[
            {"name":"Bitcoin","symbol":"BTC","price":64000.0,"change24h":2.1},
            {"name":"Ethereum","symbol":"ETH","price":3300.5,"change24h":-0.4}
        ]"#;
        let coins: Vec<MarketCoin> = serde_json::from_str(payload).unwrap();
        assert_eq!(coins.len(), 2);
        assert_eq!(coins[1].symbol, "ETH");
    }

    #[test]
    fn client_requires_an_api_key() {
        let settings = AdvisorSettings::default();
        assert!(GeminiClient::new(&settings).is_err());

        let settings = AdvisorSettings {
            api_key: Some("k".to_string()),
            ..Default::default()
        };
        let client = GeminiClient::new(&settings).unwrap();
        assert_eq!(client.model, DEFAULT_MODEL);
        assert_eq!(client.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn schema_requires_the_core_fields() {
        let schema = suggestion_schema();
        let required = schema["required"].as_array().unwrap();
        assert!(required.iter().any(|v| v == "strategy"));
        assert!(required.iter().any(|v| v == "investment"));
        assert!(schema["properties"]["strategy"]["enum"]
            .as_array()
            .unwrap()
            .iter()
            .any(|v| v == "DCA"));
    }
}
