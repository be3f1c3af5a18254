use thiserror::Error;

/// Shared cause chain for every Gemini call. A failure is terminal for that
/// request; callers surface it instead of retrying.
#[derive(Debug, Error)]
pub enum GeminiFailure {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("api returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("model returned no text")]
    EmptyResponse,

    #[error("no json payload in model text")]
    MissingPayload,

    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
#[error("strategy suggestion failed: {0}")]
pub struct SuggestionError(#[from] pub GeminiFailure);

#[derive(Debug, Error)]
#[error("market summary fetch failed: {0}")]
pub struct MarketSummaryError(#[from] pub GeminiFailure);

#[derive(Debug, Error)]
#[error("news fetch failed: {0}")]
pub struct NewsError(#[from] pub GeminiFailure);
