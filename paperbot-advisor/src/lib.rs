//! Gemini-backed advisory calls: strategy suggestions, market summaries,
//! and news digests with grounding sources.

pub mod client;
pub mod error;
pub mod types;

pub use client::{AdvisorSettings, GeminiClient, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use error::{GeminiFailure, MarketSummaryError, NewsError, SuggestionError};
pub use types::{GroundingSource, MarketCoin, MarketSummary, NewsArticle, NewsDigest};
