/// Sentiment analysis of user messages (Azure Text Analytics v3.1)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::TextAnalyticsSettings;
use crate::error::{check_status, CollaboratorError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentScores {
    pub positive: f64,
    pub neutral: f64,
    pub negative: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    /// `positive`, `neutral`, `negative` or `mixed`
    pub sentiment: String,
    pub scores: SentimentScores,
}

#[async_trait]
pub trait SentimentAnalyzer: Send + Sync {
    /// `Ok(None)` when the analyzer has nothing to say about the text.
    async fn analyze(&self, text: &str) -> Result<Option<Sentiment>, CollaboratorError>;
}

/// Used when no analyzer is configured
#[derive(Debug, Default, Clone)]
pub struct NoSentiment;

#[async_trait]
impl SentimentAnalyzer for NoSentiment {
    async fn analyze(&self, _text: &str) -> Result<Option<Sentiment>, CollaboratorError> {
        Ok(None)
    }
}

#[derive(Debug, Deserialize)]
struct SentimentResponse {
    #[serde(default)]
    documents: Vec<DocumentSentiment>,
    #[serde(default)]
    errors: Vec<DocumentError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentSentiment {
    sentiment: String,
    confidence_scores: SentimentScores,
}

#[derive(Debug, Deserialize)]
struct DocumentError {
    #[serde(default)]
    error: serde_json::Value,
}

pub struct TextAnalyticsClient {
    client: reqwest::Client,
    settings: TextAnalyticsSettings,
    language: String,
}

impl TextAnalyticsClient {
    pub fn new(client: reqwest::Client, settings: TextAnalyticsSettings, language: impl Into<String>) -> Self {
        Self {
            client,
            settings,
            language: language.into(),
        }
    }
}

fn first_document(body: SentimentResponse) -> Result<Option<Sentiment>, CollaboratorError> {
    if let Some(failure) = body.errors.into_iter().next() {
        return Err(CollaboratorError::Remote(format!("Text Analytics: {}", failure.error)));
    }
    Ok(body.documents.into_iter().next().map(|doc| Sentiment {
        sentiment: doc.sentiment,
        scores: doc.confidence_scores,
    }))
}

#[async_trait]
impl SentimentAnalyzer for TextAnalyticsClient {
    async fn analyze(&self, text: &str) -> Result<Option<Sentiment>, CollaboratorError> {
        let url = format!("{}/text/analytics/v3.1/sentiment", self.settings.endpoint);
        // The service wants a bare language code ("pt"), not a region tag.
        let language = self.language.split('-').next().unwrap_or("pt");
        let payload = json!({
            "documents": [{ "id": "1", "language": language, "text": text }]
        });

        let response = self
            .client
            .post(url)
            .header("Ocp-Apim-Subscription-Key", &self.settings.key)
            .json(&payload)
            .send()
            .await?;

        let body: SentimentResponse = check_status("Text Analytics", response)
            .await?
            .json()
            .await
            .map_err(|e| CollaboratorError::Decode {
                service: "Text Analytics",
                message: e.to_string(),
            })?;

        first_document(body)
    }
}
