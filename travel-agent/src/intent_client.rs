/// Intent classification
/// - `CluClient`: Azure Conversational Language Understanding over REST
/// - `KeywordClassifier`: offline keyword rules, no network

use async_trait::async_trait;
use dialogue_core::{normalize, Entity, Intent, IntentPrediction};
use serde::Deserialize;
use serde_json::json;

use crate::config::CluSettings;
use crate::error::{check_status, CollaboratorError};

const CLU_API_VERSION: &str = "2022-10-01-preview";

#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, text: &str, locale: &str) -> Result<IntentPrediction, CollaboratorError>;
}

#[derive(Debug, Deserialize)]
struct CluResponse {
    result: CluResult,
}

#[derive(Debug, Deserialize)]
struct CluResult {
    prediction: CluPrediction,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CluPrediction {
    #[serde(default)]
    top_intent: Option<String>,
    #[serde(default)]
    entities: Vec<CluEntity>,
}

#[derive(Debug, Deserialize)]
struct CluEntity {
    #[serde(default)]
    category: String,
    #[serde(default)]
    text: String,
}

impl From<CluPrediction> for IntentPrediction {
    fn from(prediction: CluPrediction) -> Self {
        IntentPrediction {
            top_intent: prediction.top_intent.as_deref().and_then(Intent::from_label),
            entities: prediction
                .entities
                .into_iter()
                .filter(|e| !e.category.is_empty() && !e.text.is_empty())
                .map(|e| Entity {
                    category: e.category,
                    text: e.text,
                })
                .collect(),
        }
    }
}

pub struct CluClient {
    client: reqwest::Client,
    settings: CluSettings,
}

impl CluClient {
    pub fn new(client: reqwest::Client, settings: CluSettings) -> Self {
        Self { client, settings }
    }

    fn url(&self) -> String {
        format!(
            "{}/language/:analyze-conversations?api-version={}",
            self.settings.endpoint, CLU_API_VERSION
        )
    }
}

#[async_trait]
impl IntentClassifier for CluClient {
    async fn classify(&self, text: &str, locale: &str) -> Result<IntentPrediction, CollaboratorError> {
        let payload = json!({
            "kind": "Conversation",
            "analysisInput": {
                "conversationItem": {
                    "id": "1",
                    "participantId": "user",
                    "language": locale,
                    "text": text
                }
            },
            "parameters": {
                "projectName": self.settings.project_name,
                "deploymentName": self.settings.deployment_name,
                "stringIndexType": "TextElement_V8"
            }
        });

        tracing::debug!("→ CLU request for {} chars", text.len());
        let response = self
            .client
            .post(self.url())
            .header("Ocp-Apim-Subscription-Key", &self.settings.key)
            .json(&payload)
            .send()
            .await?;

        let body: CluResponse = check_status("CLU", response)
            .await?
            .json()
            .await
            .map_err(|e| CollaboratorError::Decode {
                service: "CLU",
                message: e.to_string(),
            })?;

        let prediction = IntentPrediction::from(body.result.prediction);
        tracing::info!(
            "✓ CLU intent: {} ({} entities)",
            prediction.top_intent.map(|i| i.label()).unwrap_or("None"),
            prediction.entities.len()
        );
        Ok(prediction)
    }
}

const CANCEL_STEMS: &[&str] = &["cancel"];
const FLIGHT_WORDS: &[&str] = &["voo", "voos", "passagem", "passagens", "aereo", "aerea", "flight", "flights"];
const HOTEL_WORDS: &[&str] = &["hotel", "hoteis", "hospedagem", "pousada", "hostel"];
const BUY_FLIGHT_WORDS: &[&str] = &["comprar", "compra", "compro", "emitir", "fechar", "buy"];
const BOOK_HOTEL_WORDS: &[&str] = &["reservar", "reserva", "reserve", "comprar", "fechar", "book"];

/// Offline classifier: cancel verbs, purchase verbs and flight/hotel nouns
/// over the normalized tokens. Never fails and never yields entities.
#[derive(Debug, Default, Clone)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn predict(&self, text: &str) -> Option<Intent> {
        let normalized = normalize(text);
        let tokens: Vec<&str> = normalized
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();
        let has = |words: &[&str]| tokens.iter().any(|t| words.contains(t));

        let cancelling = tokens
            .iter()
            .any(|t| CANCEL_STEMS.iter().any(|stem| t.starts_with(stem)));
        let hotel = has(HOTEL_WORDS);
        let flight = has(FLIGHT_WORDS);

        match (cancelling, hotel, flight) {
            (true, true, _) => Some(Intent::CancelHotel),
            (true, false, true) => Some(Intent::CancelFlight),
            (false, true, _) if has(BOOK_HOTEL_WORDS) => Some(Intent::BookHotel),
            (false, true, _) => Some(Intent::SearchHotel),
            (false, false, true) if has(BUY_FLIGHT_WORDS) => Some(Intent::BuyFlight),
            (false, false, true) => Some(Intent::SearchFlight),
            _ => None,
        }
    }
}

#[async_trait]
impl IntentClassifier for KeywordClassifier {
    async fn classify(&self, text: &str, _locale: &str) -> Result<IntentPrediction, CollaboratorError> {
        Ok(IntentPrediction::new(self.predict(text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_flight_intents() {
        let classifier = KeywordClassifier::new();
        assert_eq!(classifier.predict("quero voo para Lisboa"), Some(Intent::SearchFlight));
        assert_eq!(classifier.predict("comprar voo"), Some(Intent::BuyFlight));
        assert_eq!(classifier.predict("Quero cancelar meu voo"), Some(Intent::CancelFlight));
        assert_eq!(classifier.predict("preço da passagem aérea"), Some(Intent::SearchFlight));
    }

    #[test]
    fn test_keyword_hotel_intents() {
        let classifier = KeywordClassifier::new();
        assert_eq!(classifier.predict("reservar hotel em Paris"), Some(Intent::BookHotel));
        assert_eq!(classifier.predict("tem hotéis em Roma?"), Some(Intent::SearchHotel));
        assert_eq!(classifier.predict("cancelamento do hotel"), Some(Intent::CancelHotel));
    }

    #[test]
    fn test_keyword_no_intent() {
        let classifier = KeywordClassifier::new();
        assert_eq!(classifier.predict("Olá, tudo bem?"), None);
        assert_eq!(classifier.predict("Roma"), None);
        assert_eq!(classifier.predict("cancelar"), None);
    }

    #[test]
    fn test_clu_prediction_mapping() {
        let raw = json!({
            "kind": "ConversationResult",
            "result": {
                "query": "quero voo para Lisboa",
                "prediction": {
                    "topIntent": "ConsultarVoos",
                    "projectKind": "Conversation",
                    "entities": [
                        {"category": "Destino", "text": "Lisboa", "offset": 15, "length": 6},
                        {"category": "Origem", "text": ""}
                    ]
                }
            }
        });
        let body: CluResponse = serde_json::from_value(raw).unwrap();
        let prediction = IntentPrediction::from(body.result.prediction);
        assert_eq!(prediction.top_intent, Some(Intent::SearchFlight));
        assert_eq!(prediction.entities.len(), 1);
        assert_eq!(prediction.entity("Destino"), Some("Lisboa"));
    }

    #[test]
    fn test_clu_unknown_intent_is_none() {
        let raw = json!({"result": {"prediction": {"topIntent": "None"}}});
        let body: CluResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(IntentPrediction::from(body.result.prediction).top_intent, None);
    }
}
