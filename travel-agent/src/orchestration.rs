/// Turn orchestration
/// One user message in, one reply out:
/// - extract slot facts and classify the intent
/// - run the dialogue step on a private copy of the user's context
/// - commit the copy only when the step succeeded
/// - log the exchange in the background

use anyhow::{Context, Result};
use dialogue_core::{extract, DialogState, ExtractedFacts, Intent, UserContext};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{AgentConfig, ClassifierKind};
use crate::conversation_log::{ConversationLog, HttpConversationLog, InMemoryConversationLog, LogEntry, Role};
use crate::dialogue::DialogueMachine;
use crate::error::{bounded, AgentError};
use crate::intent_client::{CluClient, IntentClassifier, KeywordClassifier};
use crate::sentiment::{NoSentiment, SentimentAnalyzer, TextAnalyticsClient};
use crate::session_store::{InMemorySessionStore, SessionStore};
use crate::travel_search::{AmadeusClient, TravelSearch};

pub const EMPTY_MESSAGE: &str = "Mensagem vazia";
pub const CLASSIFIER_APOLOGY: &str = "Desculpe, estou com problemas técnicos. Tente novamente em instantes.";
pub const INTERNAL_ERROR_REPLY: &str = "Desculpe, ocorreu um erro interno. Por favor, tente novamente.";

/// Reply for one turn. `is_error` marks rejected input and internal failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReply {
    pub text: String,
    pub is_error: bool,
}

impl TurnReply {
    fn ok(text: impl Into<String>) -> Self {
        Self { text: text.into(), is_error: false }
    }

    fn error(text: impl Into<String>) -> Self {
        Self { text: text.into(), is_error: true }
    }
}

pub struct TurnOrchestrator {
    store: Arc<dyn SessionStore>,
    classifier: Arc<dyn IntentClassifier>,
    machine: Arc<DialogueMachine>,
    sentiment: Arc<dyn SentimentAnalyzer>,
    log: Arc<dyn ConversationLog>,
    timeout: Duration,
    locale: String,
}

impl TurnOrchestrator {
    pub fn new(
        store: Arc<dyn SessionStore>,
        classifier: Arc<dyn IntentClassifier>,
        search: Arc<dyn TravelSearch>,
        sentiment: Arc<dyn SentimentAnalyzer>,
        log: Arc<dyn ConversationLog>,
        config: &AgentConfig,
    ) -> Self {
        let machine = DialogueMachine::new(search, config.default_origin.clone(), config.collaborator_timeout);
        Self {
            store,
            classifier,
            machine: Arc::new(machine),
            sentiment,
            log,
            timeout: config.collaborator_timeout,
            locale: config.language.clone(),
        }
    }

    /// Wire up the configured collaborators.
    pub fn from_config(config: &AgentConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.collaborator_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        let classifier: Arc<dyn IntentClassifier> = match (config.classifier, &config.clu) {
            (ClassifierKind::Clu, Some(clu)) => {
                tracing::info!("✓ Intent classifier: CLU project {}", clu.project_name);
                Arc::new(CluClient::new(http.clone(), clu.clone()))
            }
            _ => {
                tracing::info!("✓ Intent classifier: keyword rules");
                Arc::new(KeywordClassifier::new())
            }
        };

        let sentiment: Arc<dyn SentimentAnalyzer> = match &config.text_analytics {
            Some(settings) => Arc::new(TextAnalyticsClient::new(http.clone(), settings.clone(), config.language.clone())),
            None => {
                tracing::info!("ℹ Text Analytics not configured, sentiment disabled");
                Arc::new(NoSentiment)
            }
        };

        let log: Arc<dyn ConversationLog> = match &config.conversation_log_url {
            Some(url) => {
                tracing::info!("✓ Conversation log: {}", url);
                Arc::new(HttpConversationLog::new(http.clone(), url.clone()))
            }
            None => {
                tracing::info!("ℹ Conversation log kept in memory");
                Arc::new(InMemoryConversationLog::new())
            }
        };

        if config.amadeus.is_none() {
            tracing::warn!("⚠ Amadeus credentials missing, flight search will fail");
        }
        let search: Arc<dyn TravelSearch> = Arc::new(AmadeusClient::new(http, config.amadeus.clone()));
        let store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new(config.session_ttl, config.max_sessions));

        Ok(Self::new(store, classifier, search, sentiment, log, config))
    }

    pub fn store(&self) -> Arc<dyn SessionStore> {
        self.store.clone()
    }

    pub fn conversation_log(&self) -> Arc<dyn ConversationLog> {
        self.log.clone()
    }

    /// Process one message from `user_id`.
    ///
    /// Turns for the same user are serialized on the session lock. The
    /// stored context only changes when the whole turn succeeds.
    pub async fn handle_turn(&self, user_id: &str, raw: &str) -> TurnReply {
        let text = raw.trim();
        if text.is_empty() {
            return TurnReply::error(EMPTY_MESSAGE);
        }

        tracing::info!("→ Turn from {}: {}", user_id, text);
        let facts = extract(text);

        let handle = self.store.get(user_id).await;
        let mut stored = handle.lock().await;
        let mut working = stored.clone();
        working.merge(&facts);

        let classify = self.classifier.classify(text, &self.locale);
        let prediction = match bounded("intent classifier", self.timeout, classify).await {
            Ok(prediction) => prediction,
            Err(e) => {
                tracing::warn!("⚠ Intent classification failed for {}: {}", user_id, e);
                let state = stored.state;
                drop(stored);
                self.notify(user_id, text, CLASSIFIER_APOLOGY, json!({ "state": state.label(), "error": "classifier" }));
                return TurnReply::ok(CLASSIFIER_APOLOGY);
            }
        };

        working.data.merge_entities(&prediction);
        if prediction.top_intent.is_some() {
            working.last_intent = prediction.top_intent;
        }
        let intent = prediction.top_intent.or_else(|| carried_intent(&working, &facts));

        match self.run_step(working, facts, intent).await {
            Ok((next, reply)) => {
                let metadata = json!({
                    "state": next.state.label(),
                    "intent": intent.map(|i| i.label()),
                });
                *stored = next;
                drop(stored);
                tracing::info!("✓ Turn done for {}", user_id);
                self.notify(user_id, text, &reply, metadata);
                TurnReply::ok(reply)
            }
            Err(e) => {
                tracing::error!("✗ Turn failed for {}: {}", user_id, e);
                let state = stored.state;
                drop(stored);
                self.notify(user_id, text, INTERNAL_ERROR_REPLY, json!({ "state": state.label(), "error": "internal" }));
                TurnReply::error(INTERNAL_ERROR_REPLY)
            }
        }
    }

    /// The step runs in its own task so that a panic inside it becomes an
    /// error instead of taking the caller down.
    async fn run_step(
        &self,
        mut working: UserContext,
        facts: ExtractedFacts,
        intent: Option<Intent>,
    ) -> Result<(UserContext, String), AgentError> {
        let machine = self.machine.clone();
        let task = tokio::spawn(async move {
            let reply = machine.step(&mut working, &facts, intent).await;
            (working, reply)
        });

        task.await.map_err(|e| AgentError::TaskFailed(e.to_string()))
    }

    /// Sentiment and conversation log, off the reply path. Failures are
    /// logged and otherwise ignored.
    fn notify(&self, user_id: &str, user_text: &str, reply: &str, metadata: serde_json::Value) {
        let sentiment = self.sentiment.clone();
        let log = self.log.clone();
        let timeout = self.timeout;
        let user_id = user_id.to_string();
        let user_text = user_text.to_string();
        let reply = reply.to_string();

        tokio::spawn(async move {
            let mood = match bounded("sentiment", timeout, sentiment.analyze(&user_text)).await {
                Ok(mood) => mood,
                Err(e) => {
                    tracing::warn!("⚠ Sentiment analysis failed: {}", e);
                    None
                }
            };

            let entries = [
                LogEntry::new(&user_id, Role::User, &user_text).with_sentiment(mood),
                LogEntry::new(&user_id, Role::Bot, &reply).with_metadata(metadata),
            ];
            for entry in entries {
                if let Err(e) = bounded("conversation log", timeout, log.append(entry)).await {
                    tracing::warn!("⚠ Failed to log message for {}: {}", user_id, e);
                }
            }
        });
    }
}

/// A bare place name while idle continues the last flight or hotel request,
/// so "comprar voo" followed by "Roma" searches Rome.
fn carried_intent(ctx: &UserContext, facts: &ExtractedFacts) -> Option<Intent> {
    if ctx.state != DialogState::Idle || facts.place.is_none() {
        return None;
    }
    ctx.last_intent.filter(|i| !i.is_cancellation())
}
