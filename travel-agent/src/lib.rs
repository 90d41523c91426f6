/// Flight & hotel booking chat agent
/// Turn orchestration, remote collaborators and session storage, shared by
/// the CLI and HTTP server binaries

pub mod config;
pub mod conversation_log;
pub mod dialogue;
pub mod error;
pub mod intent_client;
pub mod orchestration;
pub mod sentiment;
pub mod session_store;
pub mod travel_search;

pub use config::{AgentConfig, ClassifierKind};
pub use conversation_log::{ConversationLog, InMemoryConversationLog, LogEntry, Role};
pub use dialogue::DialogueMachine;
pub use error::{AgentError, CollaboratorError};
pub use intent_client::{IntentClassifier, KeywordClassifier};
pub use orchestration::{TurnOrchestrator, TurnReply};
pub use sentiment::{Sentiment, SentimentAnalyzer};
pub use session_store::{InMemorySessionStore, SessionHandle, SessionStore};
pub use travel_search::{AmadeusClient, TravelSearch};

/// Log to stderr, filtered by `RUST_LOG` (default `info`).
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
