/// Agent configuration loaded from the environment (or a `.env` file)

use anyhow::{anyhow, Context, Result};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_ORIGIN: &str = "São Paulo";
pub const DEFAULT_AMADEUS_BASE_URL: &str = "https://test.api.amadeus.com";

/// Which intent classifier backs the agent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierKind {
    Clu,
    Keyword,
}

#[derive(Debug, Clone)]
pub struct CluSettings {
    pub endpoint: String,
    pub key: String,
    pub project_name: String,
    pub deployment_name: String,
}

#[derive(Debug, Clone)]
pub struct TextAnalyticsSettings {
    pub endpoint: String,
    pub key: String,
}

#[derive(Debug, Clone)]
pub struct AmadeusSettings {
    pub client_id: String,
    pub client_secret: String,
    pub base_url: String,
}

/// Agent configuration
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub port: u16,
    pub classifier: ClassifierKind,
    pub clu: Option<CluSettings>,
    pub language: String,
    pub text_analytics: Option<TextAnalyticsSettings>,
    pub amadeus: Option<AmadeusSettings>,
    pub conversation_log_url: Option<String>,
    pub collaborator_timeout: Duration,
    pub session_ttl: Duration,
    pub max_sessions: usize,
    pub default_origin: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            classifier: ClassifierKind::Keyword,
            clu: None,
            language: "pt-br".to_string(),
            text_analytics: None,
            amadeus: None,
            conversation_log_url: None,
            collaborator_timeout: Duration::from_secs(10),
            session_ttl: Duration::from_secs(1800),
            max_sessions: 10_000,
            default_origin: DEFAULT_ORIGIN.to_string(),
        }
    }
}

impl AgentConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key → value source. Blank values
    /// count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let clu = match (var("CLU_ENDPOINT"), var("CLU_KEY"), var("CLU_PROJECT_NAME")) {
            (Some(endpoint), Some(key), Some(project_name)) => Some(CluSettings {
                endpoint: endpoint.trim_end_matches('/').to_string(),
                key,
                project_name,
                deployment_name: var("CLU_DEPLOYMENT_NAME").unwrap_or_else(|| "production".to_string()),
            }),
            _ => None,
        };

        let classifier = match var("INTENT_CLASSIFIER").map(|v| v.to_lowercase()).as_deref() {
            Some("clu") => {
                if clu.is_none() {
                    return Err(anyhow!(
                        "INTENT_CLASSIFIER=clu requires CLU_ENDPOINT, CLU_KEY and CLU_PROJECT_NAME"
                    ));
                }
                ClassifierKind::Clu
            }
            Some("keyword") => ClassifierKind::Keyword,
            Some(other) => return Err(anyhow!("Unknown INTENT_CLASSIFIER '{}' (expected clu or keyword)", other)),
            None if clu.is_some() => ClassifierKind::Clu,
            None => ClassifierKind::Keyword,
        };

        let text_analytics = match (var("TEXT_ANALYTICS_ENDPOINT"), var("TEXT_ANALYTICS_KEY")) {
            (Some(endpoint), Some(key)) => Some(TextAnalyticsSettings {
                endpoint: endpoint.trim_end_matches('/').to_string(),
                key,
            }),
            _ => None,
        };

        let amadeus = match (var("AMADEUS_CLIENT_ID"), var("AMADEUS_CLIENT_SECRET")) {
            (Some(client_id), Some(client_secret)) => Some(AmadeusSettings {
                client_id,
                client_secret,
                base_url: var("AMADEUS_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_AMADEUS_BASE_URL.to_string())
                    .trim_end_matches('/')
                    .to_string(),
            }),
            _ => None,
        };

        let port = match var("PORT") {
            Some(raw) => raw.parse::<u16>().with_context(|| format!("Invalid PORT '{}'", raw))?,
            None => defaults.port,
        };

        let secs = |key: &str, default: Duration| -> Result<Duration> {
            match var(key) {
                Some(raw) => raw
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .with_context(|| format!("Invalid {} '{}'", key, raw)),
                None => Ok(default),
            }
        };

        let max_sessions = match var("MAX_SESSIONS") {
            Some(raw) => raw
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| anyhow!("Invalid MAX_SESSIONS '{}'", raw))?,
            None => defaults.max_sessions,
        };

        Ok(Self {
            port,
            classifier,
            clu,
            language: var("CLU_LANGUAGE").unwrap_or(defaults.language),
            text_analytics,
            amadeus,
            conversation_log_url: var("CONVERSATION_LOG_URL"),
            collaborator_timeout: secs("COLLABORATOR_TIMEOUT_SECS", defaults.collaborator_timeout)?,
            session_ttl: secs("SESSION_TTL_SECS", defaults.session_ttl)?,
            max_sessions,
            default_origin: var("DEFAULT_ORIGIN").unwrap_or(defaults.default_origin),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AgentConfig> {
        let env: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AgentConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.classifier, ClassifierKind::Keyword);
        assert!(config.clu.is_none());
        assert!(config.amadeus.is_none());
        assert_eq!(config.language, "pt-br");
        assert_eq!(config.collaborator_timeout, Duration::from_secs(10));
        assert_eq!(config.session_ttl, Duration::from_secs(1800));
        assert_eq!(config.max_sessions, 10_000);
        assert_eq!(config.default_origin, "São Paulo");
    }

    #[test]
    fn test_clu_selected_when_credentials_present() {
        let config = config_from(&[
            ("CLU_ENDPOINT", "https://clu.example.com/"),
            ("CLU_KEY", "secret"),
            ("CLU_PROJECT_NAME", "viagens"),
        ])
        .unwrap();
        assert_eq!(config.classifier, ClassifierKind::Clu);
        let clu = config.clu.unwrap();
        assert_eq!(clu.endpoint, "https://clu.example.com");
        assert_eq!(clu.deployment_name, "production");
    }

    #[test]
    fn test_forcing_clu_without_credentials_fails() {
        assert!(config_from(&[("INTENT_CLASSIFIER", "clu")]).is_err());
        assert!(config_from(&[("INTENT_CLASSIFIER", "gpt")]).is_err());
    }

    #[test]
    fn test_numeric_overrides() {
        let config = config_from(&[
            ("PORT", "8080"),
            ("COLLABORATOR_TIMEOUT_SECS", "3"),
            ("MAX_SESSIONS", "50"),
            ("DEFAULT_ORIGIN", "Recife"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.collaborator_timeout, Duration::from_secs(3));
        assert_eq!(config.max_sessions, 50);
        assert_eq!(config.default_origin, "Recife");

        assert!(config_from(&[("PORT", "abc")]).is_err());
        assert!(config_from(&[("MAX_SESSIONS", "0")]).is_err());
    }
}
