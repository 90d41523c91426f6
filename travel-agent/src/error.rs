/// Error types for the agent and its remote collaborators

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// Failure talking to one of the external services
#[derive(Error, Debug)]
pub enum CollaboratorError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} returned status {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("Failed to decode {service} response: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },

    #[error("{0} timed out after {1:?}")]
    Timeout(&'static str, Duration),

    #[error("{0}")]
    Remote(String),
}

/// Turn-level failures surfaced by the orchestrator. Collaborator errors
/// never reach this level: the dialogue step answers them in its reply.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Turn task failed: {0}")]
    TaskFailed(String),
}

/// Run a collaborator call under `limit`. Running out of time is an error
/// like any other.
pub async fn bounded<T, F>(service: &'static str, limit: Duration, call: F) -> Result<T, CollaboratorError>
where
    F: Future<Output = Result<T, CollaboratorError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(CollaboratorError::Timeout(service, limit)),
    }
}

/// Turn a non-2xx response into `CollaboratorError::Status`.
pub(crate) async fn check_status(
    service: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, CollaboratorError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(CollaboratorError::Status {
        service,
        status,
        body: body.chars().take(200).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bounded_passes_through() {
        let value = bounded("stub", Duration::from_secs(1), async { Ok::<_, CollaboratorError>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_bounded_times_out() {
        let result = bounded("slow", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, CollaboratorError>(())
        })
        .await;
        assert!(matches!(result, Err(CollaboratorError::Timeout("slow", _))));
    }
}
