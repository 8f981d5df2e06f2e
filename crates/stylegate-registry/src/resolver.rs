//! Endpoint resolution - bind one working client per capability

use std::sync::Arc;
use std::time::Duration;

use stylegate_core::{Capability, ClientConnector, InferenceClient};
use tracing::{error, info, warn};

/// Bounded retry policy applied to each candidate endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per candidate (at least 1)
    pub max_attempts: u32,
    /// Wait between failed attempts on the same candidate
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(2),
        }
    }
}

/// A client bound during resolution
#[derive(Clone)]
pub struct ResolvedClient {
    /// Candidate endpoint that accepted the connection
    pub endpoint: String,
    /// 1-based attempt number that succeeded on that candidate
    pub attempt: u32,
    pub client: Arc<dyn InferenceClient>,
}

impl std::fmt::Debug for ResolvedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedClient")
            .field("endpoint", &self.endpoint)
            .field("attempt", &self.attempt)
            .finish_non_exhaustive()
    }
}

/// Tries candidate endpoints in order until one yields a client
pub struct EndpointResolver {
    connector: Arc<dyn ClientConnector>,
    policy: RetryPolicy,
}

impl EndpointResolver {
    pub fn new(connector: Arc<dyn ClientConnector>) -> Self {
        Self::with_policy(connector, RetryPolicy::default())
    }

    pub fn with_policy(connector: Arc<dyn ClientConnector>, policy: RetryPolicy) -> Self {
        Self { connector, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Resolve a client for `capability`.
    ///
    /// Candidates are tried in list order, each up to `max_attempts` times
    /// with `backoff` between failures. The first success wins and later
    /// candidates are never contacted. Returns `None` when every candidate is
    /// exhausted, or immediately for an empty list.
    pub async fn resolve(
        &self,
        capability: Capability,
        candidates: &[String],
    ) -> Option<ResolvedClient> {
        let max_attempts = self.policy.max_attempts.max(1);

        for endpoint in candidates {
            for attempt in 1..=max_attempts {
                match self.connector.connect(capability, endpoint).await {
                    Ok(client) => {
                        info!(
                            capability = %capability,
                            endpoint = %endpoint,
                            attempt,
                            "Successfully connected"
                        );
                        return Some(ResolvedClient {
                            endpoint: endpoint.clone(),
                            attempt,
                            client,
                        });
                    }
                    Err(e) => {
                        warn!(
                            capability = %capability,
                            endpoint = %endpoint,
                            attempt,
                            max_attempts,
                            error = %e,
                            "Connection attempt failed"
                        );
                        if attempt < max_attempts {
                            tokio::time::sleep(self.policy.backoff).await;
                        }
                    }
                }
            }
        }

        error!(
            capability = %capability,
            candidates = candidates.len(),
            "Failed to initialize client, capability unavailable"
        );
        None
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use std::collections::HashMap;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use stylegate_core::{BackendError, BackendResult, InferenceRequest, InferenceResult};

    pub(crate) struct StubClient {
        pub endpoint: String,
    }

    #[async_trait]
    impl InferenceClient for StubClient {
        fn endpoint(&self) -> &str {
            &self.endpoint
        }

        async fn invoke(&self, _request: InferenceRequest) -> BackendResult<InferenceResult> {
            Ok(InferenceResult::Text(format!("from {}", self.endpoint)))
        }
    }

    /// Connector whose endpoints fail a scripted number of times.
    ///
    /// Endpoints missing from the script always fail.
    #[derive(Default)]
    pub(crate) struct ScriptedConnector {
        failures_before_success: Mutex<HashMap<String, u32>>,
        pub attempts: Mutex<Vec<(Capability, String)>>,
    }

    impl ScriptedConnector {
        pub fn succeed_after(self, endpoint: &str, failures: u32) -> Self {
            self.failures_before_success
                .lock()
                .insert(endpoint.to_string(), failures);
            self
        }

        pub fn attempts_for(&self, endpoint: &str) -> usize {
            self.attempts
                .lock()
                .iter()
                .filter(|(_, e)| e == endpoint)
                .count()
        }
    }

    #[async_trait]
    impl ClientConnector for ScriptedConnector {
        async fn connect(
            &self,
            capability: Capability,
            endpoint: &str,
        ) -> BackendResult<Arc<dyn InferenceClient>> {
            self.attempts
                .lock()
                .push((capability, endpoint.to_string()));

            let mut script = self.failures_before_success.lock();
            match script.get_mut(endpoint) {
                Some(0) => Ok(Arc::new(StubClient {
                    endpoint: endpoint.to_string(),
                })),
                Some(remaining) => {
                    *remaining -= 1;
                    Err(BackendError::Connect(format!("{} not ready", endpoint)))
                }
                None => Err(BackendError::Connect(format!("{} refused", endpoint))),
            }
        }
    }

    fn candidates(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_candidate_wins() {
        let connector = Arc::new(ScriptedConnector::default().succeed_after("a", 0));
        let resolver = EndpointResolver::new(connector.clone());

        let resolved = resolver
            .resolve(Capability::Chatbot, &candidates(&["a", "b"]))
            .await
            .unwrap();

        assert_eq!(resolved.endpoint, "a");
        assert_eq!(resolved.attempt, 1);
        assert_eq!(connector.attempts_for("b"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_falls_back_after_exhausting_retries() {
        let connector = Arc::new(ScriptedConnector::default().succeed_after("second", 0));
        let resolver = EndpointResolver::new(connector.clone());
        let started = tokio::time::Instant::now();

        let resolved = resolver
            .resolve(Capability::Occasion, &candidates(&["first", "second"]))
            .await
            .unwrap();

        assert_eq!(resolved.endpoint, "second");
        assert_eq!(resolved.attempt, 1);
        assert_eq!(connector.attempts_for("first"), 3);
        assert_eq!(connector.attempts_for("second"), 1);
        // Two waits between the three failed attempts, none after the last
        assert_eq!(started.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_later_retry_is_accepted() {
        let connector = Arc::new(ScriptedConnector::default().succeed_after("flaky", 2));
        let resolver = EndpointResolver::new(connector.clone());

        let resolved = resolver
            .resolve(Capability::VirtualTryon, &candidates(&["flaky", "never"]))
            .await
            .unwrap();

        assert_eq!(resolved.endpoint, "flaky");
        assert_eq!(resolved.attempt, 3);
        assert_eq!(connector.attempts_for("never"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_candidates_exhausted() {
        let connector = Arc::new(ScriptedConnector::default());
        let resolver = EndpointResolver::new(connector.clone());

        let resolved = resolver
            .resolve(Capability::TextToDress, &candidates(&["x", "y"]))
            .await;

        assert!(resolved.is_none());
        assert_eq!(connector.attempts_for("x"), 3);
        assert_eq!(connector.attempts_for("y"), 3);
    }

    #[tokio::test]
    async fn test_empty_candidates_make_no_attempts() {
        let connector = Arc::new(ScriptedConnector::default());
        let resolver = EndpointResolver::new(connector.clone());

        assert!(resolver.resolve(Capability::Chatbot, &[]).await.is_none());
        assert!(connector.attempts.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_policy() {
        let connector = Arc::new(ScriptedConnector::default().succeed_after("a", 1));
        let resolver = EndpointResolver::with_policy(
            connector.clone(),
            RetryPolicy {
                max_attempts: 1,
                backoff: Duration::from_millis(10),
            },
        );

        assert!(resolver
            .resolve(Capability::Chatbot, &candidates(&["a"]))
            .await
            .is_none());
        assert_eq!(connector.attempts_for("a"), 1);
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.backoff, Duration::from_secs(2));
    }
}
