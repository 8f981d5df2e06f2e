//! CapabilityRegistry - per-capability client handles, fixed after startup

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use futures::future::join_all;
use stylegate_core::{Capability, InferenceClient, ServiceStatus};
use tracing::info;

use crate::resolver::{EndpointResolver, ResolvedClient};

/// Configured candidates for one capability
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityConfig {
    pub capability: Capability,
    /// Candidate endpoints in preference order
    pub endpoints: Vec<String>,
}

impl CapabilityConfig {
    pub fn new<I, S>(capability: Capability, endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            capability,
            endpoints: endpoints.into_iter().map(Into::into).collect(),
        }
    }
}

/// Registry entry: the candidates and, if resolution succeeded, the bound client
#[derive(Debug, Clone)]
pub struct CapabilityEntry {
    pub candidates: Vec<String>,
    pub resolved: Option<ResolvedClient>,
}

impl CapabilityEntry {
    pub fn is_available(&self) -> bool {
        self.resolved.is_some()
    }
}

/// Read-only map from capability to its bound client.
///
/// Built once at startup; nothing is added, removed or re-resolved later.
#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    entries: HashMap<Capability, CapabilityEntry>,
}

impl CapabilityRegistry {
    /// Resolve every configured capability concurrently.
    ///
    /// Each capability runs its own resolution; a slow or failing capability
    /// does not hold up the others beyond the final join.
    pub async fn build(resolver: &EndpointResolver, capabilities: Vec<CapabilityConfig>) -> Self {
        let resolutions = capabilities.into_iter().map(|config| async move {
            let resolved = resolver
                .resolve(config.capability, &config.endpoints)
                .await;
            (
                config.capability,
                CapabilityEntry {
                    candidates: config.endpoints,
                    resolved,
                },
            )
        });

        let entries: HashMap<_, _> = join_all(resolutions).await.into_iter().collect();
        let registry = Self { entries };

        info!(
            configured = registry.entries.len(),
            available = registry.available_count(),
            "Capability registry ready"
        );

        registry
    }

    /// Build a registry from already-bound clients.
    ///
    /// `None` registers the capability as configured but unavailable.
    pub fn from_clients<I>(clients: I) -> Self
    where
        I: IntoIterator<Item = (Capability, Option<Arc<dyn InferenceClient>>)>,
    {
        let entries = clients
            .into_iter()
            .map(|(capability, client)| {
                let resolved = client.map(|client| ResolvedClient {
                    endpoint: client.endpoint().to_string(),
                    attempt: 1,
                    client,
                });
                let candidates = resolved
                    .iter()
                    .map(|r| r.endpoint.clone())
                    .collect();
                (
                    capability,
                    CapabilityEntry {
                        candidates,
                        resolved,
                    },
                )
            })
            .collect();

        Self { entries }
    }

    pub fn is_available(&self, capability: Capability) -> bool {
        self.entries
            .get(&capability)
            .is_some_and(CapabilityEntry::is_available)
    }

    /// Bound client for `capability`, if any
    pub fn get(&self, capability: Capability) -> Option<Arc<dyn InferenceClient>> {
        self.resolved(capability).map(|r| r.client.clone())
    }

    /// Endpoint the capability is bound to
    pub fn endpoint(&self, capability: Capability) -> Option<&str> {
        self.resolved(capability).map(|r| r.endpoint.as_str())
    }

    pub fn entry(&self, capability: Capability) -> Option<&CapabilityEntry> {
        self.entries.get(&capability)
    }

    /// Availability of every configured capability, keyed by name
    pub fn statuses(&self) -> BTreeMap<String, ServiceStatus> {
        self.entries
            .iter()
            .map(|(capability, entry)| {
                (
                    capability.as_str().to_string(),
                    ServiceStatus::from_bound(entry.is_available()),
                )
            })
            .collect()
    }

    /// Configured capabilities in stable order
    pub fn capabilities(&self) -> Vec<Capability> {
        let mut capabilities: Vec<_> = self.entries.keys().copied().collect();
        capabilities.sort();
        capabilities
    }

    pub fn available_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_available()).count()
    }

    fn resolved(&self, capability: Capability) -> Option<&ResolvedClient> {
        self.entries
            .get(&capability)
            .and_then(|entry| entry.resolved.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::tests::{ScriptedConnector, StubClient};
    use crate::resolver::RetryPolicy;
    use std::time::Duration;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            backoff: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_build_binds_each_capability_independently() {
        let connector = Arc::new(
            ScriptedConnector::default()
                .succeed_after("chat-a", 0)
                .succeed_after("occ-b", 1),
        );
        let resolver = EndpointResolver::with_policy(connector.clone(), fast_policy());

        let registry = CapabilityRegistry::build(
            &resolver,
            vec![
                CapabilityConfig::new(Capability::Chatbot, ["chat-a"]),
                CapabilityConfig::new(Capability::Occasion, ["occ-a", "occ-b"]),
                CapabilityConfig::new(Capability::TextToDress, ["dead"]),
            ],
        )
        .await;

        assert!(registry.is_available(Capability::Chatbot));
        assert!(registry.is_available(Capability::Occasion));
        assert!(!registry.is_available(Capability::TextToDress));
        assert!(!registry.is_available(Capability::VirtualTryon));

        assert_eq!(registry.endpoint(Capability::Chatbot), Some("chat-a"));
        assert_eq!(registry.endpoint(Capability::Occasion), Some("occ-b"));
        assert_eq!(
            registry.entry(Capability::Occasion).unwrap().resolved.as_ref().unwrap().attempt,
            2
        );
        assert!(registry.get(Capability::TextToDress).is_none());
        assert_eq!(registry.available_count(), 2);
    }

    #[tokio::test]
    async fn test_statuses_cover_configured_capabilities() {
        let connector = Arc::new(ScriptedConnector::default().succeed_after("up", 0));
        let resolver = EndpointResolver::with_policy(connector, fast_policy());

        let registry = CapabilityRegistry::build(
            &resolver,
            vec![
                CapabilityConfig::new(Capability::Chatbot, ["up"]),
                CapabilityConfig::new(Capability::VirtualTryon, Vec::<String>::new()),
            ],
        )
        .await;

        let statuses = registry.statuses();
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses["chatbot"], ServiceStatus::Available);
        assert_eq!(statuses["virtual_tryon"], ServiceStatus::Unavailable);
        assert_eq!(
            registry.capabilities(),
            vec![Capability::VirtualTryon, Capability::Chatbot]
        );
    }

    #[tokio::test]
    async fn test_nothing_resolves() {
        let connector = Arc::new(ScriptedConnector::default());
        let resolver = EndpointResolver::with_policy(connector, fast_policy());

        let registry = CapabilityRegistry::build(
            &resolver,
            Capability::ALL
                .iter()
                .map(|c| CapabilityConfig::new(*c, ["nowhere"]))
                .collect(),
        )
        .await;

        for capability in Capability::ALL {
            assert!(!registry.is_available(capability));
        }
        assert_eq!(registry.statuses().len(), 4);
        assert_eq!(registry.available_count(), 0);
    }

    #[tokio::test]
    async fn test_from_clients() {
        let client: Arc<dyn InferenceClient> = Arc::new(StubClient {
            endpoint: "fake://chat".into(),
        });
        let registry = CapabilityRegistry::from_clients([
            (Capability::Chatbot, Some(client)),
            (Capability::Occasion, None),
        ]);

        assert!(registry.is_available(Capability::Chatbot));
        assert_eq!(registry.endpoint(Capability::Chatbot), Some("fake://chat"));
        assert!(!registry.is_available(Capability::Occasion));
        assert_eq!(registry.statuses()["occasion"], ServiceStatus::Unavailable);
    }
}
