//! stylegate-registry - Endpoint resolution and capability registry
//!
//! At startup every configured capability is resolved independently: its
//! candidate endpoints are tried in order with bounded retries, and the first
//! client that can be constructed is bound. The resulting registry is
//! immutable for the rest of the process lifetime.

mod registry;
mod resolver;

pub use registry::{CapabilityConfig, CapabilityEntry, CapabilityRegistry};
pub use resolver::{EndpointResolver, ResolvedClient, RetryPolicy};
