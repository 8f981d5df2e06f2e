//! stylegate-proxy - Remote inference backend
//!
//! Implements `InferenceClient` by forwarding each request over HTTP to a
//! remote inference app via `SpaceClient`, and `ClientConnector` so the
//! endpoint resolver can bind such clients at startup.

mod proxy;

pub use proxy::{RemoteConnector, RemoteInferenceClient, DEFAULT_API_NAME};
