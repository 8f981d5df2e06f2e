//! RemoteInferenceClient - InferenceClient that proxies to a remote inference app

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use stylegate_client::{ClientError, ClientOptions, SpaceClient};
use stylegate_core::{
    BackendError, BackendResult, Capability, ClientConnector, InferenceClient, InferenceRequest,
    InferenceResult,
};

/// Endpoint name used when a capability does not configure one
pub const DEFAULT_API_NAME: &str = "/predict";

/// Map a wire error from a call on a bound client.
///
/// The remote message is surfaced verbatim so callers see what the service
/// actually said.
fn call_error(err: ClientError) -> BackendError {
    match err {
        ClientError::UnexpectedOutput(msg) => BackendError::UnexpectedOutput(msg),
        ClientError::IoError(e) => BackendError::Io(e),
        other => BackendError::Remote(other.remote_message()),
    }
}

fn output_text(value: Value) -> BackendResult<String> {
    match value {
        Value::String(text) => Ok(text),
        other => Err(BackendError::UnexpectedOutput(format!(
            "expected text output, got {}",
            other
        ))),
    }
}

/// An `InferenceClient` bound to one remote app.
///
/// Each capability uses a single named endpoint; the request variant decides
/// the argument shape (plain text, or uploaded files for try-on).
pub struct RemoteInferenceClient {
    capability: Capability,
    endpoint: String,
    api_name: String,
    client: SpaceClient,
}

impl RemoteInferenceClient {
    /// Connect to `endpoint` on behalf of `capability`.
    ///
    /// Fails with `BackendError::Connect` when the app config cannot be
    /// fetched; that is the signal the resolver retries on.
    pub async fn connect(
        capability: Capability,
        endpoint: &str,
        api_name: &str,
        options: &ClientOptions,
    ) -> BackendResult<Self> {
        let client = SpaceClient::connect(endpoint, options)
            .await
            .map_err(|e| BackendError::Connect(e.to_string()))?;

        tracing::debug!(
            capability = %capability,
            endpoint = %endpoint,
            base_url = %client.base_url(),
            "Remote inference client ready"
        );

        Ok(Self {
            capability,
            endpoint: endpoint.to_string(),
            api_name: api_name.to_string(),
            client,
        })
    }

    async fn predict_text(&self, input: String) -> BackendResult<InferenceResult> {
        let output = self
            .client
            .predict_one(&self.api_name, vec![Value::String(input)])
            .await
            .map_err(call_error)?;
        Ok(InferenceResult::Text(output_text(output)?))
    }

    async fn predict_file(&self, data: Vec<Value>) -> BackendResult<InferenceResult> {
        let output = self
            .client
            .predict_one(&self.api_name, data)
            .await
            .map_err(call_error)?;
        let local = self
            .client
            .download_output(&output)
            .await
            .map_err(call_error)?;
        Ok(InferenceResult::File(local))
    }

    async fn upload(&self, path: &Path) -> BackendResult<Value> {
        let file = self.client.upload_file(path).await.map_err(call_error)?;
        serde_json::to_value(file).map_err(|e| BackendError::Remote(e.to_string()))
    }
}

#[async_trait]
impl InferenceClient for RemoteInferenceClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn invoke(&self, request: InferenceRequest) -> BackendResult<InferenceResult> {
        if request.capability() != self.capability {
            return Err(BackendError::InvalidRequest(format!(
                "{} request sent to {} client",
                request.capability(),
                self.capability
            )));
        }

        match request {
            InferenceRequest::Chat { text } => self.predict_text(text).await,
            InferenceRequest::Occasion { query } => self.predict_text(query).await,
            InferenceRequest::TextToDress { prompt } => {
                self.predict_file(vec![Value::String(prompt)]).await
            }
            InferenceRequest::TryOn {
                person_image,
                garment_image,
            } => {
                let person = self.upload(&person_image).await?;
                let garment = self.upload(&garment_image).await?;
                self.predict_file(vec![person, garment]).await
            }
        }
    }
}

/// Connector that builds `RemoteInferenceClient`s for the resolver
#[derive(Debug, Clone, Default)]
pub struct RemoteConnector {
    options: ClientOptions,
    api_names: HashMap<Capability, String>,
}

impl RemoteConnector {
    pub fn new(options: ClientOptions) -> Self {
        Self {
            options,
            api_names: HashMap::new(),
        }
    }

    /// Override the endpoint name for one capability
    pub fn with_api_name(mut self, capability: Capability, api_name: impl Into<String>) -> Self {
        self.api_names.insert(capability, api_name.into());
        self
    }

    pub fn api_name(&self, capability: Capability) -> &str {
        self.api_names
            .get(&capability)
            .map(String::as_str)
            .unwrap_or(DEFAULT_API_NAME)
    }
}

#[async_trait]
impl ClientConnector for RemoteConnector {
    async fn connect(
        &self,
        capability: Capability,
        endpoint: &str,
    ) -> BackendResult<Arc<dyn InferenceClient>> {
        let client = RemoteInferenceClient::connect(
            capability,
            endpoint,
            self.api_name(capability),
            &self.options,
        )
        .await?;
        Ok(Arc::new(client))
    }
}
