//! Remote inference HTTP client implementation

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};
use url::Url;

use crate::error::{ClientError, Result};
use crate::types::*;

/// Default request timeout. Inference calls are slow.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);
/// Default connection timeout
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Options shared by every client built by one process
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Bearer token for private hosted spaces
    pub hf_token: Option<String>,
    /// Directory that file outputs are downloaded into
    pub download_dir: PathBuf,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            hf_token: None,
            download_dir: std::env::temp_dir().join("stylegate-downloads"),
        }
    }
}

/// Turn a configured endpoint into a base URL.
///
/// Full `http(s)://` URLs are used as given (with a trailing slash so that
/// relative joins stay under the base path). A hosted space identifier of the
/// form `owner/name` maps to `https://owner-name.hf.space/`.
pub fn resolve_endpoint(endpoint: &str) -> Result<Url> {
    let endpoint = endpoint.trim();

    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        let mut url = Url::parse(endpoint)?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        return Ok(url);
    }

    match endpoint.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            let subdomain = format!("{}-{}", owner, name)
                .to_lowercase()
                .replace('_', "-")
                .replace('.', "-");
            Ok(Url::parse(&format!("https://{}.hf.space/", subdomain))?)
        }
        _ => Err(ClientError::InvalidEndpoint(endpoint.to_string())),
    }
}

/// Join an API route onto a base URL, honouring the app's API prefix
fn api_url(base: &Url, api_prefix: &str, route: &str) -> Result<Url> {
    let prefix = api_prefix.trim_matches('/');
    let route = route.trim_start_matches('/');
    let relative = if prefix.is_empty() {
        route.to_string()
    } else {
        format!("{}/{}", prefix, route)
    };
    Ok(base.join(&relative)?)
}

/// Whether `url` is served by the same scheme, host and port as `base`
fn same_origin(base: &Url, url: &Url) -> bool {
    base.scheme() == url.scheme()
        && base.host_str() == url.host_str()
        && base.port_or_known_default() == url.port_or_known_default()
}

/// Build a request, attaching the bearer token only for the app's own origin
fn request(
    client: &Client,
    auth: Option<&HeaderValue>,
    base: &Url,
    method: Method,
    url: Url,
) -> RequestBuilder {
    let attach = auth.filter(|_| same_origin(base, &url)).cloned();
    let builder = client.request(method, url);
    match attach {
        Some(value) => builder.header(AUTHORIZATION, value),
        None => builder,
    }
}

/// Client bound to one remote inference app
///
/// Construction probes the app config, so holding a `SpaceClient` means the
/// endpoint answered at least once.
#[derive(Debug, Clone)]
pub struct SpaceClient {
    client: Client,
    base_url: Url,
    /// `Bearer <token>`, sent to `base_url`'s origin only
    auth: Option<HeaderValue>,
    config: AppConfig,
    download_dir: PathBuf,
}

impl SpaceClient {
    /// Connect to an endpoint (URL or hosted space identifier)
    #[instrument(skip(options))]
    pub async fn connect(endpoint: &str, options: &ClientOptions) -> Result<Self> {
        let base_url = resolve_endpoint(endpoint)?;

        let client = Client::builder()
            .timeout(options.timeout)
            .connect_timeout(options.connect_timeout)
            .build()?;

        let auth = options
            .hf_token
            .as_deref()
            .map(|token| {
                let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|e| ClientError::ParseError(format!("Invalid auth token: {}", e)))?;
                value.set_sensitive(true);
                Ok::<_, ClientError>(value)
            })
            .transpose()?;

        let url = base_url.join("config")?;
        debug!("Fetching app config from {}", url);
        let response = request(&client, auth.as_ref(), &base_url, Method::GET, url)
            .send()
            .await?;
        let config: AppConfig = handle_response(response).await?;

        debug!(
            version = ?config.version,
            api_prefix = %config.api_prefix,
            "Connected to remote app"
        );

        Ok(Self {
            client,
            base_url,
            auth,
            config,
            download_dir: options.download_dir.clone(),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Get the app config fetched at connect time
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn url(&self, route: &str) -> Result<Url> {
        api_url(&self.base_url, &self.config.api_prefix, route)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        request(&self.client, self.auth.as_ref(), &self.base_url, method, url)
    }

    // =========================================================================
    // Files
    // =========================================================================

    /// Upload a local file, returning a reference usable as a predict argument
    #[instrument(skip(self))]
    pub async fn upload_file(&self, path: &Path) -> Result<FileData> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();

        let form = Form::new().part("files", Part::bytes(bytes).file_name(file_name.clone()));
        let url = self.url("upload")?;

        let response = self.request(Method::POST, url).multipart(form).send().await?;
        let paths: Vec<String> = handle_response(response).await?;

        let remote = paths.into_iter().next().ok_or_else(|| {
            ClientError::ParseError("upload returned no file paths".to_string())
        })?;

        debug!(local = %path.display(), remote = %remote, "File uploaded");
        Ok(FileData::remote(remote, Some(file_name)))
    }

    /// Download a file output into the download directory.
    ///
    /// The local name is `<uuid>_<file name>`, so concurrent calls that
    /// produce the same file name never collide. A failed transfer leaves
    /// nothing behind.
    #[instrument(skip(self, output))]
    pub async fn download_output(&self, output: &Value) -> Result<PathBuf> {
        let file = FileData::from_output(output).ok_or_else(|| {
            ClientError::UnexpectedOutput(format!("not a file reference: {}", output))
        })?;

        let url = match &file.url {
            Some(url) => Url::parse(url)?,
            None => self.url(&format!("file={}", file.path))?,
        };

        let response = self.request(Method::GET, url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(extract_error(response).await);
        }

        tokio::fs::create_dir_all(&self.download_dir).await?;
        let local = self
            .download_dir
            .join(format!("{}_{}", uuid::Uuid::new_v4(), file.file_name()));

        if let Err(e) = write_body(&local, response).await {
            if let Err(remove_err) = tokio::fs::remove_file(&local).await {
                debug!(local = %local.display(), error = %remove_err, "No partial download to remove");
            }
            return Err(e);
        }

        debug!(url = %url, local = %local.display(), "Output downloaded");
        Ok(local)
    }

    // =========================================================================
    // Predict
    // =========================================================================

    /// Run a named endpoint once and return its output list
    #[instrument(skip(self, data))]
    pub async fn predict(&self, api_name: &str, data: Vec<Value>) -> Result<Vec<Value>> {
        let route = format!("run/{}", api_name.trim_start_matches('/'));
        let url = self.url(&route)?;

        let response = self
            .request(Method::POST, url)
            .json(&PredictRequest { data })
            .send()
            .await?;

        let result: PredictResponse = handle_response(response).await?;
        debug!(outputs = result.data.len(), duration = ?result.duration, "Predict finished");
        Ok(result.data)
    }

    /// Run a named endpoint and return its first output
    pub async fn predict_one(&self, api_name: &str, data: Vec<Value>) -> Result<Value> {
        self.predict(api_name, data)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::UnexpectedOutput("predict returned no outputs".into()))
    }
}

// =========================================================================
// Response Handling
// =========================================================================

async fn write_body(path: &Path, response: reqwest::Response) -> Result<()> {
    let mut out = tokio::fs::File::create(path).await?;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        out.write_all(&chunk?).await?;
    }
    out.flush().await?;
    Ok(())
}

async fn handle_response<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();

    if status.is_success() {
        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(e.to_string()))
    } else {
        Err(extract_error_from_status(response, status).await)
    }
}

async fn extract_error(response: reqwest::Response) -> ClientError {
    let status = response.status();
    extract_error_from_status(response, status).await
}

async fn extract_error_from_status(response: reqwest::Response, status: StatusCode) -> ClientError {
    let message = match response.json::<ErrorResponse>().await {
        Ok(err) => err.message().unwrap_or_else(|| format!("HTTP {}", status)),
        Err(_) => format!("HTTP {}", status),
    };

    ClientError::server_error(status.as_u16(), message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_full_url_adds_trailing_slash() {
        let url = resolve_endpoint("https://abc123.gradio.live").unwrap();
        assert_eq!(url.as_str(), "https://abc123.gradio.live/");

        let url = resolve_endpoint("https://virtual-try-on.hf.space/").unwrap();
        assert_eq!(url.as_str(), "https://virtual-try-on.hf.space/");
    }

    #[test]
    fn resolve_space_identifier() {
        let url = resolve_endpoint("dhaan-ish/text-to-cloth").unwrap();
        assert_eq!(url.as_str(), "https://dhaan-ish-text-to-cloth.hf.space/");

        let url = resolve_endpoint("Some_User/My.Space").unwrap();
        assert_eq!(url.as_str(), "https://some-user-my-space.hf.space/");
    }

    #[test]
    fn resolve_rejects_garbage() {
        assert!(matches!(
            resolve_endpoint("not an endpoint"),
            Err(ClientError::InvalidEndpoint(_))
        ));
        assert!(resolve_endpoint("a/b/c").is_err());
        assert!(resolve_endpoint("/leading").is_err());
    }

    #[test]
    fn api_url_without_prefix() {
        let base = Url::parse("http://127.0.0.1:7860/").unwrap();
        let url = api_url(&base, "", "run/predict").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:7860/run/predict");
    }

    #[test]
    fn api_url_with_prefix_and_sub_path() {
        let base = Url::parse("https://host.example/spaces/app/").unwrap();
        let url = api_url(&base, "/gradio_api", "/upload").unwrap();
        assert_eq!(url.as_str(), "https://host.example/spaces/app/gradio_api/upload");
    }

    #[test]
    fn api_url_for_remote_file() {
        let base = Url::parse("http://127.0.0.1:7860/").unwrap();
        let url = api_url(&base, "", "file=/tmp/gradio/x/out.png").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:7860/file=/tmp/gradio/x/out.png");
    }

    #[test]
    fn same_origin_compares_scheme_host_and_port() {
        let base = Url::parse("https://owner-app.hf.space/").unwrap();
        let own = Url::parse("https://owner-app.hf.space:443/file=/tmp/out.png").unwrap();
        let other_host = Url::parse("https://cdn.example/out.png").unwrap();
        let other_scheme = Url::parse("http://owner-app.hf.space/out.png").unwrap();

        assert!(same_origin(&base, &own));
        assert!(!same_origin(&base, &other_host));
        assert!(!same_origin(&base, &other_scheme));
    }

    #[test]
    fn token_is_only_attached_for_own_origin() {
        let client = Client::new();
        let base = Url::parse("http://127.0.0.1:7860/").unwrap();
        let token = HeaderValue::from_static("Bearer hf_secret");

        let own = request(
            &client,
            Some(&token),
            &base,
            Method::GET,
            base.join("config").unwrap(),
        )
        .build()
        .unwrap();
        assert_eq!(own.headers()[AUTHORIZATION], "Bearer hf_secret");

        let foreign = request(
            &client,
            Some(&token),
            &base,
            Method::GET,
            Url::parse("http://127.0.0.1:9999/out.png").unwrap(),
        )
        .build()
        .unwrap();
        assert!(foreign.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn default_options() {
        let options = ClientOptions::default();
        assert_eq!(options.timeout, DEFAULT_TIMEOUT);
        assert!(options.hf_token.is_none());
    }
}
