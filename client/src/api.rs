use crate::credentials::ApiCredentials;
use crate::signer::UrlSigner;
use anyhow::{Context, Result};
use tracing::{debug, warn};

/// Signed-request client for the Baron weather API.
///
/// Every request path is prefixed with the API key, `{base}/{key}{api}`, and
/// signed freshly before it is sent.
pub struct ApiClient {
    base_url: String,
    credentials: ApiCredentials,
    signer: UrlSigner,
    client: reqwest::Client,
}

/// Raw response of one signed GET.
#[derive(Debug, Clone)]
pub struct Payload {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl Payload {
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.contains("json"))
            .unwrap_or(false)
    }

    /// The body as UTF-8 text, if it is text.
    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        credentials: ApiCredentials,
        signer: UrlSigner,
        timeout_secs: u64,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .context("Build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            signer,
            client,
        })
    }

    pub fn credentials(&self) -> &ApiCredentials {
        &self.credentials
    }

    /// Build the signed URL for an API path such as `/reports/metar/station/egll.json`.
    pub fn make_url(&self, api: &str) -> String {
        let url = if api.starts_with('/') {
            format!("{}/{}{}", self.base_url, self.credentials.api_key(), api)
        } else {
            format!("{}/{}/{}", self.base_url, self.credentials.api_key(), api)
        };
        self.signer.sign_with(&url, &self.credentials)
    }

    /// Signed GET of an API path.
    pub async fn get(&self, api: &str) -> Result<Payload> {
        debug!("GET {}", redact_signature(api));
        self.fetch(&self.make_url(api)).await
    }

    /// Signed GET of a full URL (signed here, without the key prefix).
    pub async fn get_url(&self, url: &str) -> Result<Payload> {
        debug!("GET {}", redact_signature(url));
        self.fetch(&self.signer.sign_with(url, &self.credentials)).await
    }

    /// Signed GET of an API path, decoded as JSON.
    pub async fn get_json(&self, api: &str) -> Result<serde_json::Value> {
        let payload = self.get(api).await?;
        serde_json::from_slice(&payload.body).with_context(|| format!("Parse JSON from {api}"))
    }

    async fn fetch(&self, signed_url: &str) -> Result<Payload> {
        let resp = self
            .client
            .get(signed_url)
            .send()
            .await
            .context("Weather API request")?;

        let status = resp.status();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!("Weather API returned {status}");
            let snippet: String = body.chars().take(200).collect();
            anyhow::bail!("Weather API request failed {status}: {snippet}");
        }

        let body = resp.bytes().await.context("Read weather API response")?.to_vec();
        debug!("Received {} bytes ({})", body.len(), content_type.as_deref().unwrap_or("?"));

        Ok(Payload {
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}

/// `url` with every `sig` query value replaced, for logging.
fn redact_signature(url: &str) -> String {
    let Some((head, query)) = url.split_once('?') else {
        return url.to_string();
    };

    let query = query
        .split('&')
        .map(|param| {
            if param.starts_with("sig=") {
                "sig=[REDACTED]"
            } else {
                param
            }
        })
        .collect::<Vec<_>>()
        .join("&");

    format!("{head}?{query}")
}
