use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::error::ApiError;
use crate::view::DEFAULT_ITEMS_PER_PAGE;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_SESSION_FILE: &str = ".duty_desk_session.json";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_url: Url,
    pub timeout: Duration,
    pub items_per_page: usize,
    pub session_file: PathBuf,
}

impl ApiConfig {
    pub fn new(api_url: &str) -> Result<Self> {
        Ok(Self {
            api_url: normalize_base_url(api_url)?,
            timeout: DEFAULT_TIMEOUT,
            items_per_page: DEFAULT_ITEMS_PER_PAGE,
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
        })
    }

    /// Creates a config from environment variables, loading `.env` first
    pub fn from_env() -> Result<Self> {
        Self::from_env_with_url(None)
    }

    /// Creates a config from environment variables with an optional API URL
    /// that takes precedence over `DUTY_DESK_API_URL`
    pub fn from_env_with_url(api_url: Option<String>) -> Result<Self> {
        dotenv::dotenv().ok();

        let api_url = match api_url {
            Some(url) => url,
            None => std::env::var("DUTY_DESK_API_URL")
                .map_err(|_| anyhow!("DUTY_DESK_API_URL environment variable is required"))?,
        };
        let mut config = Self::new(&api_url)?;

        if let Ok(secs) = std::env::var("DUTY_DESK_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|_| anyhow!("DUTY_DESK_TIMEOUT_SECS must be a whole number of seconds"))?;
            config.timeout = Duration::from_secs(secs.max(1));
        }

        if let Ok(size) = std::env::var("DUTY_DESK_PAGE_SIZE") {
            let size: usize = size
                .parse()
                .map_err(|_| anyhow!("DUTY_DESK_PAGE_SIZE must be a positive number"))?;
            config.items_per_page = size.max(1);
        }

        if let Ok(path) = std::env::var("DUTY_DESK_SESSION_FILE") {
            config.session_file = PathBuf::from(path);
        }

        Ok(config)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Parses a base URL and makes sure it ends with `/`, so collection paths
/// join under it instead of replacing its last segment.
pub fn normalize_base_url(raw: &str) -> Result<Url> {
    let mut raw = raw.trim().to_string();
    if !raw.ends_with('/') {
        raw.push('/');
    }
    Url::parse(&raw).map_err(|e| anyhow!("invalid API URL {raw}: {e}"))
}

/// JSON-over-HTTP access to the REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    config: ApiConfig,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.config.api_url.join(path)?)
    }

    /// URL of one record, with `id` percent-encoded as a single path segment.
    pub fn item_url(&self, collection: &str, id: &str) -> Result<Url, ApiError> {
        let mut url = self.url(collection)?;
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .push(id);
        Ok(url)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path)?;
        tracing::debug!(%url, "GET");
        let response = self.http.get(url).send().await.map_err(self.classify())?;
        decode(response, self.timeout()).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path)?;
        tracing::debug!(%url, "POST");
        let response = self.http.post(url).json(body).send().await.map_err(self.classify())?;
        decode(response, self.timeout()).await
    }

    pub async fn put<B, T>(&self, url: Url, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        tracing::debug!(%url, "PUT");
        let response = self.http.put(url).json(body).send().await.map_err(self.classify())?;
        decode(response, self.timeout()).await
    }

    /// Deletes a resource; any 2xx counts as success and the body is ignored.
    pub async fn delete(&self, url: Url) -> Result<(), ApiError> {
        tracing::debug!(%url, "DELETE");
        let response = self.http.delete(url).send().await.map_err(self.classify())?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status.as_u16(), &body));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    fn classify(&self) -> impl Fn(reqwest::Error) -> ApiError {
        classify(self.timeout())
    }
}

/// Maps reqwest errors, turning its timeouts into [`ApiError::Timeout`].
fn classify(timeout: Duration) -> impl Fn(reqwest::Error) -> ApiError {
    move |err| {
        if err.is_timeout() {
            ApiError::Timeout(timeout)
        } else {
            ApiError::Request(err)
        }
    }
}

async fn decode<T: DeserializeOwned>(
    response: reqwest::Response,
    timeout: Duration,
) -> Result<T, ApiError> {
    let status = response.status();
    let body = response.text().await.map_err(classify(timeout))?;

    if !status.is_success() {
        return Err(status_error(status.as_u16(), &body));
    }

    // Try to parse as the expected type first
    match serde_json::from_str::<T>(&body) {
        Ok(value) => Ok(value),
        Err(e) => {
            // Some backends answer 200 with an error envelope
            if let Ok(error_response) = serde_json::from_str::<serde_json::Value>(&body) {
                if let Some(error_msg) = error_response.get("error") {
                    return Err(ApiError::Decode(format!("API error: {}", error_msg)));
                }
            }
            Err(ApiError::Decode(format!("{e}: {body}")))
        }
    }
}

/// Builds a status error, preferring an `error` or `message` field from a
/// JSON body over the raw text.
fn status_error(status: u16, body: &str) -> ApiError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .or_else(|| value.get("message"))
                .map(|m| match m {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
        })
        .unwrap_or_else(|| body.trim().to_string());
    ApiError::Status { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_trailing_slash() {
        let url = normalize_base_url("http://localhost:5000/api").unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/");
        assert_eq!(
            url.join("duties/abc").unwrap().as_str(),
            "http://localhost:5000/api/duties/abc"
        );
        assert!(normalize_base_url("not a url").is_err());
    }

    #[test]
    fn item_urls_keep_ids_in_one_segment() {
        let client = ApiClient::new(ApiConfig::new("http://localhost:5000/api").unwrap()).unwrap();
        let url = |id| client.item_url("duties", id).unwrap().to_string();
        assert_eq!(url("665f1c2a"), "http://localhost:5000/api/duties/665f1c2a");
        assert_eq!(url("a/b"), "http://localhost:5000/api/duties/a%2Fb");
        assert_eq!(url("night shift"), "http://localhost:5000/api/duties/night%20shift");
        assert_eq!(url("a+b"), "http://localhost:5000/api/duties/a+b");
    }

    #[test]
    fn status_error_prefers_message_field() {
        match status_error(400, r#"{"message":"Badge number already exists"}"#) {
            ApiError::Status { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Badge number already exists");
            }
            other => panic!("unexpected {other:?}"),
        }
        match status_error(502, "Bad Gateway\n") {
            ApiError::Status { message, .. } => assert_eq!(message, "Bad Gateway"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn config_defaults() {
        let config = ApiConfig::new("http://localhost:5000").unwrap();
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.items_per_page, 20);
        let client = ApiClient::new(config.with_timeout(Duration::from_secs(3))).unwrap();
        assert_eq!(client.timeout(), Duration::from_secs(3));
    }
}
