use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, ClientBuilder};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::CollectorError;
use crate::idealista::traits::{ApiConnector, ListingApi};
use crate::idealista::types::SearchConfig;
use crate::models::{AccessToken, CredentialBundle, ListingPage, Operation};

pub const DEFAULT_BASE_URL: &str = "https://api.idealista.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("idealista-collector/", env!("CARGO_PKG_VERSION"));

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(rename = "totalPages", alias = "total_pages")]
    total_pages: Option<u32>,
    #[serde(rename = "elementList", alias = "element_list", default)]
    element_list: Vec<serde_json::Value>,
    #[serde(default)]
    total: Option<u64>,
    #[serde(flatten)]
    envelope: serde_json::Map<String, serde_json::Value>,
}

fn http_client() -> ClientBuilder {
    Client::builder().timeout(REQUEST_TIMEOUT).user_agent(USER_AGENT)
}

/// Idealista API client for a single operation
pub struct IdealistaClient {
    client: Client,
    base_url: String,
}

impl IdealistaClient {
    pub fn new(base_url: &str) -> Result<Self, CollectorError> {
        Self::from_builder(http_client(), base_url)
    }

    fn from_builder(builder: ClientBuilder, base_url: &str) -> Result<Self, CollectorError> {
        let client = builder
            .build()
            .map_err(|e| CollectorError::ApiRequest(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn token_url(&self) -> String {
        format!("{}/oauth/token", self.base_url)
    }

    fn search_url(&self) -> String {
        format!("{}/3.5/{}/search", self.base_url, SearchConfig::COUNTRY)
    }
}

#[async_trait]
impl ListingApi for IdealistaClient {
    async fn issue_token(
        &self,
        credentials: &CredentialBundle,
    ) -> Result<AccessToken, CollectorError> {
        debug!(account = %credentials.account_label, "Requesting OAuth token");

        let response = self
            .client
            .post(self.token_url())
            .basic_auth(&credentials.api_key, Some(&credentials.api_secret))
            .form(&[("grant_type", "client_credentials"), ("scope", "read")])
            .send()
            .await
            .map_err(|e| CollectorError::Authentication(format!("token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            warn!(account = %credentials.account_label, %status, "Token endpoint rejected credentials");
            return Err(CollectorError::Authentication(format!(
                "token endpoint returned {}",
                status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| CollectorError::Authentication(format!("failed to read token response: {}", e)))?;

        parse_token(&body)
    }

    async fn fetch_page(
        &self,
        token: &AccessToken,
        query: &SearchConfig,
    ) -> Result<ListingPage, CollectorError> {
        let response = self
            .client
            .post(self.search_url())
            .bearer_auth(&token.bearer_value)
            .query(&query.query_params())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CollectorError::ApiRequest(format!("search request timed out: {}", e))
                } else {
                    CollectorError::ApiRequest(format!("search request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollectorError::ApiRequest(format!(
                "search endpoint returned {}",
                status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| CollectorError::ApiRequest(format!("failed to read search response: {}", e)))?;

        debug!(
            operation = %query.operation,
            page = query.page_number,
            bytes = body.len(),
            "Downloaded search page"
        );

        parse_search_page(&body, query)
    }
}

fn parse_token(body: &str) -> Result<AccessToken, CollectorError> {
    let parsed: TokenResponse = serde_json::from_str(body)
        .map_err(|e| CollectorError::Authentication(format!("malformed token payload: {}", e)))?;

    match parsed.access_token {
        Some(bearer_value) if !bearer_value.is_empty() => Ok(AccessToken {
            bearer_value,
            issued_at: Utc::now(),
        }),
        _ => Err(CollectorError::Authentication(
            "token payload has no access_token".to_string(),
        )),
    }
}

fn parse_search_page(body: &str, query: &SearchConfig) -> Result<ListingPage, CollectorError> {
    if body.trim().is_empty() {
        return Err(CollectorError::ApiResponseFormat(
            "empty response body, the rate limit may have been exceeded".to_string(),
        ));
    }

    let parsed: SearchResponse = serde_json::from_str(body)
        .map_err(|e| CollectorError::ApiResponseFormat(format!("invalid JSON: {}", e)))?;

    let total_pages = parsed.total_pages.ok_or_else(|| {
        CollectorError::ApiResponseFormat("response has no totalPages field".to_string())
    })?;

    Ok(ListingPage {
        operation: query.operation,
        page_number: query.page_number,
        total_pages,
        total_items: parsed.total,
        fetched_at: Utc::now(),
        envelope: parsed.envelope,
        items: parsed.element_list,
    })
}

/// Builds one [`IdealistaClient`] per operation
pub struct IdealistaConnector {
    base_url: String,
}

impl IdealistaConnector {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl ApiConnector for IdealistaConnector {
    fn connect(&self, operation: Operation) -> Result<Box<dyn ListingApi>, CollectorError> {
        info!(%operation, base_url = %self.base_url, "Creating API client");
        Ok(Box::new(IdealistaClient::new(&self.base_url)?))
    }
}
