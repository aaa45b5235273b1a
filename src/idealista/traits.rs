use async_trait::async_trait;

use crate::error::CollectorError;
use crate::idealista::types::SearchConfig;
use crate::models::{AccessToken, CredentialBundle, ListingPage, Operation};

/// Listing search API as seen by one operation's collection
#[async_trait]
pub trait ListingApi: Send + Sync {
    /// Exchange credentials for a bearer token
    async fn issue_token(&self, credentials: &CredentialBundle)
        -> Result<AccessToken, CollectorError>;

    /// Fetch a single page of results
    async fn fetch_page(
        &self,
        token: &AccessToken,
        query: &SearchConfig,
    ) -> Result<ListingPage, CollectorError>;
}

/// Hands out a fresh API client for each operation, so concurrent operations
/// never share connection state.
pub trait ApiConnector: Send + Sync {
    fn connect(&self, operation: Operation) -> Result<Box<dyn ListingApi>, CollectorError>;
}
