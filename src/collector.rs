use tracing::{error, info, warn};

use crate::error::CollectorError;
use crate::idealista::{ListingApi, SearchConfig};
use crate::models::{AccessToken, ErrorDetail, Operation, OperationSummary};
use crate::storage::ObjectWriter;

/// Pages through one operation's search results, writing each page before
/// asking for the next one.
pub struct PaginatedCollector<'a> {
    api: &'a dyn ListingApi,
    writer: &'a ObjectWriter,
    timestamp: &'a str,
    test_mode: bool,
}

impl<'a> PaginatedCollector<'a> {
    pub fn new(
        api: &'a dyn ListingApi,
        writer: &'a ObjectWriter,
        timestamp: &'a str,
        test_mode: bool,
    ) -> Self {
        Self {
            api,
            writer,
            timestamp,
            test_mode,
        }
    }

    /// Whether page `page + 1` should be requested. `total_pages` comes from
    /// page 1 and stays fixed for the whole run.
    fn has_next(&self, page: u32, total_pages: u32) -> bool {
        page < total_pages && !self.test_mode
    }

    /// Collect every page for `operation`. Failures stop pagination and are
    /// recorded in the returned summary; pages already written stay written.
    pub async fn collect(&self, operation: Operation, token: &AccessToken) -> OperationSummary {
        let base = SearchConfig::valencia(operation);
        let mut summary = OperationSummary::default();
        let mut page = 1;

        loop {
            let total_label = summary
                .total_pages
                .map_or_else(|| "?".to_string(), |t| t.to_string());
            info!(%operation, page, "Processing {} page {}/{}", operation, page, total_label);

            let query = base.for_page(page);
            let listing = match self.api.fetch_page(token, &query).await {
                Ok(listing) => listing,
                Err(e) => return self.fail(operation, summary, page, e),
            };

            let total_pages = *summary.total_pages.get_or_insert(listing.total_pages);
            if listing.total_pages != total_pages {
                warn!(
                    %operation,
                    page,
                    reported = listing.total_pages,
                    total_pages,
                    "Page count changed mid-run, keeping the first one"
                );
            }

            let items = listing.items.len() as u64;
            if let Err(e) = self.writer.write_page(&listing, self.timestamp).await {
                return self.fail(operation, summary, page, e);
            }
            summary.pages_fetched += 1;
            summary.items_fetched += items;

            if !self.has_next(page, total_pages) {
                if self.test_mode && page < total_pages {
                    info!(%operation, total_pages, "Test mode, stopping after first page");
                }
                break;
            }
            page += 1;
        }

        info!(
            %operation,
            pages = summary.pages_fetched,
            items = summary.items_fetched,
            "Completed {} operation",
            operation
        );
        summary.succeeded = true;
        summary
    }

    fn fail(
        &self,
        operation: Operation,
        mut summary: OperationSummary,
        page: u32,
        error: CollectorError,
    ) -> OperationSummary {
        error!(
            %operation,
            page,
            kind = error.kind(),
            pages_written = summary.pages_fetched,
            "Stopping {} collection: {}",
            operation,
            error
        );
        summary.succeeded = false;
        summary.error = Some(ErrorDetail::new(&error, Some(page)));
        summary
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{CredentialBundle, ListingPage};
    use crate::storage::tests::MemoryObjectStore;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::{Arc, Mutex};

    /// Scripted API: fixed page count, optional failing page
    pub struct FakeApi {
        pub total_pages: u32,
        pub items_per_page: usize,
        pub fail_on_page: Option<u32>,
        pub fail_auth: bool,
        pub requested: Mutex<Vec<u32>>,
    }

    impl FakeApi {
        pub fn with_pages(total_pages: u32) -> Self {
            Self {
                total_pages,
                items_per_page: 2,
                fail_on_page: None,
                fail_auth: false,
                requested: Mutex::new(Vec::new()),
            }
        }

        pub fn requested(&self) -> Vec<u32> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ListingApi for FakeApi {
        async fn issue_token(
            &self,
            credentials: &CredentialBundle,
        ) -> Result<AccessToken, CollectorError> {
            if self.fail_auth {
                return Err(CollectorError::Authentication(
                    "token endpoint returned 401 Unauthorized".into(),
                ));
            }
            Ok(AccessToken {
                bearer_value: format!("token-for-{}", credentials.api_key),
                issued_at: Utc::now(),
            })
        }

        async fn fetch_page(
            &self,
            _token: &AccessToken,
            query: &SearchConfig,
        ) -> Result<ListingPage, CollectorError> {
            self.requested.lock().unwrap().push(query.page_number);
            if self.fail_on_page == Some(query.page_number) {
                return Err(CollectorError::ApiRequest(
                    "search endpoint returned 500 Internal Server Error".into(),
                ));
            }
            Ok(ListingPage {
                operation: query.operation,
                page_number: query.page_number,
                total_pages: self.total_pages,
                total_items: None,
                fetched_at: Utc::now(),
                envelope: serde_json::Map::new(),
                items: (0..self.items_per_page)
                    .map(|i| serde_json::json!({"propertyCode": format!("{}-{}", query.page_number, i)}))
                    .collect(),
            })
        }
    }

    pub fn token() -> AccessToken {
        AccessToken {
            bearer_value: "t".into(),
            issued_at: Utc::now(),
        }
    }

    const TS: &str = "20250101_120000";

    #[tokio::test]
    async fn collects_every_page() {
        let api = FakeApi::with_pages(3);
        let store = Arc::new(MemoryObjectStore::default());
        let writer = ObjectWriter::new(store.clone(), "bucket", "bronze/");

        let summary = PaginatedCollector::new(&api, &writer, TS, false)
            .collect(Operation::Sale, &token())
            .await;

        assert!(summary.succeeded);
        assert_eq!(summary.pages_fetched, 3);
        assert_eq!(summary.items_fetched, 6);
        assert_eq!(summary.total_pages, Some(3));
        assert_eq!(api.requested(), vec![1, 2, 3]);
        assert_eq!(store.keys().len(), 3);
    }

    #[tokio::test]
    async fn test_mode_fetches_a_single_page() {
        for total_pages in [1, 2, 5, 40] {
            let api = FakeApi::with_pages(total_pages);
            let store = Arc::new(MemoryObjectStore::default());
            let writer = ObjectWriter::new(store.clone(), "bucket", "bronze/");

            let summary = PaginatedCollector::new(&api, &writer, TS, true)
                .collect(Operation::Rent, &token())
                .await;

            assert!(summary.succeeded);
            assert_eq!(summary.pages_fetched, 1);
            assert_eq!(api.requested(), vec![1]);
            assert_eq!(store.keys(), vec!["bucket/bronze/rent_20250101_120000_1.json"]);
        }
    }

    #[tokio::test]
    async fn empty_result_set_stops_after_first_page() {
        let mut api = FakeApi::with_pages(0);
        api.items_per_page = 0;
        let store = Arc::new(MemoryObjectStore::default());
        let writer = ObjectWriter::new(store.clone(), "bucket", "");

        let summary = PaginatedCollector::new(&api, &writer, TS, false)
            .collect(Operation::Sale, &token())
            .await;

        assert!(summary.succeeded);
        assert_eq!(summary.pages_fetched, 1);
        assert_eq!(summary.items_fetched, 0);
        assert_eq!(store.keys().len(), 1);
    }

    #[tokio::test]
    async fn failure_on_second_page_keeps_first() {
        let mut api = FakeApi::with_pages(5);
        api.fail_on_page = Some(2);
        let store = Arc::new(MemoryObjectStore::default());
        let writer = ObjectWriter::new(store.clone(), "bucket", "bronze/");

        let summary = PaginatedCollector::new(&api, &writer, TS, false)
            .collect(Operation::Sale, &token())
            .await;

        assert!(!summary.succeeded);
        assert_eq!(summary.pages_fetched, 1);
        assert_eq!(api.requested(), vec![1, 2]);
        assert_eq!(store.keys(), vec!["bucket/bronze/sale_20250101_120000_1.json"]);

        let error = summary.error.unwrap();
        assert_eq!(error.kind, "api_request");
        assert_eq!(error.page, Some(2));
    }

    #[tokio::test]
    async fn write_failure_stops_pagination() {
        let api = FakeApi::with_pages(4);
        let store = Arc::new(MemoryObjectStore::failing_on("_2.json"));
        let writer = ObjectWriter::new(store.clone(), "bucket", "bronze/");

        let summary = PaginatedCollector::new(&api, &writer, TS, false)
            .collect(Operation::Rent, &token())
            .await;

        assert!(!summary.succeeded);
        assert_eq!(summary.pages_fetched, 1);
        assert_eq!(summary.error.unwrap().kind, "storage_write");
        assert_eq!(api.requested(), vec![1, 2]);
        assert_eq!(store.put_count(), 2);
        assert_eq!(store.keys().len(), 1);
    }

    #[tokio::test]
    async fn first_page_failure_writes_nothing() {
        let mut api = FakeApi::with_pages(3);
        api.fail_on_page = Some(1);
        let store = Arc::new(MemoryObjectStore::default());
        let writer = ObjectWriter::new(store.clone(), "bucket", "");

        let summary = PaginatedCollector::new(&api, &writer, TS, false)
            .collect(Operation::Sale, &token())
            .await;

        assert!(!summary.succeeded);
        assert_eq!(summary.pages_fetched, 0);
        assert_eq!(summary.total_pages, None);
        assert!(store.keys().is_empty());
    }
}
