use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::collector::PaginatedCollector;
use crate::error::CollectorError;
use crate::idealista::ApiConnector;
use crate::models::{Invocation, Operation, OperationSummary, RunStatus, RunSummary};
use crate::secrets::{resolve_credentials, SecretStore};
use crate::storage::ObjectWriter;

/// Secret name holding the credentials for each operation
#[derive(Debug, Clone)]
pub struct SecretNames {
    pub sale: String,
    pub rent: String,
}

impl SecretNames {
    pub fn for_operation(&self, operation: Operation) -> &str {
        match operation {
            Operation::Sale => &self.sale,
            Operation::Rent => &self.rent,
        }
    }
}

/// Timestamp embedded in every object key of a run
pub fn run_timestamp(started_at: DateTime<Utc>) -> String {
    started_at.format("%Y%m%d_%H%M%S").to_string()
}

/// Entry point of a collection run. Sale and rent are collected
/// concurrently and never affect each other.
pub struct Orchestrator {
    secrets: Arc<dyn SecretStore>,
    connector: Arc<dyn ApiConnector>,
    writer: ObjectWriter,
    secret_names: SecretNames,
}

impl Orchestrator {
    pub fn new(
        secrets: Arc<dyn SecretStore>,
        connector: Arc<dyn ApiConnector>,
        writer: ObjectWriter,
        secret_names: SecretNames,
    ) -> Self {
        Self {
            secrets,
            connector,
            writer,
            secret_names,
        }
    }

    pub async fn run(&self, invocation: &Invocation, started_at: DateTime<Utc>) -> RunSummary {
        let timestamp = run_timestamp(started_at);
        if invocation.test_mode {
            info!("Running in TEST MODE - only 1 page per operation");
        }
        info!(%timestamp, "Starting collection run");

        let (sale, rent) = tokio::join!(
            self.run_operation(Operation::Sale, &timestamp, invocation.test_mode),
            self.run_operation(Operation::Rent, &timestamp, invocation.test_mode),
        );

        let operations = BTreeMap::from([(Operation::Sale, sale), (Operation::Rent, rent)]);
        let summary = RunSummary::new(timestamp, invocation.test_mode, operations);

        match summary.status {
            RunStatus::Complete => info!("✅ Collection run complete"),
            RunStatus::Partial => warn!("Collection run finished with a failed operation"),
            RunStatus::Failed => error!("Both operations failed"),
        }
        for (operation, result) in &summary.operations {
            info!(
                %operation,
                pages = result.pages_fetched,
                items = result.items_fetched,
                succeeded = result.succeeded,
                "Operation result"
            );
        }

        summary
    }

    async fn run_operation(
        &self,
        operation: Operation,
        timestamp: &str,
        test_mode: bool,
    ) -> OperationSummary {
        match self.prepare_and_collect(operation, timestamp, test_mode).await {
            Ok(summary) => summary,
            Err(e) => {
                error!(%operation, kind = e.kind(), "Could not start {} collection: {}", operation, e);
                OperationSummary::failed(&e)
            }
        }
    }

    async fn prepare_and_collect(
        &self,
        operation: Operation,
        timestamp: &str,
        test_mode: bool,
    ) -> Result<OperationSummary, CollectorError> {
        let secret_name = self.secret_names.for_operation(operation);
        info!(%operation, secret = secret_name, "Retrieving credentials");
        let credentials = resolve_credentials(self.secrets.as_ref(), secret_name).await?;

        let api = self.connector.connect(operation)?;
        let token = api.issue_token(&credentials).await?;
        info!(
            %operation,
            account = %credentials.account_label,
            issued_at = %token.issued_at,
            "Authenticated"
        );

        let collector = PaginatedCollector::new(api.as_ref(), &self.writer, timestamp, test_mode);
        Ok(collector.collect(operation, &token).await)
    }
}
