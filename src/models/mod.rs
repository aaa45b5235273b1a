use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CollectorError;

/// Listing operation queried on the API
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Sale,
    Rent,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Sale => "sale",
            Operation::Rent => "rent",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// API key/secret pair for one account
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialBundle {
    pub api_key: String,
    pub api_secret: String,
    pub account_label: String,
}

// Keeps the secret out of logs.
impl fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialBundle")
            .field("account_label", &self.account_label)
            .finish_non_exhaustive()
    }
}

/// Bearer token issued for one operation's collection
#[derive(Clone)]
pub struct AccessToken {
    pub bearer_value: String,
    pub issued_at: DateTime<Utc>,
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("issued_at", &self.issued_at)
            .finish_non_exhaustive()
    }
}

/// One page of search results, as written to storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingPage {
    pub operation: Operation,
    pub page_number: u32,
    pub total_pages: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_items: Option<u64>,
    pub fetched_at: DateTime<Utc>,
    /// Remaining response fields (`actualPage`, `itemsPerPage`, `summary`, ...)
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub envelope: serde_json::Map<String, serde_json::Value>,
    pub items: Vec<serde_json::Value>,
}

/// Invocation payload handed over by the scheduler
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    pub test_mode: bool,
}

impl Invocation {
    /// Parse the raw payload. Anything that is not an object with a boolean
    /// `test_mode` falls back to a normal run.
    pub fn from_payload(raw: &str) -> Self {
        let fields = match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(serde_json::Value::Object(fields)) => fields,
            Ok(other) => {
                tracing::warn!(payload = %other, "Ignoring non-object invocation payload");
                return Self::default();
            }
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable invocation payload");
                return Self::default();
            }
        };

        let test_mode = match fields.get("test_mode") {
            None => false,
            Some(serde_json::Value::Bool(flag)) => *flag,
            Some(other) => {
                tracing::warn!(value = %other, "test_mode is not a boolean, ignoring it");
                false
            }
        };

        Self { test_mode }
    }
}

/// Failure detail recorded for an operation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorDetail {
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl ErrorDetail {
    pub fn new(error: &CollectorError, page: Option<u32>) -> Self {
        Self {
            kind: error.kind().to_string(),
            message: error.to_string(),
            page,
        }
    }
}

/// Outcome of one operation's collection
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OperationSummary {
    pub pages_fetched: u32,
    pub items_fetched: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u32>,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

impl OperationSummary {
    pub fn failed(error: &CollectorError) -> Self {
        Self {
            error: Some(ErrorDetail::new(error, None)),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Complete,
    Partial,
    Failed,
}

/// Result returned to the invoker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_timestamp: String,
    pub test_mode: bool,
    pub status: RunStatus,
    pub operations: BTreeMap<Operation, OperationSummary>,
}

impl RunSummary {
    pub fn new(
        run_timestamp: String,
        test_mode: bool,
        operations: BTreeMap<Operation, OperationSummary>,
    ) -> Self {
        let succeeded = operations.values().filter(|s| s.succeeded).count();
        let status = if succeeded == operations.len() {
            RunStatus::Complete
        } else if succeeded == 0 {
            RunStatus::Failed
        } else {
            RunStatus::Partial
        };

        Self {
            run_timestamp,
            test_mode,
            status,
            operations,
        }
    }

    #[cfg(test)]
    pub fn operation(&self, operation: Operation) -> Option<&OperationSummary> {
        self.operations.get(&operation)
    }
}
