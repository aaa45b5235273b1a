use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::CollectorError;
use crate::models::CredentialBundle;

/// Secret store lookups by logical name
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Returns the raw secret string stored under `name`
    async fn get_secret(&self, name: &str) -> Result<String, CollectorError>;
}

/// Secrets kept in a JSON document of `name -> secret` entries. A secret is
/// either a JSON object or a string holding one.
pub struct FileSecretStore {
    path: PathBuf,
}

impl FileSecretStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SecretStore for FileSecretStore {
    async fn get_secret(&self, name: &str) -> Result<String, CollectorError> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            warn!(path = %self.path.display(), error = %e, "Secrets file unavailable");
            CollectorError::CredentialNotFound {
                name: name.to_string(),
            }
        })?;

        let document: Value =
            serde_json::from_str(&raw).map_err(|e| CollectorError::CredentialFormat {
                name: name.to_string(),
                reason: format!("secrets file is not valid JSON: {}", e),
            })?;

        match document.get(name) {
            Some(Value::String(secret)) => Ok(secret.clone()),
            Some(other) => Ok(other.to_string()),
            None => Err(CollectorError::CredentialNotFound {
                name: name.to_string(),
            }),
        }
    }
}

/// Fetch the secret named `name` and parse it into a credential bundle
pub async fn resolve_credentials(
    store: &dyn SecretStore,
    name: &str,
) -> Result<CredentialBundle, CollectorError> {
    debug!(secret = name, "Resolving credentials");
    let raw = store.get_secret(name).await?;
    parse_credentials(name, &raw)
}

fn parse_credentials(name: &str, raw: &str) -> Result<CredentialBundle, CollectorError> {
    let format_error = |reason: &str| CollectorError::CredentialFormat {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    let value: Value = serde_json::from_str(raw).map_err(|_| format_error("not valid JSON"))?;
    let fields = value
        .as_object()
        .ok_or_else(|| format_error("expected a JSON object"))?;

    let required = |field: &str| -> Result<String, CollectorError> {
        match fields.get(field).and_then(Value::as_str) {
            Some(v) if !v.trim().is_empty() => Ok(v.to_string()),
            _ => Err(format_error(&format!("missing field {}", field))),
        }
    };

    let account_label = fields
        .get("account")
        .and_then(Value::as_str)
        .filter(|v| !v.is_empty())
        .unwrap_or(name)
        .to_string();

    Ok(CredentialBundle {
        api_key: required("api_key")?,
        api_secret: required("api_secret")?,
        account_label,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;

    /// In-memory store for tests
    #[derive(Default)]
    pub struct MemorySecretStore {
        secrets: HashMap<String, String>,
    }

    impl MemorySecretStore {
        pub fn with(mut self, name: &str, secret: &str) -> Self {
            self.secrets.insert(name.to_string(), secret.to_string());
            self
        }
    }

    #[async_trait]
    impl SecretStore for MemorySecretStore {
        async fn get_secret(&self, name: &str) -> Result<String, CollectorError> {
            self.secrets
                .get(name)
                .cloned()
                .ok_or_else(|| CollectorError::CredentialNotFound {
                    name: name.to_string(),
                })
        }
    }

    #[tokio::test]
    async fn resolves_complete_bundle() {
        let store = MemorySecretStore::default().with(
            "idealista/lvw",
            r#"{"api_key":"k","api_secret":"s","account":"lvw"}"#,
        );
        let creds = resolve_credentials(&store, "idealista/lvw").await.unwrap();
        assert_eq!(creds.api_key, "k");
        assert_eq!(creds.api_secret, "s");
        assert_eq!(creds.account_label, "lvw");
    }

    #[tokio::test]
    async fn account_defaults_to_secret_name() {
        let store =
            MemorySecretStore::default().with("pmv", r#"{"api_key":"k","api_secret":"s"}"#);
        let creds = resolve_credentials(&store, "pmv").await.unwrap();
        assert_eq!(creds.account_label, "pmv");
    }

    #[tokio::test]
    async fn missing_secret_is_not_found() {
        let store = MemorySecretStore::default();
        let err = resolve_credentials(&store, "nope").await.unwrap_err();
        assert_eq!(err.kind(), "credential_not_found");
    }

    #[tokio::test]
    async fn incomplete_payloads_are_format_errors() {
        let store = MemorySecretStore::default()
            .with("no-secret", r#"{"api_key":"k"}"#)
            .with("blank-key", r#"{"api_key":"  ","api_secret":"s"}"#)
            .with("array", r#"["k","s"]"#)
            .with("garbage", "api_key=k");

        for name in ["no-secret", "blank-key", "array", "garbage"] {
            let err = resolve_credentials(&store, name).await.unwrap_err();
            assert_eq!(err.kind(), "credential_format", "secret {}", name);
        }
    }

    #[tokio::test]
    async fn file_store_reads_objects_and_strings() {
        let dir = std::env::temp_dir().join(format!("secrets-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("secrets.json");
        tokio::fs::write(
            &path,
            r#"{
                "lvw": {"api_key": "k1", "api_secret": "s1"},
                "pmv": "{\"api_key\": \"k2\", \"api_secret\": \"s2\"}"
            }"#,
        )
        .await
        .unwrap();

        let store = FileSecretStore::new(&path);
        assert_eq!(resolve_credentials(&store, "lvw").await.unwrap().api_key, "k1");
        assert_eq!(resolve_credentials(&store, "pmv").await.unwrap().api_secret, "s2");
        assert_eq!(
            resolve_credentials(&store, "other").await.unwrap_err().kind(),
            "credential_not_found"
        );

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
