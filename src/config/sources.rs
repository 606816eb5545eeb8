//! Concrete [`SecretSource`] implementations.
//!
//! [`EnvSecretSource`] reads a single environment variable.
//! [`FileSecretSource`] reads a JSON object such as
//! `{"client_secret": "..."}` from disk asynchronously via Tokio.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;

use super::{ClientSecret, SecretSource, CLIENT_SECRET_KEY};
use crate::error::RelayError;

pub struct EnvSecretSource {
    var: String,
}

impl EnvSecretSource {
    #[must_use]
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

#[async_trait]
impl SecretSource for EnvSecretSource {
    fn name(&self) -> String {
        format!("env:{}", self.var)
    }

    async fn load(&self) -> Result<ClientSecret, RelayError> {
        std::env::var(&self.var)
            .ok()
            .filter(|v| !v.is_empty())
            .map(ClientSecret::new)
            .ok_or_else(|| RelayError::MissingSecret {
                source_name: self.name(),
                key: CLIENT_SECRET_KEY,
            })
    }
}

pub struct FileSecretSource {
    path: PathBuf,
}

impl FileSecretSource {
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    async fn read_content(&self) -> Result<String, RelayError> {
        tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RelayError::SecretsFileNotFound {
                    path: self.path.clone(),
                }
            } else {
                RelayError::Io(e)
            }
        })
    }
}

#[async_trait]
impl SecretSource for FileSecretSource {
    fn name(&self) -> String {
        format!("file:{}", self.path.display())
    }

    async fn load(&self) -> Result<ClientSecret, RelayError> {
        let content = self.read_content().await?;
        parse_secrets_json(&content, &self.path.display().to_string())
    }
}

/// Extract the client secret from a secrets file body.
///
/// Unknown keys are ignored so the same file can hold other credentials.
pub fn parse_secrets_json(content: &str, path_display: &str) -> Result<ClientSecret, RelayError> {
    let parsed: HashMap<String, String> =
        serde_json::from_str(content).map_err(|e| RelayError::SecretsParse {
            path: path_display.to_string(),
            source: Box::new(e),
        })?;

    parsed
        .get(CLIENT_SECRET_KEY)
        .filter(|v| !v.is_empty())
        .map(|v| ClientSecret::new(v.as_str()))
        .ok_or_else(|| RelayError::MissingSecret {
            source_name: format!("file:{path_display}"),
            key: CLIENT_SECRET_KEY,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_client_secret() {
        let secret = parse_secrets_json(
            r#"{"client_secret": "abc", "client_id": "id"}"#,
            "secrets.json",
        )
        .unwrap();
        assert_eq!(secret.expose(), "abc");
    }

    #[test]
    fn missing_key_is_an_error() {
        let err = parse_secrets_json(r#"{"client_id": "id"}"#, "secrets.json").unwrap_err();
        assert!(matches!(err, RelayError::MissingSecret { .. }));
    }

    #[test]
    fn empty_value_is_an_error() {
        assert!(parse_secrets_json(r#"{"client_secret": ""}"#, "secrets.json").is_err());
    }

    #[test]
    fn malformed_json_reports_path() {
        let err = parse_secrets_json("{not json", "secrets.json").unwrap_err();
        assert!(err.to_string().contains("secrets.json"));
    }

    #[test]
    fn parse_error_never_contains_secret() {
        // Non-string values fail the map parse; the message must not echo content
        let err = parse_secrets_json(r#"{"client_secret": 42, "x": "hunter2"}"#, "s.json")
            .unwrap_err();
        assert!(!err.to_string().contains("hunter2"));
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let source = FileSecretSource::new(PathBuf::from("/nonexistent/secrets.json"));
        assert!(matches!(
            source.load().await,
            Err(RelayError::SecretsFileNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn file_source_reads_disk() {
        let path = std::env::temp_dir().join(format!("tokenrelay-{}.json", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, r#"{"client_secret":"from-file"}"#)
            .await
            .unwrap();
        let secret = FileSecretSource::new(path.clone()).load().await.unwrap();
        assert_eq!(secret.expose(), "from-file");
        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn env_source_missing_var_errors() {
        let source = EnvSecretSource::new("TOKENRELAY_TEST_UNSET_VARIABLE");
        assert!(source.load().await.is_err());
    }
}
