//! `tokenrelay validate` — check the secret source and upstream.
//!
//! Resolves everything `run` needs before binding, reporting results in
//! either human-readable text or machine-readable JSON format. The secret
//! value is never printed, only the source it came from.

use serde::Serialize;

use crate::cli::{ValidateArgs, ValidateFormat};
use crate::config::Upstream;
use crate::error::RelayError;

#[derive(Debug, Serialize)]
pub struct ValidateReport {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn execute(args: &ValidateArgs) -> Result<(), RelayError> {
    let resolved = async {
        let upstream = Upstream::parse(&args.secrets.upstream)?;
        let (_secret, source) = super::secret_resolver(&args.secrets).load().await?;
        Ok::<_, RelayError>((upstream, source))
    }
    .await;

    match resolved {
        Ok((upstream, source)) => {
            match args.format {
                ValidateFormat::Text => {
                    println!("\u{2713} client secret loaded from {source}");
                    println!("  upstream: {upstream}");
                }
                ValidateFormat::Json => print_json(&ValidateReport {
                    valid: true,
                    upstream: Some(upstream.to_string()),
                    secret_source: Some(source),
                    error: None,
                }),
            }
            Ok(())
        }
        Err(e) => {
            match args.format {
                ValidateFormat::Text => eprintln!("\u{2717} {e}\n"),
                ValidateFormat::Json => print_json(&ValidateReport {
                    valid: false,
                    upstream: None,
                    secret_source: None,
                    error: Some(e.to_string()),
                }),
            }
            Err(e)
        }
    }
}

fn print_json(report: &ValidateReport) {
    match serde_json::to_string(report) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Failed to serialize report: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::SecretArgs;

    fn args(secrets_file: &str, upstream: &str) -> ValidateArgs {
        ValidateArgs {
            secrets: SecretArgs {
                secrets_file: secrets_file.into(),
                client_secret_env: "TOKENRELAY_TEST_UNSET_VARIABLE".into(),
                upstream: upstream.into(),
            },
            format: ValidateFormat::Json,
        }
    }

    #[tokio::test]
    async fn missing_secrets_file_fails() {
        let result = execute(&args("/nonexistent/secrets.json", "https://example.com")).await;
        assert!(matches!(result, Err(RelayError::SecretsFileNotFound { .. })));
    }

    #[tokio::test]
    async fn bad_upstream_fails_before_secret_lookup() {
        let result = execute(&args("/nonexistent/secrets.json", "https://example.com/x")).await;
        assert!(matches!(result, Err(RelayError::InvalidUpstream { .. })));
    }

    #[tokio::test]
    async fn valid_file_passes() {
        let path = std::env::temp_dir().join(format!("tokenrelay-{}.json", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, r#"{"client_secret":"abc"}"#)
            .await
            .unwrap();
        let result = execute(&args(path.to_str().unwrap(), "https://example.com")).await;
        let _ = tokio::fs::remove_file(&path).await;
        assert!(result.is_ok());
    }

    #[test]
    fn report_omits_empty_fields() {
        let report = ValidateReport {
            valid: false,
            upstream: None,
            secret_source: None,
            error: Some("boom".into()),
        };
        assert_eq!(
            serde_json::to_string(&report).unwrap(),
            r#"{"valid":false,"error":"boom"}"#
        );
    }
}
