//! Process configuration and client-secret loading.
//!
//! [`Config`] is built once at startup and shared read-only for the
//! process lifetime. The client secret comes from a [`SecretSource`];
//! [`SecretResolver`] tries each configured source in priority order
//! (environment first, then the secrets file). [`Upstream`] is the fixed
//! scheme and authority every request is forwarded to.

pub mod sources;

use std::fmt;

use async_trait::async_trait;

use crate::error::RelayError;

/// Scheme and host used when no `--upstream` override is given.
pub const DEFAULT_UPSTREAM: &str = "https://oauth2.googleapis.com";

/// Form key the secret is injected under, and the key read from the secrets file.
pub const CLIENT_SECRET_KEY: &str = "client_secret";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub client_secret: ClientSecret,
}

/// The server-held OAuth2 client secret.
///
/// `Debug` is redacted and there is no `Display`, so the value cannot end up
/// in a log line or error body by accident. Use [`expose`](Self::expose) at
/// the single point where it is written into the outbound form.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientSecret(String);

impl ClientSecret {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ClientSecret(******)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upstream {
    scheme: String,
    authority: String,
}

impl Upstream {
    /// Parse an upstream base such as `https://oauth2.googleapis.com`.
    ///
    /// Only the scheme and authority are kept; a path, query, or fragment is
    /// rejected because the inbound request's path and query are appended
    /// verbatim.
    pub fn parse(raw: &str) -> Result<Self, RelayError> {
        let invalid = |reason: &str| RelayError::InvalidUpstream {
            url: raw.to_string(),
            reason: reason.to_string(),
        };

        let url = url::Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        let host = url.host_str().ok_or_else(|| invalid("missing host"))?;
        if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
            return Err(invalid("must not contain a path, query, or fragment"));
        }
        if !url.username().is_empty() || url.password().is_some() {
            return Err(invalid("must not contain credentials"));
        }

        // host_str() keeps IPv6 brackets, so this is a valid authority as-is
        let authority = url
            .port()
            .map_or_else(|| host.to_string(), |port| format!("{host}:{port}"));

        Ok(Self {
            scheme: url.scheme().to_string(),
            authority,
        })
    }

    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    #[must_use]
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Build the forwarding target for an inbound request path and query.
    #[must_use]
    pub fn target(&self, path_and_query: &str) -> String {
        format!("{}://{}{}", self.scheme, self.authority, path_and_query)
    }
}

impl Default for Upstream {
    fn default() -> Self {
        Self {
            scheme: "https".to_string(),
            authority: "oauth2.googleapis.com".to_string(),
        }
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.authority)
    }
}

// async_trait is required here because SecretSource is used as Box<dyn SecretSource>
// and native async fn in traits does not support dyn dispatch.
#[async_trait]
pub trait SecretSource: Send + Sync {
    fn name(&self) -> String;
    async fn load(&self) -> Result<ClientSecret, RelayError>;
}

pub struct SecretResolver {
    sources: Vec<Box<dyn SecretSource>>,
}

impl SecretResolver {
    #[must_use]
    pub fn new(sources: Vec<Box<dyn SecretSource>>) -> Self {
        Self { sources }
    }

    /// Load from the first source that yields a secret.
    ///
    /// A source that fails is logged and the next one is tried; the last
    /// failure is returned when none succeed.
    pub async fn load(&self) -> Result<(ClientSecret, String), RelayError> {
        let mut last_err = None;
        for source in &self.sources {
            match source.load().await {
                Ok(secret) => return Ok((secret, source.name())),
                Err(e) => {
                    tracing::debug!(source = %source.name(), error = %e, "secret source unavailable");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| RelayError::NoSecretSource {
            hint: "Set CLIENT_SECRET or provide --secrets-file <path> containing \
                   {\"client_secret\": \"...\"}."
                .into(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_debug_is_redacted() {
        let secret = ClientSecret::new("s3cr3t");
        let rendered = format!("{secret:?}");
        assert!(!rendered.contains("s3cr3t"));
        let config = Config {
            port: 8080,
            client_secret: secret,
        };
        assert!(!format!("{config:?}").contains("s3cr3t"));
    }

    #[test]
    fn default_upstream_matches_constant() {
        assert_eq!(Upstream::default(), Upstream::parse(DEFAULT_UPSTREAM).unwrap());
    }

    #[test]
    fn upstream_keeps_port() {
        let upstream = Upstream::parse("http://127.0.0.1:9999").unwrap();
        assert_eq!(upstream.scheme(), "http");
        assert_eq!(upstream.authority(), "127.0.0.1:9999");
        assert_eq!(
            upstream.target("/token?x=1"),
            "http://127.0.0.1:9999/token?x=1"
        );
    }

    #[test]
    fn upstream_rejects_path_and_bad_scheme() {
        assert!(Upstream::parse("https://example.com/token").is_err());
        assert!(Upstream::parse("ftp://example.com").is_err());
        assert!(Upstream::parse("not a url").is_err());
    }

    struct Failing;

    #[async_trait]
    impl SecretSource for Failing {
        fn name(&self) -> String {
            "failing".into()
        }
        async fn load(&self) -> Result<ClientSecret, RelayError> {
            Err(RelayError::MissingSecret {
                source_name: self.name(),
                key: CLIENT_SECRET_KEY,
            })
        }
    }

    struct Fixed;

    #[async_trait]
    impl SecretSource for Fixed {
        fn name(&self) -> String {
            "fixed".into()
        }
        async fn load(&self) -> Result<ClientSecret, RelayError> {
            Ok(ClientSecret::new("abc"))
        }
    }

    #[tokio::test]
    async fn resolver_falls_through_to_next_source() {
        let resolver = SecretResolver::new(vec![Box::new(Failing), Box::new(Fixed)]);
        let (secret, name) = resolver.load().await.unwrap();
        assert_eq!(secret.expose(), "abc");
        assert_eq!(name, "fixed");
    }

    #[tokio::test]
    async fn resolver_without_sources_errors() {
        let resolver = SecretResolver::new(vec![]);
        assert!(matches!(
            resolver.load().await,
            Err(RelayError::NoSecretSource { .. })
        ));
    }
}
