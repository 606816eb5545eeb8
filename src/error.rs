//! Unified startup error type for tokenrelay.
//!
//! [`RelayError`] covers everything that can stop the process before or
//! while serving: secret loading, upstream parsing, address binding.
//! Per-request failures live in [`ProxyError`](crate::proxy::ProxyError)
//! instead, because they map to HTTP statuses rather than exit codes.
//! Error messages include contextual hints to guide the user toward a fix.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RelayError {
    #[error("No client secret found.\n\n  {hint}")]
    NoSecretSource { hint: String },

    #[error("Secrets file not found: {}", path.display())]
    SecretsFileNotFound { path: PathBuf },

    #[error("Secrets file parse error in {path}:\n  {source}")]
    SecretsParse {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Secret source {source_name} has no usable '{key}' value")]
    MissingSecret {
        source_name: String,
        key: &'static str,
    },

    #[error("Invalid upstream '{url}': {reason}")]
    InvalidUpstream { url: String, reason: String },

    #[error("Invalid header name in forwarding policy: '{0}'")]
    InvalidHeaderName(String),

    #[error("Invalid address: {0}")]
    AddressParse(#[from] std::net::AddrParseError),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// Render an error and its `source()` chain as `outer: inner: root`.
///
/// hyper's errors keep the useful part (e.g. `connection refused`) in the
/// source chain, while their top-level `Display` is only `client error (Connect)`.
#[must_use]
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    use std::fmt::Write;
    let mut buf = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        let msg = inner.to_string();
        // Some wrappers repeat their inner message verbatim
        if !buf.ends_with(&msg) {
            let _ = write!(buf, ": {msg}");
        }
        source = inner.source();
    }
    buf
}
