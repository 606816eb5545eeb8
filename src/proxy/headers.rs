//! Header construction for the outbound request and the relayed response.
//!
//! [`build_outbound_headers`] copies the inbound headers through the
//! configured [`HeaderPolicy`], drops message-framing headers (the body and
//! authority are rebuilt), and appends the caller IP to `X-Forwarded-For`.
//! [`relay_response_headers`] copies the upstream response headers minus the
//! ones that describe the upstream connection itself.

use std::net::IpAddr;

use axum::http::header::{CONNECTION, CONTENT_LENGTH, CONTENT_TYPE, HOST, TRANSFER_ENCODING};
use axum::http::{HeaderMap, HeaderName, HeaderValue};

use crate::error::RelayError;

pub static X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

static FRAMING: [HeaderName; 3] = [HOST, CONTENT_LENGTH, TRANSFER_ENCODING];

static CONNECTION_SCOPED: [HeaderName; 3] = [
    CONNECTION,
    HeaderName::from_static("keep-alive"),
    TRANSFER_ENCODING,
];

/// Which inbound headers are forwarded upstream.
///
/// `CopyAll` forwards everything, `Authorization` included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HeaderPolicy {
    #[default]
    CopyAll,
    Allow(Vec<HeaderName>),
    Deny(Vec<HeaderName>),
}

impl HeaderPolicy {
    /// Build a policy from CLI lists. An allow-list wins over a deny-list.
    pub fn from_lists(allow: &[String], deny: &[String]) -> Result<Self, RelayError> {
        let parse = |names: &[String]| -> Result<Vec<HeaderName>, RelayError> {
            names
                .iter()
                .map(|name| {
                    name.trim()
                        .parse::<HeaderName>()
                        .map_err(|_| RelayError::InvalidHeaderName(name.clone()))
                })
                .collect()
        };

        if !allow.is_empty() {
            Ok(Self::Allow(parse(allow)?))
        } else if !deny.is_empty() {
            Ok(Self::Deny(parse(deny)?))
        } else {
            Ok(Self::CopyAll)
        }
    }

    #[must_use]
    pub fn permits(&self, name: &HeaderName) -> bool {
        match self {
            Self::CopyAll => true,
            Self::Allow(names) => names.contains(name),
            Self::Deny(names) => !names.contains(name),
        }
    }
}

pub fn build_outbound_headers(
    inbound: &HeaderMap,
    policy: &HeaderPolicy,
    client_ip: Option<IpAddr>,
) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(inbound.keys_len());
    for (name, value) in inbound {
        if FRAMING.contains(name) || !policy.permits(name) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }

    if !headers.contains_key(CONTENT_TYPE) {
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
    }

    if let Some(ip) = client_ip {
        append_forwarded_for(&mut headers, ip);
    }

    headers
}

/// Append `ip` to the `X-Forwarded-For` chain, collapsing prior values into one.
pub fn append_forwarded_for(headers: &mut HeaderMap, ip: IpAddr) {
    let mut chain: Vec<u8> = Vec::new();
    for prior in headers.get_all(&X_FORWARDED_FOR) {
        chain.extend_from_slice(prior.as_bytes());
        chain.extend_from_slice(b", ");
    }
    chain.extend_from_slice(ip.to_string().as_bytes());

    match HeaderValue::from_bytes(&chain) {
        Ok(value) => {
            headers.insert(X_FORWARDED_FOR.clone(), value);
        }
        Err(e) => {
            tracing::warn!(error = %e, "unable to build x-forwarded-for, leaving it unchanged");
        }
    }
}

pub fn relay_response_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(upstream.keys_len());
    for (name, value) in upstream {
        if CONNECTION_SCOPED.contains(name) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}
