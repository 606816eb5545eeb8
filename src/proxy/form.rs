//! URL-encoded form parsing and client-secret injection.
//!
//! [`parse_request_form`] builds one combined [`FormValues`] from the
//! request body (when its media type is form-urlencoded or absent) followed
//! by the query string. Parsing is strict: a malformed percent-escape or a
//! `;` separator is an error rather than being decoded leniently. Keys and
//! values are kept as raw decoded bytes, so escapes that do not form UTF-8
//! (`%FF`) reach the upstream unchanged.

use std::collections::BTreeMap;

use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderMap;
use url::form_urlencoded;

use crate::config::{ClientSecret, CLIENT_SECRET_KEY};

const FORM_MEDIA_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("invalid URL escape {0:?}")]
    InvalidEscape(String),

    #[error("invalid semicolon separator in query")]
    Semicolon,

    #[error("invalid Content-Type header: {0}")]
    ContentType(String),

    #[error("failed to read request body: {0}")]
    Body(String),
}

/// Form key/value lists, kept in byte order of the key so encoding is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormValues(BTreeMap<Vec<u8>, Vec<Vec<u8>>>);

impl FormValues {
    pub fn parse(input: &[u8]) -> Result<Self, FormError> {
        let mut form = Self::default();
        form.extend_from(input)?;
        Ok(form)
    }

    fn extend_from(&mut self, input: &[u8]) -> Result<(), FormError> {
        if input.contains(&b';') {
            return Err(FormError::Semicolon);
        }
        validate_escapes(input)?;
        for pair in input.split(|&b| b == b'&').filter(|pair| !pair.is_empty()) {
            let (key, value) = match pair.iter().position(|&b| b == b'=') {
                Some(eq) => (&pair[..eq], &pair[eq + 1..]),
                None => (pair, &[][..]),
            };
            self.add(decode_component(key), decode_component(value));
        }
        Ok(())
    }

    /// Append a value, keeping any existing values for the key.
    pub fn add(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.0.entry(key.into()).or_default().push(value.into());
    }

    #[must_use]
    pub fn get(&self, key: impl AsRef<[u8]>) -> Option<&[Vec<u8>]> {
        self.0.get(key.as_ref()).map(Vec::as_slice)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[Vec<u8>])> {
        self.0.iter().map(|(k, v)| (k.as_slice(), v.as_slice()))
    }

    /// A deep copy of this form with `client_secret` appended.
    ///
    /// `self` is left untouched, so the parsed inbound form never holds the secret.
    #[must_use]
    pub fn with_client_secret(&self, secret: &ClientSecret) -> Self {
        let mut augmented = self.clone();
        augmented.add(CLIENT_SECRET_KEY, secret.expose());
        augmented
    }

    #[must_use]
    pub fn encode(&self) -> String {
        let mut encoded = String::new();
        for (key, values) in &self.0 {
            for value in values {
                if !encoded.is_empty() {
                    encoded.push('&');
                }
                encoded.extend(form_urlencoded::byte_serialize(key));
                encoded.push('=');
                encoded.extend(form_urlencoded::byte_serialize(value));
            }
        }
        encoded
    }
}

/// `+` is a space; `%2B` decodes to a literal plus afterwards.
fn decode_component(raw: &[u8]) -> Vec<u8> {
    let spaced: Vec<u8> = raw
        .iter()
        .map(|&b| if b == b'+' { b' ' } else { b })
        .collect();
    percent_encoding::percent_decode(&spaced).collect()
}

/// Parse the body (if it is a form) and then the query into one form.
pub fn parse_request_form(
    headers: &HeaderMap,
    query: Option<&str>,
    body: &[u8],
) -> Result<FormValues, FormError> {
    let mut form = FormValues::default();
    if body_is_form(headers)? {
        form.extend_from(body)?;
    }
    if let Some(query) = query {
        form.extend_from(query.as_bytes())?;
    }
    Ok(form)
}

fn body_is_form(headers: &HeaderMap) -> Result<bool, FormError> {
    let Some(value) = headers.get(CONTENT_TYPE) else {
        return Ok(true);
    };
    let value = value
        .to_str()
        .map_err(|_| FormError::ContentType("not visible ASCII".into()))?;
    let media_type = value.split(';').next().unwrap_or_default().trim();
    if media_type.is_empty() {
        return Err(FormError::ContentType("no media type".into()));
    }
    Ok(media_type.eq_ignore_ascii_case(FORM_MEDIA_TYPE))
}

fn validate_escapes(input: &[u8]) -> Result<(), FormError> {
    let mut i = 0;
    while i < input.len() {
        if input[i] == b'%' {
            let escape = input.get(i..(i + 3).min(input.len())).unwrap_or_default();
            let valid = escape.len() == 3 && escape[1..].iter().all(u8::is_ascii_hexdigit);
            if !valid {
                return Err(FormError::InvalidEscape(
                    String::from_utf8_lossy(escape).into_owned(),
                ));
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    Ok(())
}
