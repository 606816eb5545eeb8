//! Per-request correlation IDs and request start/finish logging.
//!
//! [`correlate`] runs as an `axum::middleware::from_fn` layer. It stores
//! the generated [`CorrelationId`] in the request extensions, where the
//! proxy handler (or any extractor) reads it back with
//! [`CorrelationId::lookup`]. Inbound `x-correlation-id` headers are not
//! trusted: every request gets a new ID.
//!
//! The finish event is tied to the response body, not the handler return, so
//! `elapsed_ms` covers the whole relayed stream. `completed` is false when
//! the body errored or was dropped before its end (client went away).

use std::convert::Infallible;
use std::fmt;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::Body;
use axum::extract::{ConnectInfo, FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::Extensions;
use axum::middleware::Next;
use axum::response::Response;
use bytes::Bytes;
use hyper::body::{Body as HttpBody, Frame, SizeHint};
use tracing::Instrument;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// A new random (UUID v4) identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// The ID stored for this request, or an empty ID when none was set.
    #[must_use]
    pub fn lookup(extensions: &Extensions) -> Self {
        extensions.get::<Self>().cloned().unwrap_or_default()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::lookup(&parts.extensions))
    }
}

pub async fn correlate(mut req: Request, next: Next) -> Response {
    let correlation_id = CorrelationId::generate();
    let remote_addr = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_default();

    tracing::info!(
        correlation_id = %correlation_id,
        method = %req.method(),
        uri = %req.uri(),
        remote_addr = %remote_addr,
        "incoming request"
    );

    req.extensions_mut().insert(correlation_id.clone());

    let span = tracing::info_span!("request", correlation_id = %correlation_id);
    let start = Instant::now();
    let response = next.run(req).instrument(span).await;

    let finish = FinishLog {
        correlation_id,
        status: response.status().as_u16(),
        start,
        completed: false,
    };
    let (parts, body) = response.into_parts();
    Response::from_parts(parts, Body::new(LoggedBody::new(body, finish)))
}

/// Emits "finished handling request" when dropped.
struct FinishLog {
    correlation_id: CorrelationId,
    status: u16,
    start: Instant,
    completed: bool,
}

impl Drop for FinishLog {
    fn drop(&mut self) {
        tracing::info!(
            correlation_id = %self.correlation_id,
            status = self.status,
            elapsed_ms = u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX),
            completed = self.completed,
            "finished handling request"
        );
    }
}

/// Response body that releases its [`FinishLog`] at end of stream, on error, or on drop.
struct LoggedBody {
    inner: Body,
    finish: Option<FinishLog>,
}

impl LoggedBody {
    fn new(inner: Body, mut finish: FinishLog) -> Self {
        // Empty bodies may never be polled.
        finish.completed = inner.is_end_stream();
        Self {
            inner,
            finish: Some(finish),
        }
    }

    fn finish(&mut self, completed: bool) {
        if let Some(mut log) = self.finish.take() {
            log.completed = completed;
        }
    }
}

impl HttpBody for LoggedBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_frame(cx);
        match &polled {
            Poll::Ready(None) => this.finish(true),
            Poll::Ready(Some(Err(_))) => this.finish(false),
            Poll::Ready(Some(Ok(_))) if this.inner.is_end_stream() => this.finish(true),
            _ => {}
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_without_id_is_empty() {
        let extensions = Extensions::new();
        let id = CorrelationId::lookup(&extensions);
        assert!(id.is_empty());
        assert_eq!(id.as_str(), "");
    }

    #[test]
    fn lookup_returns_stored_id() {
        let mut extensions = Extensions::new();
        let id = CorrelationId::generate();
        extensions.insert(id.clone());
        assert_eq!(CorrelationId::lookup(&extensions), id);
    }

    #[tokio::test]
    async fn extractor_reads_stored_id_and_tolerates_absence() {
        let (mut parts, ()) = axum::http::Request::new(()).into_parts();
        let missing = CorrelationId::from_request_parts(&mut parts, &()).await.unwrap();
        assert!(missing.is_empty());

        let id = CorrelationId::generate();
        parts.extensions.insert(id.clone());
        let found = CorrelationId::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(found, id);
    }

    fn finish_log() -> FinishLog {
        FinishLog {
            correlation_id: CorrelationId::generate(),
            status: 200,
            start: Instant::now(),
            completed: false,
        }
    }

    #[tokio::test]
    async fn logged_body_passes_data_and_finishes_at_end_of_stream() {
        use http_body_util::BodyExt;

        let mut body = LoggedBody::new(Body::from("hello"), finish_log());
        assert!(body.finish.is_some());

        let frame = body.frame().await.unwrap().unwrap();
        assert_eq!(frame.into_data().unwrap(), "hello");
        assert!(body.finish.is_none());
    }

    #[test]
    fn empty_body_counts_as_completed() {
        let body = LoggedBody::new(Body::empty(), finish_log());
        assert!(body.finish.as_ref().is_some_and(|log| log.completed));
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = CorrelationId::generate();
        let b = CorrelationId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }
}
