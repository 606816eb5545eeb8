//! Core credential-injecting forwarding handler.
//!
//! The [`forward_handler`] function is the Axum fallback that receives
//! every request. It accepts POST only, parses the form body, appends the
//! configured `client_secret` to a copy of it, and forwards the result to
//! the fixed upstream with the caller's headers. The upstream response is
//! streamed back unchanged. Submodules handle form parsing ([`form`]),
//! header construction ([`headers`]), the deadline-bounded response body
//! ([`body`]), and the error-to-status mapping ([`error`]).

pub mod body;
pub mod error;
pub mod form;
pub mod headers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::uri::PathAndQuery;
use axum::http::Method;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use http_body_util::Full;
use tokio::time::Instant;

use crate::error::error_chain;
use crate::middleware::CorrelationId;
use crate::server::AppState;

pub use error::ProxyError;
pub use form::{FormError, FormValues};
pub use headers::HeaderPolicy;

pub async fn forward_handler(State(state): State<Arc<AppState>>, req: Request) -> Response {
    let correlation_id = CorrelationId::lookup(req.extensions());

    match forward(&state, req).await {
        Ok(response) => response,
        Err(e) => {
            if e.is_server_fault() {
                tracing::error!(
                    correlation_id = %correlation_id,
                    status = e.status().as_u16(),
                    error = %e,
                    "proxy request failed"
                );
            } else {
                tracing::debug!(
                    correlation_id = %correlation_id,
                    status = e.status().as_u16(),
                    error = %e,
                    "request rejected"
                );
            }
            e.into_response()
        }
    }
}

async fn forward(state: &AppState, req: Request) -> Result<Response, ProxyError> {
    if req.method() != Method::POST {
        return Err(ProxyError::MethodNotAllowed);
    }

    let client_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    let (parts, inbound_body) = req.into_parts();
    let target = state
        .upstream
        .target(parts.uri.path_and_query().map_or("/", PathAndQuery::as_str));

    let inbound_body = axum::body::to_bytes(inbound_body, state.max_body)
        .await
        .map_err(|e| FormError::Body(error_chain(&e)))?;
    let inbound_form =
        form::parse_request_form(&parts.headers, parts.uri.query(), &inbound_body)?;
    let outbound_form = inbound_form.with_client_secret(&state.config.client_secret);

    let deadline = Instant::now() + state.timeout;

    let mut outbound = hyper::Request::builder()
        .method(Method::POST)
        .uri(&target)
        .body(Full::new(Bytes::from(outbound_form.encode())))
        .map_err(|e| ProxyError::Construction {
            source: Box::new(e),
        })?;
    *outbound.headers_mut() =
        headers::build_outbound_headers(&parts.headers, &state.header_policy, client_ip);

    let upstream_response =
        match tokio::time::timeout_at(deadline, state.http_client.request(outbound)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                return Err(ProxyError::UpstreamUnavailable {
                    source: Box::new(e),
                })
            }
            Err(_) => {
                return Err(ProxyError::UpstreamUnavailable {
                    source: format!(
                        "no response from {} within {}ms",
                        state.upstream,
                        state.timeout.as_millis()
                    )
                    .into(),
                })
            }
        };

    let (upstream_parts, upstream_body) = upstream_response.into_parts();
    tracing::debug!(
        status = upstream_parts.status.as_u16(),
        upstream = %state.upstream,
        "upstream responded"
    );

    let mut response = Response::new(Body::new(body::DeadlineBody::new(
        upstream_body,
        deadline,
    )));
    *response.status_mut() = upstream_parts.status;
    *response.headers_mut() = headers::relay_response_headers(&upstream_parts.headers);
    Ok(response)
}
