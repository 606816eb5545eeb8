//! tokenrelay is a credential-injecting reverse proxy for OAuth2 token exchange.
//!
//! It accepts POSTed form requests on any path, appends a server-held
//! `client_secret` to a copy of the form, and forwards the request to a
//! single fixed upstream (`https://oauth2.googleapis.com` by default). The
//! upstream's status, headers, and body are streamed back unchanged. Every
//! request is logged under its own correlation ID.
//!
//! # Architecture
//!
//! - [`cli`] -- Command-line argument parsing with clap derive macros.
//! - [`cmd`] -- Subcommand dispatch and execution (run, validate).
//! - [`config`] -- The process [`Config`](config::Config), the fixed
//!   [`Upstream`](config::Upstream), and client-secret loading via the
//!   [`SecretSource`](config::SecretSource) trait.
//! - [`error`] -- Startup error type using `thiserror`.
//! - [`logging`] -- Structured tracing setup with JSON and pretty-print output.
//! - [`middleware`] -- Correlation ID assignment and request start/finish logging.
//! - [`proxy`] -- Core forwarding: form parsing and secret injection, header
//!   construction, and deadline-bounded response streaming.
//! - [`server`] -- Axum server setup, shared application state, HTTP client, and
//!   graceful shutdown.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `sentry-integration` | Sentry error tracking |
//! | `full` | All features |

// Public functions serve the binary and integration tests only.
#![allow(clippy::missing_errors_doc)]

pub mod cli;
pub mod cmd;
pub mod config;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod proxy;
pub mod server;

#[cfg(feature = "sentry-integration")]
pub mod sentry_integration;
