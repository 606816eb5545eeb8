//! `tokenrelay run` — start the proxy server.
//!
//! Resolves the client secret and upstream, then starts the Axum HTTP
//! server with graceful shutdown. Any failure before the listener is bound
//! is returned to `main`, which exits non-zero.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::cli::RunArgs;
use crate::config::{Config, Upstream};
use crate::error::RelayError;
use crate::logging;
use crate::proxy::HeaderPolicy;
use crate::server::{self, AppState};

pub async fn execute(args: RunArgs) -> Result<(), RelayError> {
    let log_format = logging::resolve_format(args.pretty, args.json);
    logging::init(&args.log_level, log_format);

    #[cfg(feature = "sentry-integration")]
    let _sentry_guard = args
        .sentry_dsn
        .as_ref()
        .map(|dsn| crate::sentry_integration::init(dsn, args.sentry_environment.as_deref()));

    let upstream = Upstream::parse(&args.secrets.upstream)?;
    let header_policy =
        HeaderPolicy::from_lists(&args.forward_header_allow, &args.forward_header_deny)?;
    let (client_secret, secret_source) = super::secret_resolver(&args.secrets).load().await?;

    let config = Config {
        port: args.port,
        client_secret,
    };

    let state = Arc::new(AppState {
        config: Arc::new(config),
        upstream: upstream.clone(),
        http_client: server::build_http_client(),
        header_policy,
        timeout: Duration::from_millis(args.timeout),
        max_body: args.max_body,
    });

    let addr: SocketAddr = format!("{}:{}", args.host, state.config.port).parse()?;
    let router = server::build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(
        addr = %addr,
        upstream = %upstream,
        secret_source = %secret_source,
        timeout_ms = args.timeout,
        "tokenrelay started"
    );

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(server::shutdown_signal())
    .await?;

    tracing::info!("tokenrelay stopped");
    Ok(())
}
