//! Integration tests for the HTTP server over a real socket and graceful shutdown.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::http::HeaderMap;
use axum::Router;

use tokenrelay::config::{ClientSecret, Config, Upstream};
use tokenrelay::server::{self, AppState};

async fn start_echo_upstream() -> (SocketAddr, Arc<Mutex<Option<(HeaderMap, String)>>>) {
    let seen = Arc::new(Mutex::new(None));
    let seen_by_handler = Arc::clone(&seen);
    let app = Router::new().fallback(move |headers: HeaderMap, body: String| {
        let seen = Arc::clone(&seen_by_handler);
        async move {
            *seen.lock().unwrap() = Some((headers, body));
            ([("x-upstream", "stub")], r#"{"access_token":"t"}"#)
        }
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, seen)
}

async fn start_proxy(upstream: SocketAddr) -> (SocketAddr, tokio::sync::oneshot::Sender<()>) {
    let state = Arc::new(AppState::new(
        Config {
            port: 0,
            client_secret: ClientSecret::new("server-side-secret"),
        },
        Upstream::parse(&format!("http://{upstream}")).unwrap(),
    ));
    let router = server::build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        })
        .await
        .unwrap();
    });

    (addr, shutdown_tx)
}

#[tokio::test]
async fn post_is_proxied_end_to_end() {
    let (upstream, seen) = start_echo_upstream().await;
    let (addr, shutdown) = start_proxy(upstream).await;

    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/token"))
        .header("content-type", "application/x-www-form-urlencoded")
        .body("grant_type=refresh_token&refresh_token=r1")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers().get("x-upstream").unwrap(), "stub");
    assert_eq!(resp.text().await.unwrap(), r#"{"access_token":"t"}"#);

    let (headers, body) = seen.lock().unwrap().take().unwrap();
    assert_eq!(headers.get("x-forwarded-for").unwrap(), "127.0.0.1");
    assert_eq!(
        body,
        "client_secret=server-side-secret&grant_type=refresh_token&refresh_token=r1"
    );

    let _ = shutdown.send(());
}

#[tokio::test]
async fn get_is_rejected_over_the_wire() {
    let (upstream, seen) = start_echo_upstream().await;
    let (addr, shutdown) = start_proxy(upstream).await;

    let resp = reqwest::get(format!("http://{addr}/token")).await.unwrap();
    assert_eq!(resp.status(), 405);
    assert!(seen.lock().unwrap().is_none());

    let _ = shutdown.send(());
}

#[tokio::test]
async fn graceful_shutdown_works() {
    let (upstream, _seen) = start_echo_upstream().await;
    let (addr, shutdown) = start_proxy(upstream).await;

    let url = format!("http://{addr}/token");
    assert!(reqwest::get(&url).await.is_ok());

    let _ = shutdown.send(());

    // Give it a moment to shut down
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let result = reqwest::get(&url).await;
    assert!(result.is_err());
}
