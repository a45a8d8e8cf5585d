//! HTTP server for the exchange core.
//!
//! Env: `PORT` (default 8080), `API_KEYS` (`key:user_id:role,...`),
//! `INSTRUMENTS` (`TICKER:Name,...` seeded at startup), `SNAPSHOT_PATH`
//! (state loaded from this file when present).

use std::sync::Arc;

use spotmatch::audit::StdoutAuditSink;
use spotmatch::persistence::FilePersistence;
use spotmatch::{api, AuthConfig, Exchange};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    let _ = env_logger::try_init();
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8080);

    let exchange = Arc::new(Exchange::new());
    if let Ok(path) = std::env::var("SNAPSHOT_PATH") {
        match FilePersistence::new(&path).load() {
            Ok(Some(snapshot)) => exchange.restore(snapshot),
            Ok(None) => {}
            Err(e) => eprintln!("snapshot load failed: {}", e),
        }
    }
    if let Ok(spec) = std::env::var("INSTRUMENTS") {
        for entry in spec.split(',') {
            if let Some((ticker, name)) = entry.trim().split_once(':') {
                if let Err(e) = exchange.register_instrument(ticker.trim(), name.trim()) {
                    eprintln!("instrument {} not seeded: {}", ticker, e);
                }
            }
        }
    }

    let app = api::create_router(exchange, AuthConfig::from_env(), Arc::new(StdoutAuditSink));

    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await.expect("bind");
    eprintln!("listening on http://{}", addr);
    axum::serve(listener, app.into_make_service())
        .await
        .expect("serve");
}
