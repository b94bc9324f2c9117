//! Chat message web component dev server.
//!
//! Serves the static build and exposes the host invocation bridge.

use std::sync::Arc;

use chat_message_wc::{config::AppConfig, server, telemetry};
use dotenvy::dotenv;
use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present)
    let _ = dotenv();

    telemetry::init();

    let config = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    server::start_server(Arc::new(config)).await
}
