//! Fieldporter chat proxy - cached chat backend for the Fieldporter site.
//!
//! ## Quick Start
//!
//! ```bash
//! # Start with defaults (port 8000, OpenAI API)
//! OPENAI_API_KEY=sk-... fieldporter-proxy
//!
//! # Custom configuration
//! FIELDPORTER_PORT=9000 FIELDPORTER_CACHE_SIZE=1000 fieldporter-proxy
//! ```

use fieldporter_proxy::{run_server, ProxyConfig};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("fieldporter_proxy=info,tower_http=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    run_server(ProxyConfig::from_env(), true).await
}
