use anyhow::Result;

use crate::api;
use crate::core::AppConfig;
use crate::core::logging::{init_tracing, server_filter};

pub async fn run(host: String, port: String) -> Result<()> {
    init_tracing(server_filter());

    // Without a usable credential no session is ever served
    let config = AppConfig::from_env()
        .inspect_err(|e| tracing::error!("Refusing to start: {}", e))?;
    tracing::debug!(?config, "Loaded configuration");

    api::serve(host, port, config).await
}
