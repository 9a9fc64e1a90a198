use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Default directives for the server. axum logs rejections from
/// built-in extractors with the `axum::rejection` target, at `TRACE`
/// level. `axum::rejection=trace` enables showing those events
pub fn server_filter() -> String {
    format!(
        "{}=debug,tower_http=debug,axum::rejection=trace",
        env!("CARGO_CRATE_NAME")
    )
}

/// Install the global subscriber. `RUST_LOG` takes precedence over
/// `default_directives` when set.
pub fn init_tracing(default_directives: String) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directives.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
