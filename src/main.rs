/// Photo catalog server binary
use photo_catalog::{
    config::{LogFormat, ServerConfig, DEFAULT_LOG_FILTER},
    server, AppContext, CatalogResult,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

#[tokio::main]
async fn main() -> CatalogResult<()> {
    // Configuration first so the log format is known
    let config = ServerConfig::from_env()?;

    let fmt_layer = match config.logging.format {
        LogFormat::Json => tracing_subscriber::fmt::layer().json().boxed(),
        LogFormat::Text => tracing_subscriber::fmt::layer().boxed(),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_new(&config.logging.level)
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(fmt_layer)
        .init();

    print_banner();

    let ctx = AppContext::new(config).await?;

    server::serve(ctx).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
        photo-catalog v{}
        records + blobs, verified
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
