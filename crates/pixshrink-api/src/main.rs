use pixshrink_core::Config;
use pixshrink_infra::telemetry::{init_telemetry, LogFormat};

// Use mimalloc as the global allocator for better performance and lower fragmentation,
// especially when running on musl-based systems inside containers.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    init_telemetry(
        LogFormat::parse(config.log_format()),
        env!("CARGO_PKG_NAME"),
        config.environment(),
    )
    .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    let (_state, router) = pixshrink_api::setup::initialize_app(config.clone()).await?;

    pixshrink_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
