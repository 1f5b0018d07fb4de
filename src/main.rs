use anyhow::Context;
use blogsmith_kernel::{settings::Settings, InitCtx, ModuleRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load blogsmith settings")?;
    blogsmith_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        port = settings.server.port,
        upstream = %settings.upstream.base_url,
        "blogsmith bootstrap starting"
    );

    let mut registry = ModuleRegistry::new();
    blogsmith::register_all(&mut registry, &settings)?;

    let ctx = InitCtx {
        settings: &settings,
    };
    registry.init_modules(&ctx).await?;
    registry.start_modules(&ctx).await?;

    let served = blogsmith_http::start_server(&registry, &settings).await;

    registry.stop_modules().await?;
    served
}
