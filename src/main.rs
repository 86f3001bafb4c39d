use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use co2_estimator::{config::ServiceConfig, model, server, service::EmissionService, types::RawInput};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = ServiceConfig::from_env()?;

    let estimator = model::load(&cfg.model_path, cfg.meta_path.as_deref())
        .with_context(|| format!("failed to load model {}", cfg.model_path))?;

    let profile = cfg.resolve_profile(estimator.unit());
    let names: Vec<&str> = estimator.schema().iter().map(|f| f.name()).collect();
    tracing::info!("loaded model; feat_list[{}]: {:?}", names.len(), names);

    let service = EmissionService::new(estimator, profile).with_prediction_logging(cfg.log_predictions);

    // Warmup: an all-zero row must make it through the model
    let warm = service.normalize(&RawInput::default())?;
    let y = service.estimate(&warm).context("warmup prediction failed")?;
    tracing::info!(prediction = y, "warmup forward ok");

    tracing::info!(
        unit = %service.profile().unit,
        zero_guard = service.profile().zero_guard,
        hourly = service.profile().hourly,
        "profile"
    );

    let app = server::router(Arc::new(service));

    tracing::info!("listening on {}", cfg.addr);
    let listener = tokio::net::TcpListener::bind(cfg.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
