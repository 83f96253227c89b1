use anyhow::{Context, Result};
use rtd_stream::config::load_config_or_default;
use rtd_stream::enrich::{run_metrics_reporter, EnrichmentEngine};
use rtd_stream::nats::{NatsClient, NatsSink, NatsSource};
use rtd_stream::pipeline::Pipeline;
use rtd_stream::state::{run_eviction_loop, EvictionPolicy, InMemoryPositionStore, PositionStore};
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rtd_stream=info".into()),
        )
        .init();

    info!("rtd-stream starting...");

    let config_path =
        std::env::var("RTD_STREAM_CONFIG").unwrap_or_else(|_| "rtd-stream.toml".to_string());
    let config = load_config_or_default(&config_path)
        .map_err(|e| anyhow::anyhow!("Failed to load config from {}: {}", config_path, e))?;

    info!(
        config_path = %config_path,
        application_id = %config.pipeline.application_id,
        nats_url = %config.nats.url,
        source_subject = %config.pipeline.source_subject,
        sink_subject_prefix = %config.pipeline.sink_subject_prefix,
        workers = config.pipeline.workers,
        "Configuration loaded"
    );

    // Position state
    let policy = config.state.eviction_policy();
    let store = Arc::new(InMemoryPositionStore::with_policy(policy));
    let eviction_handle = match policy {
        EvictionPolicy::Never => {
            warn!("Position state never evicts; memory grows with every distinct vehicle id");
            None
        }
        EvictionPolicy::IdleFor(ttl) => {
            info!(ttl_seconds = ttl.as_secs(), "Idle vehicle positions will be evicted");
            Some(tokio::spawn(run_eviction_loop(
                Arc::clone(&store),
                config.state.sweep_interval(),
            )))
        }
    };

    let engine = Arc::new(EnrichmentEngine::new(Arc::clone(&store)));

    let metrics_handle = tokio::spawn(run_metrics_reporter(
        engine.metrics.clone(),
        Arc::clone(&store),
        config.metrics.report_interval_seconds,
    ));

    // Transport
    let partition = config
        .pipeline
        .partition()
        .context("Invalid partition layout")?;
    let nats = NatsClient::connect(config.nats.clone()).await?;
    let source = NatsSource::connect(
        nats.jetstream(),
        &config.nats.stream_name,
        &config.pipeline.application_id,
        &config.pipeline.source_subject,
        partition,
    )
    .await?;
    let sink = Arc::new(NatsSink::new(
        nats.client().clone(),
        nats.jetstream().clone(),
        config.pipeline.sink_subject_prefix.clone(),
    ));

    let pipeline = Pipeline::new(
        engine,
        config.pipeline.workers,
        config.pipeline.channel_capacity,
    );

    let report = pipeline
        .run(source, sink, shutdown_signal())
        .await
        .context("Enrichment pipeline failed")?;

    metrics_handle.abort();
    if let Some(handle) = eviction_handle {
        handle.abort();
    }

    info!(
        received = report.received,
        delivered = report.delivered,
        tracked_vehicles = store.len(),
        "rtd-stream stopped"
    );

    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for ctrl_c signal");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
