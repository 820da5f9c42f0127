//! Basket order risk admission - Entry Point
//!
//! Reads `order.request` envelopes (or bare order requests) as JSON lines
//! from stdin, evaluates them, and writes every published decision as a JSON
//! line to stdout. Ends at EOF or on Ctrl-C.

use std::sync::Arc;

use anyhow::{Context, Result};
use baskt_admission::{
    AppConfig, Coordinator, Envelope, MemoryBroker, OrderStream, Published, ORDER_REQUEST,
};
use baskt_core::OrderRequest;
use baskt_query::{
    CachedQueryClient, DynQueryClient, HttpQueryClient, MemoryQueryClient, QuerierState,
};
use baskt_risk::RiskCheckBattery;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Risk admission for leveraged basket orders
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via BASKT_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// JSON state for the in-process querier, used when no querier URL is configured
    #[arg(short, long)]
    state: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    baskt_telemetry::init_logging()?;

    info!("Starting baskt-admission v{}", env!("CARGO_PKG_VERSION"));

    let config_path = args.config.or_else(|| std::env::var("BASKT_CONFIG").ok());
    let config = AppConfig::load(config_path.as_deref())?;
    info!(
        group = %config.consumer.group,
        instance = %config.consumer.instance_id,
        querier = ?config.querier.base_url,
        "Configuration loaded"
    );

    let upstream = build_querier(&config, args.state.as_deref())?;
    let query: DynQueryClient = Arc::new(CachedQueryClient::new(
        upstream,
        config.cache.ttl(),
        config.cache.max_size,
    ));

    let battery = RiskCheckBattery::standard(&config.risk, config.fee_skew.clone(), Arc::clone(&query));

    let (decision_tx, decision_rx) = mpsc::unbounded_channel();
    let broker = MemoryBroker::with_sink(config.consumer.group.clone(), decision_tx);
    let stream: Arc<dyn OrderStream> = Arc::new(broker.consumer(config.consumer.instance_id.clone()));
    let coordinator = Coordinator::new(query, battery, stream);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        }
    });

    let reader = tokio::spawn(read_requests(Arc::clone(&broker)));
    let writer = tokio::spawn(write_decisions(decision_rx));

    coordinator.run(shutdown_rx).await?;

    reader.abort();
    drop(coordinator);
    drop(broker);
    writer.await.context("decision writer task failed")??;

    info!("Shutdown complete");
    Ok(())
}

fn build_querier(config: &AppConfig, state_path: Option<&str>) -> Result<DynQueryClient> {
    if let Some(url) = &config.querier.base_url {
        info!(%url, "Using querier service");
        return Ok(Arc::new(HttpQueryClient::with_timeout(
            url.clone(),
            config.querier.timeout(),
        )?));
    }

    let state = match state_path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read querier state {path}"))?;
            serde_json::from_str::<QuerierState>(&content)
                .with_context(|| format!("failed to parse querier state {path}"))?
        }
        None => {
            warn!("No querier URL or state file, starting with an empty in-process querier");
            QuerierState::default()
        }
    };
    Ok(Arc::new(MemoryQueryClient::from_state(state)))
}

/// Feed stdin lines into the broker; close it at EOF.
async fn read_requests(broker: Arc<MemoryBroker>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let envelope = match serde_json::from_str::<Envelope<OrderRequest>>(line) {
            Ok(envelope) => envelope,
            Err(_) => match serde_json::from_str::<OrderRequest>(line) {
                Ok(request) => Envelope::new(ORDER_REQUEST, request),
                Err(e) => {
                    warn!(error = %e, "Skipping malformed order request");
                    continue;
                }
            },
        };

        debug!(id = %envelope.id, "Request read from stdin");
        broker.publish_request(envelope)?;
    }

    broker.close();
    Ok(())
}

async fn write_decisions(mut rx: mpsc::UnboundedReceiver<Published>) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    while let Some(published) = rx.recv().await {
        let mut line = serde_json::to_vec(&published)?;
        line.push(b'\n');
        stdout.write_all(&line).await?;
        stdout.flush().await?;
    }
    Ok(())
}
