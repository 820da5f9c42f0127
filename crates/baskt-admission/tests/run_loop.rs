//! Consumer loop integration tests.

mod common;
use common::*;

use std::sync::Arc;
use std::time::Duration;

use baskt_query::DynQueryClient;
use baskt_risk::RiskCheckConfig;
use rust_decimal_macros::dec;
use tokio::sync::watch;
use tokio::time::timeout;

#[tokio::test]
async fn test_run_decides_every_request_then_stops_on_close() {
    let querier = seeded_querier();
    let query: DynQueryClient = querier.clone();
    let (coordinator, broker) = standard_coordinator(query, RiskCheckConfig::default());

    broker.submit(open_request("alice", dec!(1000), true)).unwrap();
    broker.submit(open_request("bob", dec!(2000), false)).unwrap();
    broker.submit(open_request("carol", dec!(5000000), true)).unwrap();
    broker.close();

    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    timeout(Duration::from_secs(5), coordinator.run(shutdown_rx))
        .await
        .expect("run should finish once the stream is drained")
        .unwrap();

    assert_eq!(broker.accepted().len(), 2);
    assert_eq!(broker.rejected().len(), 1);
    assert_eq!(broker.rejected()[0].payload.check_name, "position_size");
    assert_eq!(broker.pending_len(), 0);
    assert_eq!(broker.backlog_len(), 0);
}

#[tokio::test]
async fn test_shutdown_stops_idle_coordinator() {
    let query: DynQueryClient = seeded_querier();
    let (coordinator, _broker) = standard_coordinator(query, RiskCheckConfig::default());
    let coordinator = Arc::new(coordinator);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let running = Arc::clone(&coordinator);
    let handle = tokio::spawn(async move { running.run(shutdown_rx).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown_tx.send(true).unwrap();

    let result = timeout(Duration::from_secs(2), handle)
        .await
        .expect("coordinator should stop after shutdown")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_unacked_request_is_redelivered() {
    let query: DynQueryClient = seeded_querier();
    let (coordinator, broker) = standard_coordinator(query, RiskCheckConfig::default());

    // A consumer takes the request and dies before acknowledging it.
    let first = deliver(&broker, open_request("alice", dec!(1000), true)).await;
    assert_eq!(broker.pending_len(), 1);
    assert_eq!(broker.reclaim_pending(), 1);
    broker.close();

    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    coordinator.run(shutdown_rx).await.unwrap();

    assert_eq!(broker.accepted().len(), 1);
    assert_eq!(broker.accepted()[0].payload.request, first.payload);
    assert_eq!(broker.pending_len(), 0);
}
