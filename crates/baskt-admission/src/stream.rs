//! Order streams.
//!
//! Topics: `order.request` in, `order.accepted` / `order.rejected` out. Every
//! message travels in an [`Envelope`].
//!
//! [`MemoryBroker`] implements consumer-group semantics in process: all
//! consumers of a broker compete for one backlog, a delivered message stays
//! pending until acknowledged, and [`MemoryBroker::reclaim_pending`] puts
//! unacknowledged messages back for redelivery.

use std::collections::VecDeque;
use std::sync::Arc;

use baskt_core::{OrderRequest, Price};
use baskt_query::BoxFuture;
use baskt_risk::Severity;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Notify};
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::error::{AdmissionError, AdmissionResult};

pub const ORDER_REQUEST: &str = "order.request";
pub const ORDER_ACCEPTED: &str = "order.accepted";
pub const ORDER_REJECTED: &str = "order.rejected";

/// Transport wrapper around every stream message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub id: String,
    pub stream: String,
    /// Consumer the message was last delivered to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumer: Option<String>,
    #[serde(default)]
    pub delivery_count: u32,
    #[serde(default = "Utc::now")]
    pub published_at: DateTime<Utc>,
    pub payload: T,
}

impl<T> Envelope<T> {
    pub fn new(stream: &str, payload: T) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            stream: stream.to_string(),
            consumer: None,
            delivery_count: 0,
            published_at: Utc::now(),
            payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAccepted {
    pub request: OrderRequest,
    pub execution_price: Price,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRejected {
    pub request: OrderRequest,
    pub reason: String,
    pub check_name: String,
    pub severity: Severity,
}

/// A published decision, as it appears on an outbound topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Published {
    Accepted(Envelope<OrderAccepted>),
    Rejected(Envelope<OrderRejected>),
}

/// Durable order stream as seen by one consumer.
pub trait OrderStream: Send + Sync {
    /// Next request for this consumer. `Ok(None)` once the stream is closed
    /// and drained.
    fn next(&self) -> BoxFuture<'_, AdmissionResult<Option<Envelope<OrderRequest>>>>;

    fn publish_accepted(&self, message: OrderAccepted) -> BoxFuture<'_, AdmissionResult<()>>;

    fn publish_rejected(&self, message: OrderRejected) -> BoxFuture<'_, AdmissionResult<()>>;

    /// Acknowledge a delivered request so it is not redelivered.
    fn ack<'a>(&'a self, id: &'a str) -> BoxFuture<'a, AdmissionResult<()>>;
}

#[derive(Debug, Default)]
struct BrokerState {
    backlog: VecDeque<Envelope<OrderRequest>>,
    /// Delivered but not acknowledged, in delivery order.
    pending: Vec<Envelope<OrderRequest>>,
    /// Published decisions, retained only when there is no sink.
    accepted: Vec<Envelope<OrderAccepted>>,
    rejected: Vec<Envelope<OrderRejected>>,
    closed: bool,
}

/// In-process stream shared by the consumers of one group.
pub struct MemoryBroker {
    group: String,
    state: Mutex<BrokerState>,
    notify: Notify,
    sink: Option<mpsc::UnboundedSender<Published>>,
}

impl MemoryBroker {
    pub fn new(group: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            group: group.into(),
            state: Mutex::new(BrokerState::default()),
            notify: Notify::new(),
            sink: None,
        })
    }

    /// Broker that hands every published decision to `sink` instead of
    /// retaining it.
    pub fn with_sink(group: impl Into<String>, sink: mpsc::UnboundedSender<Published>) -> Arc<Self> {
        Arc::new(Self {
            group: group.into(),
            state: Mutex::new(BrokerState::default()),
            notify: Notify::new(),
            sink: Some(sink),
        })
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    /// Handle for one consumer of this broker's group.
    pub fn consumer(self: &Arc<Self>, name: impl Into<String>) -> MemoryStream {
        MemoryStream {
            broker: Arc::clone(self),
            consumer: name.into(),
        }
    }

    /// Append a request envelope to the backlog. Returns its id.
    pub fn publish_request(&self, envelope: Envelope<OrderRequest>) -> AdmissionResult<String> {
        let id = envelope.id.clone();
        {
            let mut state = self.state.lock();
            if state.closed {
                return Err(AdmissionError::Stream(format!(
                    "{ORDER_REQUEST} is closed"
                )));
            }
            state.backlog.push_back(envelope);
        }
        self.notify.notify_waiters();
        Ok(id)
    }

    /// Wrap `request` in a fresh envelope and publish it.
    pub fn submit(&self, request: OrderRequest) -> AdmissionResult<String> {
        self.publish_request(Envelope::new(ORDER_REQUEST, request))
    }

    /// Stop accepting requests; consumers drain the backlog then see the end.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.notify.notify_waiters();
    }

    /// Return every unacknowledged message to the front of the backlog.
    pub fn reclaim_pending(&self) -> usize {
        let reclaimed = {
            let mut state = self.state.lock();
            let pending = std::mem::take(&mut state.pending);
            let count = pending.len();
            for envelope in pending.into_iter().rev() {
                state.backlog.push_front(envelope);
            }
            count
        };
        if reclaimed > 0 {
            debug!(group = %self.group, reclaimed, "reclaimed pending messages");
            self.notify.notify_waiters();
        }
        reclaimed
    }

    pub fn backlog_len(&self) -> usize {
        self.state.lock().backlog.len()
    }

    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Acceptances published so far. Always empty for a broker with a sink.
    pub fn accepted(&self) -> Vec<Envelope<OrderAccepted>> {
        self.state.lock().accepted.clone()
    }

    pub fn rejected(&self) -> Vec<Envelope<OrderRejected>> {
        self.state.lock().rejected.clone()
    }

    fn try_deliver(&self, consumer: &str) -> Option<Envelope<OrderRequest>> {
        let mut state = self.state.lock();
        let mut envelope = state.backlog.pop_front()?;
        envelope.delivery_count += 1;
        envelope.consumer = Some(consumer.to_string());
        state.pending.push(envelope.clone());
        Some(envelope)
    }

    fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    fn record(&self, published: Published) {
        match &self.sink {
            Some(sink) => {
                if sink.send(published).is_err() {
                    warn!(group = %self.group, "decision sink closed");
                }
            }
            None => {
                let mut state = self.state.lock();
                match published {
                    Published::Accepted(envelope) => state.accepted.push(envelope),
                    Published::Rejected(envelope) => state.rejected.push(envelope),
                }
            }
        }
    }
}

/// One consumer's view of a [`MemoryBroker`].
pub struct MemoryStream {
    broker: Arc<MemoryBroker>,
    consumer: String,
}

impl MemoryStream {
    pub fn consumer(&self) -> &str {
        &self.consumer
    }

    pub fn broker(&self) -> &Arc<MemoryBroker> {
        &self.broker
    }
}

impl OrderStream for MemoryStream {
    fn next(&self) -> BoxFuture<'_, AdmissionResult<Option<Envelope<OrderRequest>>>> {
        Box::pin(async move {
            loop {
                let notified = self.broker.notify.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();

                if let Some(envelope) = self.broker.try_deliver(&self.consumer) {
                    trace!(
                        consumer = %self.consumer,
                        id = %envelope.id,
                        delivery_count = envelope.delivery_count,
                        "delivered"
                    );
                    return Ok(Some(envelope));
                }
                if self.broker.is_closed() {
                    return Ok(None);
                }
                notified.await;
            }
        })
    }

    fn publish_accepted(&self, message: OrderAccepted) -> BoxFuture<'_, AdmissionResult<()>> {
        Box::pin(async move {
            self.broker
                .record(Published::Accepted(Envelope::new(ORDER_ACCEPTED, message)));
            Ok(())
        })
    }

    fn publish_rejected(&self, message: OrderRejected) -> BoxFuture<'_, AdmissionResult<()>> {
        Box::pin(async move {
            self.broker
                .record(Published::Rejected(Envelope::new(ORDER_REJECTED, message)));
            Ok(())
        })
    }

    fn ack<'a>(&'a self, id: &'a str) -> BoxFuture<'a, AdmissionResult<()>> {
        Box::pin(async move {
            let mut state = self.broker.state.lock();
            match state.pending.iter().position(|e| e.id == id) {
                Some(idx) => {
                    state.pending.remove(idx);
                    Ok(())
                }
                None => Err(AdmissionError::Stream(format!(
                    "ack for unknown or already acknowledged message {id}"
                ))),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use baskt_core::{OpenParams, Order, OrderAction, OrderKind, OrderParams};
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn request() -> OrderRequest {
        OrderRequest::new(Order {
            owner: "alice".to_string(),
            action: OrderAction::Open,
            kind: OrderKind::Market,
            basket_id: "b1".to_string(),
            params: OrderParams::Open(OpenParams {
                notional_value: dec!(100),
                leverage_bps: 10_000,
                collateral: dec!(100),
                is_long: true,
            }),
            limit: None,
        })
    }

    #[tokio::test]
    async fn test_competing_consumers_share_backlog() {
        let broker = MemoryBroker::new("risk");
        let a = broker.consumer("a");
        let b = broker.consumer("b");
        broker.submit(request()).unwrap();
        broker.submit(request()).unwrap();

        let first = a.next().await.unwrap().unwrap();
        let second = b.next().await.unwrap().unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(first.consumer.as_deref(), Some("a"));
        assert_eq!(broker.pending_len(), 2);

        a.ack(&first.id).await.unwrap();
        assert_eq!(broker.pending_len(), 1);
        assert!(a.ack(&first.id).await.is_err());
    }

    #[tokio::test]
    async fn test_reclaim_redelivers_with_incremented_count() {
        let broker = MemoryBroker::new("risk");
        let consumer = broker.consumer("a");
        let id = broker.submit(request()).unwrap();

        let delivered = consumer.next().await.unwrap().unwrap();
        assert_eq!(delivered.delivery_count, 1);

        assert_eq!(broker.reclaim_pending(), 1);
        let again = consumer.next().await.unwrap().unwrap();
        assert_eq!(again.id, id);
        assert_eq!(again.delivery_count, 2);
    }

    #[tokio::test]
    async fn test_next_waits_for_publish_and_ends_on_close() {
        let broker = MemoryBroker::new("risk");
        let consumer = broker.consumer("a");

        let publisher = Arc::clone(&broker);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            publisher.submit(request()).unwrap();
            publisher.close();
        });

        assert!(consumer.next().await.unwrap().is_some());
        assert!(consumer.next().await.unwrap().is_none());
        assert!(broker.submit(request()).is_err());
    }

    #[test]
    fn test_next_pending_until_submit() {
        let broker = MemoryBroker::new("risk");
        let consumer = broker.consumer("a");

        let mut next = tokio_test::task::spawn(consumer.next());
        tokio_test::assert_pending!(next.poll());

        broker.submit(request()).unwrap();
        assert!(next.is_woken());
        let delivered = tokio_test::assert_ready_ok!(next.poll());
        assert!(delivered.is_some());
    }

    #[tokio::test]
    async fn test_decisions_forwarded_to_sink() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let broker = MemoryBroker::with_sink("risk", tx);
        let consumer = broker.consumer("a");

        consumer
            .publish_rejected(OrderRejected {
                request: request(),
                reason: "no".to_string(),
                check_name: "liquidity".to_string(),
                severity: Severity::High,
            })
            .await
            .unwrap();

        let Some(Published::Rejected(envelope)) = rx.recv().await else {
            panic!("expected a rejection");
        };
        assert_eq!(envelope.stream, ORDER_REJECTED);

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["payload"]["checkName"], "liquidity");
        assert_eq!(json["deliveryCount"], 0);
    }

    #[tokio::test]
    async fn test_sink_broker_retains_no_decisions() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let broker = MemoryBroker::with_sink("risk", tx);
        let consumer = broker.consumer("a");

        for _ in 0..3 {
            consumer
                .publish_accepted(OrderAccepted {
                    request: request(),
                    execution_price: Price::new(dec!(100)),
                })
                .await
                .unwrap();
        }

        for _ in 0..3 {
            assert!(matches!(rx.recv().await, Some(Published::Accepted(_))));
        }
        assert!(broker.accepted().is_empty());
        assert!(broker.rejected().is_empty());
    }

    #[test]
    fn test_request_envelope_wire_format() {
        let json = r#"{
            "id": "m-1",
            "stream": "order.request",
            "publishedAt": "2024-01-01T00:00:00Z",
            "payload": {
                "requestId": "ord_1_abc",
                "order": {
                    "owner": "alice", "action": "open", "kind": "market", "basktId": "b1",
                    "params": {"notionalValue": "100", "leverageBps": 20000, "collateral": "50", "isLong": true}
                }
            }
        }"#;
        let envelope: Envelope<OrderRequest> = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.delivery_count, 0);
        assert_eq!(envelope.payload.request_id.as_str(), "ord_1_abc");
        assert!(envelope.payload.order.is_open());
    }
}
