//! Seeded in-memory namespace for `--demo`.

use busview_server::broker::BrokerResult;
use busview_server::broker::memory::InMemoryBroker;
use busview_server::connection_session::ConnectRequest;
use busview_server::model::OutgoingMessage;
use serde_json::json;

pub const DEMO_CONNECTION_STRING: &str =
    "Endpoint=sb://demo.servicebus.local;SharedAccessKeyName=RootManageSharedAccessKey;SharedAccessKey=demo";

/// A namespace with one queue and one topic with two subscriptions, each
/// holding a few messages.
pub async fn seeded_broker() -> BrokerResult<InMemoryBroker> {
    let broker = InMemoryBroker::new();
    broker.add_queue("orders").await;
    broker.add_topic("events").await;
    broker.add_subscription("events", "audit").await;
    broker.add_subscription("events", "billing").await;

    for n in 1..=3 {
        let body = json!({ "orderId": n, "amount": n * 25 }).to_string();
        broker
            .publish_message(
                "orders",
                OutgoingMessage {
                    message_id: format!("order-{n}"),
                    body,
                    content_type: Some("application/json".to_string()),
                    application_properties: [("region".to_string(), json!("eu"))]
                        .into_iter()
                        .collect(),
                },
            )
            .await?;
    }
    broker.publish("events", "customer signed up").await?;
    broker.publish("events", "invoice issued").await?;

    Ok(broker)
}

/// Connects in administrative mode so the whole demo namespace is listed.
pub fn connect_request() -> ConnectRequest {
    ConnectRequest::new(DEMO_CONNECTION_STRING).with_admin(DEMO_CONNECTION_STRING)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn demo_namespace_is_populated() {
        let broker = claims::assert_ok!(seeded_broker().await);
        assert_eq!(broker.message_count("orders", None).await, 3);
        assert_eq!(broker.message_count("events", Some("audit")).await, 2);
        assert_eq!(broker.message_count("events", Some("billing")).await, 2);
    }
}
