use claims::{assert_err, assert_matches, assert_none, assert_ok, assert_some};
use serde_json::json;
use server::broker::BrokerError;
use server::broker::memory::{FailurePoint, InMemoryBroker};
use server::connection_session::{
    ConnectRequest, ConnectionSession, SessionError, SessionOptions,
};
use server::model::{DEFAULT_CONTENT_TYPE, EntityDescriptor};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

const CONNECTION_STRING: &str = "Endpoint=sb://localhost;SharedAccessKeyName=RootManageSharedAccessKey;SharedAccessKey=SAS_KEY_VALUE;UseDevelopmentEmulator=true;";

async fn queue_session(options: SessionOptions) -> (InMemoryBroker, ConnectionSession) {
    let broker = InMemoryBroker::new();
    broker.add_queue("orders").await;
    broker.add_subscription("events", "audit").await;
    let session = ConnectionSession::with_options(Arc::new(broker.clone()), options);
    assert_ok!(
        session
            .connect(ConnectRequest::new(CONNECTION_STRING).with_entity("orders"))
            .await
    );
    (broker, session)
}

async fn fill(broker: &InMemoryBroker, entity: &str, count: usize) -> Vec<String> {
    let mut ids = Vec::new();
    for i in 0..count {
        ids.push(assert_ok!(broker.publish(entity, format!("message {i}")).await));
    }
    ids
}

#[cfg(test)]
mod peek_tests {
    use super::*;

    #[tokio::test]
    async fn test_peek_reports_more_when_page_overflows() {
        let (broker, session) = queue_session(SessionOptions::default()).await;
        let ids = fill(&broker, "orders", 4).await;

        let page = assert_ok!(session.peek(3).await);

        assert_eq!(page.len(), 3);
        assert!(page.has_more);
        let peeked: Vec<_> = page.messages.iter().map(|m| m.id.clone()).collect();
        assert_eq!(peeked, ids[..3].to_vec());
        // peeking never removes
        assert_eq!(broker.message_count("orders", None).await, 4);
    }

    #[tokio::test]
    async fn test_peek_exact_page_has_no_more() {
        let (broker, session) = queue_session(SessionOptions::default()).await;
        fill(&broker, "orders", 3).await;

        let page = assert_ok!(session.peek(3).await);

        assert_eq!(page.len(), 3);
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn test_peek_zero_only_reports_presence() {
        let (broker, session) = queue_session(SessionOptions::default()).await;

        let page = assert_ok!(session.peek(0).await);
        assert!(page.is_empty());
        assert!(!page.has_more);

        fill(&broker, "orders", 1).await;
        let page = assert_ok!(session.peek(0).await);
        assert!(page.is_empty());
        assert!(page.has_more);
    }

    #[tokio::test]
    async fn test_peek_default_page_size() {
        let options = SessionOptions::default().with_default_page_size(2);
        let (broker, session) = queue_session(options).await;
        fill(&broker, "orders", 5).await;

        let page = assert_ok!(session.peek_default().await);
        assert_eq!(page.len(), 2);
        assert!(page.has_more);
    }

    #[tokio::test]
    async fn test_peek_while_disconnected_fails() {
        let session = ConnectionSession::new(Arc::new(InMemoryBroker::new()));
        assert_eq!(
            assert_err!(session.peek(10).await),
            SessionError::NotConnected
        );
    }

    #[tokio::test]
    async fn test_peek_without_active_entity_is_empty() {
        let broker = InMemoryBroker::new();
        broker.add_queue("orders").await;
        fill(&broker, "orders", 2).await;
        let session = ConnectionSession::new(Arc::new(broker.clone()));
        assert_ok!(
            session
                .connect(ConnectRequest::new(CONNECTION_STRING).with_admin(CONNECTION_STRING))
                .await
        );

        let page = assert_ok!(session.peek(10).await);

        assert!(page.is_empty());
        assert!(!page.has_more);
        assert_eq!(broker.stats().await.receivers_opened, 0);
    }

    #[tokio::test]
    async fn test_peek_follows_selected_subscription() {
        let (broker, session) = queue_session(SessionOptions::default()).await;
        fill(&broker, "orders", 1).await;
        fill(&broker, "events", 2).await;

        assert_ok!(
            session
                .select_entity(&EntityDescriptor::subscription("audit", "events"))
                .await
        );
        let page = assert_ok!(session.peek(10).await);

        assert_eq!(page.len(), 2);
        assert_eq!(page.messages[0].content_type, DEFAULT_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn test_peek_by_message_id_scans_bounded_window() {
        let options = SessionOptions::default().with_peek_scan_limit(3);
        let (broker, session) = queue_session(options).await;
        let ids = fill(&broker, "orders", 5).await;

        let found = assert_some!(assert_ok!(session.peek_by_message_id(&ids[2]).await));
        assert_eq!(found.body, "message 2");

        // outside the scanned window
        assert_none!(assert_ok!(session.peek_by_message_id(&ids[4]).await));
        assert_none!(assert_ok!(session.peek_by_message_id("missing").await));
    }
}

#[cfg(test)]
mod receive_tests {
    use super::*;

    #[tokio::test]
    async fn test_receive_on_empty_entity_returns_none() {
        let (broker, session) = queue_session(SessionOptions::default()).await;

        assert_none!(assert_ok!(session.receive_one().await));
        assert_eq!(broker.stats().await.open_receivers(), 0);
    }

    #[tokio::test]
    async fn test_receive_completes_message() {
        let (broker, session) = queue_session(SessionOptions::default()).await;
        let ids = fill(&broker, "orders", 2).await;

        let message = assert_some!(assert_ok!(session.receive_one().await));

        assert_eq!(message.id, ids[0]);
        assert_eq!(broker.message_count("orders", None).await, 1);
        let stats = broker.stats().await;
        assert_eq!(stats.messages_completed, 1);
        assert_eq!(stats.open_receivers(), 0);
    }

    #[tokio::test]
    async fn test_complete_failure_is_surfaced_and_not_retried() {
        let (broker, session) = queue_session(SessionOptions::default()).await;
        let ids = fill(&broker, "orders", 1).await;
        broker
            .fail_on(FailurePoint::Complete, BrokerError::other("lock lost"))
            .await;

        let err = assert_err!(session.receive_one().await);

        assert_matches!(
            err,
            SessionError::MessageCompleteFailed { ref message_id, .. } if *message_id == ids[0]
        );
        // the lock is released when the receiver closes, so the message is still there
        assert_eq!(broker.message_count("orders", None).await, 1);
        assert_eq!(broker.stats().await.open_receivers(), 0);
    }

    #[tokio::test]
    async fn test_receive_while_disconnected_fails() {
        let session = ConnectionSession::new(Arc::new(InMemoryBroker::new()));
        assert_eq!(
            assert_err!(session.receive_one().await),
            SessionError::NotConnected
        );
    }
}

#[cfg(test)]
mod send_tests {
    use super::*;

    #[tokio::test]
    async fn test_send_then_peek_round_trip() {
        let (_broker, session) = queue_session(SessionOptions::default()).await;

        let first = assert_ok!(
            session
                .send(
                    "{\"total\":10}",
                    Some("application/json"),
                    vec![("source".to_string(), json!("console"))]
                )
                .await
        );
        let second = assert_ok!(session.send("plain", None, Vec::new()).await);

        assert!(!first.is_empty());
        assert_ne!(first, second);

        let page = assert_ok!(session.peek(10).await);
        assert_eq!(page.len(), 2);
        assert_eq!(page.messages[0].id, first);
        assert_eq!(page.messages[0].body, "{\"total\":10}");
        assert_eq!(page.messages[0].content_type, "application/json");
        assert_eq!(
            page.messages[0].application_properties.get("source"),
            Some(&json!("console"))
        );
        assert_eq!(page.messages[1].content_type, DEFAULT_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn test_send_generates_unique_ids() {
        let (_broker, session) = queue_session(SessionOptions::default()).await;
        let mut ids = HashSet::new();
        for _ in 0..20 {
            ids.insert(assert_ok!(session.send("x", None, Vec::new()).await));
        }
        assert_eq!(ids.len(), 20);
    }

    #[tokio::test]
    async fn test_send_drops_only_empty_property_keys() {
        let (_broker, session) = queue_session(SessionOptions::default()).await;

        assert_ok!(
            session
                .send(
                    "body",
                    None,
                    vec![
                        ("".to_string(), json!(1)),
                        ("  ".to_string(), json!(2)),
                        ("kept".to_string(), json!(3)),
                    ]
                )
                .await
        );

        let page = assert_ok!(session.peek(1).await);
        let keys: Vec<_> = page.messages[0].application_properties.keys().cloned().collect();
        assert_eq!(keys, vec!["  ".to_string(), "kept".to_string()]);
    }

    #[tokio::test]
    async fn test_send_to_subscription_targets_parent_topic() {
        let (broker, session) = queue_session(SessionOptions::default()).await;
        broker.add_subscription("events", "billing").await;
        assert_ok!(
            session
                .select_entity(&EntityDescriptor::subscription("audit", "events"))
                .await
        );

        assert_ok!(session.send("fan out", None, Vec::new()).await);

        assert_eq!(broker.message_count("events", Some("audit")).await, 1);
        assert_eq!(broker.message_count("events", Some("billing")).await, 1);
        assert_eq!(broker.message_count("orders", None).await, 0);
    }

    #[tokio::test]
    async fn test_send_failure_closes_sender() {
        let (broker, session) = queue_session(SessionOptions::default()).await;
        broker
            .fail_on(FailurePoint::Send, BrokerError::connection("link detached"))
            .await;

        let err = assert_err!(session.send("lost", None, Vec::new()).await);

        assert_eq!(
            err,
            SessionError::Broker(BrokerError::connection("link detached"))
        );
        let stats = broker.stats().await;
        assert_eq!(stats.senders_opened, 1);
        assert_eq!(stats.open_senders(), 0);
    }
}

#[cfg(test)]
mod resource_tests {
    use super::*;

    #[tokio::test]
    async fn test_every_receiver_is_closed_after_success_and_failure() {
        let (broker, session) = queue_session(SessionOptions::default()).await;
        fill(&broker, "orders", 3).await;

        assert_ok!(session.peek(2).await);
        assert_ok!(session.peek_by_message_id("x").await);
        assert_ok!(session.receive_one().await);

        broker
            .fail_on(FailurePoint::Peek, BrokerError::connection("link detached"))
            .await;
        assert_err!(session.peek(2).await);
        broker
            .fail_on(FailurePoint::Receive, BrokerError::connection("link detached"))
            .await;
        assert_err!(session.receive_one().await);

        let stats = broker.stats().await;
        assert_eq!(stats.receivers_opened, 5);
        assert_eq!(stats.open_receivers(), 0);
    }

    #[tokio::test]
    async fn test_close_failure_does_not_mask_result() {
        let (broker, session) = queue_session(SessionOptions::default()).await;
        fill(&broker, "orders", 1).await;
        broker
            .fail_on(FailurePoint::CloseReceiver, BrokerError::other("already detached"))
            .await;

        let page = assert_ok!(session.peek(5).await);
        assert_eq!(page.len(), 1);
    }

    #[tokio::test]
    async fn test_open_receiver_failure_is_reported() {
        let (broker, session) = queue_session(SessionOptions::default()).await;
        assert_ok!(session.select_entity(&EntityDescriptor::queue("ghost")).await);

        let err = assert_err!(session.peek(5).await);
        assert_matches!(err, SessionError::Broker(ref e) if e.is_not_found());
        assert_eq!(broker.stats().await.receivers_opened, 0);
    }

    #[tokio::test]
    async fn test_slow_broker_call_times_out() {
        let options = SessionOptions::default().with_operation_timeout(Duration::from_millis(20));
        let (broker, session) = queue_session(options).await;
        broker.delay_on(FailurePoint::Peek, Duration::from_secs(5)).await;

        let err = assert_err!(session.peek(5).await);

        assert_matches!(err, SessionError::OperationTimeout { operation: "peek", .. });
        assert_eq!(broker.stats().await.open_receivers(), 0);
    }

    #[tokio::test]
    async fn test_in_flight_peek_keeps_its_selection() {
        let (broker, session) = queue_session(SessionOptions::default()).await;
        assert_ok!(broker.publish("orders", "order placed").await);
        assert_ok!(broker.publish("orders", "order shipped").await);
        assert_ok!(broker.publish("events", "audit entry").await);
        broker
            .delay_on(FailurePoint::OpenReceiver, Duration::from_millis(200))
            .await;
        let session = Arc::new(session);

        let worker = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.peek(10).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_ok!(
            session
                .select_entity(&EntityDescriptor::subscription("audit", "events"))
                .await
        );

        let page = assert_ok!(assert_ok!(worker.await));
        let bodies: Vec<_> = page.messages.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["order placed", "order shipped"]);

        broker.clear_failures().await;
        let page = assert_ok!(session.peek(10).await);
        let bodies: Vec<_> = page.messages.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["audit entry"]);
    }

    #[tokio::test]
    async fn test_long_receive_wait_does_not_overflow() {
        let options = SessionOptions::default().with_receive_wait(Duration::MAX);
        let (broker, session) = queue_session(options).await;
        fill(&broker, "orders", 1).await;

        let message = assert_ok!(session.receive_one().await);
        assert_some!(message);
    }

    #[tokio::test]
    async fn test_cancellation_aborts_in_flight_call() {
        let (broker, session) = queue_session(SessionOptions::default()).await;
        broker.delay_on(FailurePoint::Send, Duration::from_secs(5)).await;
        let session = Arc::new(session);

        let token = session.cancellation_token();
        let worker = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.send("slow", None, Vec::new()).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();

        let result = assert_ok!(worker.await);
        assert_matches!(result, Err(SessionError::Cancelled { operation: "send" }));
        assert_eq!(broker.stats().await.open_senders(), 0);
    }
}
