use busview::console::{Console, Flow};
use busview::demo;
use busview_server::broker::memory::InMemoryBroker;
use busview_server::connection_session::{ConnectRequest, ConnectionSession};
use std::sync::Arc;

async fn demo_console() -> (Console, InMemoryBroker) {
    let broker = claims::assert_ok!(demo::seeded_broker().await);
    let session = ConnectionSession::new(Arc::new(broker.clone()));
    (Console::new(session, demo::connect_request()), broker)
}

async fn run(console: &Console, line: &str) -> String {
    match console.handle_line(line).await {
        Flow::Continue(output) => output,
        Flow::Quit => panic!("'{line}' should not quit"),
    }
}

mod connection_tests {
    use super::*;

    #[tokio::test]
    async fn connect_lists_demo_namespace() {
        let (console, _) = demo_console().await;

        let output = run(&console, "connect").await;
        assert_eq!(
            output,
            "Connected to demo.servicebus.local (administrative mode, 4 entities)"
        );

        let listing = run(&console, "entities").await;
        assert_eq!(
            listing.lines().map(str::trim).collect::<Vec<_>>(),
            vec![
                "queue:orders",
                "topic:events",
                "subscription:events/audit",
                "subscription:events/billing",
            ]
        );
    }

    #[tokio::test]
    async fn commands_before_connect_report_not_connected() {
        let (console, _) = demo_console().await;

        assert_eq!(run(&console, "status").await, "Not connected");
        assert!(run(&console, "peek").await.starts_with("NotConnected: "));
        assert!(run(&console, "disconnect").await.starts_with("NotConnected: "));
    }

    #[tokio::test]
    async fn second_connect_is_rejected() {
        let (console, _) = demo_console().await;
        run(&console, "connect").await;

        let output = run(&console, "connect").await;
        assert!(output.starts_with("AlreadyConnected: "), "{output}");
        assert!(console.session().is_connected().await);
    }

    #[tokio::test]
    async fn entity_mode_requires_an_entity() {
        let broker = InMemoryBroker::new();
        let defaults = ConnectRequest::new(demo::DEMO_CONNECTION_STRING);
        let console = Console::new(ConnectionSession::new(Arc::new(broker)), defaults);

        let output = run(&console, "connect").await;
        assert!(output.starts_with("MissingEntityName: "), "{output}");

        let output = run(&console, "connect --entity orders").await;
        assert_eq!(
            output,
            "Connected to demo.servicebus.local (entity mode, 1 entities)"
        );
        assert!(run(&console, "status").await.contains("active entity: orders"));
    }

    #[tokio::test]
    async fn invalid_connection_string_is_reported() {
        let (console, _) = demo_console().await;
        let output = run(&console, "connect HostName=nowhere").await;
        assert!(output.starts_with("InvalidConnectionString: "), "{output}");
    }

    #[tokio::test]
    async fn quit_stops_the_loop() {
        let (console, _) = demo_console().await;
        assert_eq!(console.handle_line("quit").await, Flow::Quit);
    }
}

mod message_tests {
    use super::*;

    #[tokio::test]
    async fn peek_pages_and_finds_by_id() {
        let (console, _) = demo_console().await;
        run(&console, "connect").await;
        assert_eq!(run(&console, "select queue orders").await, "Selected queue:orders");

        let page = run(&console, "peek 2").await;
        let lines: Vec<&str> = page.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("order-1"));
        assert_eq!(lines[2], "(more messages available)");

        let detail = run(&console, "find order-2").await;
        assert!(detail.contains("id: order-2"));
        assert!(detail.contains("property region: \"eu\""));

        assert_eq!(run(&console, "find missing").await, "Message missing not found");
    }

    #[tokio::test]
    async fn send_uses_json_content_type() {
        let (console, broker) = demo_console().await;
        run(&console, "connect").await;
        run(&console, "select subscription audit events").await;

        let output = run(&console, r#"send "{\"hello\":true}" source=console"#).await;
        let id = output
            .strip_prefix("Sent message ")
            .expect("send should report the id");

        let detail = run(&console, &format!("find {id}")).await;
        assert!(detail.contains("content type: application/json"));
        assert!(detail.contains(r#"body: {"hello":true}"#));
        assert_eq!(broker.message_count("events", Some("billing")).await, 3);
    }

    #[tokio::test]
    async fn empty_send_never_reaches_the_broker() {
        let (console, broker) = demo_console().await;
        run(&console, "connect").await;
        run(&console, "select queue orders").await;

        let output = run(&console, "send ''").await;
        assert!(output.starts_with("EmptyBody: "), "{output}");
        assert_eq!(broker.message_count("orders", None).await, 3);
    }

    #[tokio::test]
    async fn receive_completes_one_message() {
        let (console, broker) = demo_console().await;
        run(&console, "connect").await;
        run(&console, "select queue orders").await;

        let detail = run(&console, "receive").await;
        assert!(detail.contains("id: order-1"));
        assert_eq!(broker.message_count("orders", None).await, 2);
    }

    #[tokio::test]
    async fn receive_on_empty_entity() {
        let (console, broker) = demo_console().await;
        broker.add_queue("empty").await;
        run(&console, "connect").await;
        run(&console, "select queue empty").await;

        assert_eq!(run(&console, "receive").await, "No message available");
        assert_eq!(run(&console, "peek").await, "No messages");
    }
}

mod administration_tests {
    use super::*;

    #[tokio::test]
    async fn topics_cannot_be_selected() {
        let (console, _) = demo_console().await;
        run(&console, "connect").await;

        let output = run(&console, "select topic events").await;
        assert_eq!(
            output,
            "TopicNotSelectable: Please select the subscription for the topic events"
        );
    }

    #[tokio::test]
    async fn props_shows_entity_configuration() {
        let (console, _) = demo_console().await;
        run(&console, "connect").await;

        let output = run(&console, "props queue orders").await;
        assert!(output.starts_with("queue:orders"));
        assert!(output.contains("Name: orders"));

        let output = run(&console, "props queue nowhere").await;
        assert!(output.starts_with("EntityNotFound: "), "{output}");
    }

    #[tokio::test]
    async fn refresh_picks_up_new_entities() {
        let (console, broker) = demo_console().await;
        run(&console, "connect").await;
        broker.add_queue("late").await;

        assert_eq!(run(&console, "refresh").await, "Refreshed 5 entities");
        assert!(run(&console, "entities").await.contains("queue:late"));
    }
}
