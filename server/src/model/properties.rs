use crate::model::entity::EntityDescriptor;
use crate::utils::duration::format_duration;
use serde::Serialize;
use std::time::Duration;

/// Broker-side configuration of a queue.
#[derive(Serialize, Clone, PartialEq, Eq, Debug)]
pub struct QueueProperties {
    pub name: String,
    pub lock_duration: Duration,
    pub max_delivery_count: u32,
    pub default_message_time_to_live: Duration,
    pub requires_duplicate_detection: bool,
    pub duplicate_detection_history_time_window: Duration,
    pub dead_lettering_on_message_expiration: bool,
    pub enable_batched_operations: bool,
    pub requires_session: bool,
    pub enable_partitioning: bool,
    pub auto_delete_on_idle: Duration,
}

/// Broker-side configuration of a topic.
#[derive(Serialize, Clone, PartialEq, Eq, Debug)]
pub struct TopicProperties {
    pub name: String,
    pub default_message_time_to_live: Duration,
    pub requires_duplicate_detection: bool,
    pub duplicate_detection_history_time_window: Duration,
    pub enable_batched_operations: bool,
    pub enable_partitioning: bool,
    pub auto_delete_on_idle: Duration,
}

/// Broker-side configuration of a subscription.
#[derive(Serialize, Clone, PartialEq, Eq, Debug)]
pub struct SubscriptionProperties {
    pub name: String,
    pub topic_name: String,
    pub lock_duration: Duration,
    pub max_delivery_count: u32,
    pub default_message_time_to_live: Duration,
    pub dead_lettering_on_message_expiration: bool,
    pub requires_session: bool,
    pub enable_batched_operations: bool,
    pub auto_delete_on_idle: Duration,
}

/// A point-in-time snapshot of one entity's configuration.
///
/// Fetched on demand and never cached by the session.
#[derive(Serialize, Clone, PartialEq, Eq, Debug)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EntityProperties {
    Queue(QueueProperties),
    Topic(TopicProperties),
    Subscription(SubscriptionProperties),
}

impl EntityProperties {
    pub fn descriptor(&self) -> EntityDescriptor {
        match self {
            EntityProperties::Queue(q) => EntityDescriptor::queue(&q.name),
            EntityProperties::Topic(t) => EntityDescriptor::topic(&t.name),
            EntityProperties::Subscription(s) => {
                EntityDescriptor::subscription(&s.name, &s.topic_name)
            }
        }
    }

    /// Label/value rows in display order.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        match self {
            EntityProperties::Queue(q) => vec![
                ("Name", q.name.clone()),
                ("Lock duration", format_duration(q.lock_duration)),
                ("Max delivery count", q.max_delivery_count.to_string()),
                (
                    "Default message TTL",
                    format_duration(q.default_message_time_to_live),
                ),
                (
                    "Requires duplicate detection",
                    q.requires_duplicate_detection.to_string(),
                ),
                (
                    "Duplicate detection window",
                    format_duration(q.duplicate_detection_history_time_window),
                ),
                (
                    "Dead-letter on expiration",
                    q.dead_lettering_on_message_expiration.to_string(),
                ),
                ("Batched operations", q.enable_batched_operations.to_string()),
                ("Requires session", q.requires_session.to_string()),
                ("Partitioning", q.enable_partitioning.to_string()),
                ("Auto-delete on idle", format_duration(q.auto_delete_on_idle)),
            ],
            EntityProperties::Topic(t) => vec![
                ("Name", t.name.clone()),
                (
                    "Default message TTL",
                    format_duration(t.default_message_time_to_live),
                ),
                (
                    "Requires duplicate detection",
                    t.requires_duplicate_detection.to_string(),
                ),
                (
                    "Duplicate detection window",
                    format_duration(t.duplicate_detection_history_time_window),
                ),
                ("Batched operations", t.enable_batched_operations.to_string()),
                ("Partitioning", t.enable_partitioning.to_string()),
                ("Auto-delete on idle", format_duration(t.auto_delete_on_idle)),
            ],
            EntityProperties::Subscription(s) => vec![
                ("Name", s.name.clone()),
                ("Topic", s.topic_name.clone()),
                ("Lock duration", format_duration(s.lock_duration)),
                ("Max delivery count", s.max_delivery_count.to_string()),
                (
                    "Default message TTL",
                    format_duration(s.default_message_time_to_live),
                ),
                (
                    "Dead-letter on expiration",
                    s.dead_lettering_on_message_expiration.to_string(),
                ),
                ("Requires session", s.requires_session.to_string()),
                ("Batched operations", s.enable_batched_operations.to_string()),
                ("Auto-delete on idle", format_duration(s.auto_delete_on_idle)),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_descriptor_keeps_topic() {
        let props = EntityProperties::Subscription(SubscriptionProperties {
            name: "audit".to_string(),
            topic_name: "events".to_string(),
            lock_duration: Duration::from_secs(60),
            max_delivery_count: 10,
            default_message_time_to_live: Duration::from_secs(3600),
            dead_lettering_on_message_expiration: false,
            requires_session: false,
            enable_batched_operations: true,
            auto_delete_on_idle: Duration::from_secs(86_400),
        });

        assert_eq!(
            props.descriptor(),
            EntityDescriptor::subscription("audit", "events")
        );
        let fields = props.fields();
        assert_eq!(fields[1], ("Topic", "events".to_string()));
        assert_eq!(fields[2], ("Lock duration", "1m".to_string()));
    }
}
