//! Atom feed documents returned by the Service Bus management endpoint.
//!
//! A listing is a `<feed>` of `<entry>` elements; a single entity lookup
//! returns one `<entry>`. Each entry's `<content>` wraps a
//! `QueueDescription`, `TopicDescription` or `SubscriptionDescription`.
//! Looking up an entity that does not exist yields an empty feed.

use crate::model::{EntityProperties, QueueProperties, SubscriptionProperties, TopicProperties};
use crate::utils::duration::parse_iso8601_duration;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Default)]
pub struct Feed {
    #[serde(rename = "entry", default)]
    pub entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
pub struct Entry {
    pub title: Text,
    #[serde(default)]
    pub content: Option<Content>,
}

#[derive(Debug, Deserialize, Default)]
pub struct Text {
    #[serde(rename = "$text", default)]
    pub value: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct Content {
    #[serde(rename = "QueueDescription", default)]
    pub queue: Option<QueueDescription>,
    #[serde(rename = "TopicDescription", default)]
    pub topic: Option<TopicDescription>,
    #[serde(rename = "SubscriptionDescription", default)]
    pub subscription: Option<SubscriptionDescription>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct QueueDescription {
    pub lock_duration: Option<String>,
    pub max_delivery_count: Option<u32>,
    pub default_message_time_to_live: Option<String>,
    pub requires_duplicate_detection: Option<bool>,
    pub duplicate_detection_history_time_window: Option<String>,
    pub dead_lettering_on_message_expiration: Option<bool>,
    pub enable_batched_operations: Option<bool>,
    pub requires_session: Option<bool>,
    pub enable_partitioning: Option<bool>,
    pub auto_delete_on_idle: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct TopicDescription {
    pub default_message_time_to_live: Option<String>,
    pub requires_duplicate_detection: Option<bool>,
    pub duplicate_detection_history_time_window: Option<String>,
    pub enable_batched_operations: Option<bool>,
    pub enable_partitioning: Option<bool>,
    pub auto_delete_on_idle: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct SubscriptionDescription {
    pub lock_duration: Option<String>,
    pub max_delivery_count: Option<u32>,
    pub default_message_time_to_live: Option<String>,
    pub dead_lettering_on_message_expiration: Option<bool>,
    pub requires_session: Option<bool>,
    pub enable_batched_operations: Option<bool>,
    pub auto_delete_on_idle: Option<String>,
}

/// A field held a value that could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidField {
    pub field: &'static str,
    pub value: String,
}

pub fn parse_feed(xml: &str) -> Result<Feed, quick_xml::DeError> {
    quick_xml::de::from_str(xml)
}

pub fn parse_entry(xml: &str) -> Result<Entry, quick_xml::DeError> {
    quick_xml::de::from_str(xml)
}

fn duration(field: &'static str, value: Option<String>) -> Result<Duration, InvalidField> {
    match value {
        None => Ok(Duration::ZERO),
        Some(text) => parse_iso8601_duration(&text).ok_or(InvalidField { field, value: text }),
    }
}

impl QueueDescription {
    pub fn into_properties(self, name: &str) -> Result<EntityProperties, InvalidField> {
        Ok(EntityProperties::Queue(QueueProperties {
            name: name.to_string(),
            lock_duration: duration("LockDuration", self.lock_duration)?,
            max_delivery_count: self.max_delivery_count.unwrap_or_default(),
            default_message_time_to_live: duration(
                "DefaultMessageTimeToLive",
                self.default_message_time_to_live,
            )?,
            requires_duplicate_detection: self.requires_duplicate_detection.unwrap_or_default(),
            duplicate_detection_history_time_window: duration(
                "DuplicateDetectionHistoryTimeWindow",
                self.duplicate_detection_history_time_window,
            )?,
            dead_lettering_on_message_expiration: self
                .dead_lettering_on_message_expiration
                .unwrap_or_default(),
            enable_batched_operations: self.enable_batched_operations.unwrap_or_default(),
            requires_session: self.requires_session.unwrap_or_default(),
            enable_partitioning: self.enable_partitioning.unwrap_or_default(),
            auto_delete_on_idle: duration("AutoDeleteOnIdle", self.auto_delete_on_idle)?,
        }))
    }
}

impl TopicDescription {
    pub fn into_properties(self, name: &str) -> Result<EntityProperties, InvalidField> {
        Ok(EntityProperties::Topic(TopicProperties {
            name: name.to_string(),
            default_message_time_to_live: duration(
                "DefaultMessageTimeToLive",
                self.default_message_time_to_live,
            )?,
            requires_duplicate_detection: self.requires_duplicate_detection.unwrap_or_default(),
            duplicate_detection_history_time_window: duration(
                "DuplicateDetectionHistoryTimeWindow",
                self.duplicate_detection_history_time_window,
            )?,
            enable_batched_operations: self.enable_batched_operations.unwrap_or_default(),
            enable_partitioning: self.enable_partitioning.unwrap_or_default(),
            auto_delete_on_idle: duration("AutoDeleteOnIdle", self.auto_delete_on_idle)?,
        }))
    }
}

impl SubscriptionDescription {
    pub fn into_properties(
        self,
        name: &str,
        topic_name: &str,
    ) -> Result<EntityProperties, InvalidField> {
        Ok(EntityProperties::Subscription(SubscriptionProperties {
            name: name.to_string(),
            topic_name: topic_name.to_string(),
            lock_duration: duration("LockDuration", self.lock_duration)?,
            max_delivery_count: self.max_delivery_count.unwrap_or_default(),
            default_message_time_to_live: duration(
                "DefaultMessageTimeToLive",
                self.default_message_time_to_live,
            )?,
            dead_lettering_on_message_expiration: self
                .dead_lettering_on_message_expiration
                .unwrap_or_default(),
            requires_session: self.requires_session.unwrap_or_default(),
            enable_batched_operations: self.enable_batched_operations.unwrap_or_default(),
            auto_delete_on_idle: duration("AutoDeleteOnIdle", self.auto_delete_on_idle)?,
        }))
    }
}
