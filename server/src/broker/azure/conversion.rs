//! Conversions between `azservicebus` messages and the crate's model.

use crate::broker::{BrokerError, BrokerResult};
use crate::model::{MessageDetail, OutgoingMessage};
use azservicebus::prelude::ServiceBusPeekedMessage;
use azservicebus::{ServiceBusMessage, ServiceBusReceivedMessage};
use azure_core::time::OffsetDateTime;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;

fn to_utc(time: OffsetDateTime) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(time.unix_timestamp(), time.nanosecond()).unwrap_or_default()
}

// Peeked and received messages expose the same accessors but share no trait.
macro_rules! message_detail_from {
    ($source:ty) => {
        impl From<&$source> for MessageDetail {
            fn from(msg: &$source) -> Self {
                let id = msg
                    .message_id()
                    .map(|id| id.to_string())
                    .unwrap_or_default();
                let body = msg
                    .body()
                    .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
                    .unwrap_or_default();

                let properties: BTreeMap<String, Value> = msg
                    .application_properties()
                    .map(|props| {
                        props
                            .0
                            .iter()
                            .map(|(key, value)| {
                                (
                                    key.clone(),
                                    serde_json::to_value(value).unwrap_or(Value::Null),
                                )
                            })
                            .collect()
                    })
                    .unwrap_or_default();

                MessageDetail::new(
                    id,
                    msg.sequence_number(),
                    body,
                    msg.content_type(),
                    to_utc(msg.enqueued_time()),
                )
                .with_properties(properties)
            }
        }
    };
}

message_detail_from!(ServiceBusPeekedMessage);
message_detail_from!(ServiceBusReceivedMessage);

/// Build the SDK message for an [`OutgoingMessage`].
///
/// JSON strings, booleans and numbers keep their type; other values are sent
/// as their JSON text.
pub fn to_service_bus_message(message: OutgoingMessage) -> BrokerResult<ServiceBusMessage> {
    let mut sdk_message = ServiceBusMessage::new(message.body.into_bytes());
    sdk_message
        .set_message_id(message.message_id)
        .map_err(|e| BrokerError::other(format!("Invalid message id: {e}")))?;

    if let Some(content_type) = message.content_type {
        sdk_message.set_content_type(content_type);
    }

    if !message.application_properties.is_empty() {
        let bag = sdk_message
            .application_properties_mut()
            .get_or_insert_with(Default::default);
        for (key, value) in message.application_properties {
            let value = match value {
                Value::String(s) => s.into(),
                Value::Bool(b) => b.into(),
                Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                    (Some(i), _) => i.into(),
                    (None, Some(f)) => f.into(),
                    (None, None) => n.to_string().into(),
                },
                other => other.to_string().into(),
            };
            bag.0.insert(key, value);
        }
    }

    Ok(sdk_message)
}
