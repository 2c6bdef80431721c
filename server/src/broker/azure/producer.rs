use crate::broker::azure::classify_sdk_error;
use crate::broker::azure::conversion::to_service_bus_message;
use crate::broker::{BrokerError, BrokerResult, EntitySender};
use crate::model::OutgoingMessage;
use async_trait::async_trait;
use azservicebus::ServiceBusSender;

/// Sender for one queue or topic.
pub struct Producer {
    sender: Option<ServiceBusSender>,
}

impl Producer {
    pub fn new(sender: ServiceBusSender) -> Self {
        Self {
            sender: Some(sender),
        }
    }
}

#[async_trait]
impl EntitySender for Producer {
    async fn send(&mut self, message: OutgoingMessage) -> BrokerResult<()> {
        let sender = self
            .sender
            .as_mut()
            .ok_or_else(|| BrokerError::connection("Sender already disposed"))?;

        let message_id = message.message_id.clone();
        let message = to_service_bus_message(message)?;
        sender
            .send_message(message)
            .await
            .map_err(|e| classify_sdk_error("Send failed", e))?;

        log::debug!("Sent message {message_id}");
        Ok(())
    }

    async fn close(&mut self) -> BrokerResult<()> {
        if let Some(sender) = self.sender.take() {
            sender
                .dispose()
                .await
                .map_err(|e| classify_sdk_error("Failed to dispose sender", e))?;
        }
        Ok(())
    }
}
