use crate::broker::azure::classify_sdk_error;
use crate::broker::{BrokerError, BrokerResult, Delivery, EntityReceiver};
use crate::model::MessageDetail;
use async_trait::async_trait;
use azservicebus::{ServiceBusReceivedMessage, ServiceBusReceiver};
use std::collections::HashMap;
use std::time::Duration;

/// Receiver for one queue or subscription, opened in peek-lock mode.
///
/// Received messages are held until completed so the lock can be settled
/// through the [`Delivery`] handed to the caller. Disposing the receiver
/// drops any still-held messages; their locks lapse on the broker.
pub struct Consumer {
    receiver: Option<ServiceBusReceiver>,
    pending: HashMap<u64, ServiceBusReceivedMessage>,
    next_lock_token: u64,
}

impl Consumer {
    pub fn new(receiver: ServiceBusReceiver) -> Self {
        Self {
            receiver: Some(receiver),
            pending: HashMap::new(),
            next_lock_token: 0,
        }
    }

    fn receiver_mut(&mut self) -> BrokerResult<&mut ServiceBusReceiver> {
        self.receiver
            .as_mut()
            .ok_or_else(|| BrokerError::connection("Receiver already disposed"))
    }
}

#[async_trait]
impl EntityReceiver for Consumer {
    async fn peek(&mut self, max_count: u32) -> BrokerResult<Vec<MessageDetail>> {
        let receiver = self.receiver_mut()?;
        let messages = receiver
            .peek_messages(max_count, None)
            .await
            .map_err(|e| classify_sdk_error("Peek failed", e))?;

        Ok(messages.iter().map(MessageDetail::from).collect())
    }

    async fn receive_one(&mut self, max_wait: Duration) -> BrokerResult<Option<Delivery>> {
        let receiver = self.receiver_mut()?;
        let received = match tokio::time::timeout(max_wait, receiver.receive_messages(1)).await {
            Ok(result) => result.map_err(|e| classify_sdk_error("Receive failed", e))?,
            Err(_) => {
                log::debug!("receive_messages timed out after {max_wait:?}, returning no message");
                return Ok(None);
            }
        };

        let Some(message) = received.into_iter().next() else {
            return Ok(None);
        };

        self.next_lock_token += 1;
        let lock_token = self.next_lock_token;
        let detail = MessageDetail::from(&message);
        self.pending.insert(lock_token, message);

        Ok(Some(Delivery { detail, lock_token }))
    }

    async fn complete(&mut self, delivery: &Delivery) -> BrokerResult<()> {
        let message = self.pending.remove(&delivery.lock_token).ok_or_else(|| {
            BrokerError::other(format!(
                "Message '{}' was not received by this receiver",
                delivery.detail.id
            ))
        })?;

        let receiver = self.receiver_mut()?;
        receiver
            .complete_message(&message)
            .await
            .map_err(|e| classify_sdk_error("Complete failed", e))?;

        log::debug!(
            "Completed message {} (sequence: {})",
            delivery.detail.id,
            delivery.detail.sequence_number
        );
        Ok(())
    }

    async fn close(&mut self) -> BrokerResult<()> {
        if !self.pending.is_empty() {
            log::debug!(
                "Disposing receiver with {} uncompleted messages",
                self.pending.len()
            );
            self.pending.clear();
        }
        if let Some(receiver) = self.receiver.take() {
            receiver
                .dispose()
                .await
                .map_err(|e| classify_sdk_error("Failed to dispose receiver", e))?;
        }
        Ok(())
    }
}
