//! Building the list of entities a session offers for selection.

use crate::broker::AdminClient;
use crate::connection_session::call_guard::CallGuard;
use crate::connection_session::errors::SessionResult;
use crate::model::EntityDescriptor;

/// The entities implied by a non-administrative connect.
///
/// A lone entity name is a queue; with a subscription it is a topic followed
/// by that subscription.
pub(crate) fn seed_inventory(
    entity_name: &str,
    subscription_name: Option<&str>,
) -> Vec<EntityDescriptor> {
    match subscription_name {
        None => vec![EntityDescriptor::queue(entity_name)],
        Some(subscription) => vec![
            EntityDescriptor::topic(entity_name),
            EntityDescriptor::subscription(subscription, entity_name),
        ],
    }
}

/// Lists the whole namespace: queues first, then each topic immediately
/// followed by its own subscriptions, all in broker listing order.
///
/// Nothing is returned unless every listing call succeeds.
pub(crate) async fn collect_inventory(
    admin: &dyn AdminClient,
    guard: &CallGuard,
) -> SessionResult<Vec<EntityDescriptor>> {
    let queues = guard.run("list_queues", admin.list_queues()).await?;
    let topics = guard.run("list_topics", admin.list_topics()).await?;

    let mut entities: Vec<EntityDescriptor> =
        queues.into_iter().map(EntityDescriptor::queue).collect();

    for topic in topics {
        let subscriptions = guard
            .run("list_subscriptions", admin.list_subscriptions(&topic))
            .await?;
        entities.push(EntityDescriptor::topic(topic.clone()));
        entities.extend(
            subscriptions
                .into_iter()
                .map(|subscription| EntityDescriptor::subscription(subscription, topic.clone())),
        );
    }

    log::debug!("Collected {} entities", entities.len());
    Ok(entities)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_for_queue_and_subscription() {
        assert_eq!(
            seed_inventory("orders", None),
            vec![EntityDescriptor::queue("orders")]
        );
        assert_eq!(
            seed_inventory("orders", Some("sub1")),
            vec![
                EntityDescriptor::topic("orders"),
                EntityDescriptor::subscription("sub1", "orders"),
            ]
        );
    }
}
