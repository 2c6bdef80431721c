use busview_server::connection_session::ActiveEntity;
use busview_server::model::{EntityDescriptor, EntityProperties, MessageDetail, MessagePage};

/// Bodies longer than this are cut in page listings
const BODY_PREVIEW_CHARS: usize = 60;

fn preview(body: &str) -> String {
    let single_line = body.replace(['\r', '\n'], " ");
    if single_line.chars().count() > BODY_PREVIEW_CHARS {
        let cut: String = single_line.chars().take(BODY_PREVIEW_CHARS).collect();
        format!("{cut}...")
    } else {
        single_line
    }
}

pub fn active_entity(active: &ActiveEntity) -> String {
    match &active.subscription_name {
        Some(subscription) => format!("{}/{}", active.entity_name, subscription),
        None => active.entity_name.clone(),
    }
}

/// One line per entity, the active one marked with `*`.
pub fn entity_list(entities: &[EntityDescriptor], active: Option<&ActiveEntity>) -> String {
    if entities.is_empty() {
        return "No entities".to_string();
    }

    entities
        .iter()
        .map(|entity| {
            let selected = active.is_some_and(|a| match entity {
                EntityDescriptor::Queue { name } => {
                    a.entity_name == *name && a.subscription_name.is_none()
                }
                EntityDescriptor::Subscription { name, topic_name } => {
                    a.entity_name == *topic_name
                        && a.subscription_name.as_deref() == Some(name.as_str())
                }
                EntityDescriptor::Topic { .. } => false,
            });
            format!("{} {entity}", if selected { "*" } else { " " })
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn page(page: &MessagePage) -> String {
    if page.is_empty() {
        return "No messages".to_string();
    }

    let mut lines: Vec<String> = page
        .messages
        .iter()
        .map(|m| {
            format!(
                "{:>6}  {}  {}  {}",
                m.sequence_number,
                m.id,
                m.enqueued_time_utc.format("%Y-%m-%d %H:%M:%S"),
                preview(&m.body)
            )
        })
        .collect();
    if page.has_more {
        lines.push("(more messages available)".to_string());
    }
    lines.join("\n")
}

pub fn message(detail: &MessageDetail) -> String {
    let mut lines = vec![
        format!("id: {}", detail.id),
        format!("sequence: {}", detail.sequence_number),
        format!("enqueued: {}", detail.enqueued_time_utc.to_rfc3339()),
        format!("content type: {}", detail.content_type),
    ];
    for (key, value) in &detail.application_properties {
        lines.push(format!("property {key}: {value}"));
    }
    lines.push(format!("body: {}", detail.body));
    lines.join("\n")
}

pub fn properties(properties: &EntityProperties) -> String {
    let mut lines = vec![properties.descriptor().to_string()];
    lines.extend(
        properties
            .fields()
            .into_iter()
            .map(|(name, value)| format!("  {name}: {value}")),
    );
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_flattens_and_truncates() {
        assert_eq!(preview("a\nb"), "a b");
        let long = "x".repeat(BODY_PREVIEW_CHARS + 5);
        assert!(preview(&long).ends_with("..."));
        assert_eq!(preview(&long).chars().count(), BODY_PREVIEW_CHARS + 3);
    }

    #[test]
    fn active_entity_is_marked() {
        let entities = vec![
            EntityDescriptor::queue("orders"),
            EntityDescriptor::topic("events"),
            EntityDescriptor::subscription("audit", "events"),
        ];
        let active = ActiveEntity {
            entity_name: "events".to_string(),
            subscription_name: Some("audit".to_string()),
        };

        let listing = entity_list(&entities, Some(&active));
        let marked: Vec<&str> = listing.lines().filter(|l| l.starts_with('*')).collect();
        assert_eq!(marked, vec!["* subscription:events/audit"]);
    }
}
