use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The three kinds of entity a namespace exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Queue,
    Topic,
    Subscription,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Queue => "queue",
            EntityKind::Topic => "topic",
            EntityKind::Subscription => "subscription",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = EntityKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "queue" => Ok(EntityKind::Queue),
            "topic" => Ok(EntityKind::Topic),
            "subscription" => Ok(EntityKind::Subscription),
            other => Err(EntityKindError::UnknownKind(other.to_string())),
        }
    }
}

/// Why a loosely typed selection could not be turned into an [`EntityDescriptor`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntityKindError {
    #[error("Unknown entity kind '{0}'. Expected queue, topic or subscription")]
    UnknownKind(String),

    #[error("Entity name must not be empty")]
    MissingName,

    #[error("Subscription '{0}' needs the name of its topic")]
    MissingTopic(String),
}

/// Identifies one entity on a namespace.
///
/// Identity is the variant together with its names, so `Queue{a}` and
/// `Topic{a}` are different entities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EntityDescriptor {
    Queue { name: String },
    Topic { name: String },
    Subscription { name: String, topic_name: String },
}

impl EntityDescriptor {
    pub fn queue(name: impl Into<String>) -> Self {
        EntityDescriptor::Queue { name: name.into() }
    }

    pub fn topic(name: impl Into<String>) -> Self {
        EntityDescriptor::Topic { name: name.into() }
    }

    pub fn subscription(name: impl Into<String>, topic_name: impl Into<String>) -> Self {
        EntityDescriptor::Subscription {
            name: name.into(),
            topic_name: topic_name.into(),
        }
    }

    /// Builds a descriptor from the kind/name/topic triple a front-end collects.
    ///
    /// Blank names count as missing. The topic is only consulted for
    /// subscriptions.
    ///
    /// # Errors
    ///
    /// Returns [`EntityKindError`] when the kind is not recognised, the name is
    /// blank, or a subscription comes without a topic.
    pub fn from_parts(
        kind: &str,
        name: &str,
        topic_name: Option<&str>,
    ) -> Result<Self, EntityKindError> {
        let kind = kind.parse::<EntityKind>()?;
        let name = name.trim();
        if name.is_empty() {
            return Err(EntityKindError::MissingName);
        }

        match kind {
            EntityKind::Queue => Ok(Self::queue(name)),
            EntityKind::Topic => Ok(Self::topic(name)),
            EntityKind::Subscription => {
                let topic = topic_name
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| EntityKindError::MissingTopic(name.to_string()))?;
                Ok(Self::subscription(name, topic))
            }
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            EntityDescriptor::Queue { .. } => EntityKind::Queue,
            EntityDescriptor::Topic { .. } => EntityKind::Topic,
            EntityDescriptor::Subscription { .. } => EntityKind::Subscription,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            EntityDescriptor::Queue { name }
            | EntityDescriptor::Topic { name }
            | EntityDescriptor::Subscription { name, .. } => name,
        }
    }

    pub fn topic_name(&self) -> Option<&str> {
        match self {
            EntityDescriptor::Subscription { topic_name, .. } => Some(topic_name),
            _ => None,
        }
    }
}

impl fmt::Display for EntityDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityDescriptor::Subscription { name, topic_name } => {
                write!(f, "subscription:{topic_name}/{name}")
            }
            other => write!(f, "{}:{}", other.kind(), other.name()),
        }
    }
}
