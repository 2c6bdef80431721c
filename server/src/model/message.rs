use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Content type reported for messages that carry none.
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// A message as read from an entity by peek or receive.
///
/// # Examples
///
/// ```no_run
/// use server::model::MessageDetail;
///
/// let detail = MessageDetail::new("id-1", 7, "{\"a\":1}", None, chrono::Utc::now());
/// assert_eq!(detail.content_type, "text/plain");
/// ```
#[derive(Serialize, Clone, PartialEq, Debug)]
pub struct MessageDetail {
    pub id: String,
    pub sequence_number: i64,
    pub body: String,
    pub content_type: String,
    pub enqueued_time_utc: DateTime<Utc>,
    pub application_properties: BTreeMap<String, Value>,
}

impl MessageDetail {
    pub fn new(
        id: impl Into<String>,
        sequence_number: i64,
        body: impl Into<String>,
        content_type: Option<&str>,
        enqueued_time_utc: DateTime<Utc>,
    ) -> Self {
        let content_type = content_type
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE);

        Self {
            id: id.into(),
            sequence_number,
            body: body.into(),
            content_type: content_type.to_string(),
            enqueued_time_utc,
            application_properties: BTreeMap::new(),
        }
    }

    pub fn with_properties(mut self, properties: BTreeMap<String, Value>) -> Self {
        self.application_properties = properties;
        self
    }

    pub fn summary(&self) -> MessageSummary {
        MessageSummary {
            id: self.id.clone(),
            enqueued_time_utc: self.enqueued_time_utc,
        }
    }
}

/// The id/timestamp projection used for list rendering.
#[derive(Serialize, Clone, PartialEq, Eq, Debug)]
pub struct MessageSummary {
    pub id: String,
    pub enqueued_time_utc: DateTime<Utc>,
}

/// One page of peeked messages.
///
/// `has_more` is true when the broker held at least one message past the
/// end of this page at the time of the peek.
#[derive(Serialize, Clone, PartialEq, Debug, Default)]
pub struct MessagePage {
    pub messages: Vec<MessageDetail>,
    pub has_more: bool,
}

impl MessagePage {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a page from a fetch of up to `page_size + 1` messages.
    ///
    /// The extra message only proves that more remain; it is dropped.
    pub fn from_overfetch(mut fetched: Vec<MessageDetail>, page_size: usize) -> Self {
        let has_more = fetched.len() > page_size;
        fetched.truncate(page_size);
        Self {
            messages: fetched,
            has_more,
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn summaries(&self) -> Vec<MessageSummary> {
        self.messages.iter().map(MessageDetail::summary).collect()
    }
}

/// A message about to be published to an entity.
#[derive(Serialize, Clone, PartialEq, Debug)]
pub struct OutgoingMessage {
    pub message_id: String,
    pub body: String,
    pub content_type: Option<String>,
    pub application_properties: BTreeMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail(id: &str) -> MessageDetail {
        MessageDetail::new(id, 1, "body", None, Utc::now())
    }

    #[test]
    fn test_content_type_defaults_to_text_plain() {
        assert_eq!(detail("a").content_type, DEFAULT_CONTENT_TYPE);
        let json = MessageDetail::new("b", 2, "{}", Some("application/json"), Utc::now());
        assert_eq!(json.content_type, "application/json");
        let blank = MessageDetail::new("c", 3, "", Some("  "), Utc::now());
        assert_eq!(blank.content_type, DEFAULT_CONTENT_TYPE);
    }

    #[test]
    fn test_from_overfetch_trims_and_flags() {
        let fetched: Vec<_> = (0..4).map(|i| detail(&i.to_string())).collect();

        let page = MessagePage::from_overfetch(fetched.clone(), 3);
        assert_eq!(page.len(), 3);
        assert!(page.has_more);
        assert_eq!(page.messages[2].id, "2");

        let page = MessagePage::from_overfetch(fetched[..3].to_vec(), 3);
        assert_eq!(page.len(), 3);
        assert!(!page.has_more);
    }

    #[test]
    fn test_from_overfetch_zero_page_size() {
        let page = MessagePage::from_overfetch(vec![detail("a")], 0);
        assert!(page.is_empty());
        assert!(page.has_more);

        let page = MessagePage::from_overfetch(Vec::new(), 0);
        assert!(page.is_empty());
        assert!(!page.has_more);
    }
}
