use crate::model::{MessageDetail, MessagePage};

/// How many messages to fetch for a page of `page_size`, and how to cut
/// the fetched batch back down.
///
/// One message beyond the page is requested; its presence is the only
/// evidence that more remain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PagePlan {
    page_size: u32,
}

impl PagePlan {
    pub(crate) fn new(page_size: u32) -> Self {
        Self { page_size }
    }

    pub(crate) fn fetch_count(&self) -> u32 {
        self.page_size.saturating_add(1)
    }

    pub(crate) fn into_page(self, fetched: Vec<MessageDetail>) -> MessagePage {
        MessagePage::from_overfetch(fetched, self.page_size as usize)
    }
}

/// First message in `window` carrying `message_id`.
pub(crate) fn find_by_id(window: Vec<MessageDetail>, message_id: &str) -> Option<MessageDetail> {
    window.into_iter().find(|message| message.id == message_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_fetch_count_saturates() {
        assert_eq!(PagePlan::new(50).fetch_count(), 51);
        assert_eq!(PagePlan::new(0).fetch_count(), 1);
        assert_eq!(PagePlan::new(u32::MAX).fetch_count(), u32::MAX);
    }

    #[test]
    fn test_find_by_id() {
        let window = vec![
            MessageDetail::new("a", 1, "first", None, Utc::now()),
            MessageDetail::new("b", 2, "second", None, Utc::now()),
        ];
        assert_eq!(find_by_id(window.clone(), "b").map(|m| m.body), Some("second".to_string()));
        assert_eq!(find_by_id(window, "c"), None);
    }
}
