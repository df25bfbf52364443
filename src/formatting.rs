// src/formatting.rs

use crate::core::Notification;
use crate::priority::PriorityRules;

/// Turns raw alert text into an ntfy [`Notification`].
#[derive(Debug, Clone)]
pub struct NotificationFormatter {
    topic: String,
    rules: PriorityRules,
}

impl NotificationFormatter {
    pub fn new(topic: impl Into<String>, rules: PriorityRules) -> Self {
        Self {
            topic: topic.into(),
            rules,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn format(&self, text: &str) -> Notification {
        let (title, body) = split_title_body(text);
        let title = clean(title);
        let message = clean(body);
        let priority = self.rules.classify(&message);

        Notification {
            topic: self.topic.clone(),
            message,
            title,
            tags: vec![priority.tag().to_string()],
            priority,
        }
    }
}

/// Splits on the first newline. Without one, the whole text is the title.
pub fn split_title_body(text: &str) -> (&str, &str) {
    text.split_once('\n').unwrap_or((text, ""))
}

/// Rewrites `*` bullets as `- ` and trims the result.
pub fn clean(part: &str) -> String {
    part.replace('*', "- ").trim().to_string()
}
