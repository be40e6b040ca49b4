use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How an element is found within the current page or frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Locator {
    Css(String),
    XPath(String),
    Id(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn xpath(query: impl Into<String>) -> Self {
        Locator::XPath(query.into())
    }

    pub fn id(id: impl Into<String>) -> Self {
        Locator::Id(id.into())
    }

    /// XPath matching any element whose text contains `text`, as used by
    /// the page-level text-presence helpers.
    pub fn text_contains(text: &str) -> Self {
        Locator::XPath(format!(r#"//*[contains(text(), "{}")]"#, text))
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(selector) => write!(f, "css:{}", selector),
            Locator::XPath(query) => write!(f, "xpath:{}", query),
            Locator::Id(id) => write!(f, "id:{}", id),
        }
    }
}

/// Condition applied when resolving a live element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitCondition {
    /// The element is in the DOM.
    Presence,
    /// The element is in the DOM and rendered.
    Visibility,
}

/// One browser-side log record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: String,
    pub source: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    /// Comma-field-joined form used by the registry's log collection.
    pub fn flatten(&self) -> String {
        format!(
            "level: {}, source: {}, message: {}, timestamp: {}",
            self.level, self.source, self.message, self.timestamp
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locator_display() {
        assert_eq!(Locator::css("#login").to_string(), "css:#login");
        assert_eq!(Locator::xpath("//a").to_string(), "xpath://a");
        assert_eq!(Locator::id("submit").to_string(), "id:submit");
    }

    #[test]
    fn text_contains_builds_xpath() {
        let locator = Locator::text_contains("Welcome");
        assert_eq!(
            locator,
            Locator::XPath(r#"//*[contains(text(), "Welcome")]"#.to_string())
        );
    }

    #[test]
    fn log_entry_flattens_fields() {
        let entry = LogEntry {
            level: "INFO".to_string(),
            source: "console".to_string(),
            message: "ready".to_string(),
            timestamp: Utc::now(),
        };
        let flat = entry.flatten();
        assert!(flat.starts_with("level: INFO, source: console, message: ready, timestamp: "));
    }
}
