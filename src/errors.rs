use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AutomationError {
    #[error("Browser launch failed: {0}")]
    LaunchFailed(String),

    #[error("Driver not attached")]
    DriverGone,

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("JavaScript execution failed: {0}")]
    JavaScriptFailed(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Page '{page}' cannot be found")]
    PageLoadFailed { page: String },

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

pub type Result<T> = std::result::Result<T, AutomationError>;

// Convert anyhow::Error coming out of the driver crate
impl From<anyhow::Error> for AutomationError {
    fn from(err: anyhow::Error) -> Self {
        AutomationError::Driver(err.to_string())
    }
}

/// Message carried by the one driver failure worth retrying: the remote end
/// dropped the connection on a socket timeout.
const TRANSIENT_TIMEOUT_SIGNATURE: &str = "terminated due to SO_TIMEOUT";

fn absence_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)no (element|node) found|stale element|element is not attached")
            .expect("absence pattern")
    })
}

impl AutomationError {
    /// Whether this is the transient connectivity failure that the page
    /// invocation chain retries once before re-raising.
    pub fn is_transient_timeout(&self) -> bool {
        matches!(self, AutomationError::Driver(msg) if msg.contains(TRANSIENT_TIMEOUT_SIGNATURE))
    }

    /// Expected-absence conditions: the element or text is simply not there
    /// (yet). Degraded to a negative result at the lifecycle layer instead
    /// of surfacing as an error.
    pub fn is_expected_absence(&self) -> bool {
        match self {
            AutomationError::ElementNotFound(_) | AutomationError::Timeout(_) => true,
            AutomationError::Driver(msg) => absence_pattern().is_match(msg),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_timeout_signature_matches() {
        let err = AutomationError::Driver("connection terminated due to SO_TIMEOUT".to_string());
        assert!(err.is_transient_timeout());
    }

    #[test]
    fn other_driver_errors_are_not_transient() {
        assert!(!AutomationError::Driver("websocket closed".to_string()).is_transient_timeout());
        assert!(!AutomationError::Timeout("anchor".to_string()).is_transient_timeout());
    }

    #[test]
    fn absence_classification() {
        assert!(AutomationError::ElementNotFound("css:#x".to_string()).is_expected_absence());
        assert!(AutomationError::Timeout("anchor".to_string()).is_expected_absence());
        assert!(
            AutomationError::Driver("No node found for selector: #x".to_string())
                .is_expected_absence()
        );
        assert!(!AutomationError::Driver("browser crashed".to_string()).is_expected_absence());
        assert!(!AutomationError::LaunchFailed("no binary".to_string()).is_expected_absence());
    }
}
