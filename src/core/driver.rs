use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::core::Config;
use crate::errors::Result;
use crate::types::{Locator, LogEntry};

/// The primitive surface this layer consumes from the underlying browser
/// driver. Everything above delegates here; nothing above speaks the
/// driver's own protocol.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Navigate the current page to a URL.
    async fn goto(&self, url: &str) -> Result<()>;

    /// Reload the current page.
    async fn refresh(&self) -> Result<()>;

    /// Resolve an element, erroring when it is not in the DOM.
    async fn find(&self, locator: &Locator) -> Result<()>;

    /// Whether the element is present and rendered.
    async fn is_visible(&self, locator: &Locator) -> Result<bool>;

    /// Click the element.
    async fn click(&self, locator: &Locator) -> Result<()>;

    /// Double-click the element.
    async fn double_click(&self, locator: &Locator) -> Result<()>;

    /// Move the pointer over the element.
    async fn move_to(&self, locator: &Locator) -> Result<()>;

    /// Move the pointer over the element, then click it.
    async fn move_to_and_click(&self, locator: &Locator) -> Result<()>;

    /// Drag the source element onto the target element.
    async fn drag_and_drop(&self, source: &Locator, target: &Locator) -> Result<()>;

    /// Visible text of the element.
    async fn text_of(&self, locator: &Locator) -> Result<String>;

    /// Evaluate a JavaScript expression in page context.
    async fn execute_script(&self, script: &str) -> Result<Value>;

    /// Run `body` as a function with the resolved element bound as `this`.
    async fn execute_script_on(&self, locator: &Locator, body: &str) -> Result<Value>;

    /// Drain browser-side log entries buffered since the last call.
    async fn console_logs(&self) -> Result<Vec<LogEntry>>;

    /// Terminate the underlying browser.
    async fn quit(&self) -> Result<()>;
}

/// Builds driver instances on demand. Sessions create their driver lazily
/// and may discard and rebuild it after a transient failure.
#[async_trait]
pub trait DriverFactory: Send + Sync {
    async fn create(&self, config: &Config) -> Result<Arc<dyn Driver>>;
}
