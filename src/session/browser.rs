use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

use crate::core::{Config, Driver, DriverFactory};
use crate::errors::{AutomationError, Result};
use crate::types::LogEntry;
use crate::utils::javascript;

/// One browser automation handle, owned by the registry and keyed by the
/// test module it belongs to. The underlying driver is created lazily on
/// first use and can be discarded and rebuilt after a transient failure.
pub struct BrowserSession {
    module: String,
    session_id: String,
    config: Config,
    factory: Arc<dyn DriverFactory>,
    driver: Mutex<Option<Arc<dyn Driver>>>,
    logs: Mutex<Vec<LogEntry>>,
}

impl BrowserSession {
    pub(crate) fn new(module: &str, config: Config, factory: Arc<dyn DriverFactory>) -> Self {
        Self {
            module: module.to_string(),
            session_id: Uuid::new_v4().to_string(),
            config,
            factory,
            driver: Mutex::new(None),
            logs: Mutex::new(Vec::new()),
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The cached driver handle, or a newly created one.
    pub async fn driver(&self) -> Result<Arc<dyn Driver>> {
        let mut slot = self.driver.lock().await;
        if let Some(driver) = slot.as_ref() {
            return Ok(driver.clone());
        }
        info!(module = %self.module, session = %self.session_id, "starting browser session");
        let driver = self.factory.create(&self.config).await?;
        *slot = Some(driver.clone());
        Ok(driver)
    }

    /// The cached driver handle, if one is attached. Never launches.
    pub async fn attached_driver(&self) -> Option<Arc<dyn Driver>> {
        self.driver.lock().await.clone()
    }

    /// Drop the cached handle without terminating the browser. The next
    /// `driver()` call builds a fresh one.
    pub async fn invalidate(&self) {
        debug!(module = %self.module, "discarding cached driver handle");
        *self.driver.lock().await = None;
    }

    /// Terminate the browser and detach the handle. A session without a
    /// driver is a no-op.
    pub async fn quit(&self) -> Result<()> {
        let taken = self.driver.lock().await.take();
        if let Some(driver) = taken {
            info!(module = %self.module, "closing browser session");
            driver.quit().await?;
        }
        Ok(())
    }

    /// Navigate this session's browser to `url`.
    pub async fn open(&self, url: &str) -> Result<()> {
        let parsed = Url::parse(url)
            .map_err(|e| AutomationError::NavigationFailed(format!("{}: {}", url, e)))?;
        debug!(module = %self.module, url = %parsed, "navigating");
        self.driver().await?.goto(parsed.as_str()).await
    }

    /// Reload the current page, if a driver is attached.
    pub async fn refresh(&self) -> Result<()> {
        if let Some(driver) = self.attached_driver().await {
            driver.refresh().await?;
        }
        Ok(())
    }

    /// Evaluate a JavaScript expression in page context.
    pub async fn execute_script(&self, script: &str) -> Result<Value> {
        self.driver().await?.execute_script(script).await
    }

    /// Fetch browser-side log entries accumulated since the last call,
    /// append them to this session's buffer and return the whole buffer.
    pub async fn collect_logs(&self) -> Result<Vec<LogEntry>> {
        if let Some(driver) = self.attached_driver().await {
            let fresh = driver.console_logs().await?;
            self.logs.lock().await.extend(fresh);
        }
        Ok(self.logs.lock().await.clone())
    }

    /// Clear the page's local storage, if a driver is attached.
    pub async fn clear_local_storage(&self) -> Result<()> {
        if let Some(driver) = self.attached_driver().await {
            driver.execute_script(javascript::CLEAR_LOCAL_STORAGE).await?;
        }
        Ok(())
    }
}
