use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::info;

use crate::core::{Config, DriverFactory};
use crate::errors::Result;
use crate::session::BrowserSession;
use crate::types::{Locator, LogEntry};

/// Bookkeeping for the most recently constructed page. Names only; the
/// registry does not own pages, and frame context tracks a single level.
#[derive(Debug, Clone, Default)]
pub struct ActiveContext {
    pub module: Option<String>,
    pub page: Option<String>,
    pub frame: Option<Locator>,
}

/// Mapping from a test module to its browser session. Constructed
/// explicitly and passed around; the supported discipline is one writer
/// per module key.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<BrowserSession>>>,
    active: RwLock<ActiveContext>,
    config: Config,
    factory: Arc<dyn DriverFactory>,
}

impl SessionRegistry {
    pub fn new(config: Config, factory: Arc<dyn DriverFactory>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            active: RwLock::new(ActiveContext::default()),
            config,
            factory,
        }
    }

    /// Registry backed by real headless Chrome.
    pub fn chrome(config: Config) -> Self {
        Self::new(config, Arc::new(crate::browser::ChromeDriverFactory))
    }

    // A poisoned lock only means another test thread panicked; the map
    // itself is still usable.
    fn read_sessions(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<BrowserSession>>> {
        self.sessions.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_sessions(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<BrowserSession>>> {
        self.sessions.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The session for `module`, creating and storing one on first
    /// request. Creation never launches a browser; the driver is lazy.
    pub fn get_or_create(&self, module: &str) -> Arc<BrowserSession> {
        if let Some(existing) = self.read_sessions().get(module) {
            return existing.clone();
        }
        self.write_sessions()
            .entry(module.to_string())
            .or_insert_with(|| {
                info!(module, "registering browser session");
                Arc::new(BrowserSession::new(
                    module,
                    self.config.clone(),
                    self.factory.clone(),
                ))
            })
            .clone()
    }

    pub fn session_count(&self) -> usize {
        self.read_sessions().len()
    }

    pub fn modules(&self) -> Vec<String> {
        self.read_sessions().keys().cloned().collect()
    }

    fn snapshot(&self) -> Vec<Arc<BrowserSession>> {
        // collect the Arcs first so no lock is held across an await
        self.read_sessions().values().cloned().collect()
    }

    /// Terminate every session. A failure on one session aborts closing
    /// the rest; the mapping is cleared only after every session closed.
    pub async fn close_all(&self) -> Result<()> {
        for session in self.snapshot() {
            session.quit().await?;
        }
        self.write_sessions().clear();
        Ok(())
    }

    /// Reload the current page in every session.
    pub async fn refresh_all(&self) -> Result<()> {
        for session in self.snapshot() {
            session.refresh().await?;
        }
        Ok(())
    }

    /// Browser-side logs per module, each flattened into a newline-joined
    /// string of comma-field-joined entries.
    pub async fn collect_logs(&self) -> Result<HashMap<String, String>> {
        let mut out = HashMap::new();
        for session in self.snapshot() {
            let entries = session.collect_logs().await?;
            let flattened: Vec<String> = entries.iter().map(LogEntry::flatten).collect();
            out.insert(session.module().to_string(), flattened.join("\n"));
        }
        Ok(out)
    }

    /// Clear local storage in every session.
    pub async fn clear_local_storage_all(&self) -> Result<()> {
        for session in self.snapshot() {
            session.clear_local_storage().await?;
        }
        Ok(())
    }

    fn write_active(&self) -> std::sync::RwLockWriteGuard<'_, ActiveContext> {
        self.active.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Side effect of page construction: the page becomes the active one
    /// and any frame context is dropped.
    pub(crate) fn activate_page(&self, module: &str, page: &str) {
        let mut active = self.write_active();
        active.module = Some(module.to_string());
        active.page = Some(page.to_string());
        active.frame = None;
    }

    /// Track a frame context. One level only; entering a frame replaces
    /// any previous one.
    pub fn enter_frame(&self, locator: Locator) {
        self.write_active().frame = Some(locator);
    }

    pub fn leave_frame(&self) {
        self.write_active().frame = None;
    }

    pub fn active(&self) -> ActiveContext {
        self.active
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestHelper;
    use crate::utils::javascript;

    #[tokio::test]
    async fn one_session_per_module() {
        let (registry, _state) = TestHelper::mock_registry();
        let first = registry.get_or_create("tests::login");
        let second = registry.get_or_create("tests::login");
        let other = registry.get_or_create("tests::billing");

        assert!(Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(registry.session_count(), 2);
    }

    #[tokio::test]
    async fn close_all_on_empty_registry_is_a_no_op() {
        let (registry, state) = TestHelper::mock_registry();
        registry.close_all().await.expect("close");
        assert_eq!(registry.session_count(), 0);
        assert_eq!(state.quits(), 0);
    }

    #[tokio::test]
    async fn close_all_quits_and_clears() {
        let (registry, state) = TestHelper::mock_registry();
        let session = registry.get_or_create("tests::login");
        session.driver().await.expect("driver");
        registry.get_or_create("tests::billing");

        registry.close_all().await.expect("close");
        assert_eq!(state.quits(), 1); // the idle session had nothing to quit
        assert_eq!(registry.session_count(), 0);

        // a previously known module now gets a fresh session
        let fresh = registry.get_or_create("tests::login");
        assert!(!Arc::ptr_eq(&session, &fresh));
    }

    #[tokio::test]
    async fn refresh_all_reaches_live_sessions() {
        let (registry, state) = TestHelper::mock_registry();
        registry.get_or_create("tests::login").driver().await.expect("driver");
        registry.get_or_create("tests::billing");

        registry.refresh_all().await.expect("refresh");
        assert_eq!(state.refreshes(), 1);
    }

    #[tokio::test]
    async fn collect_logs_flattens_entries() {
        let (registry, state) = TestHelper::mock_registry();
        let session = registry.get_or_create("tests::login");
        session.driver().await.expect("driver");
        state.push_log("INFO", "page ready");
        state.push_log("WARNING", "slow request");

        let logs = registry.collect_logs().await.expect("logs");
        let text = logs.get("tests::login").expect("module logs");
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("level: INFO, source: console, message: page ready"));
        assert!(text.contains("level: WARNING, source: console, message: slow request"));
    }

    #[tokio::test]
    async fn clear_local_storage_all_runs_the_script() {
        let (registry, state) = TestHelper::mock_registry();
        let session = registry.get_or_create("tests::login");
        session.driver().await.expect("driver");

        registry.clear_local_storage_all().await.expect("clear");
        let call = format!("script {}", javascript::CLEAR_LOCAL_STORAGE);
        assert!(state.calls().contains(&call));
    }

    #[tokio::test]
    async fn frame_context_is_one_level() {
        let (registry, _state) = TestHelper::mock_registry();
        registry.enter_frame(Locator::css("#outer"));
        registry.enter_frame(Locator::css("#inner"));
        assert_eq!(registry.active().frame, Some(Locator::css("#inner")));
        registry.leave_frame();
        assert_eq!(registry.active().frame, None);
    }
}
