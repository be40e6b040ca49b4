//! Mock-backed fixtures for exercising the framework without a browser.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::browser::{MockDriverFactory, MockState};
use crate::core::Config;
use crate::errors::Result;
use crate::page::Page;
use crate::session::{BrowserSession, SessionRegistry};
use crate::types::Locator;

pub struct TestHelper;

impl TestHelper {
    /// Registry backed by a fresh mock state; returns both.
    pub fn mock_registry() -> (SessionRegistry, Arc<MockState>) {
        let factory = MockDriverFactory::new();
        let state = factory.state();
        (
            SessionRegistry::new(Config::default(), Arc::new(factory)),
            state,
        )
    }

    /// Same, with tight wait budgets and a fast poll so wait-loop tests
    /// stay quick.
    pub fn fast_registry() -> (SessionRegistry, Arc<MockState>) {
        let mut config = Config::default();
        config.waits.page_load_secs = 1;
        config.waits.element_load_secs = 1;
        config.waits.http_request_secs = 1;
        config.waits.poll_interval_ms = 10;
        let factory = MockDriverFactory::new();
        let state = factory.state();
        (SessionRegistry::new(config, Arc::new(factory)), state)
    }
}

/// Minimal page over the mock driver: navigates to a fixed URL and counts
/// its hook invocations.
pub struct SamplePage {
    module: String,
    locator: Locator,
    url: String,
    invocations: AtomicUsize,
    setups: AtomicUsize,
}

impl SamplePage {
    pub fn new(module: &str, locator: Locator, url: &str) -> Self {
        Self {
            module: module.to_string(),
            locator,
            url: url.to_string(),
            invocations: AtomicUsize::new(0),
            setups: AtomicUsize::new(0),
        }
    }

    /// How many times `invoke_actions` ran.
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::Relaxed)
    }

    /// How many times `setup_page` ran.
    pub fn setups(&self) -> usize {
        self.setups.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Page for SamplePage {
    fn name(&self) -> &str {
        "sample-page"
    }

    fn module(&self) -> &str {
        &self.module
    }

    fn locator(&self) -> &Locator {
        &self.locator
    }

    async fn invoke_actions(&self, session: &BrowserSession) -> Result<()> {
        self.invocations.fetch_add(1, Ordering::Relaxed);
        session.open(&self.url).await
    }

    async fn setup_page(&self, _session: &BrowserSession) -> Result<()> {
        self.setups.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_registry_sessions_share_the_scripted_state() {
        let (registry, state) = TestHelper::mock_registry();
        let session = registry.get_or_create("tests::smoke");
        session.driver().await.expect("driver");
        assert_eq!(state.drivers_created(), 1);
    }

    #[tokio::test]
    async fn fast_registry_tightens_wait_budgets() {
        let (registry, _state) = TestHelper::fast_registry();
        let session = registry.get_or_create("tests::smoke");
        assert_eq!(session.config().waits.page_load_secs, 1);
        assert_eq!(session.config().waits.poll_interval_ms, 10);
    }
}
