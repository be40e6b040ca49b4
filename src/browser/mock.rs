//! Scriptable in-memory driver for exercising the framework without a
//! browser.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use crate::core::{Config, Driver, DriverFactory};
use crate::errors::{AutomationError, Result};
use crate::types::{Locator, LogEntry};

/// Shared state behind every driver a `MockDriverFactory` hands out.
/// Tests script it up front and inspect the recorded calls afterwards.
/// The state survives driver invalidation, so retry paths can be
/// observed across driver instances.
#[derive(Default)]
pub struct MockState {
    visible: Mutex<HashSet<String>>,
    reveal_on_navigate: Mutex<Vec<String>>,
    script_results: Mutex<HashMap<String, VecDeque<Value>>>,
    texts: Mutex<HashMap<String, VecDeque<String>>>,
    navigation_failures: Mutex<VecDeque<AutomationError>>,
    calls: Mutex<Vec<String>>,
    logs: Mutex<Vec<LogEntry>>,
    drivers_created: AtomicUsize,
    quits: AtomicUsize,
    navigations: AtomicUsize,
    refreshes: AtomicUsize,
}

// a poisoned mock lock just means a test thread panicked mid-assertion
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Pop from the front while more than one value remains, so the last
/// scripted value keeps answering subsequent calls.
fn next_in<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

impl MockState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The error carrying the retryable socket-timeout signature.
    pub fn transient_timeout() -> AutomationError {
        AutomationError::Driver("connection terminated due to SO_TIMEOUT".to_string())
    }

    pub fn show(&self, locator: &Locator) {
        lock(&self.visible).insert(locator.to_string());
    }

    pub fn hide(&self, locator: &Locator) {
        lock(&self.visible).remove(&locator.to_string());
    }

    /// Make `locator` visible once the next navigation lands.
    pub fn reveal_on_navigate(&self, locator: &Locator) {
        lock(&self.reveal_on_navigate).push(locator.to_string());
    }

    /// Queue a result for a script; the last queued value keeps
    /// answering once the queue is down to one.
    pub fn push_script_result(&self, script: &str, value: Value) {
        lock(&self.script_results)
            .entry(script.to_string())
            .or_default()
            .push_back(value);
    }

    /// Queue a text value for an element, same draining rule as scripts.
    pub fn push_text(&self, locator: &Locator, text: &str) {
        lock(&self.texts)
            .entry(locator.to_string())
            .or_default()
            .push_back(text.to_string());
    }

    /// Fail the next navigation with `error`.
    pub fn fail_next_navigation(&self, error: AutomationError) {
        lock(&self.navigation_failures).push_back(error);
    }

    pub fn push_log(&self, level: &str, message: &str) {
        lock(&self.logs).push(LogEntry {
            level: level.to_string(),
            source: "console".to_string(),
            message: message.to_string(),
            timestamp: Utc::now(),
        });
    }

    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    pub fn drivers_created(&self) -> usize {
        self.drivers_created.load(Ordering::Relaxed)
    }

    pub fn quits(&self) -> usize {
        self.quits.load(Ordering::Relaxed)
    }

    pub fn navigations(&self) -> usize {
        self.navigations.load(Ordering::Relaxed)
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::Relaxed)
    }

    fn record(&self, call: String) {
        lock(&self.calls).push(call);
    }

    fn is_shown(&self, locator: &Locator) -> bool {
        lock(&self.visible).contains(&locator.to_string())
    }
}

/// Driver over a shared `MockState`.
pub struct MockDriver {
    state: Arc<MockState>,
}

#[async_trait]
impl Driver for MockDriver {
    async fn goto(&self, url: &str) -> Result<()> {
        self.state.record(format!("goto {}", url));
        if let Some(error) = lock(&self.state.navigation_failures).pop_front() {
            return Err(error);
        }
        self.state.navigations.fetch_add(1, Ordering::Relaxed);
        let revealed: Vec<String> = lock(&self.state.reveal_on_navigate).drain(..).collect();
        lock(&self.state.visible).extend(revealed);
        Ok(())
    }

    async fn refresh(&self) -> Result<()> {
        self.state.record("refresh".to_string());
        self.state.refreshes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn find(&self, locator: &Locator) -> Result<()> {
        if self.state.is_shown(locator) {
            Ok(())
        } else {
            Err(AutomationError::ElementNotFound(locator.to_string()))
        }
    }

    async fn is_visible(&self, locator: &Locator) -> Result<bool> {
        Ok(self.state.is_shown(locator))
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        self.state.record(format!("click {}", locator));
        if self.state.is_shown(locator) {
            Ok(())
        } else {
            Err(AutomationError::ElementNotFound(locator.to_string()))
        }
    }

    async fn double_click(&self, locator: &Locator) -> Result<()> {
        self.state.record(format!("double-click {}", locator));
        Ok(())
    }

    async fn move_to(&self, locator: &Locator) -> Result<()> {
        self.state.record(format!("move-to {}", locator));
        Ok(())
    }

    async fn move_to_and_click(&self, locator: &Locator) -> Result<()> {
        self.state.record(format!("move-to-and-click {}", locator));
        Ok(())
    }

    async fn drag_and_drop(&self, source: &Locator, target: &Locator) -> Result<()> {
        self.state.record(format!("drag {} -> {}", source, target));
        Ok(())
    }

    async fn text_of(&self, locator: &Locator) -> Result<String> {
        let mut texts = lock(&self.state.texts);
        match texts.get_mut(&locator.to_string()).and_then(next_in) {
            Some(text) => Ok(text),
            None => Err(AutomationError::ElementNotFound(locator.to_string())),
        }
    }

    async fn execute_script(&self, script: &str) -> Result<Value> {
        self.state.record(format!("script {}", script));
        let mut results = lock(&self.state.script_results);
        Ok(results
            .get_mut(script)
            .and_then(next_in)
            .unwrap_or(Value::Null))
    }

    async fn execute_script_on(&self, locator: &Locator, body: &str) -> Result<Value> {
        self.state.record(format!("script-on {} {}", locator, body));
        let mut results = lock(&self.state.script_results);
        Ok(results
            .get_mut(body)
            .and_then(next_in)
            .unwrap_or(Value::Null))
    }

    async fn console_logs(&self) -> Result<Vec<LogEntry>> {
        Ok(std::mem::take(&mut *lock(&self.state.logs)))
    }

    async fn quit(&self) -> Result<()> {
        self.state.record("quit".to_string());
        self.state.quits.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Factory whose drivers all share one `MockState`.
pub struct MockDriverFactory {
    state: Arc<MockState>,
}

impl MockDriverFactory {
    pub fn new() -> Self {
        Self {
            state: MockState::new(),
        }
    }

    pub fn with_state(state: Arc<MockState>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> Arc<MockState> {
        self.state.clone()
    }
}

impl Default for MockDriverFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DriverFactory for MockDriverFactory {
    async fn create(&self, _config: &Config) -> Result<Arc<dyn Driver>> {
        self.state.drivers_created.fetch_add(1, Ordering::Relaxed);
        Ok(Arc::new(MockDriver {
            state: self.state.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn navigation_reveals_scripted_locators() {
        let factory = MockDriverFactory::new();
        let state = factory.state();
        let driver = factory.create(&Config::default()).await.expect("driver");

        let anchor = Locator::css("#anchor");
        state.reveal_on_navigate(&anchor);
        assert!(!driver.is_visible(&anchor).await.expect("visible"));

        driver.goto("https://app.test/").await.expect("goto");
        assert!(driver.is_visible(&anchor).await.expect("visible"));
    }

    #[tokio::test]
    async fn scripted_queues_keep_answering_with_the_last_value() {
        let factory = MockDriverFactory::new();
        let state = factory.state();
        let driver = factory.create(&Config::default()).await.expect("driver");

        state.push_script_result("window.ready", json!(false));
        state.push_script_result("window.ready", json!(true));
        assert_eq!(driver.execute_script("window.ready").await.expect("run"), json!(false));
        assert_eq!(driver.execute_script("window.ready").await.expect("run"), json!(true));
        assert_eq!(driver.execute_script("window.ready").await.expect("run"), json!(true));
    }

    #[tokio::test]
    async fn console_logs_drain_on_read() {
        let factory = MockDriverFactory::new();
        let state = factory.state();
        let driver = factory.create(&Config::default()).await.expect("driver");

        state.push_log("INFO", "ready");
        assert_eq!(driver.console_logs().await.expect("logs").len(), 1);
        assert!(driver.console_logs().await.expect("logs").is_empty());
    }
}
