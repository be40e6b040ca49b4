pub mod gestures;
pub mod js;
pub mod waits;

pub use gestures::GestureActions;
pub use js::JsActions;
pub use waits::WaitActions;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::core::Driver;
use crate::errors::{AutomationError, Result};
use crate::session::BrowserSession;
use crate::types::{Locator, WaitCondition};
use crate::utils::wait::poll_until;

/// Minimal capability set the action mixins need from a composing type:
/// a name for logging, a locator, and the owning session. Anything
/// implementing this gets `JsActions`, `GestureActions` and `WaitActions`
/// through their blanket impls.
#[async_trait]
pub trait ElementSource: Send + Sync {
    /// Name used in log lines.
    fn name(&self) -> &str;

    /// Locator the live element is re-resolved from.
    fn locator(&self) -> &Locator;

    /// Session whose driver performs the actions.
    fn session(&self) -> &BrowserSession;

    /// Default wait budget for element resolution.
    fn default_wait(&self) -> Duration {
        self.session().config().waits.element_load()
    }

    /// Resolve the live element, applying `condition` before returning
    /// it. Errors with `Timeout` when the condition does not hold within
    /// `wait`.
    async fn get_element(&self, condition: WaitCondition, wait: Duration) -> Result<LiveElement> {
        let driver = self.session().driver().await?;
        let locator = self.locator().clone();
        let interval = self.session().config().waits.poll_interval();
        let satisfied = poll_until(wait, interval, || {
            let driver = driver.clone();
            let locator = locator.clone();
            async move {
                let probe = match condition {
                    WaitCondition::Presence => driver.find(&locator).await.map(|_| true),
                    WaitCondition::Visibility => driver.is_visible(&locator).await,
                };
                match probe {
                    Ok(found) => Ok(found),
                    Err(e) if e.is_expected_absence() => Ok(false),
                    Err(e) => Err(e),
                }
            }
        })
        .await?;
        if !satisfied {
            return Err(AutomationError::Timeout(format!(
                "element '{}' did not reach {:?} within {:?}",
                self.name(),
                condition,
                wait
            )));
        }
        Ok(LiveElement { driver, locator })
    }

    /// Resolve with the default presence condition and wait budget.
    async fn resolve(&self) -> Result<LiveElement> {
        self.get_element(WaitCondition::Presence, self.default_wait()).await
    }
}

/// A freshly resolved element: the driver handle current at resolution
/// time plus the locator actions re-target. Transient; resolved again
/// from the live DOM for each action sequence, never stored.
pub struct LiveElement {
    driver: Arc<dyn Driver>,
    locator: Locator,
}

impl std::fmt::Debug for LiveElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveElement")
            .field("locator", &self.locator)
            .finish_non_exhaustive()
    }
}

impl LiveElement {
    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    pub async fn click(&self) -> Result<()> {
        self.driver.click(&self.locator).await
    }

    pub async fn double_click(&self) -> Result<()> {
        self.driver.double_click(&self.locator).await
    }

    pub async fn move_to(&self) -> Result<()> {
        self.driver.move_to(&self.locator).await
    }

    pub async fn move_to_and_click(&self) -> Result<()> {
        self.driver.move_to_and_click(&self.locator).await
    }

    pub async fn drag_and_drop_to(&self, target: &Locator) -> Result<()> {
        self.driver.drag_and_drop(&self.locator, target).await
    }

    pub async fn text(&self) -> Result<String> {
        self.driver.text_of(&self.locator).await
    }

    pub async fn is_visible(&self) -> Result<bool> {
        self.driver.is_visible(&self.locator).await
    }

    /// Run `body` as a function with this element bound as `this`.
    pub async fn execute_script(&self, body: &str) -> Result<Value> {
        self.driver.execute_script_on(&self.locator, body).await
    }
}

/// Standalone element wrapper: a name for logging, a locator and the
/// owning session. The usual composition point for the action mixins.
pub struct Element {
    name: String,
    locator: Locator,
    session: Arc<BrowserSession>,
}

impl Element {
    pub fn new(name: &str, locator: Locator, session: Arc<BrowserSession>) -> Self {
        Self {
            name: name.to_string(),
            locator,
            session,
        }
    }
}

impl ElementSource for Element {
    fn name(&self) -> &str {
        &self.name
    }

    fn locator(&self) -> &Locator {
        &self.locator
    }

    fn session(&self) -> &BrowserSession {
        &self.session
    }
}
