use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::element::Element;
use crate::errors::{AutomationError, Result};
use crate::session::{BrowserSession, SessionRegistry};
use crate::types::Locator;
use crate::utils::wait::poll_until;

/// One logical screen of the application under test. Implementations
/// supply the anchor locator that decides presence and the navigation
/// actions that bring the page up.
#[async_trait]
pub trait Page: Send + Sync {
    /// Page name, used in logs and load-failure errors.
    fn name(&self) -> &str;

    /// Test module that owns this page's browser session.
    fn module(&self) -> &str;

    /// Anchor locator: the page counts as present while this is visible.
    fn locator(&self) -> &Locator;

    /// Navigation actions that bring the page up when it is absent.
    async fn invoke_actions(&self, session: &BrowserSession) -> Result<()>;

    /// Idempotent hook run when `invoke` finds the page already present.
    async fn setup_page(&self, _session: &BrowserSession) -> Result<()> {
        Ok(())
    }
}

/// Attempts per invocation chain: the first try plus one retry after a
/// transient driver timeout.
const INVOKE_ATTEMPTS: u32 = 2;

/// Lifecycle engine for a page: existence checks, idempotent invocation
/// with a single transient-failure retry, and the text and focus helpers.
pub struct PageObject<P: Page> {
    page: P,
    session: Arc<BrowserSession>,
}

impl<P: Page> std::fmt::Debug for PageObject<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageObject").finish_non_exhaustive()
    }
}

impl<P: Page> PageObject<P> {
    /// Bind `page` to its module's session, register it as the
    /// registry's active page and drop any active frame. Does not touch
    /// the network.
    pub fn new(registry: &SessionRegistry, page: P) -> Self {
        let session = registry.get_or_create(page.module());
        registry.activate_page(page.module(), page.name());
        Self { page, session }
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn session(&self) -> &Arc<BrowserSession> {
        &self.session
    }

    fn poll_interval(&self) -> Duration {
        self.session.config().waits.poll_interval()
    }

    /// Whether the anchor is visible within `wait`. A missing driver,
    /// timeouts and absent elements are all a plain `false`; only
    /// unexpected driver errors surface as `Err`.
    pub async fn exists(&self, wait: Duration) -> Result<bool> {
        debug!(page = self.page.name(), ?wait, "page existence check");
        let Some(driver) = self.session.attached_driver().await else {
            return Ok(false);
        };
        let anchor = self.page.locator().clone();
        let found = poll_until(wait, self.poll_interval(), || {
            let driver = driver.clone();
            let anchor = anchor.clone();
            async move {
                match driver.is_visible(&anchor).await {
                    Ok(visible) => Ok(visible),
                    Err(e) if e.is_expected_absence() => Ok(false),
                    Err(e) => Err(e),
                }
            }
        })
        .await?;
        if !found {
            info!(page = self.page.name(), "page was not found");
        }
        Ok(found)
    }

    /// Bring the page up if it is absent; run `setup_page` if it is
    /// already there. A driver failure carrying the transient timeout
    /// signature discards the cached driver handle and retries the whole
    /// sequence once; a second consecutive failure propagates, as does
    /// any other error.
    pub async fn invoke(&self) -> Result<&Self> {
        let mut attempt = 1;
        loop {
            match self.try_invoke().await {
                Ok(()) => return Ok(self),
                Err(e) if e.is_transient_timeout() && attempt < INVOKE_ATTEMPTS => {
                    attempt += 1;
                    error!(
                        page = self.page.name(),
                        "transient driver failure, retrying page invocation"
                    );
                    self.session.invalidate().await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_invoke(&self) -> Result<()> {
        if !self.exists(Duration::ZERO).await? {
            info!(page = self.page.name(), "invoking page");
            self.page.invoke_actions(&self.session).await?;
            let wait = self.session.config().waits.page_load();
            if !self.exists(wait).await? {
                return Err(AutomationError::PageLoadFailed {
                    page: self.page.name().to_string(),
                });
            }
        } else {
            self.page.setup_page(&self.session).await?;
        }
        Ok(())
    }

    /// Tear the session down first, then invoke. Recovers from a browser
    /// believed corrupt.
    pub async fn forced_invoke(&self) -> Result<&Self> {
        self.session.quit().await?;
        self.invoke().await
    }

    async fn locator_visible(&self, locator: &Locator, wait: Duration) -> Result<bool> {
        let Some(driver) = self.session.attached_driver().await else {
            return Ok(false);
        };
        poll_until(wait, self.poll_interval(), || {
            let driver = driver.clone();
            let locator = locator.clone();
            async move {
                match driver.is_visible(&locator).await {
                    Ok(visible) => Ok(visible),
                    Err(e) if e.is_expected_absence() => Ok(false),
                    Err(e) => Err(e),
                }
            }
        })
        .await
    }

    /// Whether `text` is visible anywhere on the page within `wait`.
    pub async fn text_exists(&self, text: &str, wait: Duration) -> Result<bool> {
        debug!(text, ?wait, "text existence check");
        self.locator_visible(&Locator::text_contains(text), wait).await
    }

    /// Poll until `text` appears. A timeout is a normal negative result.
    pub async fn wait_for_text_exists(&self, text: &str, wait: Duration) -> Result<bool> {
        info!(text, "waiting for text to appear");
        let found = self.locator_visible(&Locator::text_contains(text), wait).await?;
        if !found {
            info!(text, ?wait, "text did not appear in time");
        }
        Ok(found)
    }

    /// Poll until `text` disappears; true when it did within `wait`.
    pub async fn wait_while_text_exists(&self, text: &str, wait: Duration) -> Result<bool> {
        info!(text, "waiting for text to disappear");
        let Some(driver) = self.session.attached_driver().await else {
            return Ok(true);
        };
        let locator = Locator::text_contains(text);
        let gone = poll_until(wait, self.poll_interval(), || {
            let driver = driver.clone();
            let locator = locator.clone();
            async move {
                match driver.is_visible(&locator).await {
                    Ok(visible) => Ok(!visible),
                    Err(e) if e.is_expected_absence() => Ok(true),
                    Err(e) => Err(e),
                }
            }
        })
        .await?;
        if !gone {
            info!(text, ?wait, "text still visible");
        }
        Ok(gone)
    }

    /// Poll until a click on the anchor succeeds. Driver errors mean
    /// "not yet focusable" and are swallowed; the return value says
    /// whether a click eventually landed within `wait`.
    pub async fn can_be_focused(&self, wait: Duration) -> Result<bool> {
        let Some(driver) = self.session.attached_driver().await else {
            return Ok(false);
        };
        let anchor = self.page.locator().clone();
        poll_until(wait, self.poll_interval(), || {
            let driver = driver.clone();
            let anchor = anchor.clone();
            async move { Ok(driver.click(&anchor).await.is_ok()) }
        })
        .await
    }

    /// Click the anchor element once.
    pub async fn set_focus(&self) -> Result<()> {
        self.session.driver().await?.click(self.page.locator()).await
    }

    /// Visibility of an arbitrary element of this page.
    pub async fn field_displayed(&self, locator: &Locator, wait: Duration) -> Result<bool> {
        self.locator_visible(locator, wait).await
    }

    /// Element wrapper bound to this page's session.
    pub fn element(&self, name: &str, locator: Locator) -> Element {
        Element::new(name, locator, self.session.clone())
    }
}
