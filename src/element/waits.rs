use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::info;

use crate::element::ElementSource;
use crate::errors::{AutomationError, Result};
use crate::types::WaitCondition;
use crate::utils::wait::poll_until;

/// Explicit-wait capabilities for any element wrapper.
#[async_trait]
pub trait WaitActions: ElementSource {
    /// Current text of the element.
    async fn text(&self) -> Result<String> {
        self.resolve().await?.text().await
    }

    /// Wait until the element is visible.
    async fn wait_for_visibility(&self, wait: Duration) -> Result<()> {
        info!(element = self.name(), "waiting for element to be visible");
        self.get_element(WaitCondition::Visibility, wait).await?;
        Ok(())
    }

    /// Wait until the element is gone or hidden.
    async fn wait_while_exists(&self, wait: Duration) -> Result<()> {
        info!(element = self.name(), "waiting for element to disappear");
        let driver = self.session().driver().await?;
        let interval = self.session().config().waits.poll_interval();
        let locator = self.locator().clone();
        let gone = poll_until(wait, interval, || {
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
        if gone {
            Ok(())
        } else {
            Err(AutomationError::Timeout(format!(
                "element '{}' still visible after {:?}",
                self.name(),
                wait
            )))
        }
    }

    /// Wait until the element's text contains `text`.
    async fn wait_for_text_in_element(&self, text: &str, wait: Duration) -> Result<()> {
        info!(element = self.name(), text, "waiting for text in element");
        let driver = self.session().driver().await?;
        let interval = self.session().config().waits.poll_interval();
        let locator = self.locator().clone();
        let present = poll_until(wait, interval, || {
            let driver = driver.clone();
            let locator = locator.clone();
            async move {
                match driver.text_of(&locator).await {
                    Ok(actual) => Ok(actual.contains(text)),
                    Err(e) if e.is_expected_absence() => Ok(false),
                    Err(e) => Err(e),
                }
            }
        })
        .await?;
        if present {
            Ok(())
        } else {
            Err(AutomationError::Timeout(format!(
                "text '{}' not present in element '{}' after {:?}",
                text,
                self.name(),
                wait
            )))
        }
    }

    /// Re-read `text()` until it equals `expected` or the deadline
    /// passes, returning the last observed value either way. Callers
    /// compare; non-convergence is not an error. Busy poll, no backoff.
    async fn wait_for_value(&self, expected: &str, wait: Duration) -> Result<String> {
        let deadline = Instant::now() + wait;
        loop {
            let actual = self.text().await?;
            if actual == expected || Instant::now() >= deadline {
                return Ok(actual);
            }
        }
    }
}

impl<T: ElementSource + ?Sized> WaitActions for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;
    use crate::testing::TestHelper;
    use crate::types::Locator;

    #[tokio::test]
    async fn wait_for_visibility_succeeds_and_times_out() {
        let (registry, state) = TestHelper::fast_registry();
        let session = registry.get_or_create("tests::status");
        let locator = Locator::css("#spinner");
        let element = Element::new("spinner", locator.clone(), session);

        let err = element
            .wait_for_visibility(Duration::from_millis(60))
            .await
            .expect_err("hidden");
        assert!(matches!(err, AutomationError::Timeout(_)));

        state.show(&locator);
        element
            .wait_for_visibility(Duration::from_millis(60))
            .await
            .expect("visible");
    }

    #[tokio::test]
    async fn wait_while_exists_observes_disappearance() {
        let (registry, state) = TestHelper::fast_registry();
        let session = registry.get_or_create("tests::status");
        let locator = Locator::css("#spinner");
        state.show(&locator);
        let element = Element::new("spinner", locator.clone(), session);

        let hide_state = state.clone();
        let hide_locator = locator.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            hide_state.hide(&hide_locator);
        });

        element
            .wait_while_exists(Duration::from_secs(2))
            .await
            .expect("disappears");
    }

    #[tokio::test]
    async fn wait_while_exists_times_out_when_still_visible() {
        let (registry, state) = TestHelper::fast_registry();
        let session = registry.get_or_create("tests::status");
        let locator = Locator::css("#banner");
        state.show(&locator);
        let element = Element::new("banner", locator, session);

        let err = element
            .wait_while_exists(Duration::from_millis(60))
            .await
            .expect_err("still visible");
        assert!(matches!(err, AutomationError::Timeout(_)));
    }

    #[tokio::test]
    async fn wait_for_text_in_element_polls_the_accessor() {
        let (registry, state) = TestHelper::fast_registry();
        let session = registry.get_or_create("tests::status");
        let locator = Locator::css("#result");
        state.show(&locator);
        state.push_text(&locator, "pending");
        state.push_text(&locator, "3 rows imported");
        let element = Element::new("result", locator, session);

        element
            .wait_for_text_in_element("imported", Duration::from_secs(2))
            .await
            .expect("text appears");
    }

    #[tokio::test]
    async fn wait_for_value_returns_converged_value() {
        let (registry, state) = TestHelper::fast_registry();
        let session = registry.get_or_create("tests::status");
        let locator = Locator::css("#total");
        state.show(&locator);
        state.push_text(&locator, "0");
        state.push_text(&locator, "12");
        state.push_text(&locator, "100");
        let element = Element::new("total", locator, session);

        let value = element
            .wait_for_value("100", Duration::from_secs(2))
            .await
            .expect("value");
        assert_eq!(value, "100");
    }

    #[tokio::test]
    async fn wait_for_value_returns_last_observed_on_non_convergence() {
        let (registry, state) = TestHelper::fast_registry();
        let session = registry.get_or_create("tests::status");
        let locator = Locator::css("#total");
        state.show(&locator);
        state.push_text(&locator, "99");
        let element = Element::new("total", locator, session);

        let value = element
            .wait_for_value("100", Duration::from_millis(60))
            .await
            .expect("value");
        assert_eq!(value, "99");
    }
}
