use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{error, info};

use crate::element::ElementSource;
use crate::errors::Result;
use crate::utils::javascript::{HTTP_WAITER, OPEN_HTTPS, RESET_OPEN_HTTPS};
use crate::utils::wait::poll_until;

/// JavaScript capabilities for any element wrapper.
#[async_trait]
pub trait JsActions: ElementSource {
    /// Run `body` as a script with the resolved element bound as `this`,
    /// returning the stringified result.
    async fn execute_script(&self, body: &str) -> Result<String> {
        let element = self.resolve().await?;
        let value = element.execute_script(body).await?;
        Ok(stringify(&value))
    }

    /// Install the script that tracks open HTTP requests, so the idle
    /// wait below has a counter to poll.
    async fn inject_js_waiter(&self) -> Result<()> {
        info!(element = self.name(), "injecting HTTP requests waiter");
        self.session().execute_script(HTTP_WAITER).await?;
        Ok(())
    }

    /// Poll `window.openHTTPs` until it drains to zero or `wait` runs
    /// out. Best-effort: driver timeouts are swallowed and the counter is
    /// force-reset once the budget is exhausted. Not a guarantee that the
    /// page is network-idle.
    async fn wait_until_http_requests_are_finished(&self, wait: Duration) -> Result<()> {
        let session = self.session();
        let interval = session.config().waits.poll_interval();
        let drained = poll_until(wait, interval, move || async move {
            Ok(!truthy(&session.execute_script(OPEN_HTTPS).await?))
        })
        .await;
        match drained {
            Ok(true) => Ok(()),
            Ok(false) => {
                error!(wait_secs = wait.as_secs(), "HTTP requests still open after wait budget");
                session.execute_script(RESET_OPEN_HTTPS).await?;
                Ok(())
            }
            Err(e) if e.is_expected_absence() => {
                error!(wait_secs = wait.as_secs(), "HTTP request poll timed out");
                session.execute_script(RESET_OPEN_HTTPS).await?;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Scroll the element into view.
    async fn scroll_to_element(&self) -> Result<()> {
        info!(element = self.name(), "scrolling to element");
        self.execute_script("this.scrollIntoView();").await?;
        Ok(())
    }

    /// Click through the DOM instead of input simulation.
    async fn js_click(&self) -> Result<()> {
        info!(element = self.name(), "clicking element via JavaScript");
        self.execute_script("this.click();").await?;
        Ok(())
    }
}

impl<T: ElementSource + ?Sized> JsActions for T {}

fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;
    use crate::testing::TestHelper;
    use crate::types::Locator;
    use serde_json::json;

    fn visible_element() -> (Element, std::sync::Arc<crate::browser::MockState>) {
        let (registry, state) = TestHelper::fast_registry();
        let session = registry.get_or_create("tests::forms");
        let locator = Locator::css("#amount");
        state.show(&locator);
        (Element::new("amount", locator, session), state)
    }

    #[tokio::test]
    async fn execute_script_returns_stringified_result() {
        let (element, state) = visible_element();
        state.push_script_result("return this.value;", json!("42"));
        let result = element.execute_script("return this.value;").await.expect("script");
        assert_eq!(result, "42");

        state.push_script_result("return this.childElementCount;", json!(7));
        let result = element
            .execute_script("return this.childElementCount;")
            .await
            .expect("script");
        assert_eq!(result, "7");
    }

    #[tokio::test]
    async fn inject_js_waiter_installs_the_counter_script() {
        let (element, state) = visible_element();
        element.inject_js_waiter().await.expect("inject");
        assert!(state
            .calls()
            .iter()
            .any(|call| call.starts_with("script ") && call.contains("window.openHTTPs")));
    }

    #[tokio::test]
    async fn http_wait_returns_once_counter_drains() {
        let (element, state) = visible_element();
        state.push_script_result(OPEN_HTTPS, json!(2));
        state.push_script_result(OPEN_HTTPS, json!(1));
        state.push_script_result(OPEN_HTTPS, json!(0));

        element
            .wait_until_http_requests_are_finished(Duration::from_secs(1))
            .await
            .expect("wait");
        let reset = format!("script {}", RESET_OPEN_HTTPS);
        assert!(!state.calls().contains(&reset));
    }

    #[tokio::test]
    async fn http_wait_resets_counter_on_exhausted_budget() {
        let (element, state) = visible_element();
        state.push_script_result(OPEN_HTTPS, json!(3));

        element
            .wait_until_http_requests_are_finished(Duration::from_millis(80))
            .await
            .expect("wait");
        let reset = format!("script {}", RESET_OPEN_HTTPS);
        assert!(state.calls().contains(&reset));
    }

    #[tokio::test]
    async fn scroll_and_js_click_target_the_element() {
        let (element, state) = visible_element();
        element.scroll_to_element().await.expect("scroll");
        element.js_click().await.expect("click");

        let calls = state.calls();
        assert!(calls
            .iter()
            .any(|call| call.contains("this.scrollIntoView();")));
        assert!(calls.iter().any(|call| call.contains("this.click();")));
    }
}
