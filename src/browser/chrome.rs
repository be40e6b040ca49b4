//! Driver implementation over a real headless Chrome process.

use std::ffi::OsStr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use headless_chrome::{Browser, Element, LaunchOptions, Tab};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::core::{Config, Driver, DriverFactory};
use crate::errors::{AutomationError, Result};
use crate::types::{Locator, LogEntry};

const VISIBILITY_CHECK: &str = r#"function() {
    const rect = this.getBoundingClientRect();
    const style = window.getComputedStyle(this);
    return rect.width > 0 && rect.height > 0
        && style.visibility !== 'hidden' && style.display !== 'none';
}"#;

const TEXT_OF: &str = "function() { return this.innerText || this.textContent || ''; }";

// The driver has no compound double-click primitive; replay the event
// sequence on the DOM.
const DOUBLE_CLICK: &str = r#"function() {
    const opts = { bubbles: true, cancelable: true, view: window };
    for (let i = 0; i < 2; i++) {
        this.dispatchEvent(new MouseEvent('mousedown', opts));
        this.dispatchEvent(new MouseEvent('mouseup', opts));
        this.dispatchEvent(new MouseEvent('click', opts));
    }
    this.dispatchEvent(new MouseEvent('dblclick', { bubbles: true, cancelable: true, view: window, detail: 2 }));
}"#;

// Console hook installed at session start; collect_logs drains the buffer.
const CONSOLE_HOOK: &str = r#"(function() {
    if (window.__pagecraftLogs !== undefined) return;
    window.__pagecraftLogs = [];
    ['log', 'info', 'warn', 'error'].forEach(function(level) {
        const original = console[level];
        console[level] = function() {
            window.__pagecraftLogs.push({
                level: level,
                message: Array.prototype.slice.call(arguments).map(String).join(' '),
                timestamp: Date.now()
            });
            original.apply(console, arguments);
        };
    });
})()"#;

const CONSOLE_DRAIN: &str =
    "JSON.stringify(window.__pagecraftLogs ? window.__pagecraftLogs.splice(0) : [])";

#[derive(Deserialize)]
struct RawConsoleEntry {
    level: String,
    message: String,
    timestamp: i64,
}

pub struct ChromeDriver {
    browser: Mutex<Option<Browser>>,
    tab: Arc<Tab>,
}

impl ChromeDriver {
    fn element(&self, locator: &Locator) -> Result<Element<'_>> {
        let found = match locator {
            Locator::Css(selector) => self.tab.find_element(selector),
            Locator::XPath(query) => self.tab.find_element_by_xpath(query),
            Locator::Id(id) => self.tab.find_element(&format!("[id='{}']", id)),
        };
        found.map_err(|e| AutomationError::ElementNotFound(format!("{}: {}", locator, e)))
    }

    fn evaluate(&self, expression: &str) -> Result<Value> {
        let object = self
            .tab
            .evaluate(expression, false)
            .map_err(|e| AutomationError::JavaScriptFailed(e.to_string()))?;
        Ok(object.value.unwrap_or(Value::Null))
    }

    fn call_on_element(&self, locator: &Locator, body: &str) -> Result<Value> {
        let element = self.element(locator)?;
        let object = element
            .call_js_fn(&format!("function() {{ {} }}", body), vec![], false)
            .map_err(|e| AutomationError::JavaScriptFailed(e.to_string()))?;
        Ok(object.value.unwrap_or(Value::Null))
    }

    fn call_fn_on_element(&self, locator: &Locator, function: &str) -> Result<Value> {
        let element = self.element(locator)?;
        let object = element
            .call_js_fn(function, vec![], false)
            .map_err(|e| AutomationError::JavaScriptFailed(e.to_string()))?;
        Ok(object.value.unwrap_or(Value::Null))
    }
}

#[async_trait]
impl Driver for ChromeDriver {
    async fn goto(&self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .map_err(|e| AutomationError::NavigationFailed(e.to_string()))?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| AutomationError::NavigationFailed(e.to_string()))?;
        // navigation replaces the document, so the hook has to go back in
        self.evaluate(CONSOLE_HOOK)?;
        Ok(())
    }

    async fn refresh(&self) -> Result<()> {
        self.tab
            .reload(false, None)
            .map_err(|e| AutomationError::Driver(e.to_string()))?;
        self.evaluate(CONSOLE_HOOK)?;
        Ok(())
    }

    async fn find(&self, locator: &Locator) -> Result<()> {
        self.element(locator).map(|_| ())
    }

    async fn is_visible(&self, locator: &Locator) -> Result<bool> {
        let element = match self.element(locator) {
            Ok(element) => element,
            Err(_) => return Ok(false),
        };
        let object = element
            .call_js_fn(VISIBILITY_CHECK, vec![], false)
            .map_err(|e| AutomationError::JavaScriptFailed(e.to_string()))?;
        Ok(object.value.and_then(|v| v.as_bool()).unwrap_or(false))
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        self.element(locator)?
            .click()
            .map_err(|e| AutomationError::Driver(e.to_string()))?;
        Ok(())
    }

    async fn double_click(&self, locator: &Locator) -> Result<()> {
        self.call_fn_on_element(locator, DOUBLE_CLICK)?;
        Ok(())
    }

    async fn move_to(&self, locator: &Locator) -> Result<()> {
        self.element(locator)?
            .move_mouse_over()
            .map_err(|e| AutomationError::Driver(e.to_string()))?;
        Ok(())
    }

    async fn move_to_and_click(&self, locator: &Locator) -> Result<()> {
        let element = self.element(locator)?;
        element
            .move_mouse_over()
            .map_err(|e| AutomationError::Driver(e.to_string()))?;
        element
            .click()
            .map_err(|e| AutomationError::Driver(e.to_string()))?;
        Ok(())
    }

    async fn drag_and_drop(&self, source: &Locator, target: &Locator) -> Result<()> {
        let from = self
            .element(source)?
            .get_midpoint()
            .map_err(|e| AutomationError::Driver(e.to_string()))?;
        let to = self
            .element(target)?
            .get_midpoint()
            .map_err(|e| AutomationError::Driver(e.to_string()))?;
        debug!(%source, %target, "replaying drag event sequence");
        let script = format!(
            r#"(function(sx, sy, tx, ty) {{
                const src = document.elementFromPoint(sx, sy);
                const dst = document.elementFromPoint(tx, ty);
                if (!src || !dst) return false;
                const data = new DataTransfer();
                src.dispatchEvent(new DragEvent('dragstart', {{ bubbles: true, dataTransfer: data }}));
                dst.dispatchEvent(new DragEvent('dragover', {{ bubbles: true, dataTransfer: data }}));
                dst.dispatchEvent(new DragEvent('drop', {{ bubbles: true, dataTransfer: data }}));
                src.dispatchEvent(new DragEvent('dragend', {{ bubbles: true, dataTransfer: data }}));
                return true;
            }})({}, {}, {}, {})"#,
            from.x, from.y, to.x, to.y
        );
        self.evaluate(&script)?;
        Ok(())
    }

    async fn text_of(&self, locator: &Locator) -> Result<String> {
        let value = self.call_fn_on_element(locator, TEXT_OF)?;
        Ok(value.as_str().unwrap_or("").to_string())
    }

    async fn execute_script(&self, script: &str) -> Result<Value> {
        self.evaluate(script)
    }

    async fn execute_script_on(&self, locator: &Locator, body: &str) -> Result<Value> {
        self.call_on_element(locator, body)
    }

    async fn console_logs(&self) -> Result<Vec<LogEntry>> {
        let drained = self.evaluate(CONSOLE_DRAIN)?;
        let raw = drained.as_str().unwrap_or("[]");
        let entries: Vec<RawConsoleEntry> = serde_json::from_str(raw)?;
        Ok(entries
            .into_iter()
            .map(|entry| LogEntry {
                level: entry.level.to_uppercase(),
                source: "console".to_string(),
                message: entry.message,
                timestamp: DateTime::<Utc>::from_timestamp_millis(entry.timestamp)
                    .unwrap_or_else(Utc::now),
            })
            .collect())
    }

    async fn quit(&self) -> Result<()> {
        // dropping the Browser handle tears the child process down
        let mut guard = self.browser.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.take();
        Ok(())
    }
}

/// Launches headless Chrome with the configured options.
pub struct ChromeDriverFactory;

#[async_trait]
impl DriverFactory for ChromeDriverFactory {
    async fn create(&self, config: &Config) -> Result<Arc<dyn Driver>> {
        let window_size_arg = format!(
            "--window-size={},{}",
            config.browser.window_width, config.browser.window_height
        );
        let user_agent_arg = config
            .browser
            .user_agent
            .as_ref()
            .map(|ua| format!("--user-agent={}", ua));

        let mut args = vec![
            OsStr::new("--no-sandbox"),
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new(&window_size_arg),
        ];
        if let Some(ref ua_arg) = user_agent_arg {
            args.push(OsStr::new(ua_arg));
        }
        for arg in &config.browser.args {
            args.push(OsStr::new(arg));
        }

        let launch_options = LaunchOptions::default_builder()
            .headless(config.browser.headless)
            .args(args)
            .build()
            .map_err(|e| AutomationError::LaunchFailed(e.to_string()))?;

        let browser =
            Browser::new(launch_options).map_err(|e| AutomationError::LaunchFailed(e.to_string()))?;
        let tab = browser
            .new_tab()
            .map_err(|e| AutomationError::LaunchFailed(e.to_string()))?;

        let driver = ChromeDriver {
            browser: Mutex::new(Some(browser)),
            tab,
        };
        driver.evaluate(CONSOLE_HOOK)?;
        Ok(Arc::new(driver))
    }
}
