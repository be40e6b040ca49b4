//! JavaScript snippets executed in page context.

/// Script that tracks open HTTP requests through `window.openHTTPs`, so
/// the HTTP-idle wait has a counter to poll. Bundled from the resources
/// directory and installed by `JsActions::inject_js_waiter`.
pub const HTTP_WAITER: &str = include_str!("../../resources/http_waiter.js");

/// Expression reading the open-request counter.
pub const OPEN_HTTPS: &str = "window.openHTTPs";

/// Statement force-resetting the open-request counter.
pub const RESET_OPEN_HTTPS: &str = "window.openHTTPs = 0";

/// Statement clearing the page's local storage.
pub const CLEAR_LOCAL_STORAGE: &str = "window.localStorage.clear();";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waiter_script_installs_counter() {
        assert!(HTTP_WAITER.contains("window.openHTTPs"));
        assert!(HTTP_WAITER.contains("XMLHttpRequest.prototype.open"));
    }
}
