use std::future::Future;
use std::time::{Duration, Instant};

use crate::errors::Result;

/// Poll `condition` until it reports true or `wait` elapses, sleeping
/// `interval` between probes. The condition is always checked at least
/// once, so a zero wait is a single probe. Errors from the condition
/// propagate immediately.
pub async fn poll_until<F, Fut>(wait: Duration, interval: Duration, mut condition: F) -> Result<bool>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let start = Instant::now();
    loop {
        if condition().await? {
            return Ok(true);
        }
        if start.elapsed() >= wait {
            return Ok(false);
        }
        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AutomationError;

    #[tokio::test]
    async fn zero_wait_is_a_single_probe() {
        let mut probes = 0;
        let result = poll_until(Duration::ZERO, Duration::from_millis(10), || {
            probes += 1;
            async { Ok(false) }
        })
        .await
        .expect("poll");
        assert!(!result);
        assert_eq!(probes, 1);
    }

    #[tokio::test]
    async fn converges_once_condition_holds() {
        let mut probes = 0;
        let result = poll_until(Duration::from_secs(1), Duration::from_millis(5), || {
            probes += 1;
            let done = probes >= 3;
            async move { Ok(done) }
        })
        .await
        .expect("poll");
        assert!(result);
        assert_eq!(probes, 3);
    }

    #[tokio::test]
    async fn condition_errors_propagate() {
        let result: Result<bool> =
            poll_until(Duration::from_secs(1), Duration::from_millis(5), || async {
                Err(AutomationError::Driver("boom".to_string()))
            })
            .await;
        assert!(result.is_err());
    }
}
