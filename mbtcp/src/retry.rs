use std::time::Duration;

/// Controls how the channel task paces reconnection attempts
///
/// The channel owns reconnection policy in its entirety: the socket wrapper
/// itself never retries anything.
pub trait RetryStrategy: Send + Sync {
    /// reset the internal state, called after a successful connection
    fn reset(&mut self);
    /// delay to wait before the next attempt after a failed connect
    fn after_failed_connect(&mut self) -> Duration;
    /// delay to wait before reconnecting after an established connection is lost
    fn after_disconnect(&mut self) -> Duration;
}

/// Return the default [`RetryStrategy`], an exponential backoff from 1 second
/// to 1 minute
pub fn default_retry_strategy() -> Box<dyn RetryStrategy> {
    exponential_retry_strategy(Duration::from_secs(1), Duration::from_secs(60))
}

/// Return a [`RetryStrategy`] that doubles the delay on every consecutive
/// failure up to a maximum value
pub fn exponential_retry_strategy(min: Duration, max: Duration) -> Box<dyn RetryStrategy> {
    Box::new(ExponentialBackoff::new(min, max))
}

struct ExponentialBackoff {
    min: Duration,
    max: Duration,
    current: Duration,
}

impl ExponentialBackoff {
    fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max,
            current: min,
        }
    }
}

impl RetryStrategy for ExponentialBackoff {
    fn reset(&mut self) {
        self.current = self.min;
    }

    fn after_failed_connect(&mut self) -> Duration {
        let ret = self.current;
        self.current = std::cmp::min(2 * self.current, self.max);
        ret
    }

    fn after_disconnect(&mut self) -> Duration {
        self.min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_up_to_the_maximum_and_resets() {
        let mut strategy =
            exponential_retry_strategy(Duration::from_millis(100), Duration::from_millis(350));
        assert_eq!(strategy.after_failed_connect(), Duration::from_millis(100));
        assert_eq!(strategy.after_failed_connect(), Duration::from_millis(200));
        assert_eq!(strategy.after_failed_connect(), Duration::from_millis(350));
        assert_eq!(strategy.after_failed_connect(), Duration::from_millis(350));
        strategy.reset();
        assert_eq!(strategy.after_failed_connect(), Duration::from_millis(100));
        assert_eq!(strategy.after_disconnect(), Duration::from_millis(100));
    }
}
