use crate::domain::Timestamp;
use crate::ports::TimeSource;

/// Time source backed by the system clock.
///
/// For tests, use `ManualTimeSource` from the test utilities.
///
/// # Example
///
/// ```rust
/// use discv5_protocol::adapters::SystemTimeSource;
/// use discv5_protocol::ports::TimeSource;
///
/// let time_source = SystemTimeSource::new();
/// assert!(time_source.now().as_secs() > 0);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl SystemTimeSource {
    /// Create a new system time source.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        use std::time::{SystemTime, UNIX_EPOCH};

        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();

        Timestamp::new(duration.as_secs())
    }
}
