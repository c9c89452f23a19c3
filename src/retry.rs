use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::{Duration, Instant};

use crate::{
    error::CloudApiError,
    quota::{RetryQuota, UnlimitedRetryQuota},
};

/// Hard cap on the delay before any single retry attempt.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(10);

/// Base delay of the exponential backoff curve.
const BACKOFF_BASE_MS: f64 = 100.0;
/// Ceiling of the exponential backoff curve.
const BACKOFF_CEILING_MS: f64 = 5_000.0;
/// Minimum gap between two connectivity notices.
const NOTICE_INTERVAL: Duration = Duration::from_secs(5);
/// Attempt ceiling; transient outages are expected to clear long before it.
const DEFAULT_MAX_ATTEMPTS: u32 = 10_000;

/// Error names retried regardless of caller configuration.
const TRANSIENT_ERROR_NAMES: [&str; 6] = [
    "ThrottlingException",
    "Throttling",
    "TooManyRequestsException",
    "OperationAbortedException",
    "TimeoutError",
    "NetworkingError",
];

/// Retry policy shared by every client a [`ClientConfig`](crate::ClientConfig)
/// builds.
///
/// Owns the retry decision, the backoff delay and the quota override; the
/// transport owns the loop that consults them.
#[derive(Clone, Debug)]
pub struct RetryStrategy {
    retriable_errors: Vec<String>,
    max_attempts: u32,
    quota: Arc<dyn RetryQuota>,
    notice: Arc<ConnectivityNotice>,
}

impl RetryStrategy {
    /// Creates the standard policy: transient-name matching, exponential
    /// backoff, concurrent-retry throttling disabled.
    pub fn standard() -> Self {
        Self {
            retriable_errors: Vec::new(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            quota: Arc::new(UnlimitedRetryQuota),
            notice: shared_notice(),
        }
    }

    /// Adds error names retried in addition to the built-in transient set.
    pub fn with_retriable_errors<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.retriable_errors
            .extend(names.into_iter().map(Into::into));
        self
    }

    /// Decides whether a failed attempt should be retried.
    ///
    /// Connectivity failures always retry and emit a rate-limited notice.
    /// Otherwise the error's wire name must match the transient set or the
    /// caller-supplied extras.
    pub fn should_retry(&self, error: &CloudApiError) -> bool {
        if error.is_connectivity() {
            self.notice.emit();
            return true;
        }
        match error.error_name() {
            Some(name) => self.is_retriable_name(name),
            None => false,
        }
    }

    /// Delay before the given zero-based retry attempt.
    ///
    /// `min(1.5^attempt × 100 ms, 5000 ms)`, clamped to [`MAX_RETRY_DELAY`].
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let delay_ms = (1.5f64.powi(exponent) * BACKOFF_BASE_MS).min(BACKOFF_CEILING_MS);
        Duration::from_millis(delay_ms as u64).min(MAX_RETRY_DELAY)
    }

    pub(crate) fn is_retriable_name(&self, name: &str) -> bool {
        TRANSIENT_ERROR_NAMES.contains(&name)
            || self.retriable_errors.iter().any(|extra| extra == name)
    }

    pub(crate) fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub(crate) fn quota(&self) -> &dyn RetryQuota {
        self.quota.as_ref()
    }
}

/// Rate-limited "waiting for internet connection" notice.
#[derive(Debug)]
struct ConnectivityNotice {
    last_emitted: Mutex<Option<Instant>>,
    interval: Duration,
}

impl ConnectivityNotice {
    fn new(interval: Duration) -> Self {
        Self {
            last_emitted: Mutex::new(None),
            interval,
        }
    }

    fn emit(&self) {
        if self.mark_emitted() {
            tracing::info!("waiting for internet connection...");
        }
    }

    /// Returns true at most once per interval.
    fn mark_emitted(&self) -> bool {
        let mut last = self
            .last_emitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match *last {
            Some(previous) if previous.elapsed() < self.interval => false,
            _ => {
                *last = Some(Instant::now());
                true
            }
        }
    }
}

// One notice window for the whole process; concurrent clients share it.
fn shared_notice() -> Arc<ConnectivityNotice> {
    static NOTICE: OnceLock<Arc<ConnectivityNotice>> = OnceLock::new();
    NOTICE
        .get_or_init(|| Arc::new(ConnectivityNotice::new(NOTICE_INTERVAL)))
        .clone()
}
