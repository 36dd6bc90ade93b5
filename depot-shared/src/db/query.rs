/// Result-shape helpers and transient-error retry
///
/// Every lookup in the core fetches *all* matching rows and then asserts the
/// shape it expects. A uniqueness assumption that turns out to be false is a
/// data-integrity violation (`duplicate_<key>`), never silently resolved by
/// picking the first row.
///
/// # Example
///
/// ```
/// use depot_shared::db::query::{at_most_one, exactly_one};
///
/// assert_eq!(exactly_one(vec![7], "role").unwrap(), 7);
/// assert_eq!(exactly_one(Vec::<i32>::new(), "role").unwrap_err().code(), "unknown_role");
/// assert_eq!(at_most_one(Vec::<i32>::new(), "membership").unwrap(), None);
/// assert_eq!(at_most_one(vec![1, 2], "membership").unwrap_err().code(), "duplicate_membership");
/// ```

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::DepotError;

/// SQLSTATE codes treated as transient
///
/// Class 08 covers connection failures; 57P0x are server shutdown/startup
/// windows; 40001/40P01 are serialization failures and deadlocks raised by
/// SERIALIZABLE transactions competing for the same rows.
const TRANSIENT_SQLSTATES: &[&str] = &[
    "08000", "08001", "08003", "08004", "08006", "08007", // connection exceptions
    "57P01", "57P02", "57P03", // admin/crash shutdown, cannot connect now
    "40001", "40P01", // serialization failure, deadlock detected
];

/// Returns the single row, `unknown_<key>` for none, `duplicate_<key>` for more
pub fn exactly_one<T>(mut rows: Vec<T>, key: &str) -> Result<T, DepotError> {
    match rows.len() {
        0 => Err(DepotError::unknown(key)),
        1 => Ok(rows.remove(0)),
        _ => Err(DepotError::duplicate(key)),
    }
}

/// Returns `None` for no rows, the row for one, `duplicate_<key>` for more
pub fn at_most_one<T>(mut rows: Vec<T>, key: &str) -> Result<Option<T>, DepotError> {
    match rows.len() {
        0 => Ok(None),
        1 => Ok(Some(rows.remove(0))),
        _ => Err(DepotError::duplicate(key)),
    }
}

/// Classifies a store error as transient (worth retrying) or not
pub fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut => true,
        sqlx::Error::Database(db_err) => db_err
            .code()
            .map(|code| TRANSIENT_SQLSTATES.contains(&code.as_ref()))
            .unwrap_or(false),
        _ => false,
    }
}

/// Retry policy for transient store errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub retries: u32,

    /// Delay before the first retry
    pub backoff_base: Duration,

    /// Multiplier applied per subsequent retry
    pub backoff_exponent: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            backoff_base: Duration::from_millis(500),
            backoff_exponent: 2,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.backoff_exponent.saturating_pow(attempt);
        self.backoff_base.saturating_mul(factor)
    }
}

/// Runs `operation`, retrying transient store errors with exponential backoff
///
/// Non-transient errors and successes return immediately. After `retries`
/// failed retries the last transient error is returned.
///
/// `operation` is invoked once per attempt, so a transactional operation must
/// open its own transaction inside the closure.
pub async fn retry_on_transient<T, F, Fut>(
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, DepotError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DepotError>>,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Err(err) if err.is_transient() && attempt < policy.retries => {
                let delay = policy.delay_for(attempt);
                warn!(
                    attempt = attempt + 1,
                    retries = policy.retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Transient store error, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}
