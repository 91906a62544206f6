//! Overflow policies for the bounded dispatch queue
//!
//! When the queue is at capacity, the policy decides which event is lost.
//! Producers never block on a full queue.

use super::error::LoggerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Policy for handling queue overflow
///
/// # Example
///
/// ```
/// use otel_logger_system::OverflowPolicy;
///
/// // Default behavior: evict the oldest queued event
/// let policy = OverflowPolicy::default();
/// assert_eq!(policy, OverflowPolicy::DropOldest);
///
/// let policy: OverflowPolicy = "drop_newest".parse().unwrap();
/// assert_eq!(policy, OverflowPolicy::DropNewest);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Evict the oldest queued event to make room for the new one
    ///
    /// Keeps the most recent history, which is usually what matters when
    /// diagnosing the moment a burst happened.
    #[default]
    DropOldest,

    /// Discard the event being submitted
    DropNewest,
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::DropOldest => write!(f, "drop_oldest"),
            OverflowPolicy::DropNewest => write!(f, "drop_newest"),
        }
    }
}

impl FromStr for OverflowPolicy {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "drop_oldest" | "oldest" => Ok(OverflowPolicy::DropOldest),
            "drop_newest" | "newest" => Ok(OverflowPolicy::DropNewest),
            other => Err(LoggerError::config(
                "overflow_policy",
                format!("unknown overflow policy '{}'", other),
            )),
        }
    }
}

/// Callback type for overflow notifications
///
/// Called when events are dropped due to queue overflow.
/// The parameter is the total count of dropped events so far.
pub type OverflowCallback = Arc<dyn Fn(u64) + Send + Sync>;
