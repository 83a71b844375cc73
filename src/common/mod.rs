mod errors;
pub mod logging;

pub use errors::{Error, Result};

/// Milliseconds since the Unix epoch, used as the feed cache buster
pub fn epoch_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
