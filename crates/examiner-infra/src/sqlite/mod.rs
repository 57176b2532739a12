//! SQLite storage layer.
//!
//! Repository implementations backed by SQLite with WAL mode and split
//! read/write connection pools.

pub mod pool;
pub mod quota;
pub mod token;

use chrono::{DateTime, Utc};

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}
