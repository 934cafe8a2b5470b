pub mod catalog;
pub mod estimate;
pub mod location;
pub mod order;
pub mod search;

use chrono::{DateTime, SecondsFormat, Utc};

/// Renders a stored timestamp as ISO-8601 with nanosecond precision.
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}
