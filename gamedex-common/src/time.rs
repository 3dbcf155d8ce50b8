//! Timestamp utilities

use chrono::{DateTime, Months, Utc};

/// Current time as Unix epoch milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Shift a timestamp by a signed number of calendar months.
///
/// Clamps to the input on overflow, which only happens near the end of
/// chrono's representable range.
pub fn shift_months(at: DateTime<Utc>, months: i32) -> DateTime<Utc> {
    let shifted = if months >= 0 {
        at.checked_add_months(Months::new(months as u32))
    } else {
        at.checked_sub_months(Months::new(months.unsigned_abs()))
    };
    shifted.unwrap_or(at)
}
