//! Token lifetime strings such as `"15m"`, `"1h"` or `"7d"`.

use chrono::Duration;

/// Longest accepted token lifetime.
pub const MAX_LIFETIME_DAYS: i64 = 3650;

/// Parse a lifetime of the form `<n>s`, `<n>m`, `<n>h`, `<n>d` or bare seconds.
///
/// Returns `None` for empty, zero, negative or otherwise malformed input, and
/// for anything longer than [`MAX_LIFETIME_DAYS`].
pub fn parse_lifetime(value: &str) -> Option<Duration> {
    let value = value.trim();
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (digits, unit) = value.split_at(split);
    let n: i64 = digits.parse().ok()?;
    if n <= 0 {
        return None;
    }
    let lifetime = match unit.trim() {
        "" | "s" => Duration::try_seconds(n),
        "m" => Duration::try_minutes(n),
        "h" => Duration::try_hours(n),
        "d" => Duration::try_days(n),
        _ => None,
    }?;
    (lifetime <= Duration::days(MAX_LIFETIME_DAYS)).then_some(lifetime)
}
