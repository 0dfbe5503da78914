//! Duration strings as accepted on the command line (`30s`, `10m`, `1h`).

use crate::error::{BenchError, BenchResult};
use std::time::Duration;

/// Parse an `<integer><unit>` string where unit is one of `s`, `m` or `h`.
pub fn parse_interval(value: &str) -> BenchResult<Duration> {
    let value = value.trim();
    let invalid = || BenchError::InvalidDuration(value.to_string());

    let unit = value.chars().last().ok_or_else(invalid)?;
    let digits = &value[..value.len() - unit.len_utf8()];
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let amount: u64 = digits.parse().map_err(|_| invalid())?;
    let multiplier = match unit {
        's' => 1,
        'm' => 60,
        'h' => 3600,
        _ => return Err(invalid()),
    };

    amount
        .checked_mul(multiplier)
        .map(Duration::from_secs)
        .ok_or_else(invalid)
}
