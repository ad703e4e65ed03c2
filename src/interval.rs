//! Parsing of human-readable interval strings ("15s", "2m", "3h", "1d").
//!
//! Used to interpret schedule and retention-age strings for bookkeeping.
//! Actual periodic triggering is a scheduler concern, not handled here.

use std::time::Duration;

/// Parse an interval string into a duration.
///
/// Grammar: `<non-negative integer><unit>` with unit one of `s` (seconds),
/// `m` (minutes), `h` (hours), `d` (days). Any other shape yields `None`;
/// malformed input is never an error.
pub fn parse_interval(text: &str) -> Option<Duration> {
  let text = text.trim();
  if text.len() < 2 || !text.is_ascii() {
    return None;
  }

  let (number, unit) = text.split_at(text.len() - 1);
  // u64::from_str would also accept a leading '+', which the grammar
  // does not.
  if !number.bytes().all(|b| b.is_ascii_digit()) {
    return None;
  }
  let value: u64 = number.parse().ok()?;

  let seconds = match unit {
    "s" => value,
    "m" => value * 60,
    "h" => value * 3600,
    "d" => value * 86400,
    _ => return None,
  };

  Some(Duration::from_secs(seconds))
}
