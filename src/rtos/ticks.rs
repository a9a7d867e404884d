//! Millisecond to tick conversion

/// Converts a duration in milliseconds into scheduler ticks.
///
/// Rounds up, so any non-zero duration is at least one tick and never gets
/// dropped. A `tick_period_ms` of 0 means the timer was never configured;
/// it is treated as 1 ms, which turns the conversion into identity.
pub const fn to_ticks(duration_ms: u32, tick_period_ms: u32) -> u32 {
    let period = if tick_period_ms == 0 { 1 } else { tick_period_ms as u64 };
    let ticks = (duration_ms as u64 + period - 1) / period;
    if ticks > u32::MAX as u64 {
        u32::MAX
    } else {
        ticks as u32
    }
}
