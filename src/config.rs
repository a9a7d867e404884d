//! Configuration constants for the ATmega128 scheduler firmware
//!
//! `MCU_FREQ_HZ` and `TICK_PERIOD_MS` are exported by `build.rs`; set
//! `SCHED_TICK_MS` when building to change the tick length.

/// CPU frequency in Hz
pub const CPU_FREQ_HZ: u32 = parse_u32(env!("MCU_FREQ_HZ"));

/// Length of one scheduler tick in milliseconds
pub const TICK_PERIOD_MS: u32 = parse_u32(env!("TICK_PERIOD_MS"));

/// Number of task slots in the scheduler table
pub const MAX_TASKS: usize = 40;

/// UART baud rate
pub const UART_BAUD: u32 = 9600;

/// Heartbeat task interval in milliseconds
pub const HEARTBEAT_MS: u32 = 1000;

/// LED blink task interval in milliseconds
pub const LED_BLINK_MS: u32 = 500;

const fn parse_u32(raw: &str) -> u32 {
    let bytes = raw.as_bytes();
    assert!(!bytes.is_empty(), "empty numeric configuration value");

    let mut value: u32 = 0;
    let mut i = 0;
    while i < bytes.len() {
        let digit = bytes[i];
        assert!(digit.is_ascii_digit(), "non-numeric configuration value");
        value = match value.checked_mul(10) {
            Some(v) => v,
            None => panic!("configuration value overflows u32"),
        };
        value = match value.checked_add((digit - b'0') as u32) {
            Some(v) => v,
            None => panic!("configuration value overflows u32"),
        };
        i += 1;
    }
    value
}
