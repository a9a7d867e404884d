use std::env;

const DEFAULT_TICK_MS: u32 = 10;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=SCHED_TICK_MS");

    // Pass CPU frequency for timing calculations
    println!("cargo:rustc-env=MCU_FREQ_HZ=16000000");

    // Scheduler tick length, overridable per build
    let tick_ms = match env::var("SCHED_TICK_MS") {
        Ok(raw) => match raw.trim().parse::<u32>() {
            Ok(ms) if ms > 0 => ms,
            _ => {
                println!("cargo:warning=ignoring invalid SCHED_TICK_MS={raw:?}");
                DEFAULT_TICK_MS
            }
        },
        Err(_) => DEFAULT_TICK_MS,
    };
    println!("cargo:rustc-env=TICK_PERIOD_MS={tick_ms}");

    // Host builds (unit tests, proptest) skip the AVR link setup
    let target = env::var("TARGET").unwrap_or_default();
    if target.contains("avr") {
        println!("cargo:rustc-link-arg=-mmcu=atmega128");
        println!("cargo:warning=Building for ATmega128 at 16MHz, {tick_ms} ms tick");
    }
}
