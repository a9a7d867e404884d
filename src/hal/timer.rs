//! Timer0 as the scheduler tick source.
//!
//! Timer0 runs in CTC mode and raises `TIMER0_COMP` once per tick. The
//! prescaler/compare pair is computed at compile time from the CPU clock and
//! the configured tick length.

#[cfg(target_arch = "avr")]
use avr_device::atmega128a::TC0;

/// Timer0 clock select (CS02:0). Timer0 on the ATmega128 has its own
/// prescaler table, which includes /32 and /128.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prescaler {
    Direct = 1,
    Div8 = 2,
    Div32 = 3,
    Div64 = 4,
    Div128 = 5,
    Div256 = 6,
    Div1024 = 7,
}

impl Prescaler {
    /// In increasing divisor order
    pub const ALL: [Prescaler; 7] = [
        Prescaler::Direct,
        Prescaler::Div8,
        Prescaler::Div32,
        Prescaler::Div64,
        Prescaler::Div128,
        Prescaler::Div256,
        Prescaler::Div1024,
    ];

    pub const fn divisor(self) -> u32 {
        match self {
            Prescaler::Direct => 1,
            Prescaler::Div8 => 8,
            Prescaler::Div32 => 32,
            Prescaler::Div64 => 64,
            Prescaler::Div128 => 128,
            Prescaler::Div256 => 256,
            Prescaler::Div1024 => 1024,
        }
    }

    pub const fn bits(self) -> u8 {
        self as u8
    }
}

/// Prescaler and OCR0 value producing one compare match per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickConfig {
    pub prescaler: Prescaler,
    pub compare: u8,
}

impl TickConfig {
    /// Pick the smallest prescaler whose 8-bit compare range covers
    /// `tick_ms`. `None` if the tick is too long (or zero) for Timer0.
    pub const fn for_period(cpu_hz: u32, tick_ms: u32) -> Option<Self> {
        let mut i = 0;
        while i < Prescaler::ALL.len() {
            let prescaler = Prescaler::ALL[i];
            let counts =
                cpu_hz as u64 * tick_ms as u64 / (prescaler.divisor() as u64 * 1000);
            if counts >= 1 && counts <= 256 {
                return Some(Self {
                    prescaler,
                    compare: (counts - 1) as u8,
                });
            }
            i += 1;
        }
        None
    }

    /// Real tick length in microseconds after rounding.
    pub const fn period_us(&self, cpu_hz: u32) -> u32 {
        let counts = self.compare as u64 + 1;
        (counts * self.prescaler.divisor() as u64 * 1_000_000 / cpu_hz as u64) as u32
    }
}

#[cfg(target_arch = "avr")]
const WGM01: u8 = 1 << 3;
#[cfg(target_arch = "avr")]
const OCIE0: u8 = 1 << 1;

/// Owns TC0 while it drives the scheduler tick.
#[cfg(target_arch = "avr")]
pub struct TickTimer {
    tc0: TC0,
}

#[cfg(target_arch = "avr")]
impl TickTimer {
    pub fn new(tc0: TC0) -> Self {
        // Stopped, normal mode
        tc0.tccr0.write(|w| unsafe { w.bits(0) });
        tc0.tcnt0.write(|w| unsafe { w.bits(0) });
        Self { tc0 }
    }

    /// Start CTC mode with the compare-match interrupt enabled. Global
    /// interrupts still have to be enabled by the caller.
    pub fn start(&mut self, config: TickConfig) {
        self.tc0.tcnt0.write(|w| unsafe { w.bits(0) });
        self.tc0.ocr0.write(|w| unsafe { w.bits(config.compare) });
        self.tc0
            .tccr0
            .write(|w| unsafe { w.bits(WGM01 | config.prescaler.bits()) });
        self.tc0
            .timsk
            .modify(|r, w| unsafe { w.bits(r.bits() | OCIE0) });
    }

    pub fn stop(&mut self) {
        self.tc0
            .timsk
            .modify(|r, w| unsafe { w.bits(r.bits() & !OCIE0) });
        self.tc0.tccr0.write(|w| unsafe { w.bits(0) });
    }

    pub fn release(mut self) -> TC0 {
        self.stop();
        self.tc0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CPU_HZ: u32 = 16_000_000;

    #[test]
    fn one_ms_at_16mhz() {
        let config = TickConfig::for_period(CPU_HZ, 1).unwrap();
        assert_eq!(config.prescaler, Prescaler::Div64);
        assert_eq!(config.compare, 249);
        assert_eq!(config.period_us(CPU_HZ), 1000);
    }

    #[test]
    fn ten_ms_at_16mhz() {
        let config = TickConfig::for_period(CPU_HZ, 10).unwrap();
        assert_eq!(config.prescaler, Prescaler::Div1024);
        assert_eq!(config.compare, 155);
        // 156 * 1024 / 16 MHz
        assert_eq!(config.period_us(CPU_HZ), 9984);
    }

    #[test]
    fn prefers_finest_prescaler() {
        let config = TickConfig::for_period(1_000_000, 1).unwrap();
        assert_eq!(config.prescaler, Prescaler::Div8);
        assert_eq!(config.compare, 124);
    }

    #[test]
    fn rejects_unreachable_periods() {
        assert_eq!(TickConfig::for_period(CPU_HZ, 100), None);
        assert_eq!(TickConfig::for_period(CPU_HZ, 0), None);
    }

    #[test]
    fn prescaler_bits_match_divisors() {
        for (i, p) in Prescaler::ALL.iter().enumerate() {
            assert_eq!(p.bits() as usize, i + 1);
        }
        assert!(Prescaler::ALL.windows(2).all(|w| w[0].divisor() < w[1].divisor()));
    }
}
