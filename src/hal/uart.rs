//! USART0 transmitter as an `embedded_hal` serial writer.

#[cfg(target_arch = "avr")]
use avr_device::atmega128a::USART0;
#[cfg(target_arch = "avr")]
use core::convert::Infallible;
#[cfg(target_arch = "avr")]
use embedded_hal::serial;

/// UBRR value for normal-speed asynchronous mode, rounded to nearest.
pub const fn ubrr_for(cpu_hz: u32, baud: u32) -> u16 {
    let divisor = 16 * baud;
    ((cpu_hz + divisor / 2) / divisor - 1) as u16
}

#[cfg(target_arch = "avr")]
const TXEN0: u8 = 1 << 3;
#[cfg(target_arch = "avr")]
const UDRE0: u8 = 1 << 5;
// 8 data bits, no parity, 1 stop bit
#[cfg(target_arch = "avr")]
const UCSZ_8N1: u8 = 0b0000_0110;

/// Polled USART0 transmitter.
///
/// Writes never block inside the driver; `nb::block!` in the caller does
/// the waiting, in main-loop context only.
#[cfg(target_arch = "avr")]
pub struct Usart0 {
    usart: USART0,
}

#[cfg(target_arch = "avr")]
impl Usart0 {
    pub fn new(usart: USART0, baud: u32) -> Self {
        let ubrr = ubrr_for(crate::config::CPU_FREQ_HZ, baud);
        usart.ubrr0h.write(|w| unsafe { w.bits((ubrr >> 8) as u8) });
        usart.ubrr0l.write(|w| unsafe { w.bits(ubrr as u8) });
        usart.ucsr0c.write(|w| unsafe { w.bits(UCSZ_8N1) });
        usart.ucsr0b.write(|w| unsafe { w.bits(TXEN0) });
        Self { usart }
    }

    pub fn release(self) -> USART0 {
        self.usart
    }
}

#[cfg(target_arch = "avr")]
impl serial::Write<u8> for Usart0 {
    type Error = Infallible;

    fn write(&mut self, word: u8) -> nb::Result<(), Self::Error> {
        if self.usart.ucsr0a.read().bits() & UDRE0 == 0 {
            return Err(nb::Error::WouldBlock);
        }
        self.usart.udr0.write(|w| unsafe { w.bits(word) });
        Ok(())
    }

    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        if self.usart.ucsr0a.read().bits() & UDRE0 == 0 {
            return Err(nb::Error::WouldBlock);
        }
        Ok(())
    }
}
