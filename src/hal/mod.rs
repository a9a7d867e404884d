pub mod timer;
pub mod uart;

// Re-export commonly used types
pub use timer::{Prescaler, TickConfig};
pub use uart::ubrr_for;

#[cfg(target_arch = "avr")]
pub use timer::TickTimer;
#[cfg(target_arch = "avr")]
pub use uart::Usart0;
