use embedded_hal::serial;

/// Line-oriented text output over any `embedded_hal` serial writer.
///
/// Also implements [`ufmt::uWrite`], so `uwrite!` works on it directly.
pub struct SerialConsole<W> {
    serial: W,
}

impl<W: serial::Write<u8>> SerialConsole<W> {
    pub fn new(serial: W) -> Self {
        Self { serial }
    }

    pub fn write_byte(&mut self, byte: u8) -> Result<(), W::Error> {
        nb::block!(self.serial.write(byte))
    }

    pub fn write_str(&mut self, s: &str) -> Result<(), W::Error> {
        for byte in s.bytes() {
            self.write_byte(byte)?;
        }
        Ok(())
    }

    pub fn write_line(&mut self, s: &str) -> Result<(), W::Error> {
        self.write_str(s)?;
        self.write_str("\r\n")
    }

    // Debug helper - print hex value
    pub fn write_hex(&mut self, val: u8) -> Result<(), W::Error> {
        const HEX_CHARS: [u8; 16] = *b"0123456789ABCDEF";
        self.write_byte(HEX_CHARS[(val >> 4) as usize])?;
        self.write_byte(HEX_CHARS[(val & 0xF) as usize])
    }

    // Print formatted debug info
    pub fn debug(&mut self, msg: &str, val: u8) -> Result<(), W::Error> {
        self.write_str("[DBG] ")?;
        self.write_str(msg)?;
        self.write_str(": 0x")?;
        self.write_hex(val)?;
        self.write_str("\r\n")
    }

    pub fn flush(&mut self) -> Result<(), W::Error> {
        nb::block!(self.serial.flush())
    }

    pub fn release(self) -> W {
        self.serial
    }
}

impl<W: serial::Write<u8>> ufmt::uWrite for SerialConsole<W> {
    type Error = W::Error;

    fn write_str(&mut self, s: &str) -> Result<(), Self::Error> {
        SerialConsole::write_str(self, s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtos::SchedulerError;
    use embedded_hal_mock::serial::{Mock as SerialMock, Transaction as SerialTransaction};

    #[test]
    fn write_line_appends_crlf() {
        let expectations = [SerialTransaction::write_many(b"ready\r\n")];
        let mut console = SerialConsole::new(SerialMock::new(&expectations));

        console.write_line("ready").unwrap();

        console.release().done();
    }

    #[test]
    fn debug_prints_hex() {
        let expectations = [SerialTransaction::write_many(b"[DBG] slot: 0x2A\r\n")];
        let mut console = SerialConsole::new(SerialMock::new(&expectations));

        console.debug("slot", 0x2A).unwrap();

        console.release().done();
    }

    #[test]
    fn ufmt_formatting() {
        let expectations = [
            SerialTransaction::write_many(b"3 tasks, 120 ticks\r\n"),
            SerialTransaction::flush(),
        ];
        let mut console = SerialConsole::new(SerialMock::new(&expectations));

        ufmt::uwrite!(console, "{} tasks, {} ticks\r\n", 3u8, 120u32).unwrap();
        console.flush().unwrap();

        console.release().done();
    }

    #[test]
    fn scheduler_errors_render() {
        let expectations = [SerialTransaction::write_many(b"add failed: task table full")];
        let mut console = SerialConsole::new(SerialMock::new(&expectations));

        ufmt::uwrite!(console, "add failed: {}", SchedulerError::Full).unwrap();

        console.release().done();
    }
}
