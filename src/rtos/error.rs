//! Scheduler error types

use core::fmt;

/// Result type for scheduler operations
pub type Result<T> = core::result::Result<T, SchedulerError>;

/// Errors returned by the task table
///
/// Both are ordinary return values; the scheduler never retries on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SchedulerError {
    /// No free slot is left, or no callback was supplied
    Full,
    /// The task ID is out of range or the slot is already free
    NotFound,
}

impl SchedulerError {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SchedulerError::Full => "task table full",
            SchedulerError::NotFound => "task not found",
        }
    }
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ufmt::uDisplay for SchedulerError {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> core::result::Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(format!("{}", SchedulerError::Full), "task table full");
        assert_eq!(format!("{}", SchedulerError::NotFound), "task not found");
    }
}
