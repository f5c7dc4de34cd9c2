#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,

    /// Invalid CLI/config input (bad flags, unreadable config file, config that fails validation).
    InvalidInput = 30,

    /// Internal/runtime error (bind failures, IO errors, a run that produced no result).
    RuntimeError = 40,
}

impl ExitCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}
