use thiserror::Error;

/// Failure to install a program image.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LoadError {
    #[error("program is {size} bytes but only {available} bytes fit above the load offset")]
    ProgramTooLarge { size: usize, available: usize },
}

/// Conditions that stop a single `step` from completing.
///
/// The machine is left exactly as it was before the failing step.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("call stack overflow: CALL at {address:#06X} with all 16 slots in use")]
    StackOverflow { address: u16 },
    #[error("program counter {pc:#06X} does not address a full instruction")]
    ProgramCounterOutOfBounds { pc: u16 },
    #[error("memory access of {len} bytes at {address:#06X} runs past the end of memory")]
    MemoryOutOfBounds { address: u16, len: usize },
}
