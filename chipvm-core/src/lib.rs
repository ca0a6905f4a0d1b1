//! CHIP-8 virtual machine core.
//!
//! [`Machine`] holds the architectural state, [`InstructionTable`] the ordered
//! mask/pattern rules, and [`Cpu`] steps one against the other. Everything a
//! host needs to draw, beep or read keys is public state on [`Machine`].

pub mod cpu;
pub mod decode;
mod error;
mod handlers;
pub mod interpreter;
pub mod machine;

pub use cpu::{Cpu, LogObserver, Observer, UnknownOpcode};
pub use decode::{Instruction, InstructionTable, Opcode};
pub use error::{ExecutionError, LoadError};
pub use interpreter::{Interpreter, RunSummary, StopReason};
pub use machine::{Machine, MachineConfig};
