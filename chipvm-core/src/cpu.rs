use std::fmt;

use log::{trace, warn};

use crate::{ExecutionError, InstructionTable, Machine};

/// Diagnostic raised when no dispatch rule accepts an instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownOpcode {
    pub opcode: u16,
    pub address: u16,
}

impl fmt::Display for UnknownOpcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown opcode {:#06X} at {:#06X}",
            self.opcode, self.address
        )
    }
}

/// Receives diagnostics the engine recovers from.
pub trait Observer {
    fn unknown_opcode(&mut self, event: UnknownOpcode);
}

/// Forwards diagnostics to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl Observer for LogObserver {
    fn unknown_opcode(&mut self, event: UnknownOpcode) {
        warn!("{event}, skipped");
    }
}

impl Observer for Vec<UnknownOpcode> {
    fn unknown_opcode(&mut self, event: UnknownOpcode) {
        self.push(event);
    }
}

impl<O: Observer + ?Sized> Observer for &mut O {
    fn unknown_opcode(&mut self, event: UnknownOpcode) {
        (**self).unknown_opcode(event);
    }
}

/// The fetch-decode-execute engine.
///
/// Holds nothing but a borrowed rule table and the diagnostic sink; all
/// architectural state is in the [`Machine`] passed to [`Cpu::step`].
pub struct Cpu<'t, O: Observer = LogObserver> {
    table: &'t InstructionTable,
    observer: O,
}

impl<'t, O: Observer> Cpu<'t, O> {
    pub fn new(table: &'t InstructionTable, observer: O) -> Self {
        Self { table, observer }
    }

    pub fn table(&self) -> &'t InstructionTable {
        self.table
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    pub fn into_observer(self) -> O {
        self.observer
    }

    /// Executes the instruction at the program counter.
    ///
    /// An unmatched word is reported to the observer and skipped. Errors
    /// leave the machine as it was before the call.
    pub fn step(&mut self, machine: &mut Machine) -> Result<(), ExecutionError> {
        let opcode = machine.fetch()?;

        match self.table.decode(opcode) {
            Some(instruction) => {
                trace!(
                    "{:#06X}: {} {}",
                    machine.program_counter,
                    opcode,
                    instruction.name
                );
                instruction.execute(machine, opcode)
            }
            None => {
                self.observer.unknown_opcode(UnknownOpcode {
                    opcode: opcode.word(),
                    address: machine.program_counter,
                });
                machine.advance();
                Ok(())
            }
        }
    }
}

impl<'t> Cpu<'t, LogObserver> {
    pub fn with_log(table: &'t InstructionTable) -> Self {
        Self::new(table, LogObserver)
    }
}
