use std::ops::Range;

use crate::{decode::Opcode, ExecutionError, LoadError};

pub const REGISTER_COUNT: usize = 16;
pub const STACK_DEPTH: usize = 16;
pub const FLAG_REGISTER: usize = 0xF;

pub const DEFAULT_MEMORY_SIZE: usize = 4096;
pub const DEFAULT_LOAD_OFFSET: u16 = 0x200;

/// Parameters fixed for the lifetime of a [`Machine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineConfig {
    pub memory_size: usize,
    pub load_offset: u16,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            memory_size: DEFAULT_MEMORY_SIZE,
            load_offset: DEFAULT_LOAD_OFFSET,
        }
    }
}

impl MachineConfig {
    /// Bytes available to a program image.
    pub fn available(&self) -> usize {
        self.memory_size.saturating_sub(self.load_offset as usize)
    }
}

/// Architectural state of a CHIP-8 machine.
///
/// Fields are public so display, keypad and audio collaborators can read
/// and write them directly; only the configuration is fixed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Machine {
    pub memory: Vec<u8>,
    pub registers: [u8; REGISTER_COUNT],
    pub stack: [u16; STACK_DEPTH],
    pub stack_pointer: u8,
    pub program_counter: u16,
    pub index_register: u16,
    pub delay_timer: u8,
    pub sound_timer: u8,
    config: MachineConfig,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new(MachineConfig::default())
    }
}

impl Machine {
    pub fn new(config: MachineConfig) -> Self {
        Self {
            memory: vec![0; config.memory_size],
            registers: [0; REGISTER_COUNT],
            stack: [0; STACK_DEPTH],
            stack_pointer: 0,
            program_counter: config.load_offset,
            index_register: 0,
            delay_timer: 0,
            sound_timer: 0,
            config,
        }
    }

    pub fn config(&self) -> MachineConfig {
        self.config
    }

    /// Resets the machine and copies `program` to the load offset.
    ///
    /// Nothing is touched when the image does not fit.
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), LoadError> {
        let available = self.config.available();
        if program.len() > available {
            return Err(LoadError::ProgramTooLarge {
                size: program.len(),
                available,
            });
        }

        self.reset();

        if !program.is_empty() {
            let start = self.config.load_offset as usize;
            self.memory[start..start + program.len()].copy_from_slice(program);
        }
        Ok(())
    }

    pub fn reset(&mut self) {
        self.memory.clear();
        self.memory.resize(self.config.memory_size, 0);
        self.registers = [0; REGISTER_COUNT];
        self.stack = [0; STACK_DEPTH];
        self.stack_pointer = 0;
        self.program_counter = self.config.load_offset;
        self.index_register = 0;
        self.delay_timer = 0;
        self.sound_timer = 0;
    }

    /// Reads the big-endian instruction word at the program counter.
    pub fn fetch(&self) -> Result<Opcode, ExecutionError> {
        let pc = self.program_counter as usize;
        match self.memory.get(pc..pc + 2) {
            Some(&[high, low]) => Ok(Opcode::from_bytes(high, low)),
            _ => Err(ExecutionError::ProgramCounterOutOfBounds {
                pc: self.program_counter,
            }),
        }
    }

    pub fn register(&self, register_index: usize) -> u8 {
        self.registers[register_index]
    }

    pub fn register_mut(&mut self, register_index: usize) -> &mut u8 {
        &mut self.registers[register_index]
    }

    pub fn set_flag(&mut self, flag: bool) {
        *self.register_mut(FLAG_REGISTER) = flag as u8;
    }

    /// Writes an arithmetic result and then its flag.
    ///
    /// Both values must already be computed from the operands as they were
    /// before the instruction. With `register_index == 0xF` the flag is what
    /// remains in VF.
    pub fn commit(&mut self, register_index: usize, value: u8, flag: bool) {
        *self.register_mut(register_index) = value;
        self.set_flag(flag);
    }

    pub fn advance(&mut self) {
        self.program_counter = self.program_counter.wrapping_add(2);
    }

    /// Moves past the next instruction when `condition` holds, otherwise
    /// just past this one.
    pub fn skip_if(&mut self, condition: bool) {
        let delta = if condition { 4 } else { 2 };
        self.program_counter = self.program_counter.wrapping_add(delta);
    }

    pub fn jump(&mut self, address: u16) {
        self.program_counter = address;
    }

    pub fn push(&mut self, return_address: u16) -> Result<(), ExecutionError> {
        let slot = self.stack_pointer as usize;
        if slot >= STACK_DEPTH {
            return Err(ExecutionError::StackOverflow {
                address: self.program_counter,
            });
        }
        self.stack[slot] = return_address;
        self.stack_pointer += 1;
        Ok(())
    }

    /// Pops a return address, or `None` when the stack is empty.
    pub fn pop(&mut self) -> Option<u16> {
        let slot = (self.stack_pointer as usize).checked_sub(1)?;
        self.stack_pointer -= 1;
        Some(self.stack[slot])
    }

    pub fn read(&self, address: u16, len: usize) -> Result<&[u8], ExecutionError> {
        let range = self.span(address, len)?;
        Ok(&self.memory[range])
    }

    pub fn write(&mut self, address: u16, bytes: &[u8]) -> Result<(), ExecutionError> {
        let range = self.span(address, bytes.len())?;
        self.memory[range].copy_from_slice(bytes);
        Ok(())
    }

    /// One 60 Hz tick: each non-zero timer counts down by one.
    pub fn tick_timers(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }

    fn span(&self, address: u16, len: usize) -> Result<Range<usize>, ExecutionError> {
        let start = address as usize;
        let end = start + len;
        if end > self.memory.len() {
            return Err(ExecutionError::MemoryOutOfBounds { address, len });
        }
        Ok(start..end)
    }
}
