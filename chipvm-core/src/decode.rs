use std::fmt;

use crate::{handlers, ExecutionError, Machine};

/// A 16-bit instruction word with its operand fields.
///
/// Nibbles are numbered from the most significant: `x` is nibble 1, `y` is
/// nibble 2, `n` is nibble 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Opcode(u16);

impl Opcode {
    pub const fn new(word: u16) -> Self {
        Self(word)
    }

    pub const fn from_bytes(high: u8, low: u8) -> Self {
        Self(u16::from_be_bytes([high, low]))
    }

    pub const fn word(self) -> u16 {
        self.0
    }

    pub const fn x(self) -> usize {
        ((self.0 & 0x0F00) >> 8) as usize
    }

    pub const fn y(self) -> usize {
        ((self.0 & 0x00F0) >> 4) as usize
    }

    pub const fn n(self) -> u8 {
        (self.0 & 0x000F) as u8
    }

    pub const fn kk(self) -> u8 {
        (self.0 & 0x00FF) as u8
    }

    pub const fn nnn(self) -> u16 {
        self.0 & 0x0FFF
    }
}

impl From<u16> for Opcode {
    fn from(word: u16) -> Self {
        Self(word)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}", self.0)
    }
}

pub type Handler = fn(&mut Machine, Opcode) -> Result<(), ExecutionError>;

/// One mask/pattern dispatch rule.
#[derive(Clone, Copy)]
pub struct Instruction {
    pub name: &'static str,
    pub mask: u16,
    pub pattern: u16,
    pub handler: Handler,
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instruction")
            .field("name", &self.name)
            .field("mask", &format_args!("{:#06X}", self.mask))
            .field("pattern", &format_args!("{:#06X}", self.pattern))
            .finish_non_exhaustive()
    }
}

impl Instruction {
    pub const fn new(name: &'static str, mask: u16, pattern: u16, handler: Handler) -> Self {
        Self {
            name,
            mask,
            pattern,
            handler,
        }
    }

    pub fn matches(&self, opcode: Opcode) -> bool {
        opcode.word() & self.mask == self.pattern
    }

    pub fn execute(&self, machine: &mut Machine, opcode: Opcode) -> Result<(), ExecutionError> {
        (self.handler)(machine, opcode)
    }
}

/// Ordered rule list. The first matching rule wins, so exact matches must
/// come before the prefix rules that would also accept them.
#[derive(Debug, Clone)]
pub struct InstructionTable {
    instructions: Vec<Instruction>,
}

impl InstructionTable {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    /// The architectural CHIP-8 opcodes that need no display or keypad.
    pub fn chip8() -> Self {
        Self::new(vec![
            Instruction::new("RET", 0xFFFF, 0x00EE, handlers::ret),
            Instruction::new("SYS addr", 0xF000, 0x0000, handlers::sys),
            Instruction::new("JP addr", 0xF000, 0x1000, handlers::jump),
            Instruction::new("CALL addr", 0xF000, 0x2000, handlers::call),
            Instruction::new("SE Vx, byte", 0xF000, 0x3000, handlers::skip_eq_byte),
            Instruction::new("SNE Vx, byte", 0xF000, 0x4000, handlers::skip_ne_byte),
            Instruction::new("SE Vx, Vy", 0xF00F, 0x5000, handlers::skip_eq_register),
            Instruction::new("LD Vx, byte", 0xF000, 0x6000, handlers::load_byte),
            Instruction::new("ADD Vx, byte", 0xF000, 0x7000, handlers::add_byte),
            Instruction::new("LD Vx, Vy", 0xF00F, 0x8000, handlers::load_register),
            Instruction::new("OR Vx, Vy", 0xF00F, 0x8001, handlers::or),
            Instruction::new("AND Vx, Vy", 0xF00F, 0x8002, handlers::and),
            Instruction::new("XOR Vx, Vy", 0xF00F, 0x8003, handlers::xor),
            Instruction::new("ADD Vx, Vy", 0xF00F, 0x8004, handlers::add_register),
            Instruction::new("SUB Vx, Vy", 0xF00F, 0x8005, handlers::sub),
            Instruction::new("SHR Vx", 0xF00F, 0x8006, handlers::shift_right),
            Instruction::new("SUBN Vx, Vy", 0xF00F, 0x8007, handlers::sub_reversed),
            Instruction::new("SHL Vx", 0xF00F, 0x800E, handlers::shift_left),
            Instruction::new("SNE Vx, Vy", 0xF00F, 0x9000, handlers::skip_ne_register),
            Instruction::new("LD I, addr", 0xF000, 0xA000, handlers::load_index),
            Instruction::new("JP V0, addr", 0xF000, 0xB000, handlers::jump_offset),
            Instruction::new("RND Vx, byte", 0xF000, 0xC000, handlers::random),
            Instruction::new("LD Vx, DT", 0xF0FF, 0xF007, handlers::read_delay_timer),
            Instruction::new("LD DT, Vx", 0xF0FF, 0xF015, handlers::set_delay_timer),
            Instruction::new("LD ST, Vx", 0xF0FF, 0xF018, handlers::set_sound_timer),
            Instruction::new("ADD I, Vx", 0xF0FF, 0xF01E, handlers::add_index),
            Instruction::new("LD B, Vx", 0xF0FF, 0xF033, handlers::store_bcd),
            Instruction::new("LD [I], Vx", 0xF0FF, 0xF055, handlers::store_registers),
            Instruction::new("LD Vx, [I]", 0xF0FF, 0xF065, handlers::load_registers),
        ])
    }

    pub fn decode(&self, opcode: Opcode) -> Option<&Instruction> {
        self.instructions
            .iter()
            .find(|instruction| instruction.matches(opcode))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instruction> {
        self.instructions.iter()
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

impl Default for InstructionTable {
    fn default() -> Self {
        Self::chip8()
    }
}
