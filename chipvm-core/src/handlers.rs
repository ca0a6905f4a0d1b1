//! Execution semantics for each dispatch rule.
//!
//! Every handler advances the program counter itself. Handlers that write
//! VF read their operands into locals first and commit through
//! [`Machine::commit`], so `x == 0xF` or `y == 0xF` never sees a half-updated
//! register file.

use chipvm_macros::opcode;
use log::debug;
use rand::{thread_rng, Rng};

use crate::{machine::REGISTER_COUNT, ExecutionError, Machine};

//0nnn: ignored
#[opcode]
pub(crate) fn sys(machine: &mut Machine) -> Result<(), ExecutionError> {
    machine.advance();
    Ok(())
}

//00EE
#[opcode]
pub(crate) fn ret(machine: &mut Machine) -> Result<(), ExecutionError> {
    match machine.pop() {
        Some(return_address) => machine.jump(return_address),
        None => debug!(
            "RET with an empty call stack at {:#06X} ignored",
            machine.program_counter
        ),
    }
    Ok(())
}

//1nnn
#[opcode]
pub(crate) fn jump(machine: &mut Machine, #[nnn] address: u16) -> Result<(), ExecutionError> {
    machine.jump(address);
    Ok(())
}

//2nnn
#[opcode]
pub(crate) fn call(machine: &mut Machine, #[nnn] address: u16) -> Result<(), ExecutionError> {
    machine.push(machine.program_counter.wrapping_add(2))?;
    machine.jump(address);
    Ok(())
}

//3xkk
#[opcode]
pub(crate) fn skip_eq_byte(
    machine: &mut Machine,
    #[x] x: usize,
    #[kk] kk: u8,
) -> Result<(), ExecutionError> {
    machine.skip_if(machine.register(x) == kk);
    Ok(())
}

//4xkk
#[opcode]
pub(crate) fn skip_ne_byte(
    machine: &mut Machine,
    #[x] x: usize,
    #[kk] kk: u8,
) -> Result<(), ExecutionError> {
    machine.skip_if(machine.register(x) != kk);
    Ok(())
}

//5xy0
#[opcode]
pub(crate) fn skip_eq_register(
    machine: &mut Machine,
    #[x] x: usize,
    #[y] y: usize,
) -> Result<(), ExecutionError> {
    machine.skip_if(machine.register(x) == machine.register(y));
    Ok(())
}

//6xkk
#[opcode]
pub(crate) fn load_byte(
    machine: &mut Machine,
    #[x] x: usize,
    #[kk] kk: u8,
) -> Result<(), ExecutionError> {
    *machine.register_mut(x) = kk;
    machine.advance();
    Ok(())
}

//7xkk: no carry flag
#[opcode]
pub(crate) fn add_byte(
    machine: &mut Machine,
    #[x] x: usize,
    #[kk] kk: u8,
) -> Result<(), ExecutionError> {
    *machine.register_mut(x) = machine.register(x).wrapping_add(kk);
    machine.advance();
    Ok(())
}

//8xy0
#[opcode]
pub(crate) fn load_register(
    machine: &mut Machine,
    #[x] x: usize,
    #[y] y: usize,
) -> Result<(), ExecutionError> {
    *machine.register_mut(x) = machine.register(y);
    machine.advance();
    Ok(())
}

//8xy1
#[opcode]
pub(crate) fn or(machine: &mut Machine, #[x] x: usize, #[y] y: usize) -> Result<(), ExecutionError> {
    *machine.register_mut(x) |= machine.register(y);
    machine.advance();
    Ok(())
}

//8xy2
#[opcode]
pub(crate) fn and(machine: &mut Machine, #[x] x: usize, #[y] y: usize) -> Result<(), ExecutionError> {
    *machine.register_mut(x) &= machine.register(y);
    machine.advance();
    Ok(())
}

//8xy3
#[opcode]
pub(crate) fn xor(machine: &mut Machine, #[x] x: usize, #[y] y: usize) -> Result<(), ExecutionError> {
    *machine.register_mut(x) ^= machine.register(y);
    machine.advance();
    Ok(())
}

//8xy4: VF = carry
#[opcode]
pub(crate) fn add_register(
    machine: &mut Machine,
    #[x] x: usize,
    #[y] y: usize,
) -> Result<(), ExecutionError> {
    let (vx, vy) = (machine.register(x), machine.register(y));
    let (sum, carry) = vx.overflowing_add(vy);
    machine.commit(x, sum, carry);
    machine.advance();
    Ok(())
}

//8xy5: VF = no borrow
#[opcode]
pub(crate) fn sub(machine: &mut Machine, #[x] x: usize, #[y] y: usize) -> Result<(), ExecutionError> {
    let (vx, vy) = (machine.register(x), machine.register(y));
    machine.commit(x, vx.wrapping_sub(vy), vx >= vy);
    machine.advance();
    Ok(())
}

//8xy6: VF = bit shifted out, y ignored
#[opcode]
pub(crate) fn shift_right(machine: &mut Machine, #[x] x: usize) -> Result<(), ExecutionError> {
    let vx = machine.register(x);
    machine.commit(x, vx >> 1, vx & 0x01 == 0x01);
    machine.advance();
    Ok(())
}

//8xy7: VF = no borrow
#[opcode]
pub(crate) fn sub_reversed(
    machine: &mut Machine,
    #[x] x: usize,
    #[y] y: usize,
) -> Result<(), ExecutionError> {
    let (vx, vy) = (machine.register(x), machine.register(y));
    machine.commit(x, vy.wrapping_sub(vx), vy >= vx);
    machine.advance();
    Ok(())
}

//8xyE: VF = bit shifted out, y ignored
#[opcode]
pub(crate) fn shift_left(machine: &mut Machine, #[x] x: usize) -> Result<(), ExecutionError> {
    let vx = machine.register(x);
    machine.commit(x, vx << 1, vx & 0x80 == 0x80);
    machine.advance();
    Ok(())
}

//9xy0
#[opcode]
pub(crate) fn skip_ne_register(
    machine: &mut Machine,
    #[x] x: usize,
    #[y] y: usize,
) -> Result<(), ExecutionError> {
    machine.skip_if(machine.register(x) != machine.register(y));
    Ok(())
}

//Annn
#[opcode]
pub(crate) fn load_index(machine: &mut Machine, #[nnn] address: u16) -> Result<(), ExecutionError> {
    machine.index_register = address;
    machine.advance();
    Ok(())
}

//Bnnn
#[opcode]
pub(crate) fn jump_offset(machine: &mut Machine, #[nnn] address: u16) -> Result<(), ExecutionError> {
    machine.jump(address.wrapping_add(machine.register(0x0) as u16));
    Ok(())
}

//Cxkk
#[opcode]
pub(crate) fn random(machine: &mut Machine, #[x] x: usize, #[kk] kk: u8) -> Result<(), ExecutionError> {
    *machine.register_mut(x) = thread_rng().gen::<u8>() & kk;
    machine.advance();
    Ok(())
}

//Fx07
#[opcode]
pub(crate) fn read_delay_timer(machine: &mut Machine, #[x] x: usize) -> Result<(), ExecutionError> {
    *machine.register_mut(x) = machine.delay_timer;
    machine.advance();
    Ok(())
}

//Fx15
#[opcode]
pub(crate) fn set_delay_timer(machine: &mut Machine, #[x] x: usize) -> Result<(), ExecutionError> {
    machine.delay_timer = machine.register(x);
    machine.advance();
    Ok(())
}

//Fx18
#[opcode]
pub(crate) fn set_sound_timer(machine: &mut Machine, #[x] x: usize) -> Result<(), ExecutionError> {
    machine.sound_timer = machine.register(x);
    machine.advance();
    Ok(())
}

//Fx1E: VF untouched
#[opcode]
pub(crate) fn add_index(machine: &mut Machine, #[x] x: usize) -> Result<(), ExecutionError> {
    machine.index_register = machine
        .index_register
        .wrapping_add(machine.register(x) as u16);
    machine.advance();
    Ok(())
}

//Fx33
#[opcode]
pub(crate) fn store_bcd(machine: &mut Machine, #[x] x: usize) -> Result<(), ExecutionError> {
    let value = machine.register(x);
    let digits = [value / 100, value / 10 % 10, value % 10];
    machine.write(machine.index_register, &digits)?;
    machine.advance();
    Ok(())
}

//Fx55: I is left unchanged
#[opcode]
pub(crate) fn store_registers(machine: &mut Machine, #[x] x: usize) -> Result<(), ExecutionError> {
    let registers = machine.registers;
    machine.write(machine.index_register, &registers[..=x])?;
    machine.advance();
    Ok(())
}

//Fx65: I is left unchanged
#[opcode]
pub(crate) fn load_registers(machine: &mut Machine, #[x] x: usize) -> Result<(), ExecutionError> {
    let mut loaded = [0; REGISTER_COUNT];
    loaded[..=x].copy_from_slice(machine.read(machine.index_register, x + 1)?);
    machine.registers[..=x].copy_from_slice(&loaded[..=x]);
    machine.advance();
    Ok(())
}
