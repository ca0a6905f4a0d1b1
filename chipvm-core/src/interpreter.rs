use std::{
    thread,
    time::{Duration, Instant},
};

use log::debug;

use crate::{Cpu, ExecutionError, Machine, Observer};

pub const TIMER_FREQUENCY: f64 = 60.;

struct Timer {
    interval: Duration,
    last_tick: Instant,
}

impl Timer {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_tick: Instant::now(),
        }
    }

    fn tick(&mut self) -> bool {
        if self.last_tick.elapsed() >= self.interval {
            self.last_tick += self.interval;
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The configured number of cycles ran.
    CycleLimit,
    /// An instruction left the program counter and stack pointer where they
    /// were, so every further step would repeat it.
    Halted { address: u16 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: u64,
    pub stop_reason: StopReason,
}

/// Reference driving loop: steps the CPU at `max_clock_speed` instructions
/// per second and counts the timers down at 60 Hz.
///
/// A clock speed of 0 runs unthrottled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interpreter {
    pub max_clock_speed: u32,
    pub max_cycles: Option<u64>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self {
            max_clock_speed: 700,
            max_cycles: None,
        }
    }
}

impl Interpreter {
    pub fn new(max_clock_speed: u32) -> Self {
        Self {
            max_clock_speed,
            max_cycles: None,
        }
    }

    pub fn with_cycle_limit(mut self, max_cycles: u64) -> Self {
        self.max_cycles = Some(max_cycles);
        self
    }

    pub fn run<O: Observer>(
        &self,
        cpu: &mut Cpu<'_, O>,
        machine: &mut Machine,
    ) -> Result<RunSummary, ExecutionError> {
        let cpu_frame_time = (self.max_clock_speed > 0)
            .then(|| Duration::from_secs_f64(1. / self.max_clock_speed as f64));
        let mut next_cpu_frame = Instant::now();
        let mut timer = Timer::new(Duration::from_secs_f64(1. / TIMER_FREQUENCY));
        let mut cycles = 0;

        loop {
            if self.max_cycles.is_some_and(|limit| cycles >= limit) {
                return Ok(RunSummary {
                    cycles,
                    stop_reason: StopReason::CycleLimit,
                });
            }

            let address = machine.program_counter;
            let stack_pointer = machine.stack_pointer;
            cpu.step(machine)?;
            cycles += 1;

            if machine.program_counter == address && machine.stack_pointer == stack_pointer {
                debug!("halted at {address:#06X} after {cycles} cycles");
                return Ok(RunSummary {
                    cycles,
                    stop_reason: StopReason::Halted { address },
                });
            }

            if timer.tick() {
                machine.tick_timers();
            }

            if let Some(frame_time) = cpu_frame_time {
                next_cpu_frame += frame_time;
                if let Some(time_left) = next_cpu_frame.checked_duration_since(Instant::now()) {
                    thread::sleep(time_left);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InstructionTable, UnknownOpcode};

    fn load(words: &[u16]) -> Machine {
        let program: Vec<u8> = words.iter().flat_map(|word| word.to_be_bytes()).collect();
        let mut machine = Machine::default();
        machine.load_program(&program).unwrap();
        machine
    }

    #[test]
    fn stops_on_jump_to_self() {
        let table = InstructionTable::chip8();
        let mut cpu = Cpu::new(&table, Vec::<UnknownOpcode>::new());
        // countdown from 3, then park on a jump to self
        let mut machine = load(&[0x6003, 0x70FF, 0x3000, 0x1202, 0x1208]);

        let summary = Interpreter::new(0).run(&mut cpu, &mut machine).unwrap();

        assert_eq!(
            summary,
            RunSummary {
                cycles: 10,
                stop_reason: StopReason::Halted { address: 0x208 }
            }
        );
        assert_eq!(machine.registers[0], 0);
    }

    #[test]
    fn stops_at_cycle_limit() {
        let table = InstructionTable::chip8();
        let mut cpu = Cpu::new(&table, Vec::<UnknownOpcode>::new());
        let mut machine = load(&[0x7001, 0x1200]);

        let summary = Interpreter::new(0)
            .with_cycle_limit(10)
            .run(&mut cpu, &mut machine)
            .unwrap();

        assert_eq!(summary.stop_reason, StopReason::CycleLimit);
        assert_eq!(summary.cycles, 10);
        assert_eq!(machine.registers[0], 5);
    }

    #[test]
    fn propagates_stack_overflow() {
        let table = InstructionTable::chip8();
        let mut cpu = Cpu::new(&table, Vec::<UnknownOpcode>::new());
        // Unbounded recursion: 0x200 calls itself.
        let mut machine = load(&[0x2200]);

        let error = Interpreter::new(0)
            .with_cycle_limit(100)
            .run(&mut cpu, &mut machine)
            .unwrap_err();

        assert_eq!(error, ExecutionError::StackOverflow { address: 0x200 });
        assert_eq!(machine.stack_pointer, 16);
    }

    #[test]
    fn empty_stack_ret_halts() {
        let table = InstructionTable::chip8();
        let mut cpu = Cpu::new(&table, Vec::<UnknownOpcode>::new());
        let mut machine = load(&[0x00EE]);

        let summary = Interpreter::new(0).run(&mut cpu, &mut machine).unwrap();

        assert_eq!(summary.stop_reason, StopReason::Halted { address: 0x200 });
    }

    #[test]
    fn unknown_opcodes_do_not_stop_the_loop() {
        let table = InstructionTable::chip8();
        let mut cpu = Cpu::new(&table, Vec::<UnknownOpcode>::new());
        let mut machine = load(&[0xFFFF, 0x6105, 0x1204]);

        let summary = Interpreter::new(0).run(&mut cpu, &mut machine).unwrap();

        assert_eq!(summary.cycles, 3);
        assert_eq!(machine.registers[1], 5);
        assert_eq!(cpu.observer().len(), 1);
    }
}
