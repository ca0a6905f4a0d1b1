use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use chipvm_core::{
    Cpu, InstructionTable, Interpreter, LogObserver, Machine, MachineConfig, Observer,
    StopReason, UnknownOpcode,
};
use clap::Parser;
use log::{info, LevelFilter};

/// Run a CHIP-8 program image without display, keypad or sound.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Program image to load.
    rom: PathBuf,

    /// Instructions per second; 0 runs as fast as possible.
    #[arg(long, default_value_t = 700)]
    clock_hz: u32,

    /// Stop after this many instructions.
    #[arg(long)]
    cycles: Option<u64>,

    /// Bytes of emulated memory.
    #[arg(long, default_value_t = chipvm_core::machine::DEFAULT_MEMORY_SIZE)]
    memory_size: usize,

    /// Address the image is loaded at (decimal or 0x-prefixed hex).
    #[arg(long, default_value = "0x200", value_parser = parse_address)]
    load_offset: u16,

    /// Log every executed instruction.
    #[arg(long)]
    trace: bool,
}

fn parse_address(value: &str) -> Result<u16, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|error| format!("invalid address `{value}`: {error}"))
}

/// Logs unknown opcodes and keeps a count for the final report.
#[derive(Default)]
struct Tally {
    log: LogObserver,
    unknown: usize,
}

impl Observer for Tally {
    fn unknown_opcode(&mut self, event: UnknownOpcode) {
        self.unknown += 1;
        self.log.unknown_opcode(event);
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if args.trace {
        logger.filter_level(LevelFilter::Trace);
    }
    logger.init();

    let program = fs::read(&args.rom)
        .with_context(|| format!("could not read program image {}", args.rom.display()))?;

    let mut machine = Machine::new(MachineConfig {
        memory_size: args.memory_size,
        load_offset: args.load_offset,
    });
    machine
        .load_program(&program)
        .with_context(|| format!("could not load {}", args.rom.display()))?;
    info!(
        "loaded {} bytes at {:#06X}",
        program.len(),
        args.load_offset
    );

    let table = InstructionTable::chip8();
    let mut cpu = Cpu::new(&table, Tally::default());
    let mut interpreter = Interpreter::new(args.clock_hz);
    interpreter.max_cycles = args.cycles;

    let outcome = interpreter.run(&mut cpu, &mut machine);
    print_state(&machine, cpu.observer().unknown);

    let summary = outcome.context("execution stopped")?;
    match summary.stop_reason {
        StopReason::CycleLimit => info!("stopped after {} cycles", summary.cycles),
        StopReason::Halted { address } => {
            info!("halted at {address:#06X} after {} cycles", summary.cycles)
        }
    }

    Ok(())
}

fn print_state(machine: &Machine, unknown: usize) {
    for (index, row) in machine.registers.chunks(4).enumerate() {
        let line: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(offset, value)| format!("V{:X}={value:#04X}", index * 4 + offset))
            .collect();
        println!("{}", line.join(" "));
    }
    println!(
        "PC={:#06X} I={:#06X} SP={} DT={} ST={}",
        machine.program_counter,
        machine.index_register,
        machine.stack_pointer,
        machine.delay_timer,
        machine.sound_timer
    );
    println!("unknown opcodes: {unknown}");
}
