use chipvm_core::{Cpu, InstructionTable, Machine, MachineConfig, UnknownOpcode};
use proptest::prelude::*;

const VF: usize = 0xF;

fn step(machine: &mut Machine, word: u16) -> Vec<UnknownOpcode> {
    let pc = machine.program_counter as usize;
    machine.memory[pc..pc + 2].copy_from_slice(&word.to_be_bytes());
    let table = InstructionTable::chip8();
    let mut cpu = Cpu::new(&table, Vec::new());
    cpu.step(machine).unwrap();
    cpu.into_observer()
}

fn arithmetic(x: usize, y: usize, low_nibble: u16) -> u16 {
    0x8000 | (x as u16) << 8 | (y as u16) << 4 | low_nibble
}

/// Two distinct general-purpose registers, neither of them VF.
fn register_pair() -> impl Strategy<Value = (usize, usize)> {
    (0usize..15, 0usize..15).prop_filter("distinct registers", |(x, y)| x != y)
}

proptest! {
    #[test]
    fn add_wraps_and_flags_carry(a in any::<u8>(), b in any::<u8>(), (x, y) in register_pair()) {
        let mut machine = Machine::default();
        machine.registers[x] = a;
        machine.registers[y] = b;

        step(&mut machine, arithmetic(x, y, 0x4));

        let sum = a as u16 + b as u16;
        prop_assert_eq!(machine.registers[x], (sum % 256) as u8);
        prop_assert_eq!(machine.registers[VF], (sum > 255) as u8);
        prop_assert_eq!(machine.registers[y], b);
    }

    #[test]
    fn sub_flags_no_borrow(a in any::<u8>(), b in any::<u8>(), (x, y) in register_pair()) {
        let mut machine = Machine::default();
        machine.registers[x] = a;
        machine.registers[y] = b;

        step(&mut machine, arithmetic(x, y, 0x5));

        prop_assert_eq!(machine.registers[x], a.wrapping_sub(b));
        prop_assert_eq!(machine.registers[VF], (a >= b) as u8);
    }

    #[test]
    fn subn_flags_no_borrow(a in any::<u8>(), b in any::<u8>(), (x, y) in register_pair()) {
        let mut machine = Machine::default();
        machine.registers[x] = a;
        machine.registers[y] = b;

        step(&mut machine, arithmetic(x, y, 0x7));

        prop_assert_eq!(machine.registers[x], b.wrapping_sub(a));
        prop_assert_eq!(machine.registers[VF], (b >= a) as u8);
    }

    #[test]
    fn shifts_flag_the_lost_bit(a in any::<u8>(), x in 0usize..15) {
        let mut machine = Machine::default();
        machine.registers[x] = a;
        step(&mut machine, arithmetic(x, 0, 0x6));
        prop_assert_eq!(machine.registers[x], a >> 1);
        prop_assert_eq!(machine.registers[VF], a & 1);

        machine.registers[x] = a;
        step(&mut machine, arithmetic(x, 0, 0xE));
        prop_assert_eq!(machine.registers[x], a << 1);
        prop_assert_eq!(machine.registers[VF], a >> 7);
    }

    #[test]
    fn add_byte_never_touches_flag(a in any::<u8>(), kk in any::<u8>(), flag in any::<u8>(), x in 0usize..15) {
        let mut machine = Machine::default();
        machine.registers[x] = a;
        machine.registers[VF] = flag;

        step(&mut machine, 0x7000 | (x as u16) << 8 | kk as u16);

        prop_assert_eq!(machine.registers[x], a.wrapping_add(kk));
        prop_assert_eq!(machine.registers[VF], flag);
    }

    #[test]
    fn skips_move_by_two_or_four(
        value in any::<u8>(),
        kk in any::<u8>(),
        x in 0usize..16,
        noise in any::<[u8; 16]>(),
    ) {
        for (high, taken) in [(0x3000u16, value == kk), (0x4000, value != kk)] {
            let mut machine = Machine::default();
            machine.registers = noise;
            machine.registers[x] = value;

            step(&mut machine, high | (x as u16) << 8 | kk as u16);

            let expected = if taken { 0x204 } else { 0x202 };
            prop_assert_eq!(machine.program_counter, expected);
        }
    }

    #[test]
    fn call_and_ret_are_symmetric(target in 0x000u16..0x800, origin in (0x100u16..0x7FF).prop_map(|pc| pc & !1), depth in 0u8..16) {
        prop_assume!(target != origin && target != origin + 1);
        let mut machine = Machine::default();
        machine.program_counter = origin;
        machine.stack_pointer = depth;

        step(&mut machine, 0x2000 | target);
        prop_assert_eq!(machine.program_counter, target);
        prop_assert_eq!(machine.stack_pointer, depth + 1);

        step(&mut machine, 0x00EE);
        prop_assert_eq!(machine.program_counter, origin + 2);
        prop_assert_eq!(machine.stack_pointer, depth);
    }

    #[test]
    fn oversize_images_leave_state_untouched(extra in 1usize..64, seed in any::<u8>()) {
        let config = MachineConfig { memory_size: 1024, load_offset: 0x200 };
        let mut machine = Machine::new(config);
        machine.load_program(&[seed; 16]).unwrap();
        machine.registers[2] = seed;
        machine.program_counter = 0x208;
        let before = machine.clone();

        let image = vec![seed; config.available() + extra];
        prop_assert!(machine.load_program(&image).is_err());
        prop_assert_eq!(machine, before);
    }

    #[test]
    fn unknown_words_only_advance(x in 0usize..16, y in 0usize..16, low in 1u16..16) {
        let mut machine = Machine::default();
        let word = 0x5000 | (x as u16) << 8 | (y as u16) << 4 | low;

        let events = step(&mut machine, word);

        prop_assert_eq!(machine.program_counter, 0x202);
        prop_assert_eq!(events, vec![UnknownOpcode { opcode: word, address: 0x200 }]);
    }
}
