//! Instruction handlers and the table dispatching to them.

use log::trace;
use rand::Rng;

use crate::display::{Point, Resolution, ScrollDirection, Sprite};
use crate::error::{Result, VmError};
use crate::font;
use crate::instruction::{InstrKind, OperandMap};
use crate::quirks::Extension;
use crate::state::{FLAG_COUNT, PC_MASK, STACK_MAX_SIZE};
use crate::vm::Vm;

pub type Handler = fn(&mut Vm, OperandMap) -> Result<()>;

/// Handlers indexed by [`InstrKind`], for the kinds the active extension supports.
#[derive(Clone)]
pub struct InstrSet {
    handlers: [Option<Handler>; InstrKind::COUNT],
    ext: Extension,
}

impl InstrSet {
    pub fn new(ext: Extension) -> Self {
        let mut handlers: [Option<Handler>; InstrKind::COUNT] = [None; InstrKind::COUNT];

        for kind in InstrKind::CHIP8 {
            handlers[kind.index()] = Some(handler(kind));
        }
        if ext == Extension::Schip {
            for kind in InstrKind::SCHIP {
                handlers[kind.index()] = Some(handler(kind));
            }
        }

        Self { handlers, ext }
    }

    pub fn get(&self, kind: InstrKind) -> Option<Handler> {
        self.handlers[kind.index()]
    }

    pub fn contains(&self, kind: InstrKind) -> bool {
        self.get(kind).is_some()
    }

    pub fn extension(&self) -> Extension {
        self.ext
    }
}

fn handler(kind: InstrKind) -> Handler {
    match kind {
        InstrKind::ClearScreen => clear_screen,
        InstrKind::Ret => ret,
        InstrKind::Jump => jump,
        InstrKind::Call => call,
        InstrKind::SkipEqual => skip_equal,
        InstrKind::SkipNotEqual => skip_not_equal,
        InstrKind::SkipRegsEqual => skip_regs_equal,
        InstrKind::LoadByte => load_byte,
        InstrKind::Add => add,
        InstrKind::LoadReg => load_reg,
        InstrKind::Or => or,
        InstrKind::And => and,
        InstrKind::Xor => xor,
        InstrKind::AddReg => add_reg,
        InstrKind::SubReg => sub_reg,
        InstrKind::RShift => rshift,
        InstrKind::LoadAndSubReg => load_and_sub_reg,
        InstrKind::LShift => lshift,
        InstrKind::SkipRegsNotEqual => skip_regs_not_equal,
        InstrKind::LoadI => load_i,
        InstrKind::JumpOffset => jump_offset,
        InstrKind::Random => random,
        InstrKind::DrawSprite => draw_sprite,
        InstrKind::SkipPressed => skip_pressed,
        InstrKind::SkipNotPressed => skip_not_pressed,
        InstrKind::LoadDt => load_dt,
        InstrKind::ReadKey => read_key,
        InstrKind::SetDt => set_dt,
        InstrKind::SetSt => set_st,
        InstrKind::AddI => add_i,
        InstrKind::FontChar => font_char,
        InstrKind::Bcd => bcd,
        InstrKind::RegDump => reg_dump,
        InstrKind::RegLoad => reg_load,
        InstrKind::Hires => hires,
        InstrKind::Lores => lores,
        InstrKind::ScrollDown => scroll_down,
        InstrKind::ScrollRight => scroll_right,
        InstrKind::ScrollLeft => scroll_left,
        InstrKind::BigFontChar => big_font_char,
        InstrKind::SaveFlags => save_flags,
        InstrKind::LoadFlags => load_flags,
        InstrKind::Exit => exit,
    }
}

fn skip_if(vm: &mut Vm, cond: bool) {
    if cond {
        vm.state.pc = vm.state.pc.wrapping_add(2) & PC_MASK;
    }
}

fn clear_screen(vm: &mut Vm, _: OperandMap) -> Result<()> {
    vm.display.clear();
    Ok(())
}

fn ret(vm: &mut Vm, _: OperandMap) -> Result<()> {
    vm.state.pc = vm.state.stack.pop().ok_or(VmError::StackUnderflow)?;
    Ok(())
}

fn jump(vm: &mut Vm, ops: OperandMap) -> Result<()> {
    vm.state.pc = ops.addr;
    Ok(())
}

fn call(vm: &mut Vm, ops: OperandMap) -> Result<()> {
    if vm.state.stack.len() >= STACK_MAX_SIZE {
        return Err(VmError::StackOverflow);
    }

    vm.state.stack.push(vm.state.pc);
    vm.state.pc = ops.addr;
    Ok(())
}

fn skip_equal(vm: &mut Vm, ops: OperandMap) -> Result<()> {
    let cond = vm.state.regs[ops.x as usize] == ops.imm2;
    skip_if(vm, cond);
    Ok(())
}

fn skip_not_equal(vm: &mut Vm, ops: OperandMap) -> Result<()> {
    let cond = vm.state.regs[ops.x as usize] != ops.imm2;
    skip_if(vm, cond);
    Ok(())
}

fn skip_regs_equal(vm: &mut Vm, ops: OperandMap) -> Result<()> {
    let cond = vm.state.regs[ops.x as usize] == vm.state.regs[ops.y as usize];
    skip_if(vm, cond);
    Ok(())
}

fn skip_regs_not_equal(vm: &mut Vm, ops: OperandMap) -> Result<()> {
    let cond = vm.state.regs[ops.x as usize] != vm.state.regs[ops.y as usize];
    skip_if(vm, cond);
    Ok(())
}

fn load_byte(vm: &mut Vm, ops: OperandMap) -> Result<()> {
    vm.state.regs[ops.x as usize] = ops.imm2;
    Ok(())
}

fn add(vm: &mut Vm, ops: OperandMap) -> Result<()> {
    let vx = &mut vm.state.regs[ops.x as usize];
    *vx = vx.wrapping_add(ops.imm2);
    Ok(())
}

fn load_reg(vm: &mut Vm, ops: OperandMap) -> Result<()> {
    vm.state.regs[ops.x as usize] = vm.state.regs[ops.y as usize];
    Ok(())
}

fn bitwise(vm: &mut Vm, ops: OperandMap, op: fn(u8, u8) -> u8) {
    if vm.quirks().bitwise_reset_vf {
        *vm.state.vf() = 0;
    }

    let vy = vm.state.regs[ops.y as usize];
    let vx = &mut vm.state.regs[ops.x as usize];
    *vx = op(*vx, vy);
}

fn or(vm: &mut Vm, ops: OperandMap) -> Result<()> {
    bitwise(vm, ops, |a, b| a | b);
    Ok(())
}

fn and(vm: &mut Vm, ops: OperandMap) -> Result<()> {
    bitwise(vm, ops, |a, b| a & b);
    Ok(())
}

fn xor(vm: &mut Vm, ops: OperandMap) -> Result<()> {
    bitwise(vm, ops, |a, b| a ^ b);
    Ok(())
}

fn add_reg(vm: &mut Vm, ops: OperandMap) -> Result<()> {
    let vy = vm.state.regs[ops.y as usize];
    let vx = &mut vm.state.regs[ops.x as usize];
    let (sum, carry) = vx.overflowing_add(vy);
    *vx = sum;
    // VF last, so `8Fy4` ends with the flag
    *vm.state.vf() = carry as u8;
    Ok(())
}

fn sub_reg(vm: &mut Vm, ops: OperandMap) -> Result<()> {
    let vy = vm.state.regs[ops.y as usize];
    let vx = &mut vm.state.regs[ops.x as usize];
    let (diff, borrow) = vx.overflowing_sub(vy);
    *vx = diff;
    *vm.state.vf() = !borrow as u8;
    Ok(())
}

fn load_and_sub_reg(vm: &mut Vm, ops: OperandMap) -> Result<()> {
    let vy = vm.state.regs[ops.y as usize];
    let vx = &mut vm.state.regs[ops.x as usize];
    let (diff, borrow) = vy.overflowing_sub(*vx);
    *vx = diff;
    *vm.state.vf() = !borrow as u8;
    Ok(())
}

fn shift_source(vm: &mut Vm, ops: OperandMap) -> u8 {
    if vm.quirks().shift_set_vx_to_vy {
        vm.state.regs[ops.x as usize] = vm.state.regs[ops.y as usize];
    }
    vm.state.regs[ops.x as usize]
}

fn rshift(vm: &mut Vm, ops: OperandMap) -> Result<()> {
    let vx = shift_source(vm, ops);
    vm.state.regs[ops.x as usize] = vx >> 1;
    *vm.state.vf() = vx & 0x01;
    Ok(())
}

fn lshift(vm: &mut Vm, ops: OperandMap) -> Result<()> {
    let vx = shift_source(vm, ops);
    vm.state.regs[ops.x as usize] = vx << 1;
    *vm.state.vf() = vx >> 7;
    Ok(())
}

fn load_i(vm: &mut Vm, ops: OperandMap) -> Result<()> {
    vm.state.i = ops.imm3;
    Ok(())
}

fn jump_offset(vm: &mut Vm, ops: OperandMap) -> Result<()> {
    let reg = if vm.quirks().jump_offset_use_v0 { 0 } else { ops.x };
    let offset = vm.state.regs[reg as usize] as u16;
    vm.state.pc = (ops.addr + offset) & PC_MASK;
    Ok(())
}

fn random(vm: &mut Vm, ops: OperandMap) -> Result<()> {
    let value: u8 = vm.rng.gen();
    vm.state.regs[ops.x as usize] = value & ops.imm2;
    Ok(())
}

fn draw_sprite(vm: &mut Vm, ops: OperandMap) -> Result<()> {
    let x = vm.state.regs[ops.x as usize] as usize % vm.display.width();
    let y = vm.state.regs[ops.y as usize] as usize % vm.display.height();
    let i = vm.state.i;
    let memory = &vm.state.memory;

    let (rows, width): (Vec<u16>, usize) = if ops.imm1 == 0 && vm.ext() == Extension::Schip {
        if vm.display.resolution() == Resolution::Low && vm.quirks().draw_8x16_sprite_in_lores {
            let rows = (0..16).map(|r| memory.read(i.wrapping_add(r)) as u16);
            (rows.collect(), 8)
        } else {
            let rows = (0..16).map(|r| memory.read_word(i.wrapping_add(2 * r)));
            (rows.collect(), 16)
        }
    } else {
        let rows = (0..ops.imm1 as u16).map(|r| memory.read(i.wrapping_add(r)) as u16);
        (rows.collect(), 8)
    };

    let sprite = Sprite::new(Point::new(x, y), rows, width);
    let collision = vm.display.draw_sprite(&sprite);
    *vm.state.vf() = collision as u8;
    Ok(())
}

fn skip_pressed(vm: &mut Vm, ops: OperandMap) -> Result<()> {
    let key = vm.state.regs[ops.x as usize] as usize & 0xF;
    let cond = vm.state.input_table[key];
    skip_if(vm, cond);
    Ok(())
}

fn skip_not_pressed(vm: &mut Vm, ops: OperandMap) -> Result<()> {
    let key = vm.state.regs[ops.x as usize] as usize & 0xF;
    let cond = !vm.state.input_table[key];
    skip_if(vm, cond);
    Ok(())
}

fn load_dt(vm: &mut Vm, ops: OperandMap) -> Result<()> {
    vm.state.regs[ops.x as usize] = vm.state.dt;
    Ok(())
}

/// Waits for a key to be pressed and released again. Only the first held key
/// found by a scan is tracked; others pressed meanwhile are not reported.
fn read_key(vm: &mut Vm, ops: OperandMap) -> Result<()> {
    match vm.key_wait {
        None => {
            vm.key_wait = vm
                .state
                .input_table
                .iter()
                .position(|&held| held)
                .map(|key| key as u8);
        }
        Some(key) if !vm.state.input_table[key as usize] => {
            trace!("Key {key:X} released");
            vm.state.regs[ops.x as usize] = key;
            vm.key_wait = None;
            return Ok(());
        }
        Some(_) => {}
    }

    vm.state.pc = vm.state.pc.wrapping_sub(2) & PC_MASK;
    Ok(())
}

fn set_dt(vm: &mut Vm, ops: OperandMap) -> Result<()> {
    vm.state.dt = vm.state.regs[ops.x as usize];
    Ok(())
}

fn set_st(vm: &mut Vm, ops: OperandMap) -> Result<()> {
    vm.state.st = vm.state.regs[ops.x as usize];
    Ok(())
}

fn add_i(vm: &mut Vm, ops: OperandMap) -> Result<()> {
    vm.state.i = vm.state.i.wrapping_add(vm.state.regs[ops.x as usize] as u16);
    Ok(())
}

fn font_char(vm: &mut Vm, ops: OperandMap) -> Result<()> {
    let vx = vm.state.regs[ops.x as usize] as u16;
    vm.state.i = font::OFFSET + vx * font::CHAR_SIZE;
    Ok(())
}

fn bcd(vm: &mut Vm, ops: OperandMap) -> Result<()> {
    let vx = vm.state.regs[ops.x as usize];
    let i = vm.state.i;
    let memory = &mut vm.state.memory;

    memory.write(i, vx / 100);
    memory.write(i.wrapping_add(1), vx / 10 % 10);
    memory.write(i.wrapping_add(2), vx % 10);
    Ok(())
}

fn reg_dump(vm: &mut Vm, ops: OperandMap) -> Result<()> {
    let i = vm.state.i;
    for n in 0..=ops.x {
        vm.state.memory.write(i.wrapping_add(n as u16), vm.state.regs[n as usize]);
    }

    if vm.quirks().load_save_increment_i {
        vm.state.i = i.wrapping_add(ops.x as u16 + 1);
    }
    Ok(())
}

fn reg_load(vm: &mut Vm, ops: OperandMap) -> Result<()> {
    let i = vm.state.i;
    for n in 0..=ops.x {
        vm.state.regs[n as usize] = vm.state.memory.read(i.wrapping_add(n as u16));
    }

    if vm.quirks().load_save_increment_i {
        vm.state.i = i.wrapping_add(ops.x as u16 + 1);
    }
    Ok(())
}

fn hires(vm: &mut Vm, _: OperandMap) -> Result<()> {
    vm.display.set_resolution(Resolution::High);
    Ok(())
}

fn lores(vm: &mut Vm, _: OperandMap) -> Result<()> {
    vm.display.set_resolution(Resolution::Low);
    Ok(())
}

fn scroll_down(vm: &mut Vm, ops: OperandMap) -> Result<()> {
    vm.display.scroll(ScrollDirection::Down, ops.imm1 as usize);
    Ok(())
}

fn scroll_right(vm: &mut Vm, _: OperandMap) -> Result<()> {
    vm.display.scroll(ScrollDirection::Right, 4);
    Ok(())
}

fn scroll_left(vm: &mut Vm, _: OperandMap) -> Result<()> {
    vm.display.scroll(ScrollDirection::Left, 4);
    Ok(())
}

fn big_font_char(vm: &mut Vm, ops: OperandMap) -> Result<()> {
    let digit = (vm.state.regs[ops.x as usize] & 0xF) as u16;
    vm.state.i = font::BIG_OFFSET + digit * font::BIG_CHAR_SIZE;
    Ok(())
}

fn check_flag_index(x: u8) -> Result<usize> {
    match x as usize {
        n if n < FLAG_COUNT => Ok(n),
        _ => Err(VmError::FlagIndex(x)),
    }
}

fn save_flags(vm: &mut Vm, ops: OperandMap) -> Result<()> {
    let n = check_flag_index(ops.x)?;
    vm.flags[..=n].copy_from_slice(&vm.state.regs[..=n]);
    Ok(())
}

fn load_flags(vm: &mut Vm, ops: OperandMap) -> Result<()> {
    let n = check_flag_index(ops.x)?;
    vm.state.regs[..=n].copy_from_slice(&vm.flags[..=n]);
    Ok(())
}

fn exit(vm: &mut Vm, _: OperandMap) -> Result<()> {
    vm.unload();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::quirks::{EdgeMode, Quirks};
    use crate::vm::Mode;

    fn vm() -> Vm {
        let mut config = Config::default();
        config.cpu.rng_seed = 1;
        config.extension = Extension::Schip;
        let mut vm = Vm::new(config);
        vm.load(&[]).unwrap();
        vm.set_mode(Mode::Run);
        vm
    }

    fn run(vm: &mut Vm, opcodes: &[u16]) -> Result<()> {
        for &opcode in opcodes {
            vm.exec_instr(opcode)?;
        }
        Ok(())
    }

    #[test]
    fn add_reg_carry() {
        let mut vm = vm();
        for (a, b) in [(0u8, 0u8), (200, 55), (200, 56), (255, 255), (1, 254)] {
            vm.state.regs[1] = a;
            vm.state.regs[2] = b;
            run(&mut vm, &[0x8124]).unwrap();
            assert_eq!(vm.state.regs[1], a.wrapping_add(b));
            assert_eq!(vm.state.regs[0xF], (a as u16 + b as u16 > 255) as u8);
        }
    }

    #[test]
    fn sub_reg_borrow() {
        let mut vm = vm();
        for (a, b) in [(5u8, 3u8), (3, 5), (7, 7), (0, 255)] {
            vm.state.regs[1] = a;
            vm.state.regs[2] = b;
            run(&mut vm, &[0x8125]).unwrap();
            assert_eq!(vm.state.regs[1], a.wrapping_sub(b));
            assert_eq!(vm.state.regs[0xF], (a >= b) as u8);
        }
    }

    #[test]
    fn load_and_sub_reg() {
        let mut vm = vm();
        vm.state.regs[1] = 3;
        vm.state.regs[2] = 10;
        run(&mut vm, &[0x8127]).unwrap();
        assert_eq!(vm.state.regs[1], 7);
        assert_eq!(vm.state.regs[0xF], 1);

        vm.state.regs[1] = 11;
        run(&mut vm, &[0x8127]).unwrap();
        assert_eq!(vm.state.regs[1], 255);
        assert_eq!(vm.state.regs[0xF], 0);
    }

    #[test]
    fn flag_register_as_operand_ends_with_flag() {
        let mut vm = vm();
        vm.state.regs[0xF] = 0xFF;
        vm.state.regs[1] = 0x01;
        run(&mut vm, &[0x8F14]).unwrap();
        assert_eq!(vm.state.regs[0xF], 1);
    }

    #[test]
    fn shifts_with_vy_quirk() {
        let mut vm = vm();
        vm.state.regs[2] = 0b1000_0001;
        run(&mut vm, &[0x8126]).unwrap();
        assert_eq!(vm.state.regs[1], 0b0100_0000);
        assert_eq!(vm.state.regs[0xF], 1);

        run(&mut vm, &[0x812E]).unwrap();
        assert_eq!(vm.state.regs[1], 0b0000_0010);
        assert_eq!(vm.state.regs[0xF], 1);
    }

    #[test]
    fn shifts_without_vy_quirk() {
        let mut vm = vm();
        vm.set_quirks(Quirks {
            shift_set_vx_to_vy: false,
            ..Default::default()
        });
        vm.state.regs[1] = 0b0100_0010;
        vm.state.regs[2] = 0xFF;
        run(&mut vm, &[0x8126]).unwrap();
        assert_eq!(vm.state.regs[1], 0b0010_0001);
        assert_eq!(vm.state.regs[0xF], 0);

        run(&mut vm, &[0x812E]).unwrap();
        assert_eq!(vm.state.regs[1], 0b0100_0010);
        assert_eq!(vm.state.regs[0xF], 0);
    }

    #[test]
    fn bitwise_vf_quirk() {
        let mut vm = vm();
        vm.state.regs[1] = 0b1100;
        vm.state.regs[2] = 0b1010;
        vm.state.regs[0xF] = 9;
        run(&mut vm, &[0x8121]).unwrap();
        assert_eq!(vm.state.regs[1], 0b1110);
        assert_eq!(vm.state.regs[0xF], 9);

        vm.set_quirks(Quirks {
            bitwise_reset_vf: true,
            ..Default::default()
        });
        run(&mut vm, &[0x8122]).unwrap();
        assert_eq!(vm.state.regs[1], 0b1010);
        assert_eq!(vm.state.regs[0xF], 0);

        run(&mut vm, &[0x8123]).unwrap();
        assert_eq!(vm.state.regs[1], 0);
    }

    #[test]
    fn call_ret_round_trip() {
        let mut vm = vm();
        vm.state.pc = 0x206;
        run(&mut vm, &[0x2400]).unwrap();
        assert_eq!(vm.state.pc, 0x400);
        assert_eq!(vm.state.stack, vec![0x206]);
        run(&mut vm, &[0x00EE]).unwrap();
        assert_eq!(vm.state.pc, 0x206);
        assert!(vm.state.stack.is_empty());
    }

    #[test]
    fn thirteenth_call_overflows() {
        let mut vm = vm();
        for _ in 0..STACK_MAX_SIZE {
            run(&mut vm, &[0x2300]).unwrap();
        }
        assert!(matches!(run(&mut vm, &[0x2300]), Err(VmError::StackOverflow)));
        assert_eq!(vm.state.stack.len(), STACK_MAX_SIZE);
    }

    #[test]
    fn ret_on_empty_stack() {
        let mut vm = vm();
        assert!(matches!(run(&mut vm, &[0x00EE]), Err(VmError::StackUnderflow)));
    }

    #[test]
    fn skips() {
        let mut vm = vm();
        vm.state.regs[3] = 0x42;
        vm.state.regs[4] = 0x42;

        run(&mut vm, &[0x3342]).unwrap();
        assert_eq!(vm.state.pc, 0x202);
        run(&mut vm, &[0x4342]).unwrap();
        assert_eq!(vm.state.pc, 0x202);
        run(&mut vm, &[0x5340]).unwrap();
        assert_eq!(vm.state.pc, 0x204);
        run(&mut vm, &[0x9340]).unwrap();
        assert_eq!(vm.state.pc, 0x204);
    }

    #[test]
    fn skip_wraps_out_of_range_pc() {
        let mut vm = vm();
        vm.state.pc = 0xFFFF;
        run(&mut vm, &[0x3000]).unwrap();
        assert_eq!(vm.state.pc, 0x001);
    }

    #[test]
    fn jump_offset_quirk() {
        let mut vm = vm();
        vm.state.regs[0] = 0x10;
        vm.state.regs[3] = 0x20;
        run(&mut vm, &[0xB300]).unwrap();
        assert_eq!(vm.state.pc, 0x310);

        vm.set_quirks(Quirks {
            jump_offset_use_v0: false,
            ..Default::default()
        });
        run(&mut vm, &[0xB300]).unwrap();
        assert_eq!(vm.state.pc, 0x320);
    }

    #[test]
    fn random_is_masked() {
        let mut vm = vm();
        for _ in 0..32 {
            run(&mut vm, &[0xC50F]).unwrap();
            assert!(vm.state.regs[5] <= 0x0F);
        }
        run(&mut vm, &[0xC500]).unwrap();
        assert_eq!(vm.state.regs[5], 0);
    }

    #[test]
    fn draw_sets_collision_flag() {
        let mut vm = vm();
        vm.state.regs[0] = 66; // wraps to column 2
        vm.state.regs[1] = 1;
        run(&mut vm, &[0xF229, 0xD015]).unwrap();

        assert_eq!(vm.state.regs[0xF], 0);
        assert!(vm.display.at(Point::new(2, 1)));
        assert!(vm.display.at(Point::new(5, 5)));

        run(&mut vm, &[0xD015]).unwrap();
        assert_eq!(vm.state.regs[0xF], 1);
        assert!(!vm.display.at(Point::new(2, 1)));
    }

    #[test]
    fn draw_clips_by_default_and_wraps_with_quirk() {
        let mut vm = vm();
        vm.state.regs[0] = 60;
        vm.state.regs[1] = 0;
        vm.state.i = 0x300;
        vm.state.memory[0x300] = 0xFF;

        run(&mut vm, &[0xD011]).unwrap();
        assert!(vm.display.at(Point::new(63, 0)));
        assert!(!vm.display.at(Point::new(0, 0)));

        vm.set_quirks(Quirks {
            wrap_x: EdgeMode::Wrap,
            ..Default::default()
        });
        run(&mut vm, &[0x00E0, 0xD011]).unwrap();
        assert!(vm.display.at(Point::new(63, 0)));
        assert!(vm.display.at(Point::new(3, 0)));
    }

    #[test]
    fn zero_height_draws_big_sprite() {
        let mut vm = vm();
        vm.state.i = 0x300;
        for n in 0..32 {
            vm.state.memory[0x300 + n] = 0xFF;
        }

        run(&mut vm, &[0x00FF, 0xD010]).unwrap();
        assert!(vm.display.at(Point::new(15, 15)));
        assert!(!vm.display.at(Point::new(16, 0)));
        assert!(!vm.display.at(Point::new(0, 16)));
    }

    #[test]
    fn zero_height_in_lores_with_quirk_is_eight_wide() {
        let mut vm = vm();
        vm.set_quirks(Quirks {
            draw_8x16_sprite_in_lores: true,
            ..Default::default()
        });
        vm.state.i = 0x300;
        for n in 0..32 {
            vm.state.memory[0x300 + n] = 0xFF;
        }

        run(&mut vm, &[0xD010]).unwrap();
        assert!(vm.display.at(Point::new(7, 15)));
        assert!(!vm.display.at(Point::new(8, 0)));
    }

    #[test]
    fn zero_height_without_extension_draws_nothing() {
        let mut vm = vm();
        vm.set_extension(Extension::None);
        vm.state.i = 0x300;
        vm.state.memory[0x300] = 0xFF;
        run(&mut vm, &[0xD010]).unwrap();
        assert!(!vm.display.at(Point::new(0, 0)));
        assert_eq!(vm.state.regs[0xF], 0);
    }

    #[test]
    fn read_key_waits_for_release() {
        let mut vm = vm();
        vm.state.pc = 0x202;

        run(&mut vm, &[0xF30A]).unwrap();
        assert_eq!(vm.state.pc, 0x200);

        vm.set_key(0x7, true);
        vm.state.pc = 0x202;
        run(&mut vm, &[0xF30A]).unwrap();
        assert_eq!(vm.state.pc, 0x200);

        // a second key pressed meanwhile does not change the tracked one
        vm.set_key(0x2, true);
        vm.set_key(0x7, false);
        vm.state.pc = 0x202;
        run(&mut vm, &[0xF30A]).unwrap();
        assert_eq!(vm.state.pc, 0x202);
        assert_eq!(vm.state.regs[3], 0x7);
    }

    #[test]
    fn key_skips() {
        let mut vm = vm();
        vm.state.regs[1] = 0xA;
        run(&mut vm, &[0xE19E]).unwrap();
        assert_eq!(vm.state.pc, 0x200);
        run(&mut vm, &[0xE1A1]).unwrap();
        assert_eq!(vm.state.pc, 0x202);

        vm.set_key(0xA, true);
        run(&mut vm, &[0xE19E]).unwrap();
        assert_eq!(vm.state.pc, 0x204);
    }

    #[test]
    fn timers_and_index() {
        let mut vm = vm();
        vm.state.regs[2] = 30;
        run(&mut vm, &[0xF215, 0xF218, 0xF307, 0xA100, 0xF21E]).unwrap();
        assert_eq!(vm.state.dt, 30);
        assert_eq!(vm.state.st, 30);
        assert_eq!(vm.state.regs[3], 30);
        assert_eq!(vm.state.i, 0x100 + 30);
    }

    #[test]
    fn bcd_digits() {
        let mut vm = vm();
        vm.state.regs[4] = 254;
        vm.state.i = 0x400;
        run(&mut vm, &[0xF433]).unwrap();
        assert_eq!(&vm.state.memory[0x400..0x403], &[2, 5, 4]);
    }

    #[test]
    fn font_addresses() {
        let mut vm = vm();
        vm.state.regs[1] = 0xA;
        run(&mut vm, &[0xF129]).unwrap();
        assert_eq!(vm.state.i, 50);
        run(&mut vm, &[0xF130]).unwrap();
        assert_eq!(vm.state.i, 80 + 100);
    }

    #[test]
    fn reg_dump_and_load() {
        let mut vm = vm();
        for n in 0..4 {
            vm.state.regs[n] = n as u8 + 1;
        }
        vm.state.i = 0x500;
        run(&mut vm, &[0xF355]).unwrap();
        assert_eq!(&vm.state.memory[0x500..0x505], &[1, 2, 3, 4, 0]);
        assert_eq!(vm.state.i, 0x504);

        vm.set_quirks(Quirks {
            load_save_increment_i: false,
            ..Default::default()
        });
        vm.state.i = 0x501;
        run(&mut vm, &[0xF265]).unwrap();
        assert_eq!(&vm.state.regs[..3], &[2, 3, 4]);
        assert_eq!(vm.state.i, 0x501);
    }

    #[test]
    fn flags_round_trip() {
        let mut vm = vm();
        for n in 0..8 {
            vm.state.regs[n] = 0x10 + n as u8;
        }
        run(&mut vm, &[0xF775]).unwrap();
        vm.reset();
        run(&mut vm, &[0xF385]).unwrap();
        assert_eq!(&vm.state.regs[..5], &[0x10, 0x11, 0x12, 0x13, 0]);
        assert_eq!(vm.flags.bits() >> 56, 0x17);
    }

    #[test]
    fn flags_index_out_of_range() {
        let mut vm = vm();
        assert!(matches!(run(&mut vm, &[0xF875]), Err(VmError::FlagIndex(8))));
        assert!(matches!(run(&mut vm, &[0xFF85]), Err(VmError::FlagIndex(0xF))));
    }

    #[test]
    fn scroll_instructions() {
        let mut vm = vm();
        run(&mut vm, &[0x00FF]).unwrap();
        vm.display.set_pixel(Point::new(10, 0), true);

        run(&mut vm, &[0x00C3]).unwrap();
        assert!(vm.display.at(Point::new(10, 3)));

        run(&mut vm, &[0x00FB]).unwrap();
        assert!(vm.display.at(Point::new(14, 3)));

        run(&mut vm, &[0x00FC, 0x00FC]).unwrap();
        assert!(vm.display.at(Point::new(6, 3)));

        run(&mut vm, &[0x00FE]).unwrap();
        assert_eq!(vm.display.resolution(), Resolution::Low);
        run(&mut vm, &[0x00C4]).unwrap();
        assert!(vm.display.at(Point::new(6, 5)));
    }

    #[test]
    fn exit_unloads() {
        let mut vm = vm();
        vm.load(&[0x00, 0xFD]).unwrap();
        vm.step().unwrap();
        assert_eq!(vm.mode(), Mode::Empty);
        assert_eq!(vm.state.rom_size, 0);
    }

    #[test]
    fn table_follows_extension() {
        let chip8 = InstrSet::new(Extension::None);
        assert!(chip8.contains(InstrKind::DrawSprite));
        assert!(!chip8.contains(InstrKind::Hires));

        let schip = InstrSet::new(Extension::Schip);
        assert!(InstrKind::SCHIP.iter().all(|&kind| schip.contains(kind)));
    }
}
