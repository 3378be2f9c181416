use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};

use crate::breakpoint::BreakpointMap;
use crate::config::{Config, CpuConfig, GraphicsConfig, SoundConfig};
use crate::disasm;
use crate::display::{Display, Resolution};
use crate::error::{Result, VmError};
use crate::instr_set::InstrSet;
use crate::instruction::{try_decode, OperandMap};
use crate::quirks::{Extension, Quirks};
use crate::sound::ToneGenerator;
use crate::state::{RplFlags, VmState, KEY_COUNT, MEM_SIZE, PC_MASK, PROG_MAX_SIZE, PROG_OFFSET};

const TIMER_PERIOD: Duration = Duration::from_nanos(1_000_000_000 / 60);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// No program loaded.
    Empty,
    Run,
    /// Advanced one instruction at a time by [`Vm::step`].
    Step,
    Paused,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Empty => "empty",
            Mode::Run => "run",
            Mode::Step => "step",
            Mode::Paused => "paused",
        };
        f.write_str(name)
    }
}

pub struct Vm {
    pub state: VmState,
    pub display: Display,
    pub breakpoints: BreakpointMap,
    pub beeper: ToneGenerator,
    /// SUPER-CHIP flag registers, kept across resets.
    pub flags: RplFlags,
    /// Changed only through the setters, which keep the parts derived from it in sync.
    config: Config,
    pub(crate) rng: StdRng,
    /// Key a pending `Fx0A` is waiting to see released.
    pub(crate) key_wait: Option<u8>,
    instr_set: InstrSet,
    mode: Mode,
    prev_mode: Mode,
    exec_acc: Duration,
    timer_acc: Duration,
    last_update: Option<Instant>,
}

impl fmt::Debug for Vm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vm")
            .field("pc", &format_args!("{:#06x}", self.state.pc))
            .field("i", &format_args!("{:#06x}", self.state.i))
            .field("regs", &self.state.regs)
            .field("stack", &self.state.stack)
            .field("mode", &self.mode)
            .field("ext", &self.ext())
            .finish_non_exhaustive()
    }
}

impl Vm {
    pub fn new(config: Config) -> Self {
        let sound = &config.sound;
        let beeper = ToneGenerator::new(sound.waveform, sound.level, sound.frequency);

        Self {
            state: VmState::new(),
            display: Display::new(config.display()),
            breakpoints: BreakpointMap::new(),
            beeper,
            flags: RplFlags::from_bits(config.cpu.rpl_flags),
            rng: StdRng::seed_from_u64(config.cpu.rng_seed),
            key_wait: None,
            instr_set: InstrSet::new(config.extension),
            mode: Mode::Empty,
            prev_mode: Mode::Empty,
            exec_acc: Duration::ZERO,
            timer_acc: Duration::ZERO,
            last_update: None,
            config,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn prev_mode(&self) -> Mode {
        self.prev_mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        if self.mode == mode {
            return;
        }

        info!("Mode changed [from: {}] [to: {}]", self.mode, mode);
        self.prev_mode = self.mode;
        self.mode = mode;
    }

    /// Freezes a running or stepping VM.
    pub fn pause(&mut self) {
        if matches!(self.mode, Mode::Run | Mode::Step) {
            self.set_mode(Mode::Paused);
        }
    }

    /// Returns to the mode the VM was paused from.
    pub fn resume(&mut self) {
        if self.mode == Mode::Paused {
            self.set_mode(self.prev_mode);
        }
    }

    pub fn ext(&self) -> Extension {
        self.instr_set.extension()
    }

    pub fn set_extension(&mut self, ext: Extension) {
        self.config.extension = ext;
        self.instr_set = InstrSet::new(ext);
        info!("Instruction set changed [ext: {:?}]", ext);
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn quirks(&self) -> &Quirks {
        &self.config.quirks
    }

    pub fn set_quirks(&mut self, quirks: Quirks) {
        self.config.quirks = quirks;
        self.display.set_wrap(quirks.wrap_x, quirks.wrap_y);
    }

    /// Applies new CPU settings. A changed seed restarts the random sequence.
    pub fn set_cpu(&mut self, cpu: CpuConfig) {
        if cpu.rng_seed != self.config.cpu.rng_seed {
            self.rng = StdRng::seed_from_u64(cpu.rng_seed);
        }
        self.config.cpu = cpu;
    }

    pub fn set_sound(&mut self, sound: SoundConfig) {
        self.beeper.level = sound.level;
        self.beeper.frequency = sound.frequency;
        if self.beeper.waveform() != sound.waveform {
            self.beeper.change_waveform(sound.waveform);
        }
        self.config.sound = sound;
    }

    pub fn set_graphics(&mut self, graphics: GraphicsConfig) {
        self.config.graphics = graphics;

        let display = self.config.display();
        self.display.set_on_color(display.on_color);
        self.display.set_off_color(display.off_color);
        self.display.set_scale_factor(display.scale_factor);
        self.display.set_grid(display.enable_grid);
        self.display.set_fade(display.enable_fade, display.fade_speed);
    }

    pub fn set_key(&mut self, key: u8, pressed: bool) {
        self.state.input_table[key as usize % KEY_COUNT] = pressed;
    }

    /// Samples the wall clock and advances the VM by the time elapsed since
    /// the previous call.
    pub fn update(&mut self) -> Result<()> {
        let now = Instant::now();
        let delta = self
            .last_update
            .map(|last| now.saturating_duration_since(last))
            .unwrap_or_default();
        self.last_update = Some(now);

        self.advance(delta)
    }

    /// Advances the VM by `delta`: at most one instruction when the cycle
    /// period has elapsed, plus as many 60 Hz timer ticks as are due.
    pub fn advance(&mut self, delta: Duration) -> Result<()> {
        if self.mode == Mode::Empty {
            return Ok(());
        }

        if self.mode == Mode::Run {
            self.exec_acc += delta;

            if self.config.cpu.uncap_cycles_per_sec || self.exec_acc >= self.cycle_period() {
                self.exec_acc = Duration::ZERO;

                if self.breakpoints.has(self.state.pc) {
                    warn!("Breakpoint hit [offset: {:#06x}]", self.state.pc);
                    self.set_mode(Mode::Step);
                } else {
                    self.step()?;
                }
            }
        }

        self.timer_acc += delta;
        while self.timer_acc >= TIMER_PERIOD {
            self.state.update_timers();
            self.display.animate();
            self.timer_acc -= TIMER_PERIOD;
        }

        if self.config.sound.enable && self.mode == Mode::Run && self.state.st > 0 {
            self.beeper.play();
        }

        Ok(())
    }

    fn cycle_period(&self) -> Duration {
        Duration::from_secs(1) / self.config.cpu.cycles_per_sec.max(1)
    }

    /// Fetches and executes one instruction. A failing instruction pauses
    /// the VM before the error is returned.
    pub fn step(&mut self) -> Result<()> {
        if self.mode == Mode::Empty {
            return Ok(());
        }

        let opcode = self.state.memory.read_word(self.state.pc);
        self.state.pc = self.state.pc.wrapping_add(2) & PC_MASK;

        let result = self.exec_instr(opcode);
        if let Err(err) = &result {
            error!("Execution stopped: {err}");
            self.set_mode(Mode::Paused);
        }
        result
    }

    /// Executes `opcode` as if it had just been fetched.
    pub fn exec_instr(&mut self, opcode: u16) -> Result<()> {
        let offset = self.state.pc.wrapping_sub(2) % MEM_SIZE as u16;
        let invalid = || VmError::InvalidOpcode { opcode, offset };

        // kinds outside the active extension are as unknown as unmapped opcodes
        let kind = try_decode(opcode).ok_or_else(invalid)?;
        let handler = self.instr_set.get(kind).ok_or_else(invalid)?;

        debug!("Processing instruction [{offset:#06x}: {opcode:04x}] [{kind:?}]");
        handler(self, OperandMap::from(opcode))
    }

    pub fn disassemble(&self, opcode: u16) -> Option<String> {
        disasm::disassemble(opcode, &self.config.quirks)
    }

    /// Copies a program to 0x200 and resets the machine. Oversized programs
    /// are rejected before anything changes.
    pub fn load(&mut self, rom: &[u8]) -> Result<()> {
        if rom.len() > PROG_MAX_SIZE {
            return Err(VmError::RomTooLarge { size: rom.len() });
        }

        let start = PROG_OFFSET as usize;
        self.state.memory[start..].fill(0);
        self.state.memory[start..start + rom.len()].copy_from_slice(rom);
        self.state.rom_size = rom.len();
        self.reset();

        info!("Loaded ROM [size: {}]", rom.len());
        Ok(())
    }

    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let rom = std::fs::read(path.as_ref())?;
        self.load(&rom)
    }

    /// Restores power-on state, keeping the loaded program.
    pub fn reset(&mut self) {
        self.state.reset();
        self.display.set_resolution(Resolution::Low);
        self.display.clear();
        self.key_wait = None;
        self.exec_acc = Duration::ZERO;
        self.timer_acc = Duration::ZERO;
        info!("Reset VM");
    }

    /// Removes the program from memory and leaves the VM empty.
    pub fn unload(&mut self) {
        self.state.memory[PROG_OFFSET as usize..].fill(0);
        self.state.rom_size = 0;
        self.reset();
        self.set_mode(Mode::Empty);
        info!("Unloaded ROM");
    }
}
