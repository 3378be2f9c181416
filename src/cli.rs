use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;
use std::error::Error;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::disasm;
use crate::display::Color;
use crate::frontend;
use crate::input::Layout;
use crate::quirks::{Extension, Quirks};
use crate::state::PROG_OFFSET;
use crate::vm::{Mode, Vm};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity of debug logging
    #[arg(short, long, value_enum, global = true)]
    debug: Option<DebugMode>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a ROM in a window
    Run {
        /// The path to the ROM
        path: PathBuf,

        #[command(flatten)]
        options: RunOptions,
    },
    /// Write a listing of a ROM
    Disassemble {
        /// The path to the ROM
        path: PathBuf,

        /// Where to output the disassembled ROM
        #[arg(short, long)]
        output_file: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
pub struct RunOptions {
    /// Instructions executed per second
    #[arg(long, default_value_t = 250)]
    pub ips: u32,

    /// Execute an instruction on every frame, ignoring --ips
    #[arg(long)]
    pub uncap: bool,

    /// Seed of the random number generator, the current time if absent
    #[arg(long)]
    pub seed: Option<u64>,

    /// Enable SUPER-CHIP instructions
    #[arg(long)]
    pub schip: bool,

    /// BNNN jumps to NNN + VX instead of NNN + V0
    #[arg(long)]
    pub jump_vx: bool,

    /// Wrap sprites around the left and right edges
    #[arg(long)]
    pub wrap_x: bool,

    /// Wrap sprites around the top and bottom edges
    #[arg(long)]
    pub wrap_y: bool,

    /// Reset VF after 8XY1, 8XY2 and 8XY3
    #[arg(long)]
    pub vf_reset: bool,

    /// Shift VX in place instead of copying VY into it first
    #[arg(long)]
    pub shift_vx: bool,

    /// Leave I unchanged after FX55 and FX65
    #[arg(long)]
    pub keep_i: bool,

    /// Draw DXY0 as an 8x16 sprite in low resolution
    #[arg(long)]
    pub lores_8x16: bool,

    /// Colour of lit pixels, RRGGBB or RRGGBBAA
    #[arg(long, value_parser = parse_color, default_value = "#ffffffff")]
    pub on_color: Color,

    /// Colour of unlit pixels, RRGGBB or RRGGBBAA
    #[arg(long, value_parser = parse_color, default_value = "#000000ff")]
    pub off_color: Color,

    /// Window pixels per high resolution pixel
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u8).range(1..))]
    pub scale: u8,

    /// Outline every pixel
    #[arg(long)]
    pub grid: bool,

    /// Let cleared pixels fade out
    #[arg(long)]
    pub fade: bool,

    /// Colour steps per frame while fading
    #[arg(long, default_value_t = 16)]
    pub fade_speed: u8,

    /// Keep the tone generator silent. The window opens no audio device, so
    /// playing the tone is left to programs embedding the VM
    #[arg(long)]
    pub mute: bool,

    /// Keyboard layout of the hex keypad
    #[arg(long, value_enum, default_value_t = Layout::Modern)]
    pub layout: Layout,
}

fn parse_color(s: &str) -> Result<Color, String> {
    Color::from_hex(s).ok_or_else(|| format!("`{s}` is not an RRGGBB or RRGGBBAA colour"))
}

impl From<&RunOptions> for Config {
    fn from(options: &RunOptions) -> Self {
        let mut config = Config::default();

        config.cpu.cycles_per_sec = options.ips;
        config.cpu.uncap_cycles_per_sec = options.uncap;
        if let Some(seed) = options.seed {
            config.cpu.rng_seed = seed;
        }

        config.graphics.on_color = options.on_color;
        config.graphics.off_color = options.off_color;
        config.graphics.scale_factor = options.scale as usize;
        config.graphics.enable_grid = options.grid;
        config.graphics.enable_fade = options.fade;
        config.graphics.fade_speed = options.fade_speed;

        config.sound.enable = !options.mute;
        config.input.layout = options.layout;

        config.quirks = Quirks {
            jump_offset_use_v0: !options.jump_vx,
            wrap_x: options.wrap_x.into(),
            wrap_y: options.wrap_y.into(),
            bitwise_reset_vf: options.vf_reset,
            shift_set_vx_to_vy: !options.shift_vx,
            load_save_increment_i: !options.keep_i,
            draw_8x16_sprite_in_lores: options.lores_8x16,
        };
        config.extension = if options.schip {
            Extension::Schip
        } else {
            Extension::None
        };

        config
    }
}

#[derive(Copy, Clone, ValueEnum)]
enum DebugMode {
    Info,
    Debug,
    Trace,
    Warn,
    Error,
}

impl ToString for DebugMode {
    fn to_string(&self) -> String {
        match self {
            Self::Info => "info".into(),
            Self::Debug => "debug".into(),
            Self::Trace => "trace".into(),
            Self::Warn => "warn".into(),
            Self::Error => "error".into(),
        }
    }
}

pub fn init() -> Cli {
    let cli = Cli::parse();
    std::env::set_var(
        "RUST_LOG",
        format!(
            "superchip={}",
            cli.debug.unwrap_or(DebugMode::Error).to_string()
        ),
    );

    env_logger::init();

    cli
}

/// Loads the ROM at `path` and runs it until the window is closed.
pub fn run(path: &Path, options: &RunOptions) -> Result<(), Box<dyn Error>> {
    let mut vm = Vm::new(Config::from(options));
    vm.load_file(path)?;
    vm.set_mode(Mode::Run);

    frontend::run(vm)
}

pub fn disassemble(path: &Path, output_file: Option<PathBuf>) -> Result<(), Box<dyn Error>> {
    if let Some(mut dir) = output_file.clone() {
        if dir.extension().is_none() {
            return Err(format!("{} is not a file", dir.display()).into());
        }
        dir.pop();
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }

    let output = output_file.unwrap_or_else(|| PathBuf::from("output.txt"));
    let rom = fs::read(path)?;
    let mut file = fs::File::create(&output)?;

    writeln!(file, "== {} ==", path.display())?;
    for line in disasm::listing(&rom, PROG_OFFSET, &Quirks::default()) {
        writeln!(file, "{line}")?;
    }

    file.flush()?;

    info!("Wrote disassembled ROM to {}", output.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quirks::EdgeMode;
    use clap::CommandFactory;

    fn options(args: &[&str]) -> RunOptions {
        let cli = Cli::try_parse_from(["superchip", "run", "game.ch8"].iter().chain(args))
            .unwrap_or_else(|e| panic!("{e}"));
        match cli.command {
            Commands::Run { options, .. } => options,
            Commands::Disassemble { .. } => unreachable!(),
        }
    }

    #[test]
    fn command_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_match_config() {
        let config = Config::from(&options(&["--seed", "3"]));
        let mut expected = Config::default();
        expected.cpu.rng_seed = 3;
        assert_eq!(config, expected);
    }

    #[test]
    fn quirk_flags() {
        let config = Config::from(&options(&[
            "--schip",
            "--jump-vx",
            "--wrap-y",
            "--vf-reset",
            "--shift-vx",
            "--keep-i",
            "--lores-8x16",
        ]));
        assert_eq!(config.extension, Extension::Schip);
        assert_eq!(
            config.quirks,
            Quirks {
                jump_offset_use_v0: false,
                wrap_x: EdgeMode::Clip,
                wrap_y: EdgeMode::Wrap,
                bitwise_reset_vf: true,
                shift_set_vx_to_vy: false,
                load_save_increment_i: false,
                draw_8x16_sprite_in_lores: true,
            }
        );
    }

    #[test]
    fn graphics_and_input_flags() {
        let config = Config::from(&options(&[
            "--on-color",
            "33ff66",
            "--scale",
            "8",
            "--mute",
            "--layout",
            "original",
            "--ips",
            "700",
        ]));
        assert_eq!(config.graphics.on_color, Color::rgba(0x33, 0xFF, 0x66, 0xFF));
        assert_eq!(config.graphics.scale_factor, 8);
        assert!(!config.sound.enable);
        assert_eq!(config.input.layout, Layout::Original);
        assert_eq!(config.cpu.cycles_per_sec, 700);
    }

    #[test]
    fn bad_arguments_are_rejected() {
        for args in [
            ["run", "game.ch8", "--on-color", "green"],
            ["run", "game.ch8", "--scale", "0"],
            ["run", "game.ch8", "--layout", "dvorak"],
        ] {
            let argv = std::iter::once("superchip").chain(args);
            assert!(Cli::try_parse_from(argv).is_err());
        }
    }

    #[test]
    fn disassemble_subcommand() {
        let argv = ["superchip", "-d", "trace", "disassemble", "a.ch8", "-o", "out/a.txt"];
        let cli = Cli::try_parse_from(argv).unwrap_or_else(|e| panic!("{e}"));
        match cli.command {
            Commands::Disassemble { path, output_file } => {
                assert_eq!(path, PathBuf::from("a.ch8"));
                assert_eq!(output_file, Some(PathBuf::from("out/a.txt")));
            }
            Commands::Run { .. } => unreachable!(),
        }
    }

    #[test]
    fn disassemble_writes_listing() {
        let dir = std::env::temp_dir().join(format!("superchip-disasm-{}", std::process::id()));
        let rom = dir.join("rom.ch8");
        let output = dir.join("listing").join("rom.txt");
        fs::create_dir_all(&dir).unwrap();
        fs::write(&rom, [0x00, 0xE0, 0x12, 0x00]).unwrap();

        disassemble(&rom, Some(output.clone())).unwrap();

        let text = fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "0x0200: 00e0  clear_screen");
        assert_eq!(lines[2], "0x0202: 1200  jump 0x0200");
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn disassemble_rejects_directory_output() {
        assert!(disassemble(Path::new("rom.ch8"), Some(PathBuf::from("listing"))).is_err());
    }
}
