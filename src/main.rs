use log::error;
use superchip::cli;

fn main() {
    let cli = cli::init();
    let result = match cli.command {
        cli::Commands::Run { path, options } => cli::run(&path, &options),
        cli::Commands::Disassemble { path, output_file } => cli::disassemble(&path, output_file),
    };

    result.unwrap_or_else(|e| {
        error!("{}", e);
        std::process::exit(1);
    });
}
