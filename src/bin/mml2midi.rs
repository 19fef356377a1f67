use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use mml2midi::prelude::*;
use tracing::Level;

/// Compile a music macro language source into a Standard MIDI File
#[derive(Parser)]
#[command(name = "mml2midi")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Source file
    input: PathBuf,

    /// MIDI file to create
    output: PathBuf,

    /// Resolution of a quarter note
    #[arg(long, default_value_t = Timing::DEFAULT_TICKS_PER_QUARTER_NOTE)]
    ticks_per_quarter: u16,

    /// Header format: 0, 1 or 2
    #[arg(long, default_value = "1", value_parser = parse_format)]
    format: FormatType,

    /// More log output, repeat for more
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_format(arg: &str) -> Result<FormatType, String> {
    let value: u16 = arg.parse().map_err(|e| format!("{e}"))?;
    FormatType::try_from(value).map_err(|_| format!("unknown format {value}"))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let options = CompileOptions::default()
        .with_ticks_per_quarter_note(cli.ticks_per_quarter)
        .with_format(cli.format);

    match compile_file(&cli.input, &cli.output, &options) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("mml2midi: {}: {e}", cli.input.display());
            ExitCode::FAILURE
        }
    }
}
