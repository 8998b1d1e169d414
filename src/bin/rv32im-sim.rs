use std::fs::File;
use std::io::{BufWriter, Write};
use std::process::ExitCode;

use clap::Parser;
use clap_num::maybe_hex;

use rv32im_sim::elf_loader::load_elf;
use rv32im_sim::engine::{Engine, StdIo};
use rv32im_sim::report;

/// Simulate an RV32IM program and report branch-prediction accuracy.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about)]
struct Args {
    /// Path to the ELF executable to simulate.
    input: String,

    /// Emit one line per retired instruction to standard output (or
    /// --trace-file, if given).
    #[arg(short, long)]
    trace: bool,

    /// Write the trace to this file instead of standard output. Implies
    /// --trace.
    #[arg(long)]
    trace_file: Option<String>,

    /// Override the ELF entry point (use 0x prefix for hexadecimal).
    #[arg(short, long, value_parser=maybe_hex::<u32>)]
    start: Option<u32>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut image = match load_elf(&args.input) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let start_addr = args.start.unwrap_or(image.entry_point);
    let mut engine = Engine::new(start_addr);
    let mut io = StdIo;

    let mut file_sink;
    let mut stdout_sink;
    let mut trace_sink: Option<&mut dyn Write> = if args.trace || args.trace_file.is_some() {
        match args.trace_file {
            Some(path) => match File::create(&path) {
                Ok(file) => {
                    file_sink = BufWriter::new(file);
                    Some(&mut file_sink)
                }
                Err(e) => {
                    eprintln!("error: could not open trace file {path}: {e}");
                    return ExitCode::FAILURE;
                }
            },
            None => {
                stdout_sink = BufWriter::new(std::io::stdout());
                Some(&mut stdout_sink)
            }
        }
    } else {
        None
    };

    let run_result = engine.run(
        &mut image.memory,
        &mut io,
        Some(&image.symbols),
        trace_sink.as_deref_mut(),
    );

    if let Some(sink) = trace_sink.take() {
        let _ = sink.flush();
    }

    match run_result {
        Ok(stat) => {
            println!("{}", report::render(&stat));
            ExitCode::SUCCESS
        }
        Err((stat, fault)) => {
            println!("{}", report::render(&stat));
            eprintln!("fatal: {fault}");
            ExitCode::FAILURE
        }
    }
}
