#![deny(unsafe_code)]

//! Command-line entry point: encrypt a file through the five-stage
//! pipeline.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Parser, ValueEnum};
use env_logger::Env;
use log::info;
use parking_lot::{Condvar, Mutex};

use encpipe_lib::cipher::{ByteTransform, ShiftCipher, XorCipher, load_key};
use encpipe_lib::counts::TransferCounts;
use encpipe_lib::io::{FileSink, FileSource};
use encpipe_lib::logging::OperationTimer;
use encpipe_lib::pipeline::{Pipeline, PipelineConfig};
use encpipe_lib::reset::ResetController;
use encpipe_lib::validation::{validate_file_exists, validate_queue_capacity};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Custom styles for CLI help output
const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// Cipher selection.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CipherArg {
    /// Add the key to each byte, wrapping mod 256
    Shift,
    /// XOR each byte with the key (self-inverse)
    Xor,
}

/// Encrypt a byte stream through a five-stage concurrent pipeline.
///
/// Bytes flow reader -> input queue -> transform -> output queue -> writer,
/// with a counting stage auditing each queue. Queue capacities bound memory
/// and provide blocking backpressure end to end.
#[derive(Parser, Debug)]
#[command(version, styles = STYLES)]
struct Args {
    /// File to read plaintext bytes from
    input: PathBuf,

    /// File to write transformed bytes to
    output: PathBuf,

    /// Key file; its bytes fold into a single key byte
    key: PathBuf,

    /// Input queue capacity (N). Must be greater than 1; prompted for
    /// interactively when omitted
    #[arg(short = 'N', long)]
    input_queue: Option<usize>,

    /// Output queue capacity (M). Must be greater than 1; prompted for
    /// interactively when omitted
    #[arg(short = 'M', long)]
    output_queue: Option<usize>,

    /// Cipher to apply
    #[arg(long, value_enum, default_value = "shift")]
    cipher: CipherArg,

    /// Pause, drain, and log counts every this many seconds while running
    #[arg(long, value_name = "SECONDS")]
    reset_interval: Option<u64>,
}

/// Resolve a capacity from its flag, or prompt for it on stdin.
fn resolve_capacity(flag: Option<usize>, parameter: &str, prompt: &str) -> Result<usize> {
    match flag {
        Some(value) => {
            validate_queue_capacity(parameter, value)?;
            Ok(value)
        }
        None => prompt_capacity(prompt),
    }
}

/// Re-prompt until a capacity greater than 1 is read.
fn prompt_capacity(prompt: &str) -> Result<usize> {
    let stdin = std::io::stdin();
    let mut line = String::new();
    loop {
        print!("Enter {prompt} capacity (> 1): ");
        std::io::stdout().flush()?;
        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            bail!("end of input while prompting for {prompt} capacity");
        }
        match line.trim().parse::<usize>() {
            Ok(value) if value > 1 => return Ok(value),
            _ => eprintln!("{prompt} capacity must be an integer greater than 1"),
        }
    }
}

type DoneFlag = Arc<(Mutex<bool>, Condvar)>;

/// Periodically drain and log the pipeline until `done` is set.
fn spawn_reset_ticker(
    controller: ResetController,
    every: Duration,
    done: DoneFlag,
) -> thread::JoinHandle<()> {
    thread::spawn(move || loop {
        {
            let (lock, cvar) = &*done;
            let mut finished = lock.lock();
            if !*finished {
                let _ = cvar.wait_for(&mut finished, every);
            }
            if *finished {
                break;
            }
        }
        controller.request_reset();
        controller.resume_after_reset();
    })
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    validate_file_exists(&args.input, "Input file")?;
    validate_file_exists(&args.key, "Key file")?;
    let key = load_key(&args.key)?;

    let input_capacity = resolve_capacity(args.input_queue, "input-queue", "input queue")?;
    let output_capacity = resolve_capacity(args.output_queue, "output-queue", "output queue")?;

    let source = FileSource::open(&args.input)?;
    let sink = FileSink::create(&args.output)?;
    let transform: Box<dyn ByteTransform> = match args.cipher {
        CipherArg::Shift => Box::new(ShiftCipher::new(key)),
        CipherArg::Xor => Box::new(XorCipher::new(key)),
    };

    let counts = Arc::new(TransferCounts::new());
    let config = PipelineConfig::new(input_capacity, output_capacity);
    let pipeline = Pipeline::new(config, counts.clone())?;

    let timer = OperationTimer::new("Encrypting");
    let done: DoneFlag = Arc::new((Mutex::new(false), Condvar::new()));
    let ticker = args
        .reset_interval
        .map(|secs| spawn_reset_ticker(pipeline.controller(), Duration::from_secs(secs), Arc::clone(&done)));

    let result = pipeline.run(source, sink, transform);

    {
        let (lock, cvar) = &*done;
        *lock.lock() = true;
        cvar.notify_all();
    }
    if let Some(handle) = ticker {
        let _ = handle.join();
    }

    result?;
    timer.log_completion(counts.output_total());
    info!("pipeline complete");
    Ok(())
}
