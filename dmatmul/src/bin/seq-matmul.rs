//! Sequential reference: the same matrices multiplied in one process
//! without any communication.
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process;
use std::time::Instant;
use clap::Parser;
use log::{error, info};
use dmatmul::config::{Args, Config, DEFAULT_SEQUENTIAL_SIZE};
use dmatmul::driver::{self, Report};
use dmatmul::{kernel, Result};

/// There is only one process, so there is no timing mode to choose.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct SeqArgs {
    /// Matrix dimension N (the matrices are N x N)
    #[arg(short = 'n', long)]
    size: Option<usize>,

    /// YAML file with default options
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Only print the elapsed time, not the result matrix
    #[arg(short, long)]
    quiet: bool,
}

impl From<SeqArgs> for Args {
    fn from(args: SeqArgs) -> Args {
        Args {
            size: args.size,
            timing: None,
            config: args.config,
            quiet: args.quiet,
        }
    }
}

fn run() -> Result<()> {
    let args = Args::from(SeqArgs::parse());
    let config = Config::resolve(&args, DEFAULT_SEQUENTIAL_SIZE)?;
    let a = driver::init_a(config.size)?;
    let b = driver::init_b(config.size)?;

    let start = Instant::now();
    let product = kernel::multiply(&a, &b)?;
    let elapsed = start.elapsed();
    info!("multiplied {0}x{0} in {1:.6} s", config.size, elapsed.as_secs_f64());

    let report = Report { product, elapsed };
    let mut out = BufWriter::new(io::stdout().lock());
    report.write(&mut out, config.print)?;
    out.flush()?;
    Ok(())
}

fn main() {
    env_logger::init();

    if let Err(err) = run() {
        error!("{}", err);
        process::exit(err.exit_code());
    }
}
