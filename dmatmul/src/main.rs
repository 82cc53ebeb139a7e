//! Distributed matrix multiplication.
//!
//! Run directly for a single process, or under `smpi-exec -n P` for a group
//! of `P` processes.
use std::io::{self, BufWriter, Write};
use std::process;
use clap::Parser;
use log::error;
use dmatmul::config::{Args, Config, DEFAULT_SIZE};
use dmatmul::{driver, Result};

fn run() -> Result<()> {
    let args = Args::parse();
    let config = Config::resolve(&args, DEFAULT_SIZE)?;
    let comm = smpi::init()?;
    if let Some(report) = driver::run(&comm, &config)? {
        let mut out = BufWriter::new(io::stdout().lock());
        report.write(&mut out, config.print)?;
        out.flush()?;
    }
    Ok(())
}

fn main() {
    env_logger::init();

    if let Err(err) = run() {
        error!("{}", err);
        process::exit(err.exit_code());
    }
}
