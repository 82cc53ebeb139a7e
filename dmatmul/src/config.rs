//! Command line and configuration file options.
//!
//! Values given on the command line override the YAML file, which overrides
//! the built-in defaults.
use std::fs::File;
use std::path::{Path, PathBuf};
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use crate::{Error, Result};

/// Matrix dimension of the distributed run.
pub const DEFAULT_SIZE: usize = 1000;

/// Matrix dimension of the sequential reference run.
pub const DEFAULT_SEQUENTIAL_SIZE: usize = 1009;

#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Matrix dimension N (the matrices are N x N)
    #[arg(short = 'n', long)]
    pub size: Option<usize>,

    /// Which elapsed time the root reports
    #[arg(short, long, value_enum)]
    pub timing: Option<TimingMode>,

    /// YAML file with default options
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Only print the elapsed time, not the result matrix
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimingMode {
    /// Root's own local multiply only
    #[default]
    Compute,
    /// Root's wall time from broadcast to gather
    Total,
    /// Slowest local multiply over all ranks
    Max,
}

/// Options as they appear in the configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub size: Option<usize>,
    pub timing: Option<TimingMode>,
    pub print: Option<bool>,
}

/// Fully resolved options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub size: usize,
    pub timing: TimingMode,
    /// Print the result matrix on the root
    pub print: bool,
}

impl Config {
    pub fn new(size: usize) -> Config {
        Config {
            size,
            timing: TimingMode::default(),
            print: true,
        }
    }

    /// Merge command line arguments, the file they name and `default_size`.
    pub fn resolve(args: &Args, default_size: usize) -> Result<Config> {
        let file = match &args.config {
            Some(path) => load_config(path)?,
            None => FileConfig::default(),
        };
        let size = args.size.or(file.size).unwrap_or(default_size);
        if size == 0 {
            return Err(Error::Config("matrix size must be positive".to_string()));
        }
        Ok(Config {
            size,
            timing: args.timing.or(file.timing).unwrap_or_default(),
            print: !args.quiet && file.print.unwrap_or(true),
        })
    }
}

/// Load the YAML configuration file at `path`.
pub fn load_config(path: &Path) -> Result<FileConfig> {
    let f = File::open(path)
        .map_err(|err| Error::Config(format!("cannot open {}: {err}", path.display())))?;
    serde_yaml::from_reader(f)
        .map_err(|err| Error::Config(format!("invalid config {}: {err}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(text: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(text.as_bytes()).unwrap();
        f
    }

    #[test]
    fn defaults_without_arguments() {
        let args = Args::parse_from(["dmatmul"]);
        let config = Config::resolve(&args, DEFAULT_SIZE).unwrap();
        assert_eq!(config, Config::new(DEFAULT_SIZE));
    }

    #[test]
    fn command_line_flags() {
        let args = Args::parse_from(["dmatmul", "-n", "8", "--timing", "max", "--quiet"]);
        let config = Config::resolve(&args, DEFAULT_SIZE).unwrap();
        assert_eq!(config.size, 8);
        assert_eq!(config.timing, TimingMode::Max);
        assert!(!config.print);
    }

    #[test]
    fn file_values_fill_in_and_flags_win() {
        let f = write_config("size: 12\ntiming: total\nprint: false\n");
        let args = Args {
            config: Some(f.path().to_path_buf()),
            ..Args::default()
        };
        let config = Config::resolve(&args, DEFAULT_SIZE).unwrap();
        assert_eq!(config.size, 12);
        assert_eq!(config.timing, TimingMode::Total);
        assert!(!config.print);

        let args = Args {
            size: Some(16),
            config: Some(f.path().to_path_buf()),
            ..Args::default()
        };
        assert_eq!(Config::resolve(&args, DEFAULT_SIZE).unwrap().size, 16);
    }

    #[test]
    fn unknown_keys_are_config_errors() {
        let f = write_config("sise: 12\n");
        let args = Args {
            config: Some(f.path().to_path_buf()),
            ..Args::default()
        };
        assert!(matches!(
            Config::resolve(&args, DEFAULT_SIZE),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let args = Args {
            config: Some(PathBuf::from("/nonexistent/dmatmul.yaml")),
            ..Args::default()
        };
        assert!(matches!(
            Config::resolve(&args, DEFAULT_SIZE),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn zero_size_is_rejected() {
        let args = Args::parse_from(["dmatmul", "--size", "0"]);
        assert!(matches!(
            Config::resolve(&args, DEFAULT_SIZE),
            Err(Error::Config(_))
        ));
    }
}
