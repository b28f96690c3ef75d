use clap::*;
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[command(name = "coremap")]
pub struct CliOptions {
    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Core file to load before running any command
    #[arg(long, value_name = "FILE")]
    pub core: Option<PathBuf>,

    /// Directories searched for mmapfile arguments, instead of $PATH
    #[arg(long, value_name = "DIRS")]
    pub search_path: Option<String>,

    /// Define a symbol usable as a map address.
    ///
    /// Example:
    ///   coremap --define shm_base=0x7f0000000000
    #[arg(long = "define", num_args = 1, value_name = "NAME=ADDR", value_parser = parse_define)]
    pub defines: Vec<(String, String)>,

    /// Run a command before reading from stdin (repeatable)
    #[arg(short = 'x', long = "eval-command", value_name = "CMD")]
    pub commands: Vec<String>,

    /// Exit after running the --eval-command commands
    #[arg(long)]
    pub batch: bool,
}

pub fn parse_define(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, addr)) if !name.is_empty() && !addr.is_empty() => {
            Ok((name.to_string(), addr.to_string()))
        }
        _ => Err(format!("expected NAME=ADDR, got `{}`", s)),
    }
}

impl CliOptions {
    /// Log filter for the -v count; RUST_LOG still wins when set
    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}
