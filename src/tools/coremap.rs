mod cli;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::io::{self, BufRead, Write};

use crate::cli::CliOptions;
use coremap::dispatcher::{CommandOutcome, Session};
use coremap::eval::AddressEvaluator;
use coremap::interface::FixedMapper;

/// Entry point of the coremap shell.
///
///     coremap [--core FILE] [-x CMD]... [--batch]
///
/// Commands given with -x run first, in order. Unless --batch is set, further commands are
/// then read from stdin until `quit` or end of input. A failing -x command stops a batch
/// run with its status.
fn main() -> Result<()> {
    let opts = CliOptions::parse();

    env_logger::Builder::new()
        .filter_level(opts.log_level())
        .parse_default_env()
        .init();

    let session = Session::new(Box::new(FixedMapper), opts.search_path.clone());

    for (name, addr) in &opts.defines {
        let addr = session
            .symbols
            .evaluate(addr)
            .map_err(|e| anyhow!(e))
            .with_context(|| format!("--define {}", name))?;
        session.symbols.define(name, addr);
    }

    if let Some(core) = &opts.core {
        session
            .image
            .load(core)
            .with_context(|| format!("loading core {}", core.display()))?;
    }

    for command in &opts.commands {
        match session.execute(command) {
            Ok(CommandOutcome::Output(out)) => print_output(&out),
            Ok(CommandOutcome::Quit) => return Ok(()),
            Err(e) => {
                eprintln!("{}", e);
                if opts.batch {
                    std::process::exit(e.status().unsigned_abs() as i32);
                }
            }
        }
    }
    if opts.batch {
        return Ok(());
    }

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("(coremap) ");
        io::stdout().flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        match session.execute(&line) {
            Ok(CommandOutcome::Output(out)) => print_output(&out),
            Ok(CommandOutcome::Quit) => break,
            Err(e) => eprintln!("{}", e),
        }
    }
    Ok(())
}

fn print_output(out: &str) {
    if !out.is_empty() {
        println!("{}", out.trim_end());
    }
}
