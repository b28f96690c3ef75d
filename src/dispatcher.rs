//! Command dispatch for the coremap shell
//!
//! A `Session` holds the image being debugged and the collaborators `mmapfile` needs, and
//! runs one command line at a time. Commands:
//!
//! ```text
//! mmapfile | mmap <FILENAME> <ADDR> <OFFSET> <LENGTH>
//! core <FILE>
//! info target | info files
//! x <ADDR> <LENGTH>
//! define <NAME> <ADDR>
//! help [COMMAND]
//! quit
//! ```
use std::env;
use std::path::Path;
use thiserror::Error;

use crate::constants::{MMAPFILE_HELP, SEARCH_PATH_VAR};
use crate::eval::{AddressEvaluator, SymbolEvaluator};
use crate::image::{ImageRegions, ProcessImage};
use crate::interface::{hexdump, parse_literal, split_args, syscall_error, ImageError, MapBacking, MmapError};
use crate::mmapfile::mmap_command;

const HELP: &str = "\
List of commands:

mmapfile, mmap -- Add contents of memory mapped files missing from core dump
core           -- Use FILE as core dump for examining memory
info target    -- Names of targets and files being debugged
x              -- Examine memory: x ADDRESS LENGTH
define         -- Define a symbol: define NAME ADDRESS
quit           -- Exit the shell";

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Mmap(#[from] MmapError),
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error("Undefined command: \"{0}\".  Try \"help\".")]
    Undefined(String),
    #[error("Usage: {0}")]
    Usage(&'static str),
    #[error("{0}")]
    Eval(String),
    #[error("Cannot access memory at address {0:#x}")]
    Memory(u64),
}

impl CommandError {
    /// Negative errno for the failure, in the style of a syscall return
    pub fn status(&self) -> i32 {
        match self {
            CommandError::Mmap(e) => syscall_error(e, "mmapfile"),
            CommandError::Image(_) => -(libc::ENOEXEC),
            CommandError::Memory(_) => -(libc::EFAULT),
            _ => -(libc::EINVAL),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum CommandOutcome {
    Output(String),
    Quit,
}

pub struct Session {
    pub image: ProcessImage,
    pub symbols: SymbolEvaluator,
    mapper: Box<dyn MapBacking>,
    search_path: Option<String>,
}

impl Session {
    /// `search_path` overrides the `PATH` environment variable when set
    pub fn new(mapper: Box<dyn MapBacking>, search_path: Option<String>) -> Self {
        Session {
            image: ProcessImage::empty(),
            symbols: SymbolEvaluator::new(),
            mapper,
            search_path,
        }
    }

    /// Search path for this invocation, read from the environment at call time
    fn search_path(&self) -> Option<String> {
        self.search_path
            .clone()
            .or_else(|| env::var(SEARCH_PATH_VAR).ok())
    }

    pub fn execute(&self, line: &str) -> Result<CommandOutcome, CommandError> {
        let line = line.trim();
        let (cmd, args) = match line.split_once(char::is_whitespace) {
            Some((cmd, args)) => (cmd, args.trim()),
            None => (line, ""),
        };

        let output = match cmd {
            "" => String::new(),
            "mmapfile" | "mmap" => {
                let search_path = self.search_path();
                let mapped = mmap_command(
                    args,
                    &self.image,
                    &self.symbols,
                    &*self.mapper,
                    search_path.as_deref(),
                )?;
                mapped.to_string()
            }
            "core" | "core-file" => {
                if args.is_empty() {
                    return Err(CommandError::Usage("core <FILE>"));
                }
                self.image.load(Path::new(args))?;
                format!("Core was loaded from {}.", args)
            }
            "info" => match args {
                "target" | "files" => self.info_target(),
                _ => return Err(CommandError::Usage("info target")),
            },
            "x" => self.examine(args)?,
            "define" => {
                let args = split_args(args);
                let [name, addr] = args.as_slice() else {
                    return Err(CommandError::Usage("define <NAME> <ADDRESS>"));
                };
                let addr = self.symbols.evaluate(addr).map_err(CommandError::Eval)?;
                self.symbols.define(name, addr);
                format!("{} = {:#x}", name, addr)
            }
            "help" => match args {
                "mmapfile" | "mmap" => MMAPFILE_HELP.to_string(),
                _ => HELP.to_string(),
            },
            "quit" | "q" => return Ok(CommandOutcome::Quit),
            other => return Err(CommandError::Undefined(other.to_string())),
        };
        Ok(CommandOutcome::Output(output))
    }

    fn info_target(&self) -> String {
        let Some(core) = self.image.core_path() else {
            return "No core file loaded.".to_string();
        };

        let mut out = format!("Local core dump file:\n\t`{}'\n", core.display());
        let table = self.image.regions();
        if table.is_empty() {
            out.push_str("\tNo regions.\n");
        }
        for region in table.iter() {
            out.push_str(&format!(
                "\t{:#018x} - {:#018x} is {} [{}]\n",
                region.start,
                region.end(),
                region.name,
                region.class
            ));
        }
        out
    }

    fn examine(&self, args: &str) -> Result<String, CommandError> {
        let args = split_args(args);
        let [addr, len] = args.as_slice() else {
            return Err(CommandError::Usage("x <ADDRESS> <LENGTH>"));
        };
        let addr = self.symbols.evaluate(addr).map_err(CommandError::Eval)?;
        let len = parse_literal(len)?;
        let len = usize::try_from(len).map_err(|_| CommandError::Memory(addr))?;

        let bytes = self
            .image
            .read_memory(addr, len)
            .ok_or(CommandError::Memory(addr))?;
        Ok(hexdump(addr, &bytes))
    }
}
