//! Error types shared by the path resolver, the mapping registrar and the image layer.
//!
//! Every user-facing failure of `mmapfile` is one `MmapError`. Callers that speak in errno
//! terms (the command dispatcher, scripts) get the negative errno through `syscall_error`.
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::constants::MMAPFILE_USAGE;

/// Subset of the POSIX errno values this crate reports
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[repr(i32)]
pub enum Errno {
    ENOENT = 2,   // No such file or directory
    ENOEXEC = 8,  // Exec format error
    ENOMEM = 12,  // Out of memory
    EEXIST = 17,  // File exists
    EINVAL = 22,  // Invalid argument
}

#[derive(Debug, Error)]
pub enum MmapError {
    #[error("MMAP ERROR: Usage: {}", MMAPFILE_USAGE)]
    Usage,

    #[error("MMAP ERROR: invalid number `{0}`")]
    BadLiteral(String),

    #[error("MMAP ERROR: cannot evaluate address `{expr}`: {reason}")]
    BadAddress { expr: String, reason: String },

    #[error("MMAP ERROR: No core file loaded.")]
    NoImageLoaded,

    #[error("MMAP ERROR: size cannot be 0")]
    ZeroLength,

    /// Raised both by the pre-check and by a refused fixed mapping. `source` is set
    /// only for the latter and is kept for logging.
    #[error(
        "MMAP_ERROR:\nCannot memory map file <{file}> at\naddress {addr:#x} as it results in an overlap\nuse info target for more info"
    )]
    Overlap {
        file: String,
        addr: u64,
        #[source]
        source: Option<io::Error>,
    },

    #[error("{file}: No such file or directory")]
    FileNotFound { file: String },

    #[error("MMAP ERROR: cannot register region for {path}: {reason}")]
    ResourceExhaustion { path: PathBuf, reason: String },
}

impl MmapError {
    pub fn errno(&self) -> Errno {
        match self {
            MmapError::Usage
            | MmapError::BadLiteral(_)
            | MmapError::BadAddress { .. }
            | MmapError::ZeroLength => Errno::EINVAL,
            MmapError::NoImageLoaded => Errno::ENOEXEC,
            MmapError::Overlap { .. } => Errno::EEXIST,
            MmapError::FileNotFound { .. } => Errno::ENOENT,
            MmapError::ResourceExhaustion { .. } => Errno::ENOMEM,
        }
    }
}

/// Failures while loading a core image
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("could not read core file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("\"{path}\": not a core file: {reason}")]
    Parse { path: PathBuf, reason: String },
}

/// Logs the failure and returns the negative errno, in the style of a syscall return value
pub fn syscall_error(err: &MmapError, syscall: &str) -> i32 {
    log::debug!("{} failed: {}", syscall, err);
    -(err.errno() as i32)
}
