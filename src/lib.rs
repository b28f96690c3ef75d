//! coremap: map files that are missing from a core dump back into the debugger
//!
//! Read-only shared file mappings are normally left out of core files. `mmapfile` finds the
//! backing file on a search path, maps it at the address it had in the dumped process and
//! registers it as a region so memory reads through the image see its contents.

pub mod constants;
pub mod dispatcher;
pub mod eval;
pub mod image;
pub mod interface;
pub mod mmapfile;
pub mod resolver;

#[cfg(test)]
mod tests;
