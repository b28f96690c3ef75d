// Interface shared by the resolver, registrar and image layer
pub mod errors;
pub mod mem;
pub mod misc;

pub use errors::*;
pub use mem::*;
pub use misc::*;
