pub mod map_constants;
pub mod path_constants;

pub use map_constants::*;
pub use path_constants::*;
