mod tissue;
mod volume;

pub use tissue::*;
pub use volume::*;
