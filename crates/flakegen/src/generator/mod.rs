mod lock;
mod spin;

pub use lock::*;
pub use spin::*;
