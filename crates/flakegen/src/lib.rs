#![doc = include_str!("../README.md")]

mod config;
mod error;
mod generator;
mod id;
mod identity;
#[cfg(feature = "serde")]
pub mod serde_ext;
mod status;
mod time;

pub use crate::config::*;
pub use crate::error::*;
pub use crate::generator::*;
pub use crate::id::*;
pub use crate::identity::*;
pub use crate::status::*;
pub use crate::time::*;
