//! Various utility modules.

pub mod clock;
pub(crate) mod config;
