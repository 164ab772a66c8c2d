//! Command implementations

pub mod deploy;
pub mod fleet;
pub mod plan;
