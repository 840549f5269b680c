//! Command implementations.

pub mod build;
pub mod epub;
pub mod serve;
