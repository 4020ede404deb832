//! Secret provider implementations.

pub mod env;
pub mod file;
