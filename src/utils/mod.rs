//! Shared utilities

pub mod terminal;
pub mod tools;
