//! Shared leaf types: address parts, outcome flags, errors, configuration.

pub mod address;
pub mod config;
pub mod error;
pub mod outcome;
