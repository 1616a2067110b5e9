//! Core types: errors, configuration normalization, path helpers.

pub mod config;
pub mod errors;
pub mod paths;
