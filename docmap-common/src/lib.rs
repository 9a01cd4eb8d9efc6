//! # docmap common library
//!
//! Shared code for the docmap persistence crates:
//! - Error type and result alias
//! - TOML configuration and data folder resolution
//! - Tracing subscriber setup
//! - SQLite pool management that survives external deletion of the database file

pub mod config;
pub mod db;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
