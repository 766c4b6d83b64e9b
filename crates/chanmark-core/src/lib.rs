//! Core domain logic for the channel marker bot.
//!
//! This crate is intentionally framework-agnostic. The Discord gateway and REST
//! API live behind ports (traits) implemented in adapter crates.

pub mod access;
pub mod config;
pub mod cooldown;
pub mod domain;
pub mod errors;
pub mod locks;
pub mod logging;
pub mod marker;
pub mod ports;
pub mod rename;
pub mod replies;

pub use errors::{Error, Result};
pub use rename::{RenameGuard, RenameOutcome};
