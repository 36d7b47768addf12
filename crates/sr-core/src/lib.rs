//! Core of the sheet relay: change detection, subscriber registry and fan-out.
//!
//! This crate is framework-agnostic. Telegram and Google Sheets live behind
//! ports (traits) implemented in adapter crates.

pub mod clock;
pub mod config;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod messaging;
pub mod notify;
pub mod poller;
pub mod registry;
pub mod service;
pub mod store;

pub use errors::{Error, Result};
