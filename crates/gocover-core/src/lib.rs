//! Core library for gocover: drives `go test`, classifies its output, and
//! judges each package against a coverage gate.

pub mod aggregate;
pub mod classify;
pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod runner;

pub use error::{Error, Result};
