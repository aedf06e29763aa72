//! `sml2iso` library crate.
//!
//! The binary (`sml2iso`) is a thin wrapper around this library so that:
//!
//! - the harvest pipeline is testable against in-memory services
//! - the SOS client, parser and renderer are reusable on their own
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod debug;
pub mod domain;
pub mod error;
pub mod harvest;
pub mod io;
pub mod logging;
pub mod render;
pub mod report;
