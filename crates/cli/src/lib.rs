//! Service and command-line client for pairlink.
//!
//! `pairlink serve` runs the HTTP service in front of a [`pairlink::SessionManager`];
//! every other subcommand is a thin client of that service.

pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod server;
