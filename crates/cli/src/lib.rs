//! Command-line front end for the droidbridge session manager.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod output;
pub mod styles;
