//! High-level commands for mcpsync operations.
//!
//! These are called by the CLI frontend; they return reports instead of
//! printing so any frontend can render them.

pub mod server;

pub use server::{
    ClientListing, ServerCommand, ServerOptions, ServerOutcome, ServerReport, method_lines,
    schema_details,
};
