//! Orchestration of adapter operations across tools.

pub mod manager;

pub use manager::{BatchReport, Manager, ManagerFactory, ToolOutcome};
