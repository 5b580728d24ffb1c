//! CLI-specific functionality for the task orchestrator
//!
//! This module contains argument parsing, task file loading,
//! and configuration discovery.

pub mod args;
pub mod config;
pub mod tasks;

pub use args::{Args, ExecutionMode, PlanConfig, SimulateConfig};
pub use config::ConfigDiscovery;
pub use tasks::{TaskFile, TaskFileError, TaskFormat, TaskLoader};
