//! orderscout - bounded-concurrency extraction of company order histories
//!
//! Pending companies are fetched from a record store, each one is handed to a
//! browser automation agent under a timeout, the agent's answer is validated,
//! and exactly one outcome per company is written back.

pub mod agent;
pub mod config;
pub mod domain;
pub mod error;
pub mod orchestrator;
pub mod prompt;
pub mod store;
pub mod task;
pub mod validation;

pub use error::{Result, ScoutError};
