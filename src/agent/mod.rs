//! Automation agent layer
//!
//! - AutomationAgent trait: one instruction in, one raw payload out
//! - HttpAgent: talks to a browser-automation service
//! - MockAgent: scripted agent for tests and dry runs

pub mod client;
pub mod http;
pub mod mock;

pub use client::{AgentError, AutomationAgent, RawResult, SchemaDescriptor};
pub use http::{HttpAgent, HttpAgentConfig};
pub use mock::{MockAgent, MockBehavior};
