//! Extraction task wrapper around the automation agent

mod extraction;

pub use extraction::ExtractionTask;
