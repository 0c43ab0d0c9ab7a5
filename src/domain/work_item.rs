//! Work items: one entity pending extraction.

use serde::{Deserialize, Serialize};

/// A single entity waiting for its order history to be extracted.
///
/// Created by the record store on fetch and never mutated during a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Opaque store key, unique per item
    pub id: String,

    /// Company name as known to the store
    pub entity_name: String,

    /// URL (or other locator) the agent starts from
    pub source_reference: String,
}

impl WorkItem {
    pub fn new(id: impl Into<String>, entity_name: impl Into<String>, source_reference: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entity_name: entity_name.into(),
            source_reference: source_reference.into(),
        }
    }

    /// An item is only dispatchable when it names an entity.
    pub fn is_valid(&self) -> bool {
        !self.id.trim().is_empty() && !self.entity_name.trim().is_empty()
    }
}
