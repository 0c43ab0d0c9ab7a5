//! Prompt construction for the automation agent

mod instruction;

pub use instruction::{InstructionHeader, build_instruction};
