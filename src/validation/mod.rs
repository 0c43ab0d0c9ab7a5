//! Validation of raw agent output
//!
//! Turns whatever the agent returned into a typed `ExtractionResult`, or a
//! `ParseFailure` carrying the raw payload and a diagnostic.

mod extract;
mod result;

pub use extract::parse_json_text;
pub use result::validate;
