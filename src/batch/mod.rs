//! Batch payload generation
//!
//! - [`pattern`] - field patterns and how they are derived from responses
//! - [`generator`] - linear and chaotic generation, type coercion, body rendering

pub mod generator;
pub mod pattern;

pub use generator::{
    coerce, generate_batch, random_token, render_body, to_number, BatchGenerator, BatchItem,
    BatchMode, RangeSpec, MAX_BATCH_SIZE,
};
pub use pattern::{patterns_from_response, FieldPattern, FieldType};
