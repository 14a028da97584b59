//! HTTP methods supported by the workbench

mod method;

pub use method::*;
