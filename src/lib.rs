//! Axiom library interface
//!
//! The core of an API workbench: environments and `{{variable}}`
//! substitution, batch payload generation from field patterns, and a
//! transmission engine that sends a batch sequentially or in a burst while
//! publishing progress and a per-item log.
//!
//! # Module Organization
//!
//! - [`variables`] - Variables, environments and interpolation
//! - [`batch`] - Field patterns and batch generation
//! - [`range`] - Id range inference from sample payloads
//! - [`transmit`] - Transport seam, request executor and the transmission engine
//! - [`diagnosis`] - Failure classification for error responses
//! - [`monitor`] - Periodic health probing
//! - [`devexp`] - curl import and export
//! - [`workbench`] - History, library and backup files
//! - [`core`] - CLI command dispatch

pub mod batch;
pub mod cli;
pub mod config;
pub mod core;
pub mod devexp;
pub mod diagnosis;
pub mod errors;
pub mod http;
pub mod models;
pub mod monitor;
pub mod output;
pub mod range;
pub mod signals;
pub mod status;
pub mod transmit;
pub mod variables;
pub mod workbench;
