//! Data models for requests, responses and history

pub mod types;

pub use types::{generate_id, now_millis, ApiRequest, ApiResponse, HeaderEntry, HistoryItem};
