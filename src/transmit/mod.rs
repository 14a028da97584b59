//! Request execution and batch transmission
//!
//! - [`transport`] - the network seam and its reqwest implementation
//! - [`executor`] - one interpolated request in, one normalized response out
//! - [`engine`] - the batch run state machine (sequential and burst)

pub mod engine;
pub mod executor;
pub mod transport;

pub use engine::{
    parse_raw_batch, BatchSource, EngineOptions, EngineSnapshot, RunHandle, Strategy,
    TransmissionEngine, TransmissionPlan, TransmissionResult, TransmissionState,
};
pub use executor::{normalize, parse_body, prepare, Executor};
pub use transport::{
    OutboundRequest, RawResponse, ReqwestTransport, Transport, TransportError, TransportErrorKind,
    TransportOptions, USER_AGENT_STRING,
};
