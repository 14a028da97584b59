//! Exit status codes for the CLI
//!
//! - 0: Success
//! - 1: Any error (transport failures, rejected batch items, HTTP errors with --check-status)
//! - 130: User interrupted (Ctrl+C, standard SIGINT exit code)

use std::process::{ExitCode, Termination};

use crate::transmit::EngineSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitStatus {
    Success = 0,
    Error = 1,
    /// Ctrl+C, standard SIGINT code
    Interrupted = 130,
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status as u8)
    }
}

impl Termination for ExitStatus {
    fn report(self) -> ExitCode {
        ExitCode::from(self as u8)
    }
}

impl ExitStatus {
    /// Exit status for a single response.
    ///
    /// Non-2xx responses only count as errors under `--check-status`.
    pub fn from_http_status(status_code: u16, check_status: bool) -> Self {
        if !check_status || (200..300).contains(&status_code) {
            ExitStatus::Success
        } else {
            ExitStatus::Error
        }
    }

    /// A batch succeeds when every logged item came back 2xx
    pub fn from_batch(snapshot: &EngineSnapshot) -> Self {
        if snapshot.log.iter().all(|r| r.is_success()) {
            ExitStatus::Success
        } else {
            ExitStatus::Error
        }
    }
}
