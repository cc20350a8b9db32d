//! # rsiscope CLI
//!
//! Command parsing, dispatch and rendering for the `rsiscope` binary.
//!
//! | Exit code | Meaning |
//! |-----------|---------|
//! | 0 | success |
//! | 2 | invalid input, configuration or command error |
//! | 3 | the envelope carries errors |
//! | 4 | serialization failure |
//! | 5 | `--strict` and the envelope has warnings or errors |
//! | 10 | export or I/O failure |

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;

mod metadata;

use rsiscope_core::Envelope;
use serde_json::Value;

use crate::error::CliError;

/// Process exit status for a rendered envelope.
pub fn exit_status(envelope: &Envelope<Value>, strict: bool) -> Result<u8, CliError> {
    if strict && (!envelope.meta.warnings.is_empty() || !envelope.errors.is_empty()) {
        return Err(CliError::StrictModeViolation {
            warning_count: envelope.meta.warnings.len(),
            error_count: envelope.errors.len(),
        });
    }

    if envelope.has_errors() {
        return Ok(3);
    }

    Ok(0)
}
