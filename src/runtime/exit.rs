//! Process exit codes. Only `main` terminates the process; everything below returns.

use crate::controller::RotationOutcome;

/// Run reached `Done` with nothing left behind
pub const EXIT_SUCCESS: u8 = 0;
/// Configuration error or failed run
pub const EXIT_FAILURE: u8 = 1;
/// Run reached `Done` but some stale keys could not be demoted
pub const EXIT_PARTIAL_DEMOTION: u8 = 2;

pub fn exit_code(outcome: &RotationOutcome) -> u8 {
    if !outcome.is_done() {
        EXIT_FAILURE
    } else if outcome.partial_demotion().is_some() {
        EXIT_PARTIAL_DEMOTION
    } else {
        EXIT_SUCCESS
    }
}
