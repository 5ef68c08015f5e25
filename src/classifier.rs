//! Outcome classification for contention responses.
//!
//! The mapping is deliberately a trichotomy: a loser that the server turned
//! away correctly (400/500) must never be counted together with a response
//! nobody expected (404, 401, 502, a dropped connection, ...).

use crate::domain::{AttackResponse, Outcome};

pub const STATUS_CREATED: u16 = 201;
pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_INTERNAL_SERVER_ERROR: u16 = 500;

/// Classify one response by status code. Pure and total.
pub fn classify(response: &AttackResponse) -> Outcome {
    classify_status(response.status)
}

pub fn classify_status(status: u16) -> Outcome {
    match status {
        STATUS_CREATED => Outcome::Won,
        STATUS_BAD_REQUEST | STATUS_INTERNAL_SERVER_ERROR => Outcome::RejectedExpected,
        _ => Outcome::RejectedUnexpected,
    }
}
