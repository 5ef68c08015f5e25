pub mod http;

pub use http::*;

use async_trait::async_trait;

use crate::domain::{AttackRequest, AttackResponse, LoginResponse};
use crate::error::TransportError;

/// Transport seam towards the system under test.
///
/// The harness only ever talks to the target through this trait, so the
/// scheduler and the provisioner can run against the real HTTP service or an
/// in-process stand-in.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SeatApi: Send + Sync {
    /// `POST /api/v1/users/login`
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, TransportError>;

    /// `POST /api/v1/videos/{resource_id}/golden_comment`
    async fn claim_seat(&self, request: &AttackRequest) -> Result<AttackResponse, TransportError>;
}
