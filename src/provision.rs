//! Credential provisioning.
//!
//! Runs exactly once, before any virtual client is scheduled. Any failure is
//! fatal to the run: the harness never attacks with an empty or missing token.

use tracing::{error, info, instrument};

use crate::client::SeatApi;
use crate::config::LoginConfig;
use crate::domain::{Credential, LoginResponse};
use crate::error::ProvisioningError;

/// Log in once and return the shared credential.
#[instrument(skip_all, fields(username = %login.username))]
pub async fn provision<A>(api: &A, login: &LoginConfig) -> Result<Credential, ProvisioningError>
where
    A: SeatApi + ?Sized,
{
    info!("provisioning credential");

    let response = api
        .login(&login.username, &login.password)
        .await
        .map_err(|e| {
            error!(error = %e, "login endpoint unreachable");
            ProvisioningError::from(e)
        })?;

    let credential = extract_credential(&response, &login.token_pointer).map_err(|e| {
        error!(status = response.status, error = %e, "provisioning failed");
        e
    })?;

    info!(status = response.status, "credential provisioned");
    Ok(credential)
}

/// Validate a login response and pull the token out of it.
pub fn extract_credential(
    response: &LoginResponse,
    token_pointer: &str,
) -> Result<Credential, ProvisioningError> {
    if !response.is_success() {
        let message = response
            .body
            .as_ref()
            .and_then(|b| b.get("error"))
            .and_then(|e| e.as_str())
            .unwrap_or("no error message")
            .to_string();
        return Err(ProvisioningError::Rejected {
            status: response.status,
            message,
        });
    }

    let token = response
        .body
        .as_ref()
        .and_then(|body| body.pointer(token_pointer))
        .and_then(|value| value.as_str())
        .ok_or_else(|| ProvisioningError::MissingToken {
            pointer: token_pointer.to_string(),
        })?;

    Credential::new(token).ok_or_else(|| ProvisioningError::EmptyToken {
        pointer: token_pointer.to_string(),
    })
}
