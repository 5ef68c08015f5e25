use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::time::Duration;
use tracing::debug;

use super::SeatApi;
use crate::config::TargetConfig;
use crate::domain::{
    AttackRequest, AttackResponse, CommentPayload, LoginPayload, LoginResponse,
};
use crate::error::TransportError;

/// reqwest-backed client for the video service.
///
/// A single connection pool is shared by all virtual clients; every request
/// carries the configured timeout so a hung exchange cannot stall shutdown.
#[derive(Clone)]
pub struct HttpSeatApi {
    base_url: String,
    client: reqwest::Client,
}

impl HttpSeatApi {
    pub fn new(target: &TargetConfig) -> Result<Self, TransportError> {
        Self::with_timeout(&target.base_url, target.request_timeout, &target.user_agent)
    }

    pub fn with_timeout(
        base_url: &str,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, TransportError> {
        reqwest::Url::parse(base_url).map_err(|e| TransportError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static("golden-seat-harness")),
        );
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn login_url(&self) -> String {
        format!("{}/api/v1/users/login", self.base_url)
    }

    pub fn golden_comment_url(&self, resource_id: &str) -> String {
        format!(
            "{}/api/v1/videos/{}/golden_comment",
            self.base_url, resource_id
        )
    }

    /// Read the body as JSON, tolerating empty or non-JSON bodies.
    async fn read_json(resp: reqwest::Response) -> Option<serde_json::Value> {
        match resp.bytes().await {
            Ok(bytes) if !bytes.is_empty() => serde_json::from_slice(&bytes).ok(),
            Ok(_) => None,
            Err(e) => {
                debug!(error = %e, "failed to read response body");
                None
            }
        }
    }
}

#[async_trait]
impl SeatApi for HttpSeatApi {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, TransportError> {
        let resp = self
            .client
            .post(self.login_url())
            .json(&LoginPayload { username, password })
            .send()
            .await?;

        let status = resp.status().as_u16();
        let body = Self::read_json(resp).await;
        Ok(LoginResponse { status, body })
    }

    async fn claim_seat(&self, request: &AttackRequest) -> Result<AttackResponse, TransportError> {
        let resp = self
            .client
            .post(self.golden_comment_url(&request.resource_id))
            .bearer_auth(request.credential.token())
            .json(&CommentPayload {
                content: request.content.clone(),
            })
            .send()
            .await?;

        let status = resp.status().as_u16();
        let body = Self::read_json(resp).await;
        Ok(AttackResponse::new(status, body))
    }
}
