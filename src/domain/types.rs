use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Credential
// ============================================================================

/// Bearer token obtained once during provisioning.
///
/// Cloning is cheap (the token is reference counted) and the value is never
/// mutated after construction. `Debug` and `Display` never print the token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(Arc<str>);

impl Credential {
    /// Wrap a token exactly as issued. Returns `None` for an empty or
    /// whitespace-only token.
    pub fn new(token: impl AsRef<str>) -> Option<Self> {
        let token = token.as_ref();
        if token.trim().is_empty() {
            return None;
        }
        Some(Self(Arc::from(token)))
    }

    /// Raw token, for the `Authorization: Bearer` header
    pub fn token(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(<redacted, {} chars>)", self.0.len())
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

// ============================================================================
// Virtual user identity
// ============================================================================

/// Identifier of one virtual client, stable for its whole lifetime (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VirtualUserId(pub u32);

impl fmt::Display for VirtualUserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Request / response values
// ============================================================================

/// One contention request, built fresh on every client iteration.
#[derive(Debug, Clone)]
pub struct AttackRequest {
    pub resource_id: String,
    pub virtual_user: VirtualUserId,
    pub content: String,
    pub credential: Credential,
}

impl AttackRequest {
    /// Build a request whose content is rendered from `template`, with every
    /// `{vu}` replaced by the virtual user id.
    pub fn new(
        resource_id: impl Into<String>,
        virtual_user: VirtualUserId,
        template: &str,
        credential: Credential,
    ) -> Self {
        Self {
            resource_id: resource_id.into(),
            virtual_user,
            content: render_content(template, virtual_user),
            credential,
        }
    }
}

/// Render the per-client comment body.
pub fn render_content(template: &str, virtual_user: VirtualUserId) -> String {
    template.replace("{vu}", &virtual_user.to_string())
}

/// JSON body of the contention endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommentPayload {
    pub content: String,
}

/// Status used when no HTTP response was received at all.
pub const TRANSPORT_FAILURE_STATUS: u16 = 0;

/// Response to a contention request, owned by the client that issued it.
#[derive(Debug, Clone, PartialEq)]
pub struct AttackResponse {
    pub status: u16,
    pub body: Option<serde_json::Value>,
}

impl AttackResponse {
    pub fn new(status: u16, body: Option<serde_json::Value>) -> Self {
        Self { status, body }
    }

    /// Sentinel response for a request that never got an HTTP status
    /// (timeout, connection refused, ...).
    pub fn transport_failure() -> Self {
        Self {
            status: TRANSPORT_FAILURE_STATUS,
            body: None,
        }
    }

    pub fn is_transport_failure(&self) -> bool {
        self.status == TRANSPORT_FAILURE_STATUS
    }

    /// Server-provided error message (`{"error": "..."}` envelope), if any
    pub fn error_message(&self) -> Option<&str> {
        self.body.as_ref()?.get("error")?.as_str()
    }
}

/// Raw response of the login endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginResponse {
    pub status: u16,
    pub body: Option<serde_json::Value>,
}

impl LoginResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Body of the login request.
#[derive(Debug, Clone, Serialize)]
pub struct LoginPayload<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

// ============================================================================
// Outcome
// ============================================================================

/// Semantic result of one contention request.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Outcome {
    /// Seat granted (HTTP 201)
    Won,
    /// Server refused the claim as part of normal contention (HTTP 400/500)
    RejectedExpected,
    /// Anything else, transport failures included
    RejectedUnexpected,
}
