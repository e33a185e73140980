//! Result shapes returned by the dispatcher, the gateway and the feeds.
//!
//! Nothing in the call path panics or returns a Rust error for an upstream
//! problem: every outcome is a [`CallResult`]. A failure always carries a
//! message; its HTTP status is only present when the server answered with a
//! non-2xx code (or, for [`CallErrorKind::Blocked`], the synthetic 503).

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Failure classification for a single call or an orchestrated fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallErrorKind {
    EndpointNotFound,
    EndpointDisabled,
    Transport,
    Timeout,
    Http,
    Decode,
    Blocked,
    FallbackDisabled,
    FallbackExhausted,
}

impl CallErrorKind {
    pub const fn code(self) -> &'static str {
        match self {
            Self::EndpointNotFound => "call.endpoint_not_found",
            Self::EndpointDisabled => "call.endpoint_disabled",
            Self::Transport => "call.transport",
            Self::Timeout => "call.timeout",
            Self::Http => "call.http",
            Self::Decode => "call.decode",
            Self::Blocked => "call.blocked",
            Self::FallbackDisabled => "call.fallback_disabled",
            Self::FallbackExhausted => "call.fallback_exhausted",
        }
    }

    /// Configuration and policy failures never touch the network.
    pub const fn reached_network(self) -> bool {
        matches!(
            self,
            Self::Transport | Self::Timeout | Self::Http | Self::Decode
        )
    }
}

/// Successful call payload.
#[derive(Debug, Clone, PartialEq)]
pub struct CallSuccess<T> {
    pub data: T,
    pub status: Option<u16>,
}

impl<T> CallSuccess<T> {
    pub fn new(data: T, status: Option<u16>) -> Self {
        Self { data, status }
    }
}

/// Failed call with its classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallFailure {
    kind: CallErrorKind,
    message: String,
    status: Option<u16>,
}

impl CallFailure {
    pub fn new(kind: CallErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    pub fn endpoint_not_found(endpoint_key: &str) -> Self {
        Self::new(
            CallErrorKind::EndpointNotFound,
            format!("Endpoint not found: {endpoint_key}"),
        )
    }

    pub fn endpoint_disabled(endpoint_key: &str) -> Self {
        Self::new(
            CallErrorKind::EndpointDisabled,
            format!("Endpoint is disabled: {endpoint_key}"),
        )
    }

    pub fn timeout(endpoint_key: &str, timeout_ms: u64) -> Self {
        Self::new(
            CallErrorKind::Timeout,
            format!("API call timeout after {timeout_ms}ms: {endpoint_key}"),
        )
    }

    pub fn http(status: u16, status_text: &str, body: &str) -> Self {
        Self::new(
            CallErrorKind::Http,
            format!("API call failed: {status} {status_text} - {body}"),
        )
        .with_status(status)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub const fn kind(&self) -> CallErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn status(&self) -> Option<u16> {
        self.status
    }

    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub const fn is_blocked(&self) -> bool {
        matches!(self.kind, CallErrorKind::Blocked)
    }
}

impl Display for CallFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for CallFailure {}

pub type CallResult<T> = Result<CallSuccess<T>, CallFailure>;

/// Gateway outcome: a call result plus whether policy refused to dispatch it.
///
/// `blocked` is true only for the synthetic result produced when the policy
/// store blocked the call; it is false for every real network attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockedCallResult<T> {
    pub result: CallResult<T>,
    pub blocked: bool,
}

impl<T> BlockedCallResult<T> {
    pub fn dispatched(result: CallResult<T>) -> Self {
        Self {
            result,
            blocked: false,
        }
    }

    pub fn blocked(failure: CallFailure) -> Self {
        Self {
            result: Err(failure),
            blocked: true,
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn into_result(self) -> CallResult<T> {
        self.result
    }
}
