//! Preferred-then-alternate source orchestration.
//!
//! [`SourceFallback`] resolves a feature's effective preferences, attempts the
//! preferred [`DataSource`], and only when that attempt fails or is blocked
//! (and fallback is enabled) attempts the alternate one. The two attempts are
//! strictly sequential.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use crate::call_result::{BlockedCallResult, CallErrorKind, CallFailure};
use crate::policy::PolicyStore;
use crate::DataSource;

pub type AttemptFuture<'a, T> = Pin<Box<dyn Future<Output = BlockedCallResult<T>> + Send + 'a>>;

/// One failed source attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceAttemptError {
    pub source: DataSource,
    pub blocked: bool,
    pub failure: CallFailure,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FallbackSuccess<T> {
    pub data: T,
    pub selected_source: DataSource,
    pub source_chain: Vec<DataSource>,
    pub used_fallback: bool,
    pub warnings: Vec<String>,
    pub errors: Vec<SourceAttemptError>,
    pub latency_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackFailure {
    pub kind: CallErrorKind,
    pub message: String,
    pub source_chain: Vec<DataSource>,
    pub errors: Vec<SourceAttemptError>,
    pub latency_ms: u64,
}

impl FallbackFailure {
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// True when every attempted source was refused by policy.
    pub fn all_blocked(&self) -> bool {
        !self.errors.is_empty() && self.errors.iter().all(|error| error.blocked)
    }
}

pub type FallbackResult<T> = Result<FallbackSuccess<T>, FallbackFailure>;

/// Runs one feature fetch across its preferred and alternate sources.
#[derive(Clone)]
pub struct SourceFallback {
    policy: Arc<PolicyStore>,
}

impl SourceFallback {
    pub fn new(policy: Arc<PolicyStore>) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &Arc<PolicyStore> {
        &self.policy
    }

    /// Invokes `attempt` with the preferred source and, if allowed, the alternate.
    ///
    /// `attempt` is called at most twice and never for the alternate source
    /// while the preferred attempt succeeds or fallback is disabled.
    pub async fn run<'s, T, F>(&self, feature_id: &str, mut attempt: F) -> FallbackResult<T>
    where
        F: FnMut(DataSource) -> AttemptFuture<'s, T>,
    {
        let started = Instant::now();
        let preferences = self.policy.effective_preferences(feature_id);
        let preferred = preferences.preferred_data_source;
        let mut source_chain = vec![preferred];
        let mut errors = Vec::with_capacity(2);

        let outcome = attempt(preferred).await;
        let first_failure = match outcome.result {
            Ok(success) => {
                return Ok(FallbackSuccess {
                    data: success.data,
                    selected_source: preferred,
                    source_chain,
                    used_fallback: false,
                    warnings: Vec::new(),
                    errors,
                    latency_ms: elapsed_ms(started),
                });
            }
            Err(failure) => failure,
        };
        let first_message = first_failure.message().to_owned();
        errors.push(SourceAttemptError {
            source: preferred,
            blocked: outcome.blocked,
            failure: first_failure,
        });

        if !preferences.enable_fallback {
            warn!(
                feature = feature_id,
                source = preferred.as_str(),
                error = %first_message,
                "preferred source failed and fallback is disabled"
            );
            return Err(FallbackFailure {
                kind: CallErrorKind::FallbackDisabled,
                message: format!(
                    "{preferred} data source failed for {feature_id} and fallback is disabled: {first_message}"
                ),
                source_chain,
                errors,
                latency_ms: elapsed_ms(started),
            });
        }

        let alternate = preferred.alternate();
        info!(
            feature = feature_id,
            from = preferred.as_str(),
            to = alternate.as_str(),
            "falling back to alternate source"
        );
        source_chain.push(alternate);

        let outcome = attempt(alternate).await;
        match outcome.result {
            Ok(success) => Ok(FallbackSuccess {
                data: success.data,
                selected_source: alternate,
                source_chain,
                used_fallback: true,
                warnings: vec![format!(
                    "source fallback succeeded with '{alternate}' after '{preferred}' failed: {first_message}"
                )],
                errors,
                latency_ms: elapsed_ms(started),
            }),
            Err(failure) => {
                let message = format!(
                    "Both {preferred} and {alternate} data sources failed for {feature_id}: \
                     {preferred}: {first_message}; {alternate}: {}",
                    failure.message()
                );
                warn!(feature = feature_id, error = %message, "all sources failed");
                errors.push(SourceAttemptError {
                    source: alternate,
                    blocked: outcome.blocked,
                    failure,
                });
                Err(FallbackFailure {
                    kind: CallErrorKind::FallbackExhausted,
                    message,
                    source_chain,
                    errors,
                    latency_ms: elapsed_ms(started),
                })
            }
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
}
