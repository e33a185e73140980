use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::info;

use crate::call_result::{BlockedCallResult, CallErrorKind, CallFailure};
use crate::dispatcher::{CallOptions, RequestDispatcher};
use crate::policy::PolicyStore;
use crate::DataSource;

/// Status reported on calls refused by policy.
pub const BLOCKED_STATUS: u16 = 503;

/// Feature-scoped front door to the dispatcher.
///
/// Consults the [`PolicyStore`] before every call; a blocked call is answered
/// with a synthetic 503-shaped failure and never reaches the dispatcher.
#[derive(Clone)]
pub struct FeatureGateway {
    dispatcher: RequestDispatcher,
    policy: Arc<PolicyStore>,
}

impl FeatureGateway {
    pub fn new(dispatcher: RequestDispatcher, policy: Arc<PolicyStore>) -> Self {
        Self { dispatcher, policy }
    }

    pub fn policy(&self) -> &Arc<PolicyStore> {
        &self.policy
    }

    pub fn dispatcher(&self) -> &RequestDispatcher {
        &self.dispatcher
    }

    pub async fn call_for_feature<T>(
        &self,
        feature_id: &str,
        endpoint_key: &str,
        source: DataSource,
        options: &CallOptions,
    ) -> BlockedCallResult<T>
    where
        T: DeserializeOwned,
    {
        if let Some(blocked) = self.check(feature_id, endpoint_key, source) {
            return blocked;
        }
        BlockedCallResult::dispatched(self.dispatcher.dispatch(endpoint_key, options).await)
    }

    /// Same as [`call_for_feature`](Self::call_for_feature) against `<endpoint>/<path_suffix>`.
    pub async fn call_for_feature_with_path<T>(
        &self,
        feature_id: &str,
        endpoint_key: &str,
        path_suffix: &str,
        source: DataSource,
        options: &CallOptions,
    ) -> BlockedCallResult<T>
    where
        T: DeserializeOwned,
    {
        if let Some(blocked) = self.check(feature_id, endpoint_key, source) {
            return blocked;
        }
        BlockedCallResult::dispatched(
            self.dispatcher
                .dispatch_with_path_suffix(endpoint_key, path_suffix, options)
                .await,
        )
    }

    fn check<T>(
        &self,
        feature_id: &str,
        endpoint_key: &str,
        source: DataSource,
    ) -> Option<BlockedCallResult<T>> {
        if !self.policy.is_blocked(feature_id, endpoint_key, source) {
            return None;
        }

        info!(
            feature = feature_id,
            endpoint = endpoint_key,
            source = source.as_str(),
            "call blocked by policy"
        );
        Some(BlockedCallResult::blocked(blocked_failure(feature_id, source)))
    }
}

pub fn blocked_failure(feature_id: &str, source: DataSource) -> CallFailure {
    CallFailure::new(
        CallErrorKind::Blocked,
        format!("Service temporarily unavailable: {source} data source for {feature_id} is blocked"),
    )
    .with_status(BLOCKED_STATUS)
}
