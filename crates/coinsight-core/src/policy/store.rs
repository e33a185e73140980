use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::PolicyError;
use crate::kv::KeyValueStore;
use crate::policy::snapshot;
use crate::policy::state::{
    EffectivePreferences, FeatureBlockingPatch, FeatureBlockingState,
    FeatureDataSourcePreferences, FeaturePreferencesPatch, GlobalBlockingPatch,
    GlobalBlockingState, GlobalDataSourcePreferences, GlobalPreferencesPatch, PolicyState,
};
use crate::{DataSource, Provider};

/// Key under which policy snapshots are persisted.
pub const POLICY_STORE_KEY: &str = "api-blocking-store";

/// Shared blocking and source-preference policy.
///
/// Reads are synchronous and lock only for the duration of the lookup.
/// Every mutation is applied in memory first, then the full state is written
/// to the attached [`KeyValueStore`] (last write wins). Mutations are
/// serialized through `writer`, so snapshots reach the store in the same order
/// as the in-memory updates. A failed write is reported to the caller but the
/// in-memory change stands.
pub struct PolicyStore {
    state: RwLock<PolicyState>,
    writer: Mutex<()>,
    persistence: Option<Arc<dyn KeyValueStore>>,
}

impl Default for PolicyStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl PolicyStore {
    /// Store without persistence, starting from defaults.
    pub fn in_memory() -> Self {
        Self::with_state(PolicyState::default())
    }

    pub fn with_state(state: PolicyState) -> Self {
        Self {
            state: RwLock::new(state),
            writer: Mutex::new(()),
            persistence: None,
        }
    }

    /// Loads the persisted snapshot, migrating older versions forward.
    ///
    /// Never fails: an unreadable or unsupported snapshot is logged and the
    /// store starts from defaults.
    pub async fn load(persistence: Arc<dyn KeyValueStore>) -> Self {
        let state = match persistence.get_item(POLICY_STORE_KEY).await {
            Ok(Some(raw)) => match snapshot::decode(&raw) {
                Ok(loaded) => {
                    if loaded.was_migrated() {
                        info!(
                            from_version = loaded.stored_version,
                            to_version = snapshot::CURRENT_VERSION,
                            "migrated persisted policy snapshot"
                        );
                        if let Err(error) = save_state(persistence.as_ref(), &loaded.state).await {
                            warn!(%error, "failed to rewrite migrated policy snapshot");
                        }
                    }
                    loaded.state
                }
                Err(error) => {
                    warn!(%error, "ignoring unreadable policy snapshot; using defaults");
                    PolicyState::default()
                }
            },
            Ok(None) => {
                debug!("no persisted policy snapshot; using defaults");
                PolicyState::default()
            }
            Err(error) => {
                warn!(%error, "failed to read policy snapshot; using defaults");
                PolicyState::default()
            }
        };

        Self {
            state: RwLock::new(state),
            writer: Mutex::new(()),
            persistence: Some(persistence),
        }
    }

    pub fn snapshot(&self) -> PolicyState {
        self.read().clone()
    }

    pub fn is_feature_source_blocked(&self, feature_id: &str, source: DataSource) -> bool {
        self.read().is_feature_source_blocked(feature_id, source)
    }

    pub fn is_global_blocked(&self, provider: Provider) -> bool {
        self.read().is_global_blocked(provider)
    }

    pub fn is_blocked(&self, feature_id: &str, endpoint_key: &str, source: DataSource) -> bool {
        self.read().is_blocked(feature_id, endpoint_key, source)
    }

    pub fn effective_preferences(&self, feature_id: &str) -> EffectivePreferences {
        self.read().effective_preferences(feature_id)
    }

    pub fn feature_blocking(&self, feature_id: &str) -> FeatureBlockingState {
        self.read().feature_blocking(feature_id)
    }

    pub fn global_blocking(&self) -> GlobalBlockingState {
        self.read().global_blocking
    }

    pub fn feature_preferences(&self, feature_id: &str) -> Option<FeatureDataSourcePreferences> {
        self.read().feature_preferences.get(feature_id).copied()
    }

    pub fn global_preferences(&self) -> GlobalDataSourcePreferences {
        self.read().global_preferences
    }

    pub async fn set_feature_blocking(
        &self,
        feature_id: &str,
        patch: FeatureBlockingPatch,
    ) -> Result<(), PolicyError> {
        let _writer = self.writer.lock().await;
        let state = self.mutate(|state| state.apply_feature_blocking(feature_id, patch));
        info!(feature = feature_id, ?patch, "feature blocking updated");
        self.persist(&state).await
    }

    pub async fn set_global_blocking(&self, patch: GlobalBlockingPatch) -> Result<(), PolicyError> {
        let _writer = self.writer.lock().await;
        let state = self.mutate(|state| state.apply_global_blocking(patch));
        info!(?patch, "global blocking updated");
        self.persist(&state).await
    }

    pub async fn set_feature_preferences(
        &self,
        feature_id: &str,
        patch: FeaturePreferencesPatch,
    ) -> Result<(), PolicyError> {
        let _writer = self.writer.lock().await;
        let state = self.mutate(|state| state.apply_feature_preferences(feature_id, patch));
        info!(feature = feature_id, ?patch, "feature preferences updated");
        self.persist(&state).await
    }

    pub async fn set_global_preferences(
        &self,
        patch: GlobalPreferencesPatch,
    ) -> Result<(), PolicyError> {
        let _writer = self.writer.lock().await;
        let state = self.mutate(|state| state.apply_global_preferences(patch));
        info!(?patch, "global preferences updated");
        self.persist(&state).await
    }

    /// Restores all four partitions to their defaults.
    pub async fn reset(&self) -> Result<(), PolicyError> {
        let _writer = self.writer.lock().await;
        let state = self.mutate(|state| *state = PolicyState::default());
        info!("policy reset to defaults");
        self.persist(&state).await
    }

    /// Applies `update` under the write lock and returns the resulting state.
    fn mutate(&self, update: impl FnOnce(&mut PolicyState)) -> PolicyState {
        let mut state = self.write();
        update(&mut state);
        state.clone()
    }

    async fn persist(&self, state: &PolicyState) -> Result<(), PolicyError> {
        let Some(persistence) = &self.persistence else {
            return Ok(());
        };
        let result = save_state(persistence.as_ref(), state).await;
        if let Err(error) = &result {
            warn!(%error, "failed to persist policy snapshot");
        }
        result
    }

    fn read(&self) -> RwLockReadGuard<'_, PolicyState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, PolicyState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn save_state(persistence: &dyn KeyValueStore, state: &PolicyState) -> Result<(), PolicyError> {
    let encoded = snapshot::encode(state)?;
    persistence.set_item(POLICY_STORE_KEY, encoded).await
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::kv::{MemoryKeyValueStore, StoreFuture};

    /// Holds back writes of snapshots without a backend block, so an older
    /// snapshot would land after a newer one if writes were not ordered.
    struct SlowStaleWrites {
        inner: MemoryKeyValueStore,
    }

    impl KeyValueStore for SlowStaleWrites {
        fn get_item<'a>(&'a self, name: &'a str) -> StoreFuture<'a, Option<String>> {
            self.inner.get_item(name)
        }

        fn set_item<'a>(&'a self, name: &'a str, value: String) -> StoreFuture<'a, ()> {
            Box::pin(async move {
                if !value.contains("\"blockBackend\":true") {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
                self.inner.set_item(name, value).await
            })
        }

        fn remove_item<'a>(&'a self, name: &'a str) -> StoreFuture<'a, ()> {
            self.inner.remove_item(name)
        }
    }

    #[tokio::test]
    async fn mutations_are_persisted_and_reloaded() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let store = PolicyStore::load(kv.clone()).await;

        store
            .set_feature_blocking("markets", FeatureBlockingPatch::source(DataSource::Primary, true))
            .await
            .expect("persisted");
        store
            .set_global_blocking(GlobalBlockingPatch::provider(Provider::CoinGecko, true))
            .await
            .expect("persisted");

        let reloaded = PolicyStore::load(kv).await;
        assert!(reloaded.is_feature_source_blocked("markets", DataSource::Primary));
        assert!(reloaded.is_global_blocked(Provider::CoinGecko));
        assert_eq!(reloaded.snapshot(), store.snapshot());
    }

    #[tokio::test]
    async fn reset_restores_defaults() {
        let store = PolicyStore::in_memory();
        store
            .set_global_preferences(GlobalPreferencesPatch {
                preferred_data_source: Some(DataSource::Secondary),
                enable_fallback: Some(false),
            })
            .await
            .expect("in-memory store never fails");
        store.reset().await.expect("in-memory store never fails");

        assert_eq!(store.snapshot(), PolicyState::default());
    }

    #[tokio::test]
    async fn legacy_snapshot_is_migrated_and_rewritten() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        kv.set_item(
            POLICY_STORE_KEY,
            String::from(r#"{"state":{"featureBlocking":{"dominance":{"blockCoinGecko":true}}},"version":0}"#),
        )
        .await
        .expect("seed");

        let store = PolicyStore::load(kv.clone()).await;
        assert!(store.is_feature_source_blocked("dominance", DataSource::Secondary));

        let rewritten = kv
            .get_item(POLICY_STORE_KEY)
            .await
            .expect("read")
            .expect("rewritten snapshot present");
        assert!(rewritten.contains("\"version\":1"));
        assert!(rewritten.contains("blockSecondary"));
    }

    #[tokio::test]
    async fn corrupt_snapshot_falls_back_to_defaults() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        kv.set_item(POLICY_STORE_KEY, String::from("not json"))
            .await
            .expect("seed");

        let store = PolicyStore::load(kv).await;
        assert_eq!(store.snapshot(), PolicyState::default());
    }

    #[tokio::test]
    async fn concurrent_mutations_persist_the_latest_state() {
        let kv = Arc::new(SlowStaleWrites {
            inner: MemoryKeyValueStore::new(),
        });
        let store = PolicyStore::load(kv.clone()).await;

        let (feature, global) = tokio::join!(
            store.set_feature_blocking("markets", FeatureBlockingPatch::source(DataSource::Primary, true)),
            store.set_global_blocking(GlobalBlockingPatch::provider(Provider::Backend, true)),
        );
        feature.expect("persisted");
        global.expect("persisted");

        let reloaded = PolicyStore::load(kv).await;
        assert!(reloaded.is_global_blocked(Provider::Backend));
        assert!(reloaded.is_feature_source_blocked("markets", DataSource::Primary));
        assert_eq!(reloaded.snapshot(), store.snapshot());
    }
}
