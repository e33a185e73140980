use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{DataSource, Provider};

/// Per-feature source blocking flags. Unknown features are never blocked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureBlockingState {
    #[serde(default)]
    pub block_primary: bool,
    #[serde(default)]
    pub block_secondary: bool,
}

impl FeatureBlockingState {
    pub const fn is_blocked(self, source: DataSource) -> bool {
        match source {
            DataSource::Primary => self.block_primary,
            DataSource::Secondary => self.block_secondary,
        }
    }
}

/// Process-wide provider blocking flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalBlockingState {
    #[serde(rename = "blockBackend", default)]
    pub block_backend: bool,
    #[serde(rename = "blockCoinGecko", default)]
    pub block_coingecko: bool,
}

impl GlobalBlockingState {
    pub const fn is_blocked(self, provider: Provider) -> bool {
        match provider {
            Provider::Backend => self.block_backend,
            Provider::CoinGecko => self.block_coingecko,
        }
    }
}

/// A feature's own source preference, optionally deferring to the global one.
///
/// While `use_global_preferences` is set the other two fields are ignored but kept,
/// so flipping it back restores the feature's override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureDataSourcePreferences {
    pub preferred_data_source: DataSource,
    pub enable_fallback: bool,
    pub use_global_preferences: bool,
}

impl Default for FeatureDataSourcePreferences {
    fn default() -> Self {
        Self {
            preferred_data_source: DataSource::Primary,
            enable_fallback: true,
            use_global_preferences: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalDataSourcePreferences {
    pub preferred_data_source: DataSource,
    pub enable_fallback: bool,
}

impl Default for GlobalDataSourcePreferences {
    fn default() -> Self {
        Self {
            preferred_data_source: DataSource::Primary,
            enable_fallback: true,
        }
    }
}

/// Resolved preference pair a feature acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectivePreferences {
    pub preferred_data_source: DataSource,
    pub enable_fallback: bool,
}

impl From<GlobalDataSourcePreferences> for EffectivePreferences {
    fn from(value: GlobalDataSourcePreferences) -> Self {
        Self {
            preferred_data_source: value.preferred_data_source,
            enable_fallback: value.enable_fallback,
        }
    }
}

/// Partial update for [`FeatureBlockingState`]; `None` fields are left alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureBlockingPatch {
    pub block_primary: Option<bool>,
    pub block_secondary: Option<bool>,
}

impl FeatureBlockingPatch {
    pub fn source(source: DataSource, blocked: bool) -> Self {
        match source {
            DataSource::Primary => Self {
                block_primary: Some(blocked),
                ..Self::default()
            },
            DataSource::Secondary => Self {
                block_secondary: Some(blocked),
                ..Self::default()
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GlobalBlockingPatch {
    pub block_backend: Option<bool>,
    pub block_coingecko: Option<bool>,
}

impl GlobalBlockingPatch {
    pub fn provider(provider: Provider, blocked: bool) -> Self {
        match provider {
            Provider::Backend => Self {
                block_backend: Some(blocked),
                ..Self::default()
            },
            Provider::CoinGecko => Self {
                block_coingecko: Some(blocked),
                ..Self::default()
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeaturePreferencesPatch {
    pub preferred_data_source: Option<DataSource>,
    pub enable_fallback: Option<bool>,
    pub use_global_preferences: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GlobalPreferencesPatch {
    pub preferred_data_source: Option<DataSource>,
    pub enable_fallback: Option<bool>,
}

/// The four policy partitions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyState {
    #[serde(default)]
    pub feature_blocking: BTreeMap<String, FeatureBlockingState>,
    #[serde(default)]
    pub global_blocking: GlobalBlockingState,
    #[serde(default)]
    pub feature_preferences: BTreeMap<String, FeatureDataSourcePreferences>,
    #[serde(default)]
    pub global_preferences: GlobalDataSourcePreferences,
}

impl PolicyState {
    pub fn feature_blocking(&self, feature_id: &str) -> FeatureBlockingState {
        self.feature_blocking
            .get(feature_id)
            .copied()
            .unwrap_or_default()
    }

    pub fn is_feature_source_blocked(&self, feature_id: &str, source: DataSource) -> bool {
        self.feature_blocking(feature_id).is_blocked(source)
    }

    pub fn is_global_blocked(&self, provider: Provider) -> bool {
        self.global_blocking.is_blocked(provider)
    }

    /// Global blocks win: a feature cannot opt out of a provider-wide block.
    pub fn is_blocked(&self, feature_id: &str, endpoint_key: &str, source: DataSource) -> bool {
        let globally_blocked = Provider::ALL
            .into_iter()
            .any(|provider| provider.identifies(endpoint_key) && self.is_global_blocked(provider));

        globally_blocked || self.is_feature_source_blocked(feature_id, source)
    }

    pub fn effective_preferences(&self, feature_id: &str) -> EffectivePreferences {
        match self.feature_preferences.get(feature_id) {
            Some(own) if !own.use_global_preferences => EffectivePreferences {
                preferred_data_source: own.preferred_data_source,
                enable_fallback: own.enable_fallback,
            },
            _ => self.global_preferences.into(),
        }
    }

    pub fn apply_feature_blocking(&mut self, feature_id: &str, patch: FeatureBlockingPatch) {
        let entry = self
            .feature_blocking
            .entry(feature_id.to_owned())
            .or_default();
        if let Some(value) = patch.block_primary {
            entry.block_primary = value;
        }
        if let Some(value) = patch.block_secondary {
            entry.block_secondary = value;
        }
    }

    pub fn apply_global_blocking(&mut self, patch: GlobalBlockingPatch) {
        if let Some(value) = patch.block_backend {
            self.global_blocking.block_backend = value;
        }
        if let Some(value) = patch.block_coingecko {
            self.global_blocking.block_coingecko = value;
        }
    }

    pub fn apply_feature_preferences(&mut self, feature_id: &str, patch: FeaturePreferencesPatch) {
        let entry = self
            .feature_preferences
            .entry(feature_id.to_owned())
            .or_default();
        if let Some(value) = patch.preferred_data_source {
            entry.preferred_data_source = value;
        }
        if let Some(value) = patch.enable_fallback {
            entry.enable_fallback = value;
        }
        if let Some(value) = patch.use_global_preferences {
            entry.use_global_preferences = value;
        }
    }

    pub fn apply_global_preferences(&mut self, patch: GlobalPreferencesPatch) {
        if let Some(value) = patch.preferred_data_source {
            self.global_preferences.preferred_data_source = value;
        }
        if let Some(value) = patch.enable_fallback {
            self.global_preferences.enable_fallback = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unseen_feature_is_never_blocked() {
        let state = PolicyState::default();
        assert!(!state.is_feature_source_blocked("dominance", DataSource::Primary));
        assert!(!state.is_feature_source_blocked("dominance", DataSource::Secondary));
        assert!(!state.is_blocked("dominance", "BACKEND_DOMINANCE", DataSource::Primary));
    }

    #[test]
    fn global_block_overrides_unblocked_feature() {
        let mut state = PolicyState::default();
        state.apply_global_blocking(GlobalBlockingPatch::provider(Provider::Backend, true));
        state.apply_feature_blocking("dominance", FeatureBlockingPatch::source(DataSource::Primary, false));

        assert!(state.is_blocked("dominance", "BACKEND_DOMINANCE", DataSource::Primary));
        assert!(!state.is_blocked("dominance", "COINGECKO_GLOBAL", DataSource::Secondary));
    }

    #[test]
    fn feature_block_applies_to_any_endpoint_of_that_source() {
        let mut state = PolicyState::default();
        state.apply_feature_blocking("markets", FeatureBlockingPatch::source(DataSource::Secondary, true));

        assert!(state.is_blocked("markets", "COINGECKO_MARKETS", DataSource::Secondary));
        assert!(!state.is_blocked("markets", "BACKEND_MARKETS", DataSource::Primary));
        assert!(!state.is_blocked("dominance", "COINGECKO_MARKETS", DataSource::Secondary));
    }

    #[test]
    fn patches_merge_instead_of_replacing() {
        let mut state = PolicyState::default();
        state.apply_feature_blocking("markets", FeatureBlockingPatch::source(DataSource::Primary, true));
        state.apply_feature_blocking("markets", FeatureBlockingPatch::source(DataSource::Secondary, true));

        assert_eq!(
            state.feature_blocking("markets"),
            FeatureBlockingState {
                block_primary: true,
                block_secondary: true,
            }
        );
    }

    #[test]
    fn effective_preferences_follow_use_global_toggle() {
        let mut state = PolicyState::default();
        state.apply_global_preferences(GlobalPreferencesPatch {
            enable_fallback: Some(false),
            ..GlobalPreferencesPatch::default()
        });
        state.apply_feature_preferences(
            "dominance",
            FeaturePreferencesPatch {
                preferred_data_source: Some(DataSource::Secondary),
                use_global_preferences: Some(false),
                ..FeaturePreferencesPatch::default()
            },
        );

        let own = state.effective_preferences("dominance");
        assert_eq!(own.preferred_data_source, DataSource::Secondary);
        assert!(own.enable_fallback);

        state.apply_feature_preferences(
            "dominance",
            FeaturePreferencesPatch {
                use_global_preferences: Some(true),
                ..FeaturePreferencesPatch::default()
            },
        );
        let inherited = state.effective_preferences("dominance");
        assert_eq!(inherited.preferred_data_source, DataSource::Primary);
        assert!(!inherited.enable_fallback);

        // Override values stay latent while inheriting.
        let stored = state.feature_preferences["dominance"];
        assert_eq!(stored.preferred_data_source, DataSource::Secondary);
    }

    #[test]
    fn unseen_feature_inherits_global_preferences() {
        let state = PolicyState::default();
        assert_eq!(
            state.effective_preferences("anything"),
            EffectivePreferences {
                preferred_data_source: DataSource::Primary,
                enable_fallback: true,
            }
        );
    }
}
