//! Versioned policy snapshots.
//!
//! Snapshots are stored as `{"version": N, "state": {...}}`. Older versions
//! are decoded with their own types and converted forward, so user-configured
//! blocking survives a schema change instead of resetting.
//!
//! | Version | Change |
//! |---------|--------|
//! | 0 | feature blocking keyed as `blockBackend` / `blockCoinGecko` |
//! | 1 | feature blocking keyed as `blockPrimary` / `blockSecondary` |

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PolicyError;
use crate::policy::state::{
    FeatureBlockingState, FeatureDataSourcePreferences, GlobalBlockingState,
    GlobalDataSourcePreferences, PolicyState,
};

pub const CURRENT_VERSION: u32 = 1;

#[derive(Debug, Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    state: &'a PolicyState,
}

#[derive(Debug, Deserialize)]
struct RawSnapshot {
    #[serde(default)]
    version: u32,
    state: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyFeatureBlocking {
    #[serde(default)]
    block_backend: bool,
    #[serde(rename = "blockCoinGecko", default)]
    block_coingecko: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PolicyStateV0 {
    #[serde(default)]
    feature_blocking: BTreeMap<String, LegacyFeatureBlocking>,
    #[serde(default)]
    global_blocking: GlobalBlockingState,
    #[serde(default)]
    feature_preferences: BTreeMap<String, FeatureDataSourcePreferences>,
    #[serde(default)]
    global_preferences: GlobalDataSourcePreferences,
}

impl From<PolicyStateV0> for PolicyState {
    fn from(legacy: PolicyStateV0) -> Self {
        let feature_blocking = legacy
            .feature_blocking
            .into_iter()
            .map(|(feature_id, flags)| {
                (
                    feature_id,
                    FeatureBlockingState {
                        block_primary: flags.block_backend,
                        block_secondary: flags.block_coingecko,
                    },
                )
            })
            .collect();

        Self {
            feature_blocking,
            global_blocking: legacy.global_blocking,
            feature_preferences: legacy.feature_preferences,
            global_preferences: legacy.global_preferences,
        }
    }
}

/// A decoded snapshot and the version it was stored at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedSnapshot {
    pub state: PolicyState,
    pub stored_version: u32,
}

impl LoadedSnapshot {
    pub fn was_migrated(&self) -> bool {
        self.stored_version < CURRENT_VERSION
    }
}

pub fn encode(state: &PolicyState) -> Result<String, PolicyError> {
    let snapshot = SnapshotRef {
        version: CURRENT_VERSION,
        state,
    };
    Ok(serde_json::to_string(&snapshot)?)
}

/// Decodes any supported snapshot version into the current [`PolicyState`].
///
/// A document without a `state` wrapper is read as a bare version-0 state.
pub fn decode(raw: &str) -> Result<LoadedSnapshot, PolicyError> {
    let document: Value = serde_json::from_str(raw)?;
    let RawSnapshot { version, state } = if document.get("state").is_some() {
        serde_json::from_value(document)?
    } else {
        RawSnapshot {
            version: 0,
            state: document,
        }
    };

    let state = match version {
        0 => serde_json::from_value::<PolicyStateV0>(state)?.into(),
        CURRENT_VERSION => serde_json::from_value::<PolicyState>(state)?,
        found => {
            return Err(PolicyError::UnsupportedVersion {
                found,
                supported: CURRENT_VERSION,
            })
        }
    };

    Ok(LoadedSnapshot {
        state,
        stored_version: version,
    })
}
