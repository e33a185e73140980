//! Blocking and source-preference policy.
//!
//! | Partition | Scope | Default |
//! |-----------|-------|---------|
//! | feature blocking | per feature id | nothing blocked |
//! | global blocking | per provider | nothing blocked |
//! | feature preferences | per feature id | inherit global |
//! | global preferences | process | primary, fallback enabled |

mod snapshot;
mod state;
mod store;

pub use snapshot::{decode as decode_snapshot, encode as encode_snapshot, LoadedSnapshot, CURRENT_VERSION};
pub use state::{
    EffectivePreferences, FeatureBlockingPatch, FeatureBlockingState,
    FeatureDataSourcePreferences, FeaturePreferencesPatch, GlobalBlockingPatch,
    GlobalBlockingState, GlobalDataSourcePreferences, GlobalPreferencesPatch, PolicyState,
};
pub use store::{PolicyStore, POLICY_STORE_KEY};
