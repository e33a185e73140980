use std::collections::BTreeMap;

use serde::Serialize;

use coinsight_core::feeds::{DOMINANCE_FEATURE, MARKETS_FEATURE};
use coinsight_core::policy::{
    EffectivePreferences, FeatureBlockingPatch, FeaturePreferencesPatch, GlobalBlockingPatch,
    GlobalPreferencesPatch, PolicyState,
};
use coinsight_core::{DataSource, PolicyStore, Provider, ValidationError};

use crate::cli::{FeatureSourceArgs, PolicyArgs, PolicyCommand, PreferArgs, ProviderArgs};
use crate::error::CliError;
use crate::output::Response;

use super::Context;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PolicyView {
    state: PolicyState,
    effective: BTreeMap<String, EffectivePreferences>,
}

pub async fn run(args: &PolicyArgs, context: &Context) -> Result<Response, CliError> {
    let policy = context.policy.as_ref();

    match &args.command {
        PolicyCommand::Show => {}
        PolicyCommand::Block(args) => set_feature_source(policy, args, true).await?,
        PolicyCommand::Unblock(args) => set_feature_source(policy, args, false).await?,
        PolicyCommand::GlobalBlock(args) => set_provider(policy, args, true).await?,
        PolicyCommand::GlobalUnblock(args) => set_provider(policy, args, false).await?,
        PolicyCommand::Prefer(args) => prefer(policy, args).await?,
        PolicyCommand::Reset => policy.reset().await?,
    }

    Ok(Response::ok(serde_json::to_value(view(policy))?))
}

fn view(policy: &PolicyStore) -> PolicyView {
    let state = policy.snapshot();
    let effective = [DOMINANCE_FEATURE, MARKETS_FEATURE]
        .into_iter()
        .map(String::from)
        .chain(state.feature_preferences.keys().cloned())
        .chain(state.feature_blocking.keys().cloned())
        .map(|feature| {
            let preferences = state.effective_preferences(&feature);
            (feature, preferences)
        })
        .collect();

    PolicyView { state, effective }
}

async fn set_feature_source(
    policy: &PolicyStore,
    args: &FeatureSourceArgs,
    blocked: bool,
) -> Result<(), CliError> {
    let feature = feature_id(&args.feature)?;
    let source: DataSource = args.source.parse()?;
    policy
        .set_feature_blocking(feature, FeatureBlockingPatch::source(source, blocked))
        .await?;
    Ok(())
}

async fn set_provider(policy: &PolicyStore, args: &ProviderArgs, blocked: bool) -> Result<(), CliError> {
    let provider: Provider = args.provider.parse()?;
    policy
        .set_global_blocking(GlobalBlockingPatch::provider(provider, blocked))
        .await?;
    Ok(())
}

async fn prefer(policy: &PolicyStore, args: &PreferArgs) -> Result<(), CliError> {
    let preferred_data_source = args
        .source
        .as_deref()
        .map(str::parse::<DataSource>)
        .transpose()?;

    match args.feature.as_deref() {
        Some(feature) => {
            let feature = feature_id(feature)?;
            // Naming a feature without --use-global means the override should take effect.
            let patch = FeaturePreferencesPatch {
                preferred_data_source,
                enable_fallback: args.fallback,
                use_global_preferences: Some(args.use_global.unwrap_or(false)),
            };
            policy.set_feature_preferences(feature, patch).await?;
        }
        None => {
            if args.use_global.is_some() {
                return Err(CliError::Command(String::from(
                    "--use-global only applies together with --feature",
                )));
            }
            let patch = GlobalPreferencesPatch {
                preferred_data_source,
                enable_fallback: args.fallback,
            };
            policy.set_global_preferences(patch).await?;
        }
    }
    Ok(())
}

fn feature_id(raw: &str) -> Result<&str, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyFeatureId);
    }
    Ok(trimmed)
}
