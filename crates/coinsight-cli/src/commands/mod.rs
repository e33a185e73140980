mod coin;
mod dominance;
mod endpoints;
mod markets;
mod policy;

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use coinsight_core::{
    ClientConfig, FallbackResult, FeatureGateway, FileKeyValueStore, InMemoryEndpointRegistry,
    PolicyStore, ReqwestHttpClient, RequestDispatcher,
};

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::output::Response;

/// Shared wiring built once per invocation.
pub struct Context {
    pub config: ClientConfig,
    pub registry: Arc<InMemoryEndpointRegistry>,
    pub policy: Arc<PolicyStore>,
}

impl Context {
    pub async fn from_cli(cli: &Cli) -> Self {
        let mut builder = ClientConfig::builder().with_env();
        if let Some(timeout_ms) = cli.timeout_ms {
            builder = builder.timeout_ms(timeout_ms);
        }
        if let Some(home) = &cli.home {
            builder = builder.home(home.clone());
        }
        let config = builder.build();

        let policy = if cli.memory {
            PolicyStore::in_memory()
        } else {
            PolicyStore::load(Arc::new(FileKeyValueStore::new(config.store_dir()))).await
        };

        Self {
            registry: Arc::new(InMemoryEndpointRegistry::with_defaults(&config)),
            policy: Arc::new(policy),
            config,
        }
    }

    pub fn gateway(&self) -> FeatureGateway {
        let dispatcher = RequestDispatcher::new(
            self.registry.clone(),
            Arc::new(ReqwestHttpClient::default()),
        );
        FeatureGateway::new(dispatcher, self.policy.clone())
    }
}

pub async fn run(cli: &Cli) -> Result<Response, CliError> {
    let context = Context::from_cli(cli).await;

    match &cli.command {
        Command::Dominance => dominance::run(&context).await,
        Command::Markets(args) => markets::run(args, &context).await,
        Command::Coin(args) => coin::run(args, &context).await,
        Command::Policy(args) => policy::run(args, &context).await,
        Command::Endpoints => endpoints::run(&context),
    }
}

/// Converts a feed outcome into a response; failures keep every attempt's error.
fn from_fallback<T: Serialize>(outcome: FallbackResult<T>) -> Result<Response, CliError> {
    match outcome {
        Ok(success) => Ok(Response::ok(serde_json::to_value(&success.data)?)
            .with_source(success.selected_source, success.used_fallback)
            .with_source_chain(success.source_chain)
            .with_attempt_errors(&success.errors)
            .with_warnings(success.warnings)
            .with_latency(success.latency_ms)),
        Err(failure) => Ok(Response::ok(Value::Null)
            .failed(failure.code(), failure.message.as_str())
            .with_source_chain(failure.source_chain)
            .with_attempt_errors(&failure.errors)
            .with_latency(failure.latency_ms)),
    }
}
