//! Scripted in-memory transport shared by the behaviour tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use coinsight_core::endpoint::default_endpoints;
use coinsight_core::http_client::HttpFuture;
use coinsight_core::{
    ClientConfig, FeatureGateway, HttpClient, HttpError, HttpRequest, HttpResponse,
    InMemoryEndpointRegistry, PolicyStore, RequestDispatcher,
};

pub const BACKEND_URL: &str = "https://backend.test/api";
pub const COINGECKO_URL: &str = "https://gecko.test/api/v3";

/// Canned reply for requests whose URL starts with a given prefix.
#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16, String),
    Error(HttpError),
    /// Never resolves; only the dispatcher timeout ends the call.
    Hang,
}

impl Reply {
    pub fn json(body: &str) -> Self {
        Self::Status(200, body.to_owned())
    }
}

#[derive(Default)]
pub struct ScriptedHttpClient {
    routes: Vec<(String, Reply)>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, url_prefix: &str, reply: Reply) -> Self {
        self.routes.push((url_prefix.to_owned(), reply));
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }

    pub fn calls_to(&self, url_prefix: &str) -> usize {
        self.requests()
            .iter()
            .filter(|request| request.url.starts_with(url_prefix))
            .count()
    }
}

impl HttpClient for ScriptedHttpClient {
    fn execute<'a>(&'a self, request: HttpRequest) -> HttpFuture<'a> {
        Box::pin(async move {
            let reply = self
                .routes
                .iter()
                .find(|(prefix, _)| request.url.starts_with(prefix.as_str()))
                .map(|(_, reply)| reply.clone());
            self.requests.lock().expect("requests lock").push(request);

            match reply {
                Some(Reply::Status(status, body)) => Ok(HttpResponse::new(status, body)),
                Some(Reply::Error(error)) => Err(error),
                Some(Reply::Hang) => std::future::pending().await,
                None => Err(HttpError::connect("no scripted route")),
            }
        })
    }
}

pub fn test_config() -> ClientConfig {
    ClientConfig::builder()
        .backend_url(BACKEND_URL)
        .coingecko_url(COINGECKO_URL)
        .home(std::env::temp_dir().join("coinsight-tests"))
        .build()
}

/// Registry, transport and policy wired the way the CLI wires them.
pub struct Harness {
    pub registry: Arc<InMemoryEndpointRegistry>,
    pub http: Arc<ScriptedHttpClient>,
    pub policy: Arc<PolicyStore>,
}

impl Harness {
    pub fn new(http: ScriptedHttpClient) -> Self {
        Self::with_policy(http, PolicyStore::in_memory())
    }

    pub fn with_policy(http: ScriptedHttpClient, policy: PolicyStore) -> Self {
        Self {
            registry: Arc::new(InMemoryEndpointRegistry::new(default_endpoints(&test_config()))),
            http: Arc::new(http),
            policy: Arc::new(policy),
        }
    }

    pub fn dispatcher(&self) -> RequestDispatcher {
        RequestDispatcher::new(self.registry.clone(), self.http.clone())
    }

    pub fn gateway(&self) -> FeatureGateway {
        FeatureGateway::new(self.dispatcher(), self.policy.clone())
    }
}
