use std::io::{self, Write};

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use coinsight_core::{DataSource, SourceAttemptError, UtcDateTime};

use crate::error::CliError;

/// JSON document written to stdout for every command.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub data: Value,
    pub meta: ResponseMeta,
    pub errors: Vec<ErrorRecord>,
    #[serde(skip)]
    pub failed: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    pub request_id: Uuid,
    pub generated_at: UtcDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_source: Option<DataSource>,
    pub source_chain: Vec<DataSource>,
    pub used_fallback: bool,
    pub warnings: Vec<String>,
    pub latency_ms: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<DataSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub blocked: bool,
}

impl From<&SourceAttemptError> for ErrorRecord {
    fn from(error: &SourceAttemptError) -> Self {
        Self {
            code: error.failure.code().to_owned(),
            message: error.failure.message().to_owned(),
            source: Some(error.source),
            status: error.failure.status(),
            blocked: error.blocked,
        }
    }
}

impl Response {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            meta: ResponseMeta {
                request_id: Uuid::new_v4(),
                generated_at: UtcDateTime::now(),
                selected_source: None,
                source_chain: Vec::new(),
                used_fallback: false,
                warnings: Vec::new(),
                latency_ms: 0,
            },
            errors: Vec::new(),
            failed: false,
        }
    }

    pub fn failed(mut self, code: &str, message: impl Into<String>) -> Self {
        self.errors.insert(
            0,
            ErrorRecord {
                code: code.to_owned(),
                message: message.into(),
                source: None,
                status: None,
                blocked: false,
            },
        );
        self.failed = true;
        self
    }

    pub fn with_source(mut self, selected: DataSource, used_fallback: bool) -> Self {
        self.meta.selected_source = Some(selected);
        self.meta.used_fallback = used_fallback;
        self
    }

    pub fn with_source_chain(mut self, source_chain: Vec<DataSource>) -> Self {
        self.meta.source_chain = source_chain;
        self
    }

    pub fn with_attempt_errors(mut self, errors: &[SourceAttemptError]) -> Self {
        self.errors.extend(errors.iter().map(ErrorRecord::from));
        self
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.meta.warnings.extend(warnings);
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.meta.latency_ms = latency_ms;
        self
    }
}

pub fn render(response: &Response, pretty: bool) -> Result<(), CliError> {
    let rendered = if pretty {
        serde_json::to_string_pretty(response)?
    } else {
        serde_json::to_string(response)?
    };

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{rendered}")?;
    Ok(())
}
