use crate::error::CliError;
use crate::output::Response;

use super::Context;

pub fn run(context: &Context) -> Result<Response, CliError> {
    let endpoints = context.registry.snapshot();
    Ok(Response::ok(serde_json::to_value(endpoints)?))
}
