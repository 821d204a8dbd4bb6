//! Decodes list-endpoint request bodies into an optional [`Filter`].
//!
//! An empty JSON object (`{}`) means "no predicate, still apply
//! authorization" — the list endpoints never treat it as malformed.

use rlreg_domain::error::Error;
use rlreg_domain::filter::Filter;

use crate::api::error::ApiError;

pub fn parse_filter_body(body: serde_json::Value) -> Result<Option<Filter>, ApiError> {
    let serde_json::Value::Object(map) = body else {
        return Err(Error::Validation("filter body must be a JSON object".into()).into());
    };
    if map.is_empty() {
        return Ok(None);
    }
    serde_json::from_value(serde_json::Value::Object(map))
        .map(Some)
        .map_err(|e| Error::Validation(format!("invalid filter: {e}")).into())
}

/// Episode listing bodies are a filter merged with `include_tuples`.
pub fn parse_episode_list_body(body: serde_json::Value) -> Result<(Option<Filter>, bool), ApiError> {
    let serde_json::Value::Object(mut map) = body else {
        return Err(Error::Validation("filter body must be a JSON object".into()).into());
    };
    let include_tuples = map
        .remove("include_tuples")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let filter = parse_filter_body(serde_json::Value::Object(map))?;
    Ok((filter, include_tuples))
}
