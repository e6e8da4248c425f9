//! Typed extraction helpers over the untyped JSON request body every verb
//! receives — parse into sum types at the edge rather than threading raw
//! JSON deeper into the engine.

use serde_json::Value as Json;

use crate::error::{ActionError, ActionResult};

pub fn str_field<'a>(params: &'a Json, field: &str) -> ActionResult<&'a str> {
    params.get(field).and_then(Json::as_str).ok_or_else(|| ActionError::missing(field))
}

pub fn opt_str_field<'a>(params: &'a Json, field: &str) -> Option<&'a str> {
    params.get(field).and_then(Json::as_str)
}

pub fn u32_field(params: &Json, field: &str) -> ActionResult<u32> {
    params
        .get(field)
        .and_then(Json::as_u64)
        .map(|n| n as u32)
        .ok_or_else(|| ActionError::missing(field))
}

pub fn opt_bool_field(params: &Json, field: &str) -> Option<bool> {
    params.get(field).and_then(Json::as_bool)
}

pub fn parse_id<T: std::str::FromStr>(raw: &str, field: &str) -> ActionResult<T> {
    raw.parse::<T>().map_err(|_| ActionError::validation(format!("'{field}' is not a valid id")))
}

/// `via` may be a single link id string, or an array of link ids.
pub fn via_hops(params: &Json) -> ActionResult<Vec<String>> {
    match params.get("via") {
        Some(Json::String(s)) => Ok(vec![s.clone()]),
        Some(Json::Array(items)) => items
            .iter()
            .map(|v| v.as_str().map(str::to_string).ok_or_else(|| ActionError::validation("via entries must be strings")))
            .collect(),
        _ => Err(ActionError::missing("via")),
    }
}
