use serde::de::DeserializeOwned;

use crate::ipc::error::err;
use crate::ipc::types::Request;

/// Required string param; the `Err` side is a ready-made response.
pub fn str_param<'a>(req: &'a Request, key: &str) -> Result<&'a str, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {key}"), None))
}

/// Required param decoded with serde.
pub fn parse_param<T: DeserializeOwned>(req: &Request, key: &str) -> Result<T, serde_json::Value> {
    let Some(raw) = req.params.get(key) else {
        return Err(err(&req.id, "bad_params", format!("missing {key}"), None));
    };
    serde_json::from_value(raw.clone())
        .map_err(|e| err(&req.id, "bad_params", format!("invalid {key}: {e}"), None))
}

/// Optional param decoded with serde; JSON null counts as absent.
pub fn parse_opt_param<T: DeserializeOwned>(
    req: &Request,
    key: &str,
) -> Result<Option<T>, serde_json::Value> {
    match req.params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(_) => parse_param(req, key).map(Some),
    }
}
