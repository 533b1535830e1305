//! IPC command handlers.
//!
//! Each submodule implements the commands for one IPC category.

pub mod adjustments;
pub mod diagnostics;
pub mod payments;
pub mod payouts;
pub mod referrals;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::rpc::RpcError;

type Result = std::result::Result<Value, RpcError>;

/// Decode method params into a typed request.
pub(crate) fn parse<T: DeserializeOwned>(params: &Value) -> std::result::Result<T, RpcError> {
    let params = if params.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        params.clone()
    };
    serde_json::from_value(params).map_err(|e| RpcError::invalid_params(&e.to_string()))
}

/// Encode a handler result.
pub(crate) fn to_result<T: Serialize>(value: &T) -> Result {
    serde_json::to_value(value).map_err(|e| RpcError::internal_error(&format!("encode error: {e}")))
}

/// Current Unix time in seconds.
pub(crate) fn now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
