use serde_json::json;

use crate::ipc::error::err;

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

pub fn bad_params(message: impl Into<String>) -> HandlerErr {
    HandlerErr::new("bad_params", message)
}

pub fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| bad_params(format!("missing {}", key)))
}

/// Absent and explicit-null both mean "not provided".
pub fn get_optional_str(params: &serde_json::Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

pub fn get_required_i64(params: &serde_json::Value, key: &str) -> Result<i64, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| bad_params(format!("missing {}", key)))
}

pub fn get_required_u8(params: &serde_json::Value, key: &str) -> Result<u8, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_u64())
        .and_then(|v| u8::try_from(v).ok())
        .ok_or_else(|| bad_params(format!("missing {}", key)))
}

pub fn get_required_str_array(
    params: &serde_json::Value,
    key: &str,
) -> Result<Vec<String>, HandlerErr> {
    let Some(values) = params.get(key).and_then(|v| v.as_array()) else {
        return Err(bad_params(format!("missing {}", key)));
    };
    Ok(values
        .iter()
        .filter_map(|v| v.as_str().map(|s| s.to_string()))
        .collect())
}

/// Stamp a mutation result with its persistence outcome. The mutation itself
/// already succeeded in memory; a warning only means the write was lost.
pub fn attach_persistence(result: &mut serde_json::Value, warning: Option<String>) {
    result["persisted"] = json!(warning.is_none());
    if let Some(w) = warning {
        result["warning"] = json!(w);
    }
}

pub fn merge_warnings(warnings: Vec<Option<String>>) -> Option<String> {
    let collected: Vec<String> = warnings.into_iter().flatten().collect();
    if collected.is_empty() {
        None
    } else {
        Some(collected.join("; "))
    }
}
