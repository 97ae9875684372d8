use serde_json::Value;

pub fn get_str<'a>(params: &'a Value, key: &str) -> Option<&'a str> {
    params.get(key).and_then(|v| v.as_str())
}

/// Trimmed string param; blank counts as absent.
pub fn optional_trimmed(params: &Value, key: &str) -> Option<String> {
    get_str(params, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// `null` and a missing key are both `None`; any other non-integer is an error.
pub fn optional_i64(params: &Value, key: &str) -> Result<Option<i64>, String> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_i64()
            .map(Some)
            .ok_or_else(|| format!("{} must be integer", key)),
    }
}

pub fn optional_bool(params: &Value, key: &str) -> Result<Option<bool>, String> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_bool()
            .map(Some)
            .ok_or_else(|| format!("{} must be boolean", key)),
    }
}

pub fn string_list(params: &Value, key: &str) -> Result<Vec<String>, String> {
    let Some(arr) = params.get(key).and_then(|v| v.as_array()) else {
        return Err(format!("{} must be an array of strings", key));
    };
    arr.iter()
        .map(|v| {
            v.as_str()
                .map(str::to_string)
                .ok_or_else(|| format!("{} must be an array of strings", key))
        })
        .collect()
}
