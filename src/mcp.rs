use serde_json::Value;

// tools/call result: one text block plus the structured output.
// `isError` is present only when set.
fn mcp_wrap(structured: Value, text_opt: Option<String>, is_error: bool) -> Value {
    let text = match text_opt {
        Some(s) => s,
        None => serde_json::to_string(&structured).unwrap_or_else(|_| "{}".to_string()),
    };
    let mut obj = serde_json::json!({
        "content": [{ "type": "text", "text": text }],
        "structuredContent": structured,
    });
    if is_error {
        if let Some(map) = obj.as_object_mut() {
            map.insert("isError".to_string(), Value::Bool(true));
        }
    }
    obj
}

// Wrap a serializable tool output; the error flag follows its `error` field.
pub fn wrap_output<T: serde::Serialize>(output: &T) -> Value {
    let structured = serde_json::to_value(output).unwrap_or_else(|e| {
        serde_json::json!({ "error": { "code": "server_error", "message": e.to_string(), "retriable": false } })
    });
    let is_error = structured.get("error").is_some_and(|e| !e.is_null());
    let text = structured
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .map(str::to_string);
    mcp_wrap(structured, text, is_error)
}
