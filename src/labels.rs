use serde::Serialize;
use serde_json::Value;

use crate::error::TransportError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeLabel {
    pub name: String,
}

/// Normalizes a `nodeLabels` payload into a list.
///
/// The field may hold one label or a list of labels; absent, null and empty values yield
/// no labels. Some servers send the document as a JSON string, so one level of string
/// wrapping is unwrapped first. Anything else is a malformed response.
pub fn normalize_node_labels(payload: &Value) -> Result<Vec<NodeLabel>, TransportError> {
    let unwrapped;
    let payload = match payload {
        Value::String(raw) => {
            unwrapped = serde_json::from_str::<Value>(raw)
                .map_err(|e| TransportError::decode(format!("nodeLabels body: {e}")))?;
            &unwrapped
        }
        other => other,
    };

    let label = |v: &Value| match v {
        Value::String(name) => Ok(NodeLabel { name: name.clone() }),
        other => Err(TransportError::decode(format!(
            "nodeLabels entry is not a string: {other}"
        ))),
    };
    match payload.get("nodeLabels") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) if s.is_empty() => Ok(Vec::new()),
        Some(v @ Value::String(_)) => Ok(vec![label(v)?]),
        Some(Value::Array(items)) => items.iter().map(label).collect(),
        Some(other) => Err(TransportError::decode(format!(
            "nodeLabels is neither a string nor a list: {other}"
        ))),
    }
}
