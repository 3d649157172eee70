//! Long-running operations.

use crate::types::Status;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `google.longrunning.Operation`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Operation {
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
}

impl Operation {
    /// Heuristic used on create/delete replies: operation names live under `/operations/`.
    pub fn looks_like(value: &Value) -> bool {
        value
            .get("name")
            .and_then(Value::as_str)
            .map(|n| n.contains("/operations/"))
            .unwrap_or(false)
    }

    /// Result of a finished operation, with the `@type` marker removed from the payload.
    pub fn into_result(self) -> Result<Value> {
        if let Some(status) = self.error {
            return Err(Error::Operation {
                name: self.name,
                message: format!("{} (code {})", status.message, status.code),
            });
        }
        let mut response = self.response.unwrap_or_else(|| Value::Object(Default::default()));
        if let Some(obj) = response.as_object_mut() {
            obj.remove("@type");
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detects_operation_names() {
        assert!(Operation::looks_like(&json!({
            "name": "projects/p/locations/l/datasets/1/operations/99"
        })));
        assert!(!Operation::looks_like(&json!({"name": "projects/p/locations/l/datasets/1"})));
    }

    #[test]
    fn finished_operation_yields_response() {
        let op: Operation = serde_json::from_value(json!({
            "name": "projects/p/locations/l/operations/1",
            "done": true,
            "response": {"@type": "type.googleapis.com/google.cloud.aiplatform.v1beta1.Dataset", "name": "ds"}
        }))
        .unwrap();
        assert_eq!(op.into_result().unwrap(), json!({"name": "ds"}));
    }

    #[test]
    fn failed_operation_is_an_error() {
        let op: Operation = serde_json::from_value(json!({
            "name": "projects/p/locations/l/operations/2",
            "done": true,
            "error": {"code": 3, "message": "bad spec"}
        }))
        .unwrap();
        let err = op.into_result().unwrap_err();
        assert!(matches!(err, Error::Operation { .. }));
        assert!(err.to_string().contains("bad spec"));
    }
}
