//! Operation discovery in OpenAPI 3 documents.

use super::types::ExtensionOperation;
use crate::types::FunctionDeclaration;
use crate::{Error, ErrorContext, Result};
use serde_json::{json, Map, Value};

const METHODS: &[&str] = &["get", "post", "put", "patch", "delete"];

/// One operation per `paths.{path}.{method}.operationId`, ordered by path.
pub fn operations_from_openapi(yaml: &str) -> Result<Vec<ExtensionOperation>> {
    let doc: Value = serde_yaml::from_str(yaml)?;
    let paths = doc.get("paths").and_then(Value::as_object).ok_or_else(|| {
        Error::validation_with_context(
            "OpenAPI document has no paths",
            ErrorContext::new().with_field_path("manifest.api_spec.open_api_yaml"),
        )
    })?;
    let mut ops = Vec::new();
    for (path, item) in paths {
        for method in METHODS {
            let Some(op) = item.get(*method) else {
                continue;
            };
            let Some(id) = op.get("operationId").and_then(Value::as_str) else {
                return Err(Error::validation_with_context(
                    format!("{} {} has no operationId", method.to_uppercase(), path),
                    ErrorContext::new().with_field_path(format!("paths.{}.{}", path, method)),
                ));
            };
            let description = op
                .get("description")
                .or_else(|| op.get("summary"))
                .and_then(Value::as_str)
                .map(String::from);
            ops.push(ExtensionOperation {
                operation_id: id.to_string(),
                function_declaration: Some(FunctionDeclaration {
                    name: id.to_string(),
                    description,
                    parameters: parameters_schema(op),
                }),
            });
        }
    }
    Ok(ops)
}

pub fn operation_ids_from_openapi(yaml: &str) -> Result<Vec<String>> {
    Ok(operations_from_openapi(yaml)?
        .into_iter()
        .map(|op| op.operation_id)
        .collect())
}

/// JSON request body schema if present, otherwise an object schema built from `parameters`.
fn parameters_schema(op: &Value) -> Option<Value> {
    if let Some(schema) = op.pointer("/requestBody/content/application~1json/schema") {
        return Some(schema.clone());
    }
    let params = op.get("parameters")?.as_array()?;
    let mut properties = Map::new();
    let mut required = Vec::new();
    for p in params {
        let Some(name) = p.get("name").and_then(Value::as_str) else {
            continue;
        };
        let mut schema = p.get("schema").cloned().unwrap_or_else(|| json!({"type": "string"}));
        if let (Some(desc), Some(obj)) = (p.get("description"), schema.as_object_mut()) {
            obj.entry("description").or_insert_with(|| desc.clone());
        }
        properties.insert(name.to_string(), schema);
        if p.get("required").and_then(Value::as_bool).unwrap_or(false) {
            required.push(json!(name));
        }
    }
    let mut schema = json!({"type": "object", "properties": properties});
    if !required.is_empty() {
        schema["required"] = Value::Array(required);
    }
    Some(schema)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEC: &str = r#"
openapi: "3.0.0"
info:
  title: weather
  version: "1"
paths:
  /forecast:
    get:
      operationId: get_forecast
      summary: Forecast for a city
      parameters:
        - name: city
          in: query
          required: true
          description: City name
          schema:
            type: string
  /alerts:
    post:
      operationId: create_alert
      requestBody:
        content:
          application/json:
            schema:
              type: object
              properties:
                threshold: {type: number}
"#;

    #[test]
    fn discovers_operations_and_schemas() {
        let ops = operations_from_openapi(SPEC).unwrap();
        let ids: Vec<&str> = ops.iter().map(|o| o.operation_id.as_str()).collect();
        assert!(ids.contains(&"get_forecast") && ids.contains(&"create_alert"));
        let forecast = ops.iter().find(|o| o.operation_id == "get_forecast").unwrap();
        let decl = forecast.function_declaration.as_ref().unwrap();
        assert_eq!(decl.description.as_deref(), Some("Forecast for a city"));
        let params = decl.parameters.as_ref().unwrap();
        assert_eq!(params["required"][0], "city");
        assert_eq!(params["properties"]["city"]["description"], "City name");
        let alert = ops.iter().find(|o| o.operation_id == "create_alert").unwrap();
        assert_eq!(
            alert.function_declaration.as_ref().unwrap().parameters.as_ref().unwrap()["properties"]["threshold"]["type"],
            "number"
        );
    }

    #[test]
    fn missing_paths_or_ids_rejected() {
        assert!(operations_from_openapi("openapi: 3.0.0").is_err());
        assert!(operations_from_openapi("paths:\n  /x:\n    get:\n      summary: no id\n").is_err());
        assert!(operations_from_openapi("paths: [unclosed").is_err());
    }
}
