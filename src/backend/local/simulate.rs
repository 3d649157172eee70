//! Collection-specific behavior of the local emulator.

use super::{new_id, paginate, parent_of, Store};
use crate::embeddings::{find_most_similar, simulated_embedding, SIMULATED_DIMENSIONS};
use crate::extensions::ExtensionOperation;
use crate::types::time::{format_timestamp, now_timestamp, parse_duration, parse_timestamp};
use crate::{Error, ErrorContext, Result};
use chrono::{TimeDelta, Utc};
use serde_json::{json, Value};

const DEFAULT_CACHE_TTL_SECS: i64 = 3600;
const CHARS_PER_TOKEN: usize = 4;
/// `google.rpc.Code.ALREADY_EXISTS`
const CODE_ALREADY_EXISTS: i32 = 6;

const TERMINAL_JOB_STATES: &[&str] = &[
    "JOB_STATE_SUCCEEDED",
    "JOB_STATE_FAILED",
    "JOB_STATE_CANCELLED",
    "JOB_STATE_EXPIRED",
    "JOB_STATE_PARTIALLY_SUCCEEDED",
];

pub(super) fn on_create(collection: &str, value: &mut Value) -> Result<()> {
    match collection {
        "cachedContents" => {
            apply_cache_expiration(value, true)?;
            let tokens = text_len(&value["contents"]) + text_len(&value["systemInstruction"]);
            value["usageMetadata"] = json!({
                "totalTokenCount": tokens.div_ceil(CHARS_PER_TOKEN),
            });
        }
        "tuningJobs" => {
            value["state"] = json!("JOB_STATE_PENDING");
        }
        _ => {}
    }
    Ok(())
}

pub(super) fn on_patch(collection: &str, value: &mut Value) -> Result<()> {
    if collection == "cachedContents" {
        apply_cache_expiration(value, false)?;
    }
    Ok(())
}

/// Advance emulated tuning jobs by one state on every read.
pub(super) fn on_get(collection: &str, value: &mut Value) {
    if collection != "tuningJobs" {
        return;
    }
    let now = now_timestamp();
    match value["state"].as_str() {
        Some("JOB_STATE_PENDING") | Some("JOB_STATE_QUEUED") => {
            value["state"] = json!("JOB_STATE_RUNNING");
            value["startTime"] = json!(now);
        }
        Some("JOB_STATE_RUNNING") => {
            let name = value["name"].as_str().unwrap_or_default().to_string();
            let location = parent_of(&name);
            let id = name.rsplit('/').next().unwrap_or_default();
            value["state"] = json!("JOB_STATE_SUCCEEDED");
            value["endTime"] = json!(now);
            value["tunedModel"] = json!({
                "model": format!("{}/models/{}", location, id),
                "endpoint": format!("{}/endpoints/{}", location, id),
            });
        }
        _ => {}
    }
    value["updateTime"] = json!(now);
}

pub(super) fn is_expired(collection: &str, value: &Value) -> bool {
    if collection != "cachedContents" {
        return false;
    }
    value["expireTime"]
        .as_str()
        .and_then(|raw| parse_timestamp(raw).ok())
        .map(|t| t <= Utc::now())
        .unwrap_or(false)
}

/// `ttl` is input-only: fold it into `expireTime`.
fn apply_cache_expiration(value: &mut Value, default_if_missing: bool) -> Result<()> {
    let Some(obj) = value.as_object_mut() else {
        return Ok(());
    };
    if let Some(ttl) = obj.remove("ttl") {
        let raw = ttl.as_str().unwrap_or_default();
        let ttl = parse_duration(raw)?;
        let expire = i64::try_from(ttl.as_millis())
            .ok()
            .and_then(TimeDelta::try_milliseconds)
            .and_then(|delta| Utc::now().checked_add_signed(delta))
            .ok_or_else(|| {
                Error::validation_with_context(
                    format!("ttl '{}' puts the expire time out of range", raw),
                    ErrorContext::new().with_field_path("ttl"),
                )
            })?;
        obj.insert("expireTime".into(), json!(format_timestamp(expire)));
    } else if default_if_missing && !obj.contains_key("expireTime") {
        let expire = Utc::now() + TimeDelta::seconds(DEFAULT_CACHE_TTL_SECS);
        obj.insert("expireTime".into(), json!(format_timestamp(expire)));
    }
    Ok(())
}

fn text_len(value: &Value) -> usize {
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| match (k.as_str(), v) {
                ("text", Value::String(s)) => s.chars().count(),
                _ => text_len(v),
            })
            .sum(),
        Value::Array(items) => items.iter().map(text_len).sum(),
        _ => 0,
    }
}

/// Custom `name:verb` methods.
pub(super) fn invoke(store: &mut Store, name: &str, verb: &str, body: Value) -> Result<Value> {
    match verb {
        "cancel" => cancel_job(store, name),
        "import" => import_extension(store, name, body),
        "execute" => execute_extension(store, name, body),
        "query" => query_extension(store, name, body),
        "upsertExamples" => upsert_examples(store, name, body),
        "removeExamples" => remove_examples(store, name, body),
        "fetchExamples" => fetch_examples(store, name, body),
        "searchExamples" => search_examples(store, name, body),
        "restore" => restore_version(store, name),
        other => Err(Error::remote(400, format!("method '{}' is not supported on {}", other, name))),
    }
}

fn cancel_job(store: &mut Store, name: &str) -> Result<Value> {
    let job = store.get_mut(name).ok_or_else(|| Error::not_found(name))?;
    let state = job["state"].as_str().unwrap_or_default();
    if TERMINAL_JOB_STATES.contains(&state) {
        return Err(Error::remote(
            400,
            format!("job {} is already in terminal state {}", name, state),
        ));
    }
    let now = now_timestamp();
    job["state"] = json!("JOB_STATE_CANCELLED");
    job["endTime"] = json!(now);
    job["updateTime"] = json!(now);
    Ok(json!({}))
}

fn import_extension(store: &mut Store, collection_name: &str, body: Value) -> Result<Value> {
    let parent = collection_name
        .strip_suffix("/extensions")
        .ok_or_else(|| Error::remote(400, format!("cannot import into {}", collection_name)))?;
    let mut value = body;
    let operations = derive_operations(&value["manifest"]["apiSpec"])?;
    let name = format!("{}/extensions/{}", parent, new_id());
    let now = now_timestamp();
    let fields = value
        .as_object_mut()
        .ok_or_else(|| bad_request("import body must be a JSON object"))?;
    fields.insert("name".into(), json!(name));
    fields.insert("createTime".into(), json!(now));
    fields.insert("updateTime".into(), json!(now));
    fields.insert("extensionOperations".into(), serde_json::to_value(operations)?);
    store.insert(name, value.clone());
    Ok(value)
}

fn derive_operations(api_spec: &Value) -> Result<Vec<ExtensionOperation>> {
    if let Some(yaml) = api_spec["openApiYaml"].as_str() {
        return crate::extensions::operations_from_openapi(yaml);
    }
    if let Some(uri) = api_spec["openApiGcsUri"].as_str() {
        return Ok(crate::extensions::hub_operations(uri).unwrap_or_default());
    }
    Ok(Vec::new())
}

fn execute_extension(store: &mut Store, name: &str, body: Value) -> Result<Value> {
    let extension = store.get(name).ok_or_else(|| Error::not_found(name))?;
    let operation_id = body["operationId"].as_str().unwrap_or_default();
    let known = extension["extensionOperations"]
        .as_array()
        .map(|ops| ops.iter().any(|op| op["operationId"] == operation_id))
        .unwrap_or(false);
    if !known {
        return Err(Error::remote(
            400,
            format!("operation '{}' is not defined by {}", operation_id, name),
        ));
    }
    let output = json!({
        "operationId": operation_id,
        "operationParams": body["operationParams"],
        "simulated": true,
    });
    Ok(json!({ "content": output.to_string() }))
}

fn query_extension(store: &mut Store, name: &str, body: Value) -> Result<Value> {
    let extension = store.get(name).ok_or_else(|| Error::not_found(name))?;
    let display = extension["displayName"].as_str().unwrap_or("extension");
    let question = body["contents"]
        .as_array()
        .and_then(|c| c.last())
        .map(|c| collect_text(&c["parts"]))
        .unwrap_or_default();
    Ok(json!({
        "steps": [{
            "role": "model",
            "parts": [{"text": format!("[{}] {}", display, question)}]
        }]
    }))
}

fn require_store<'a>(store: &'a Store, name: &str) -> Result<&'a Value> {
    store.get(name).ok_or_else(|| Error::not_found(name))
}

fn upsert_examples(store: &mut Store, store_name: &str, body: Value) -> Result<Value> {
    require_store(store, store_name)?;
    let overwrite = body["overwrite"].as_bool().unwrap_or(false);
    let examples = body["examples"].as_array().cloned().unwrap_or_default();
    let mut results = Vec::with_capacity(examples.len());
    for mut example in examples {
        let id = example["exampleId"]
            .as_str()
            .filter(|s| !s.is_empty())
            .map(String::from)
            .unwrap_or_else(new_id);
        let key = format!("{}/examples/{}", store_name, id);
        if store.contains(&key) && !overwrite {
            results.push(json!({
                "status": {
                    "code": CODE_ALREADY_EXISTS,
                    "message": format!("example {} already exists", id),
                }
            }));
            continue;
        }
        let fields = example
            .as_object_mut()
            .ok_or_else(|| bad_request("each example must be a JSON object"))?;
        fields.insert("exampleId".into(), json!(id));
        fields.insert("createTime".into(), json!(now_timestamp()));
        let stored = fields
            .entry("storedContentsExample")
            .or_insert_with(|| json!({}));
        if stored.is_null() {
            *stored = json!({});
        }
        let stored = stored
            .as_object_mut()
            .ok_or_else(|| bad_request("storedContentsExample must be a JSON object"))?;
        let has_key = stored
            .get("searchKey")
            .and_then(Value::as_str)
            .map(|k| !k.is_empty())
            .unwrap_or(false);
        if !has_key {
            let key_text = stored
                .get("contentsExample")
                .and_then(|c| c["contents"].as_array())
                .and_then(|c| c.last())
                .map(|c| collect_text(&c["parts"]))
                .unwrap_or_default();
            stored.insert("searchKey".into(), json!(key_text));
        }
        store.insert(key, example.clone());
        results.push(json!({ "example": example }));
    }
    Ok(json!({ "results": results }))
}

fn remove_examples(store: &mut Store, store_name: &str, body: Value) -> Result<Value> {
    require_store(store, store_name)?;
    let ids: Vec<String> = body["exampleIds"]
        .as_array()
        .map(|a| a.iter().filter_map(|v| v.as_str().map(String::from)).collect())
        .unwrap_or_default();
    let removed: Vec<String> = ids
        .into_iter()
        .filter(|id| store.remove_tree(&format!("{}/examples/{}", store_name, id)))
        .collect();
    Ok(json!({ "exampleIds": removed }))
}

fn fetch_examples(store: &mut Store, store_name: &str, body: Value) -> Result<Value> {
    require_store(store, store_name)?;
    let wanted: Vec<&str> = body["exampleIds"]
        .as_array()
        .map(|a| a.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    let examples: Vec<Value> = store
        .children(store_name, "examples")
        .into_iter()
        .map(|(_, v)| v)
        .filter(|v| wanted.is_empty() || wanted.contains(&v["exampleId"].as_str().unwrap_or_default()))
        .collect();
    let page_size = body["pageSize"].as_u64().map(|s| s as u32);
    let page = paginate(examples, page_size, body["pageToken"].as_str())?;
    let mut reply = json!({ "examples": page.items });
    if let Some(token) = page.next_page_token {
        reply["nextPageToken"] = json!(token);
    }
    Ok(reply)
}

fn search_examples(store: &mut Store, store_name: &str, body: Value) -> Result<Value> {
    require_store(store, store_name)?;
    let params = &body["storedContentsExampleParameters"];
    let query = match params["searchKey"].as_str() {
        Some(key) => key.to_string(),
        None => params["contentSearchKey"]["contents"]
            .as_array()
            .and_then(|c| c.last())
            .map(|c| collect_text(&c["parts"]))
            .ok_or_else(|| {
                Error::validation_with_context(
                    "search requires a search key or content search key",
                    ErrorContext::new().with_field_path("storedContentsExampleParameters"),
                )
            })?,
    };
    let top_k = body["topK"].as_u64().unwrap_or(3) as usize;

    let examples: Vec<Value> = store
        .children(store_name, "examples")
        .into_iter()
        .map(|(_, v)| v)
        .collect();
    let candidates: Vec<Vec<f32>> = examples
        .iter()
        .map(|e| {
            simulated_embedding(
                e["storedContentsExample"]["searchKey"].as_str().unwrap_or_default(),
                SIMULATED_DIMENSIONS,
            )
        })
        .collect();
    let query_vec = simulated_embedding(&query, SIMULATED_DIMENSIONS);
    let ranked = find_most_similar(&query_vec, &candidates, top_k)?;
    let results: Vec<Value> = ranked
        .into_iter()
        .filter_map(|hit| {
            examples.get(hit.index).map(|example| {
                json!({ "example": example, "similarityScore": hit.score })
            })
        })
        .collect();
    Ok(json!({ "results": results }))
}

fn restore_version(store: &mut Store, version_name: &str) -> Result<Value> {
    let version = store
        .get(version_name)
        .cloned()
        .ok_or_else(|| Error::not_found(version_name))?;
    let dataset_name = parent_of(version_name).to_string();
    let dataset = store
        .get_mut(&dataset_name)
        .ok_or_else(|| Error::not_found(dataset_name.as_str()))?;
    dataset["metadata"] = version["metadata"].clone();
    dataset["updateTime"] = json!(now_timestamp());
    Ok(dataset.clone())
}

fn bad_request(message: &str) -> Error {
    Error::remote(400, message)
}

fn collect_text(parts: &Value) -> String {
    parts
        .as_array()
        .map(|ps| {
            ps.iter()
                .filter_map(|p| p["text"].as_str())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
}
