//! In-process emulator of the Vertex resource surface.
//!
//! Resources live in a single ordered map keyed by full resource name.
//! Collection-specific behavior (cache expiry, tuning job progression, example
//! search, extension execution, ...) is applied by the `simulate` hooks so that
//! services run unchanged against either backend.

mod simulate;

use super::{ListOptions, ListPage, VertexBackend};
use crate::error::lock_poisoned;
use crate::types::time::now_timestamp;
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::RwLock;
use tracing::debug;

const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone)]
struct Entry {
    seq: u64,
    value: Value,
}

/// Resource map plus insertion counter.
#[derive(Debug, Default)]
pub(crate) struct Store {
    entries: BTreeMap<String, Entry>,
    next_seq: u64,
}

impl Store {
    pub(crate) fn insert(&mut self, name: String, value: Value) {
        let seq = match self.entries.get(&name) {
            Some(existing) => existing.seq,
            None => {
                self.next_seq += 1;
                self.next_seq
            }
        };
        self.entries.insert(name, Entry { seq, value });
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name).map(|e| &e.value)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.entries.get_mut(name).map(|e| &mut e.value)
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Remove a resource and everything nested under it.
    pub(crate) fn remove_tree(&mut self, name: &str) -> bool {
        let prefix = format!("{}/", name);
        let existed = self.entries.remove(name).is_some();
        self.entries.retain(|k, _| !k.starts_with(&prefix));
        existed
    }

    /// Direct children of `parent` in `collection`, in insertion order.
    pub(crate) fn children(&self, parent: &str, collection: &str) -> Vec<(String, Value)> {
        let prefix = format!("{}/{}/", parent, collection);
        let mut found: Vec<(&String, &Entry)> = self
            .entries
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            .filter(|(k, _)| !k[prefix.len()..].contains('/'))
            .collect();
        found.sort_by_key(|(_, e)| e.seq);
        found
            .into_iter()
            .map(|(k, e)| (k.clone(), e.value.clone()))
            .collect()
    }
}

pub(crate) fn new_id() -> String {
    // Vertex ids are opaque; a dashless uuid keeps them URL-safe.
    uuid::Uuid::new_v4().simple().to_string()
}

/// Parent segment depth of `projects/{p}/locations/{l}`.
fn is_location(parent: &str) -> bool {
    parent.split('/').count() == 4
}

pub struct LocalBackend {
    store: RwLock<Store>,
}

impl LocalBackend {
    pub fn new() -> Self {
        Self {
            store: RwLock::new(Store::default()),
        }
    }

    /// Number of stored resources, nested ones included.
    pub fn len(&self) -> usize {
        self.store.read().map(|s| s.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Store>> {
        self.store.write().map_err(|_| lock_poisoned("local_backend"))
    }
}

impl Default for LocalBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VertexBackend for LocalBackend {
    async fn create(&self, parent: &str, collection: &str, body: Value) -> Result<Value> {
        let mut value = into_object(body, collection)?;
        let mut store = self.write()?;
        if !is_location(parent) && !store.contains(parent) {
            return Err(Error::not_found(parent));
        }
        let name = format!("{}/{}/{}", parent, collection, new_id());
        let now = now_timestamp();
        if let Some(obj) = value.as_object_mut() {
            obj.insert("name".into(), Value::String(name.clone()));
            obj.insert("createTime".into(), Value::String(now.clone()));
            obj.insert("updateTime".into(), Value::String(now));
        }
        simulate::on_create(collection, &mut value)?;
        store.insert(name.clone(), value.clone());
        debug!(backend = "local", method = "create", resource = name.as_str(), "vertexai-preview request");
        Ok(value)
    }

    async fn get(&self, name: &str) -> Result<Value> {
        let mut store = self.write()?;
        let collection = collection_of(name);
        let expired = match store.get(name) {
            Some(value) => simulate::is_expired(collection, value),
            None => return Err(Error::not_found(name)),
        };
        if expired {
            store.remove_tree(name);
            return Err(Error::not_found(name));
        }
        let value = store.get_mut(name).ok_or_else(|| Error::not_found(name))?;
        simulate::on_get(collection, value);
        debug!(backend = "local", method = "get", resource = name, "vertexai-preview request");
        Ok(value.clone())
    }

    async fn list(&self, parent: &str, collection: &str, options: &ListOptions) -> Result<ListPage> {
        let filter = match &options.filter {
            Some(raw) => parse_filter(raw)?,
            None => Vec::new(),
        };
        let store = self.store.read().map_err(|_| lock_poisoned("local_backend"))?;
        let mut items: Vec<Value> = store
            .children(parent, collection)
            .into_iter()
            .map(|(_, v)| v)
            .filter(|v| !simulate::is_expired(collection, v))
            .filter(|v| filter.iter().all(|clause| clause.matches(v)))
            .collect();
        if options
            .order_by
            .as_deref()
            .map(|o| o.trim().ends_with(" desc"))
            .unwrap_or(false)
        {
            items.reverse();
        }
        paginate(items, options.page_size, options.page_token.as_deref())
    }

    async fn patch(&self, name: &str, body: Value, update_mask: &[&str]) -> Result<Value> {
        let body = into_object(body, collection_of(name))?;
        let mut store = self.write()?;
        let value = store.get_mut(name).ok_or_else(|| Error::not_found(name))?;
        let (Some(target), Some(source)) = (value.as_object_mut(), body.as_object()) else {
            return Err(Error::runtime("stored resource is not an object"));
        };
        if update_mask.is_empty() {
            for (k, v) in source {
                target.insert(k.clone(), v.clone());
            }
        } else {
            for path in update_mask {
                let field = path.split('.').next().map(snake_to_camel).unwrap_or_default();
                match source.get(&field) {
                    Some(v) => {
                        target.insert(field, v.clone());
                    }
                    None => {
                        target.remove(&field);
                    }
                }
            }
        }
        target.insert("updateTime".into(), Value::String(now_timestamp()));
        simulate::on_patch(collection_of(name), value)?;
        debug!(backend = "local", method = "patch", resource = name, "vertexai-preview request");
        Ok(value.clone())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let mut store = self.write()?;
        if !store.remove_tree(name) {
            return Err(Error::not_found(name));
        }
        debug!(backend = "local", method = "delete", resource = name, "vertexai-preview request");
        Ok(())
    }

    async fn invoke(&self, name: &str, verb: &str, body: Value) -> Result<Value> {
        let mut store = self.write()?;
        let reply = simulate::invoke(&mut store, name, verb, body)?;
        debug!(backend = "local", method = verb, resource = name, "vertexai-preview request");
        Ok(reply)
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

fn into_object(body: Value, collection: &str) -> Result<Value> {
    match body {
        Value::Object(_) => Ok(body),
        Value::Null => Ok(Value::Object(Map::new())),
        _ => Err(Error::validation_with_context(
            "request body must be a JSON object",
            ErrorContext::new().with_source(format!("local_backend:{}", collection)),
        )),
    }
}

/// Collection segment of a resource name (`.../tuningJobs/123` → `tuningJobs`).
pub(crate) fn collection_of(name: &str) -> &str {
    let mut it = name.rsplit('/');
    it.next();
    it.next().unwrap_or_default()
}

/// Enclosing resource of a name (`a/b/c/d` → `a/b`).
pub(crate) fn parent_of(name: &str) -> &str {
    let mut cut = name.len();
    for _ in 0..2 {
        cut = name[..cut].rfind('/').unwrap_or(0);
    }
    &name[..cut]
}

pub(crate) fn paginate(items: Vec<Value>, page_size: Option<u32>, token: Option<&str>) -> Result<ListPage> {
    let offset = match token.filter(|t| !t.is_empty()) {
        Some(t) => t
            .parse::<usize>()
            .map_err(|_| Error::validation(format!("invalid page token '{}'", t)))?,
        None => 0,
    };
    let size = page_size
        .map(|s| s as usize)
        .filter(|s| *s > 0)
        .unwrap_or(DEFAULT_PAGE_SIZE);
    let total = items.len();
    let page: Vec<Value> = items.into_iter().skip(offset).take(size).collect();
    let next = offset + page.len();
    Ok(ListPage {
        items: page,
        next_page_token: (next < total).then(|| next.to_string()),
    })
}

pub(crate) fn snake_to_camel(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut upper = false;
    for c in s.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// One `field="value"` clause of a list filter.
#[derive(Debug, Clone, PartialEq)]
struct FilterClause {
    path: Vec<String>,
    value: String,
}

impl FilterClause {
    fn matches(&self, resource: &Value) -> bool {
        let mut current = resource;
        for segment in &self.path {
            match current.get(segment) {
                Some(v) => current = v,
                None => return false,
            }
        }
        match current {
            Value::String(s) => *s == self.value,
            Value::Null => false,
            other => other.to_string() == self.value,
        }
    }
}

fn parse_filter(raw: &str) -> Result<Vec<FilterClause>> {
    let mut clauses = Vec::new();
    for part in split_and(raw) {
        let (field, value) = part.split_once('=').ok_or_else(|| {
            Error::validation_with_context(
                format!("unsupported filter clause '{}'", part),
                ErrorContext::new().with_details("expected field=\"value\" joined by AND"),
            )
        })?;
        let field = field.trim();
        if field.is_empty() {
            return Err(Error::validation(format!("filter clause '{}' has no field", part)));
        }
        let value = value.trim().trim_matches('"').to_string();
        clauses.push(FilterClause {
            path: field.split('.').map(snake_to_camel).collect(),
            value,
        });
    }
    Ok(clauses)
}

fn split_and(raw: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = raw.trim();
    while let Some(idx) = find_and(rest) {
        parts.push(rest[..idx].trim());
        rest = rest[idx + 5..].trim();
    }
    if !rest.is_empty() {
        parts.push(rest);
    }
    parts
}

/// Byte offset of the first ` and ` (any case) outside double quotes.
fn find_and(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut quoted = false;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'"' => quoted = !quoted,
            b' ' if !quoted
                && bytes
                    .get(i..i + 5)
                    .map(|w| w.eq_ignore_ascii_case(b" and "))
                    .unwrap_or(false) =>
            {
                return Some(i);
            }
            _ => {}
        }
    }
    None
}
