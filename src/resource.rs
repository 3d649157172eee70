//! Resource name formatting and parsing.
//!
//! Vertex resources are addressed as
//! `projects/{project}/locations/{location}/{collection}/{id}[/{sub}/{sub_id}...]`.
//! Most service methods accept either the full name or the trailing id.

use crate::config::VertexConfig;
use crate::{Error, ErrorContext, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").expect("id pattern is valid"));

static NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^projects/([^/]+)/locations/([^/]+)/((?:[A-Za-z]+/[^/]+)(?:/[A-Za-z]+/[^/]+)*)$")
        .expect("resource name pattern is valid")
});

pub fn is_valid_id(id: &str) -> bool {
    ID_PATTERN.is_match(id)
}

pub fn parent(project: &str, location: &str) -> String {
    format!("projects/{}/locations/{}", project, location)
}

/// A parsed Vertex resource name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceName {
    pub project: String,
    pub location: String,
    /// `(collection, id)` pairs from outermost to innermost.
    pub segments: Vec<(String, String)>,
}

impl ResourceName {
    pub fn new(
        project: impl Into<String>,
        location: impl Into<String>,
        collection: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            location: location.into(),
            segments: vec![(collection.into(), id.into())],
        }
    }

    pub fn parse(name: &str) -> Result<Self> {
        let caps = NAME_PATTERN.captures(name).ok_or_else(|| {
            Error::validation_with_context(
                format!("'{}' is not a valid resource name", name),
                ErrorContext::new()
                    .with_details("expected projects/{p}/locations/{l}/{collection}/{id}"),
            )
        })?;
        let project = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let location = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        let tail = caps.get(3).map(|m| m.as_str()).unwrap_or_default();

        let parts: Vec<&str> = tail.split('/').collect();
        let segments = parts
            .chunks(2)
            .filter_map(|pair| match pair {
                [collection, id] => Some((collection.to_string(), id.to_string())),
                _ => None,
            })
            .collect();
        Ok(Self {
            project: project.to_string(),
            location: location.to_string(),
            segments,
        })
    }

    pub fn child(mut self, collection: impl Into<String>, id: impl Into<String>) -> Self {
        self.segments.push((collection.into(), id.into()));
        self
    }

    pub fn id(&self) -> &str {
        self.segments.last().map(|(_, id)| id.as_str()).unwrap_or_default()
    }

    pub fn collection(&self) -> &str {
        self.segments.last().map(|(c, _)| c.as_str()).unwrap_or_default()
    }

    /// Name of the enclosing resource (or the location for top-level resources).
    pub fn parent(&self) -> String {
        let mut out = parent(&self.project, &self.location);
        if let Some((_, outer)) = self.segments.split_last() {
            for (collection, id) in outer {
                out.push('/');
                out.push_str(collection);
                out.push('/');
                out.push_str(id);
            }
        }
        out
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "projects/{}/locations/{}", self.project, self.location)?;
        for (collection, id) in &self.segments {
            write!(f, "/{}/{}", collection, id)?;
        }
        Ok(())
    }
}

/// Expand a bare id into a full resource name under the configured location.
///
/// Full names must point at `collection` under the configured location and
/// project. The API may answer with the numeric project number in place of the
/// project id, so an all-digit project is also accepted.
pub fn full_resource_name(config: &VertexConfig, collection: &str, name_or_id: &str) -> Result<String> {
    let name_or_id = name_or_id.trim();
    if name_or_id.is_empty() {
        return Err(Error::validation_with_context(
            format!("{} name must not be empty", collection),
            ErrorContext::new().with_field_path("name"),
        ));
    }
    if name_or_id.starts_with("projects/") {
        let parsed = ResourceName::parse(name_or_id)?;
        if parsed.collection() != collection {
            return Err(Error::validation_with_context(
                format!("'{}' is not a {} resource", name_or_id, collection),
                ErrorContext::new().with_field_path("name"),
            ));
        }
        if parsed.location != config.location {
            return Err(Error::validation_with_context(
                format!(
                    "'{}' is in location {}, client is configured for {}",
                    name_or_id, parsed.location, config.location
                ),
                ErrorContext::new().with_field_path("name"),
            ));
        }
        let project_number = parsed.project.chars().all(|c| c.is_ascii_digit());
        if parsed.project != config.project && !project_number {
            return Err(Error::validation_with_context(
                format!(
                    "'{}' belongs to project {}, client is configured for {}",
                    name_or_id, parsed.project, config.project
                ),
                ErrorContext::new().with_field_path("name"),
            ));
        }
        return Ok(parsed.to_string());
    }
    if !is_valid_id(name_or_id) {
        return Err(Error::validation_with_context(
            format!("'{}' is not a valid {} id", name_or_id, collection),
            ErrorContext::new().with_field_path("name"),
        ));
    }
    Ok(ResourceName::new(&config.project, &config.location, collection, name_or_id).to_string())
}

/// Resolve a model reference into a full publisher model name.
///
/// - `gemini-1.5-pro-002` → `projects/{p}/locations/{l}/publishers/google/models/gemini-1.5-pro-002`
/// - `models/gemini-1.5-pro-002` → same as above
/// - `publishers/{pub}/models/{m}` → prefixed with the configured parent
/// - `projects/...` → unchanged
pub fn full_model_name(config: &VertexConfig, model: &str) -> Result<String> {
    let model = model.trim();
    if model.is_empty() {
        return Err(Error::validation_with_context(
            "model name must not be empty",
            ErrorContext::new().with_field_path("model"),
        ));
    }
    if model.starts_with("projects/") {
        return Ok(model.to_string());
    }
    if model.starts_with("publishers/") {
        return Ok(format!("{}/{}", config.parent(), model));
    }
    let short = model.strip_prefix("models/").unwrap_or(model);
    if !is_valid_id(short) {
        return Err(Error::validation_with_context(
            format!("'{}' is not a valid model id", model),
            ErrorContext::new().with_field_path("model"),
        ));
    }
    Ok(format!("{}/publishers/google/models/{}", config.parent(), short))
}

/// Trailing id of a resource name (the whole string when there is no `/`).
pub fn resource_id(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> VertexConfig {
        VertexConfig::new("proj", "us-central1")
    }

    #[test]
    fn parse_nested_name() {
        let name =
            ResourceName::parse("projects/proj/locations/us-central1/datasets/42/datasetVersions/7")
                .unwrap();
        assert_eq!(name.id(), "7");
        assert_eq!(name.collection(), "datasetVersions");
        assert_eq!(name.parent(), "projects/proj/locations/us-central1/datasets/42");
        assert_eq!(
            name.to_string(),
            "projects/proj/locations/us-central1/datasets/42/datasetVersions/7"
        );
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(ResourceName::parse("datasets/42").is_err());
        assert!(ResourceName::parse("projects/p/locations/l/datasets").is_err());
    }

    #[test]
    fn expands_bare_ids() {
        assert_eq!(
            full_resource_name(&cfg(), "cachedContents", "123").unwrap(),
            "projects/proj/locations/us-central1/cachedContents/123"
        );
        assert!(full_resource_name(&cfg(), "cachedContents", "").is_err());
        assert!(full_resource_name(
            &cfg(),
            "cachedContents",
            "projects/proj/locations/us-central1/tuningJobs/1"
        )
        .is_err());
    }

    #[test]
    fn full_names_must_match_configured_location_and_project() {
        let own = "projects/proj/locations/us-central1/cachedContents/1";
        assert_eq!(full_resource_name(&cfg(), "cachedContents", own).unwrap(), own);
        let by_number = "projects/123456789/locations/us-central1/cachedContents/1";
        assert_eq!(
            full_resource_name(&cfg(), "cachedContents", by_number).unwrap(),
            by_number
        );
        assert!(full_resource_name(
            &cfg(),
            "cachedContents",
            "projects/proj/locations/europe-west4/cachedContents/1"
        )
        .is_err());
        assert!(full_resource_name(
            &cfg(),
            "cachedContents",
            "projects/other/locations/us-central1/cachedContents/1"
        )
        .is_err());
    }

    #[test]
    fn model_name_forms() {
        let parent = "projects/proj/locations/us-central1";
        assert_eq!(
            full_model_name(&cfg(), "gemini-1.5-pro-002").unwrap(),
            format!("{}/publishers/google/models/gemini-1.5-pro-002", parent)
        );
        assert_eq!(
            full_model_name(&cfg(), "models/gemini-1.5-pro-002").unwrap(),
            format!("{}/publishers/google/models/gemini-1.5-pro-002", parent)
        );
        assert_eq!(
            full_model_name(&cfg(), "publishers/meta/models/llama").unwrap(),
            format!("{}/publishers/meta/models/llama", parent)
        );
        let full = format!("{}/publishers/google/models/x", parent);
        assert_eq!(full_model_name(&cfg(), &full).unwrap(), full);
        assert!(full_model_name(&cfg(), "  ").is_err());
    }
}
