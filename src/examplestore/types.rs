use crate::types::{Content, Status};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExampleStoreConfig {
    pub vertex_embedding_model: String,
}

impl ExampleStoreConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            vertex_embedding_model: model.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExampleStore {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub example_store_config: ExampleStoreConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<DateTime<Utc>>,
}

impl ExampleStore {
    pub fn resource_id(&self) -> &str {
        crate::resource::resource_id(&self.name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedContent {
    pub content: Content,
}

/// A conversation plus the response the model is expected to give.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContentsExample {
    #[serde(default)]
    pub contents: Vec<Content>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expected_contents: Vec<ExpectedContent>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredContentsExample {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_key: Option<String>,
    #[serde(default)]
    pub contents_example: ContentsExample,
}

impl StoredContentsExample {
    /// Text of the last user turn, used when no search key is given.
    pub fn default_search_key(&self) -> Option<String> {
        self.contents_example
            .contents
            .iter()
            .rev()
            .find(|c| c.is_user())
            .map(Content::text)
            .filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Example {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub stored_contents_example: StoredContentsExample,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
}

impl Example {
    pub fn new(contents: Vec<Content>, expected: Vec<Content>) -> Self {
        Self {
            stored_contents_example: StoredContentsExample {
                search_key: None,
                contents_example: ContentsExample {
                    contents,
                    expected_contents: expected
                        .into_iter()
                        .map(|content| ExpectedContent { content })
                        .collect(),
                },
            },
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.example_id = Some(id.into());
        self
    }

    pub fn with_search_key(mut self, key: impl Into<String>) -> Self {
        self.stored_contents_example.search_key = Some(key.into());
        self
    }

    pub fn search_key(&self) -> Option<&str> {
        self.stored_contents_example.search_key.as_deref()
    }
}

/// Outcome of one example in an upsert call; exactly one field is set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpsertResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Example>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

impl UpsertResult {
    pub fn is_ok(&self) -> bool {
        self.example.is_some() && self.status.as_ref().map(|s| s.code == 0).unwrap_or(true)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub example: Example,
    #[serde(default)]
    pub similarity_score: f64,
}

/// What to search an example store with.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchQuery {
    /// Compared directly against stored search keys.
    SearchKey(String),
    /// The last entry of the conversation becomes the search key.
    Contents(Vec<Content>),
}

impl From<&str> for SearchQuery {
    fn from(key: &str) -> Self {
        SearchQuery::SearchKey(key.to_string())
    }
}

impl From<String> for SearchQuery {
    fn from(key: String) -> Self {
        SearchQuery::SearchKey(key)
    }
}

impl From<Vec<Content>> for SearchQuery {
    fn from(contents: Vec<Content>) -> Self {
        SearchQuery::Contents(contents)
    }
}
