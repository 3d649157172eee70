use crate::types::{format_duration, Content, Tool, ToolConfig};
use crate::{Error, ErrorContext, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::Duration;

const MAX_DISPLAY_NAME_CHARS: usize = 128;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CacheUsageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_token_count: Option<i64>,
}

/// A `cachedContents` resource as returned by the API.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CachedContent {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contents: Vec<Content>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_config: Option<ToolConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_metadata: Option<CacheUsageMetadata>,
}

impl CachedContent {
    pub fn resource_id(&self) -> &str {
        crate::resource::resource_id(&self.name)
    }

    /// An entry without an expire time never reports as expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expire_time.map(|t| t <= now).unwrap_or(false)
    }
}

/// When a cached content stops being usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiration {
    Ttl(Duration),
    ExpireTime(DateTime<Utc>),
}

impl Expiration {
    pub fn validate(&self) -> Result<()> {
        match self {
            Expiration::Ttl(ttl) if ttl.is_zero() => Err(Error::validation_with_context(
                "ttl must be positive",
                ErrorContext::new().with_field_path("ttl"),
            )),
            Expiration::Ttl(ttl)
                if chrono::TimeDelta::from_std(*ttl)
                    .ok()
                    .and_then(|delta| Utc::now().checked_add_signed(delta))
                    .is_none() =>
            {
                Err(Error::validation_with_context(
                    format!("ttl of {}s is too large", ttl.as_secs()),
                    ErrorContext::new().with_field_path("ttl"),
                ))
            }
            _ => Ok(()),
        }
    }

    /// Wire field name and value.
    pub(crate) fn to_field(self) -> (&'static str, Value) {
        match self {
            Expiration::Ttl(ttl) => ("ttl", json!(format_duration(ttl))),
            Expiration::ExpireTime(at) => (
                "expireTime",
                json!(crate::types::time::format_timestamp(at)),
            ),
        }
    }
}

/// Builder for a new cached content.
#[derive(Debug, Clone)]
pub struct CreateCachedContentRequest {
    pub model: String,
    pub display_name: Option<String>,
    pub system_instruction: Option<Content>,
    pub contents: Vec<Content>,
    pub tools: Vec<Tool>,
    pub tool_config: Option<ToolConfig>,
    pub expiration: Option<Expiration>,
}

impl CreateCachedContentRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            display_name: None,
            system_instruction: None,
            contents: Vec::new(),
            tools: Vec::new(),
            tool_config: None,
            expiration: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_system_instruction(mut self, instruction: Content) -> Self {
        self.system_instruction = Some(instruction);
        self
    }

    pub fn with_contents(mut self, contents: Vec<Content>) -> Self {
        self.contents = contents;
        self
    }

    pub fn with_tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_tool_config(mut self, config: ToolConfig) -> Self {
        self.tool_config = Some(config);
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.expiration = Some(Expiration::Ttl(ttl));
        self
    }

    pub fn with_expire_time(mut self, at: DateTime<Utc>) -> Self {
        self.expiration = Some(Expiration::ExpireTime(at));
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.contents.is_empty() && self.system_instruction.is_none() {
            return Err(Error::validation_with_context(
                "cached content needs contents or a system instruction",
                ErrorContext::new().with_field_path("contents"),
            ));
        }
        if let Some(name) = &self.display_name {
            if name.chars().count() > MAX_DISPLAY_NAME_CHARS {
                return Err(Error::validation_with_context(
                    format!("display name exceeds {} characters", MAX_DISPLAY_NAME_CHARS),
                    ErrorContext::new().with_field_path("display_name"),
                ));
            }
        }
        if let Some(expiration) = &self.expiration {
            expiration.validate()?;
        }
        Ok(())
    }

    /// Request body with `model` already resolved to a full name.
    pub(crate) fn to_body(&self, model: String) -> Result<Value> {
        let mut body = Map::new();
        body.insert("model".into(), json!(model));
        if let Some(name) = &self.display_name {
            body.insert("displayName".into(), json!(name));
        }
        if let Some(instruction) = &self.system_instruction {
            body.insert("systemInstruction".into(), serde_json::to_value(instruction)?);
        }
        if !self.contents.is_empty() {
            body.insert("contents".into(), serde_json::to_value(&self.contents)?);
        }
        if !self.tools.is_empty() {
            body.insert("tools".into(), serde_json::to_value(&self.tools)?);
        }
        if let Some(config) = &self.tool_config {
            body.insert("toolConfig".into(), serde_json::to_value(config)?);
        }
        if let Some(expiration) = self.expiration {
            let (field, value) = expiration.to_field();
            body.insert(field.into(), value);
        }
        Ok(Value::Object(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_requires_content() {
        let req = CreateCachedContentRequest::new("gemini-1.5-pro-002");
        assert!(req.validate().is_err());
        let req = req.with_system_instruction(Content::system("be terse"));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn zero_ttl_rejected() {
        let req = CreateCachedContentRequest::new("m")
            .with_contents(vec![Content::user("hi")])
            .with_ttl(Duration::ZERO);
        assert!(req.validate().is_err());
    }

    #[test]
    fn ttl_beyond_timestamp_range_rejected() {
        assert!(Expiration::Ttl(Duration::from_secs(10_000_000_000_000)).validate().is_err());
        assert!(Expiration::Ttl(Duration::from_secs(86_400 * 365)).validate().is_ok());
    }

    #[test]
    fn long_display_name_rejected() {
        let req = CreateCachedContentRequest::new("m")
            .with_contents(vec![Content::user("hi")])
            .with_display_name("x".repeat(129));
        assert!(req.validate().is_err());
    }

    #[test]
    fn body_carries_one_expiration_field() {
        let req = CreateCachedContentRequest::new("m")
            .with_contents(vec![Content::user("hi")])
            .with_ttl(Duration::from_secs(600));
        let body = req.to_body("full/m".into()).unwrap();
        assert_eq!(body["ttl"], "600s");
        assert!(body.get("expireTime").is_none());
        assert_eq!(body["model"], "full/m");
    }

    #[test]
    fn expiry_check() {
        let now = Utc::now();
        let mut cc = CachedContent::default();
        assert!(!cc.is_expired(now));
        cc.expire_time = Some(now - chrono::Duration::seconds(1));
        assert!(cc.is_expired(now));
    }
}
