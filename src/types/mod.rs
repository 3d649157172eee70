//! Core type definitions shared by the services.

pub mod content;
pub mod time;

pub use content::{
    Blob, Content, FileData, FunctionCall, FunctionCallingConfig, FunctionDeclaration,
    FunctionResponse, GenerationConfig, Part, SafetySetting, Status, ThinkingConfig, Tool,
    ToolConfig,
};
pub use time::{format_duration, parse_duration};
