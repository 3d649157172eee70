//! Prompt Management Example
//!
//! Saves a prompt, edits it, restores the first version and renders it.
//! Runs against the in-process backend, so no Google Cloud project is needed.

use std::collections::HashMap;
use vertexai_preview::prompts::{Prompt, ValidationMode};
use vertexai_preview::{VertexClient, VertexConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    vertexai_preview::init_logging();

    let client = VertexClient::builder()
        .with_config(VertexConfig::new("demo-project", "us-central1"))
        .local()
        .build()?;
    let prompts = client.prompts();

    let draft = Prompt::new("Write a haiku about {subject}.")
        .with_model_name("gemini-1.5-pro-002")
        .with_system_instruction("You are a poet.")
        .with_prompt_name("haiku");
    let v1 = prompts.create_version(&draft, Some("first draft")).await?;
    let prompt_id = v1.prompt_id.clone().unwrap_or_default();
    println!("saved prompt {} version {:?}", prompt_id, v1.version_id);

    let mut edited = v1.clone();
    edited.prompt_data = "Write a haiku about {subject} in the style of {poet}.".to_string();
    let v2 = prompts.create_version(&edited, Some("with style")).await?;
    println!("saved version {:?}", v2.version_id);

    for version in prompts.list_versions(&prompt_id).await? {
        println!("  {} -> {}", version.version_id, version.display_name);
    }

    if let Some(first) = v1.version_id.as_deref() {
        let restored = prompts.restore_version(&prompt_id, first).await?;
        println!("restored: {}", restored.prompt_data);
    }

    let current = prompts.get(&prompt_id, None).await?;
    let vars = HashMap::from([("subject".to_string(), "autumn rain".to_string())]);
    for content in current.assemble_contents(&vars, ValidationMode::Strict)? {
        println!("[{}] {}", content.role.as_deref().unwrap_or("-"), content.text());
    }
    Ok(())
}
