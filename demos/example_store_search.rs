//! Example Store Search Example
//!
//! Fills an example store with a few support conversations and retrieves the
//! closest ones for a new question.

use vertexai_preview::examplestore::{Example, ExampleStoreConfig};
use vertexai_preview::{Content, VertexClient, VertexConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    vertexai_preview::init_logging();

    let client = VertexClient::builder()
        .with_config(VertexConfig::new("demo-project", "us-central1"))
        .local()
        .build()?;
    let stores = client.example_stores();

    let store = stores
        .create_store(
            "support-examples",
            Some("Answered support questions"),
            ExampleStoreConfig::new("text-embedding-005"),
        )
        .await?;
    let store_id = store.resource_id().to_string();

    let pairs = [
        ("How do I reset my password?", "Open Settings, then Security, then Reset."),
        ("Can I change my billing date?", "Yes, from the Billing page once per cycle."),
        ("Where can I download invoices?", "Invoices are under Billing, History."),
    ];
    let examples: Vec<Example> = pairs
        .iter()
        .map(|(q, a)| Example::new(vec![Content::user(*q)], vec![Content::model(*a)]))
        .collect();
    for result in stores.upsert_examples(&store_id, examples, false).await? {
        match (&result.example, &result.status) {
            (Some(example), _) => println!("stored {:?}", example.example_id),
            (None, Some(status)) => println!("rejected: {}", status.message),
            _ => {}
        }
    }

    let question = "I forgot my password";
    println!("\nclosest examples to {:?}:", question);
    for hit in stores.search_examples(&store_id, question, 2).await? {
        println!(
            "  {:.3}  {}",
            hit.similarity_score,
            hit.example.search_key().unwrap_or_default()
        );
    }

    stores.delete_store(&store_id).await?;
    Ok(())
}
