//! End-to-end service flows against the in-process backend.

use std::collections::HashMap;
use std::time::Duration;
use vertexai_preview::caching::{CreateCachedContentRequest, Expiration};
use vertexai_preview::examplestore::{Example, ExampleStoreConfig};
use vertexai_preview::prompts::{Prompt, ValidationMode};
use vertexai_preview::tuning::{JobState, SftTrainRequest};
use vertexai_preview::{Content, VertexClient, VertexConfig};

fn client() -> VertexClient {
    VertexClient::builder()
        .with_config(VertexConfig::new("demo-project", "us-central1"))
        .local()
        .build()
        .expect("local client")
}

#[tokio::test]
async fn cached_content_lifecycle() {
    let caching = client().caching();
    let created = caching
        .create(
            CreateCachedContentRequest::new("gemini-1.5-pro-002")
                .with_display_name("handbook")
                .with_system_instruction(Content::system("Answer from the handbook."))
                .with_contents(vec![Content::user("Chapter one: the basics.")])
                .with_ttl(Duration::from_secs(600)),
        )
        .await
        .unwrap();
    assert!(created.name.contains("/cachedContents/"));
    assert!(created.expire_time.is_some());
    assert!(!created.is_expired(chrono::Utc::now()));

    let fetched = caching.get(created.resource_id()).await.unwrap();
    assert_eq!(fetched.display_name.as_deref(), Some("handbook"));

    let later = chrono::Utc::now() + chrono::Duration::hours(5);
    let updated = caching
        .update(&created.name, Expiration::ExpireTime(later))
        .await
        .unwrap();
    assert_eq!(
        updated.expire_time.map(|t| t.timestamp()),
        Some(later.timestamp())
    );

    assert_eq!(caching.list().await.unwrap().len(), 1);
    caching.delete(&created.name).await.unwrap();
    let err = caching.get(&created.name).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn example_store_search_ranks_closest_first() {
    let stores = client().example_stores();
    let store = stores
        .create_store("faq", None, ExampleStoreConfig::new("text-embedding-005"))
        .await
        .unwrap();
    let id = store.resource_id().to_string();

    let examples = vec![
        Example::new(
            vec![Content::user("How do I reset my password?")],
            vec![Content::model("Use the account page.")],
        )
        .with_id("password"),
        Example::new(
            vec![Content::user("What are your opening hours?")],
            vec![Content::model("Nine to five.")],
        )
        .with_id("hours"),
    ];
    let results = stores.upsert_examples(&id, examples, false).await.unwrap();
    assert!(results.iter().all(|r| r.is_ok()));

    let hits = stores
        .search_examples(&id, "reset my password", 2)
        .await
        .unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].example.example_id.as_deref(), Some("password"));
    assert!(hits[0].similarity_score >= hits[1].similarity_score);

    let duplicate = Example::new(vec![Content::user("again")], vec![]).with_id("hours");
    let results = stores
        .upsert_examples(&id, vec![duplicate], false)
        .await
        .unwrap();
    assert!(!results[0].is_ok());

    let removed = stores
        .remove_examples(&id, &["hours".to_string()])
        .await
        .unwrap();
    assert_eq!(removed, vec!["hours".to_string()]);
    assert_eq!(stores.fetch_examples(&id, &[]).await.unwrap().len(), 1);

    stores.delete_store(&id).await.unwrap();
    assert!(stores.get_store(&id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn tuning_job_reaches_success() -> anyhow::Result<()> {
    let tuning = client().tuning();
    let job = tuning
        .train(
            SftTrainRequest::new("gemini-1.0-pro-002", "gs://bucket/train.jsonl")
                .with_tuned_model_display_name("support-bot"),
        )
        .await?;
    assert_eq!(job.state, JobState::Pending);

    let done = tuning
        .wait(&job.name, Duration::from_millis(1), Duration::from_secs(5))
        .await?;
    assert!(done.has_succeeded());
    assert!(done.tuned_model_name().is_some());
    assert!(done.tuned_model_endpoint_name().is_some());

    // finished jobs cannot be cancelled
    assert!(tuning.cancel(&job.name).await.is_err());
    Ok(())
}

#[tokio::test]
async fn prompt_versions_round_trip() {
    let prompts = client().prompts();
    let prompt = Prompt::new("Translate {text} into {language}")
        .with_model_name("gemini-1.5-pro-002")
        .with_system_instruction("You are a translator.")
        .with_prompt_name("translator");

    let v1 = prompts.create_version(&prompt, Some("first")).await.unwrap();
    let prompt_id = v1.prompt_id.clone().unwrap();

    let mut edited = v1.clone();
    edited.prompt_data = "Translate {text} into {language}, politely".to_string();
    let v2 = prompts.create_version(&edited, Some("second")).await.unwrap();
    assert_eq!(v2.prompt_id.as_deref(), Some(prompt_id.as_str()));
    assert_ne!(v1.version_id, v2.version_id);

    let versions = prompts.list_versions(&prompt_id).await.unwrap();
    assert_eq!(versions.len(), 2);

    let old = prompts
        .get(&prompt_id, v1.version_id.as_deref())
        .await
        .unwrap();
    assert_eq!(old.prompt_data, "Translate {text} into {language}");

    let restored = prompts
        .restore_version(&prompt_id, v1.version_id.as_deref().unwrap())
        .await
        .unwrap();
    assert_eq!(restored.prompt_data, old.prompt_data);
    let latest = prompts.get(&prompt_id, None).await.unwrap();
    assert_eq!(latest.prompt_data, old.prompt_data);

    let vars = HashMap::from([
        ("text".to_string(), "hello".to_string()),
        ("language".to_string(), "French".to_string()),
    ]);
    let contents = latest.assemble_contents(&vars, ValidationMode::Strict).unwrap();
    assert_eq!(contents[0].text(), "Translate hello into French");

    assert_eq!(prompts.list().await.unwrap().len(), 1);
    prompts.delete(&prompt_id).await.unwrap();
    assert!(prompts.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn hub_extension_executes_known_operations_only() {
    let extensions = client().extensions();
    let ext = extensions.from_hub("code_interpreter", None).await.unwrap();
    assert!(ext.has_operation("generate_and_execute"));

    let output = extensions
        .execute(
            &ext.name,
            "generate_and_execute",
            serde_json::json!({"query": "sum 1..10"}),
        )
        .await
        .unwrap();
    assert_eq!(output["operationId"], "generate_and_execute");

    assert!(extensions
        .execute(&ext.name, "no_such_op", serde_json::json!({}))
        .await
        .is_err());
    assert!(extensions.from_hub("vertex_ai_search", None).await.is_err());

    let reply = extensions
        .query(&ext.name, vec![Content::user("plot a sine wave")])
        .await
        .unwrap();
    assert!(!reply.steps.is_empty());
}
