//! Template engine behavior through the public API.

use std::collections::HashMap;
use vertexai_preview::prompts::{
    extract_variables, render, PromptTemplate, TemplateCache, TemplateError, ValidationMode,
};
use vertexai_preview::Error;

fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn modes_differ_only_in_how_gaps_are_handled() {
    let template = "Dear {name}, your order {order_id} shipped.";
    let partial = vars(&[("name", "Ada")]);

    assert!(matches!(
        render(template, &partial, ValidationMode::Strict),
        Err(TemplateError::MissingVariables(ref m)) if m == &["order_id".to_string()]
    ));
    assert_eq!(
        render(template, &partial, ValidationMode::Warn).unwrap(),
        "Dear Ada, your order {order_id} shipped."
    );
    assert_eq!(
        render(template, &partial, ValidationMode::Loose).unwrap(),
        "Dear Ada, your order  shipped."
    );
    assert_eq!(
        render(template, &partial, ValidationMode::None).unwrap(),
        "Dear Ada, your order {order_id} shipped."
    );
}

#[test]
fn strict_rejects_unused_variables() {
    let supplied = vars(&[("a", "1"), ("extra", "2")]);
    let err = render("{a}", &supplied, ValidationMode::Strict).unwrap_err();
    assert!(matches!(err, TemplateError::UnknownVariables(_)));
    assert_eq!(render("{a}", &supplied, ValidationMode::Warn).unwrap(), "1");
}

#[test]
fn malformed_templates_report_position() {
    assert!(matches!(
        extract_variables("hello {name"),
        Err(TemplateError::UnclosedBrace { position: 6 })
    ));
    assert!(matches!(
        extract_variables("oops }"),
        Err(TemplateError::UnmatchedClosingBrace { position: 5 })
    ));
    assert!(matches!(
        extract_variables("{}"),
        Err(TemplateError::EmptyPlaceholder { .. })
    ));
}

#[test]
fn variables_are_listed_once_in_first_use_order() {
    let names = extract_variables("{b} and {a} and {b} again").unwrap();
    assert_eq!(names, vec!["b".to_string(), "a".to_string()]);
}

#[test]
fn mode_names_parse() {
    assert_eq!("strict".parse::<ValidationMode>().unwrap(), ValidationMode::Strict);
    assert_eq!("LOOSE".parse::<ValidationMode>().unwrap(), ValidationMode::Loose);
    assert!("lenient".parse::<ValidationMode>().is_err());
}

#[test]
fn cache_reuses_compiled_templates() {
    let cache = TemplateCache::new(2);
    let first = cache.get_or_compile("Hi {who}").unwrap();
    let second = cache.get_or_compile("Hi {who}").unwrap();
    assert!(std::sync::Arc::ptr_eq(&first, &second));

    cache.get_or_compile("{x}").unwrap();
    cache.get_or_compile("{y}").unwrap();
    let stats = cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 3);
    assert_eq!(stats.len, 2);

    assert!(cache.get_or_compile("{broken").is_err());
    assert_eq!(cache.stats().len, 2);
}

#[test]
fn template_errors_convert_into_crate_errors() {
    let template = PromptTemplate::compile("{q}").unwrap();
    let err: Error = template
        .render(&HashMap::new(), ValidationMode::Strict)
        .unwrap_err()
        .into();
    assert!(err.to_string().contains("q"));
}
