//! ReAct Planner Example
//!
//! Builds the planning instruction for an agent with two tools and splits a
//! canned model reply into thoughts, tool calls and the visible answer.

use serde_json::json;
use vertexai_preview::planners::{parse_react, PlanReActPlanner, Planner, PlanningContext};
use vertexai_preview::types::FunctionDeclaration;
use vertexai_preview::Part;

fn main() {
    vertexai_preview::init_logging();

    let planner = PlanReActPlanner::new();
    let context = PlanningContext::new()
        .with_agent_name("travel_agent")
        .with_tools(vec![
            FunctionDeclaration {
                name: "get_weather".to_string(),
                description: Some("Current weather for a city".to_string()),
                parameters: Some(json!({
                    "type": "object",
                    "properties": { "city": { "type": "string" } },
                    "required": ["city"]
                })),
            },
            FunctionDeclaration {
                name: "find_flights".to_string(),
                description: Some("Flights between two airports".to_string()),
                parameters: None,
            },
        ]);
    if let Some(instruction) = planner.build_planning_instruction(&context) {
        println!("=== Planning instruction ===\n{}\n", instruction);
    }

    let reply = "/*PLANNING*/ 1. Check the weather in Lisbon. 2. Recommend packing.\n\
                 /*REASONING*/ Lisbon is 24C and sunny according to the tool.\n\
                 /*FINAL_ANSWER*/ Pack light clothes and sunscreen.";
    for segment in parse_react(reply) {
        println!("[{:?}] {}", segment.kind, segment.text);
    }

    let parts = vec![
        Part::text("/*PLANNING*/ Look up the weather first."),
        Part::function_call("get_weather", json!({ "city": "Lisbon" })),
        Part::text("/*REASONING*/ this trailing text is dropped"),
    ];
    if let Some(processed) = planner.process_planning_response(&parts) {
        println!("\n=== Processed parts ===");
        for part in processed {
            match (&part.function_call, &part.text) {
                (Some(call), _) => println!("call {}({})", call.name, call.args),
                (None, Some(text)) if part.is_thought() => println!("thought: {}", text),
                (None, Some(text)) => println!("answer: {}", text),
                _ => {}
            }
        }
    }
}
