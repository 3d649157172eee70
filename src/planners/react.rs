//! Plan-ReAct: the model writes a plan, reasons, acts through tools and ends
//! with a tagged final answer.

use super::{Planner, PlanningContext};
use crate::types::Part;

pub const PLANNING_TAG: &str = "/*PLANNING*/";
pub const REPLANNING_TAG: &str = "/*REPLANNING*/";
pub const REASONING_TAG: &str = "/*REASONING*/";
pub const ACTION_TAG: &str = "/*ACTION*/";
pub const FINAL_ANSWER_TAG: &str = "/*FINAL_ANSWER*/";

/// Kind of a tagged block in a ReAct response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReActTag {
    /// Text before the first tag.
    Preamble,
    Planning,
    Replanning,
    Reasoning,
    Action,
    FinalAnswer,
}

impl ReActTag {
    const TAGGED: [ReActTag; 5] = [
        ReActTag::Planning,
        ReActTag::Replanning,
        ReActTag::Reasoning,
        ReActTag::Action,
        ReActTag::FinalAnswer,
    ];

    pub fn marker(self) -> Option<&'static str> {
        match self {
            ReActTag::Preamble => None,
            ReActTag::Planning => Some(PLANNING_TAG),
            ReActTag::Replanning => Some(REPLANNING_TAG),
            ReActTag::Reasoning => Some(REASONING_TAG),
            ReActTag::Action => Some(ACTION_TAG),
            ReActTag::FinalAnswer => Some(FINAL_ANSWER_TAG),
        }
    }

    /// Everything but the final answer is the model's own thinking.
    pub fn is_thought(self) -> bool {
        !matches!(self, ReActTag::FinalAnswer | ReActTag::Preamble)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReActSegment {
    pub kind: ReActTag,
    pub text: String,
}

fn next_tag(text: &str) -> Option<(usize, ReActTag)> {
    ReActTag::TAGGED
        .iter()
        .filter_map(|tag| {
            let marker = tag.marker()?;
            text.find(marker).map(|pos| (pos, *tag))
        })
        .min_by_key(|(pos, _)| *pos)
}

/// Split `text` into its tagged blocks, in order.
///
/// Block text is trimmed and empty blocks are dropped.
pub fn parse_react(text: &str) -> Vec<ReActSegment> {
    let mut segments = Vec::new();
    let mut kind = ReActTag::Preamble;
    let mut rest = text;
    loop {
        let (body, next) = match next_tag(rest) {
            Some((pos, tag)) => (&rest[..pos], Some((pos, tag))),
            None => (rest, None),
        };
        let body = body.trim();
        if !body.is_empty() {
            segments.push(ReActSegment {
                kind,
                text: body.to_string(),
            });
        }
        match next {
            Some((pos, tag)) => {
                let marker_len = tag.marker().map(str::len).unwrap_or(0);
                rest = &rest[pos + marker_len..];
                kind = tag;
            }
            None => return segments,
        }
    }
}

const THOUGHT_PREFIXES: [&str; 4] = [PLANNING_TAG, REASONING_TAG, ACTION_TAG, REPLANNING_TAG];

/// Forces the model to plan, reason and act in tagged blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanReActPlanner;

impl PlanReActPlanner {
    pub fn new() -> Self {
        Self
    }

    fn push_non_call_part(part: &Part, out: &mut Vec<Part>) {
        if let Some(text) = part.text.as_deref() {
            if let Some(idx) = text.rfind(FINAL_ANSWER_TAG) {
                let split = idx + FINAL_ANSWER_TAG.len();
                let (reasoning, answer) = text.split_at(split);
                if !reasoning.is_empty() {
                    out.push(Part::text(reasoning).as_thought());
                }
                if !answer.is_empty() {
                    out.push(Part::text(answer));
                }
                return;
            }
            if THOUGHT_PREFIXES.iter().any(|tag| text.starts_with(tag)) {
                out.push(part.clone().as_thought());
                return;
            }
        }
        out.push(part.clone());
    }
}

fn named_call(part: &Part) -> bool {
    part.function_call
        .as_ref()
        .map(|call| !call.name.is_empty())
        .unwrap_or(false)
}

impl Planner for PlanReActPlanner {
    fn build_planning_instruction(&self, context: &PlanningContext) -> Option<String> {
        let mut instruction = format!(
            "When answering the question, try to leverage the available tools to gather the information \
instead of your memorized knowledge.\n\n\
Follow this process when answering the question: (1) first come up with a plan in natural language \
text format; (2) then use tools to execute the plan and provide reasoning between tool code snippets \
to make a summary of current state and next step. Tool code snippets and reasoning should be \
interleaved with each other. (3) In the end, return one final answer.\n\n\
Follow this format when answering the question: (1) The planning part should be under {planning}. \
(2) The tool code snippets should be under {action}, and the reasoning parts should be under \
{reasoning}. (3) The final answer part should be under {final_answer}.\n\n\
The plan is made to answer the user query if following the plan. The plan is coherent and covers all \
aspects of information from the user query, and only involves the tools that are accessible by the \
agent. If the initial plan cannot be successfully executed, you should learn from previous execution \
results and revise your plan. The revised plan should be under {replanning}. Then use tools to follow \
the new plan.\n\n\
The reasoning summarizes the current trajectory based on the user query and tool outputs, and \
determines the next step. The final answer should be precise and follow query formatting \
requirements.\n\n\
Tool code snippets may only use functions that are explicitly provided; do not invent new ones.",
            planning = PLANNING_TAG,
            replanning = REPLANNING_TAG,
            reasoning = REASONING_TAG,
            action = ACTION_TAG,
            final_answer = FINAL_ANSWER_TAG,
        );
        if !context.tools.is_empty() {
            let names: Vec<&str> = context.tools.iter().map(|t| t.name.as_str()).collect();
            instruction.push_str("\n\nAvailable tools: ");
            instruction.push_str(&names.join(", "));
            instruction.push('.');
        }
        Some(instruction)
    }

    /// Keep parts up to the first named function call, that call, and the
    /// function calls directly after it. Reasoning text is marked as thought.
    fn process_planning_response(&self, parts: &[Part]) -> Option<Vec<Part>> {
        if parts.is_empty() {
            return None;
        }
        let mut kept = Vec::with_capacity(parts.len());
        let mut first_call = None;
        for (i, part) in parts.iter().enumerate() {
            if part.function_call.is_some() {
                if !named_call(part) {
                    continue;
                }
                kept.push(part.clone());
                first_call = Some(i);
                break;
            }
            Self::push_non_call_part(part, &mut kept);
        }
        if let Some(first) = first_call {
            kept.extend(
                parts[first + 1..]
                    .iter()
                    .take_while(|p| p.function_call.is_some())
                    .cloned(),
            );
        }
        Some(kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_tagged_blocks_in_order() {
        let text = "intro /*PLANNING*/ 1. look up\n/*ACTION*/ search() /*REASONING*/ found it \
                    /*FINAL_ANSWER*/ 42";
        let segs = parse_react(text);
        let kinds: Vec<ReActTag> = segs.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ReActTag::Preamble,
                ReActTag::Planning,
                ReActTag::Action,
                ReActTag::Reasoning,
                ReActTag::FinalAnswer
            ]
        );
        assert_eq!(segs[1].text, "1. look up");
        assert_eq!(segs[4].text, "42");
    }

    #[test]
    fn empty_blocks_dropped() {
        let segs = parse_react("/*PLANNING*//*REPLANNING*/ new plan");
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].kind, ReActTag::Replanning);
        assert!(parse_react("   ").is_empty());
    }

    #[test]
    fn final_answer_split_at_last_tag() {
        let planner = PlanReActPlanner::new();
        let out = planner
            .process_planning_response(&[Part::text(
                "/*REASONING*/ a /*FINAL_ANSWER*/ draft /*FINAL_ANSWER*/ done",
            )])
            .unwrap();
        assert_eq!(out.len(), 2);
        assert!(out[0].is_thought());
        assert!(out[0].text.as_deref().unwrap().ends_with(FINAL_ANSWER_TAG));
        assert_eq!(out[1].text.as_deref(), Some(" done"));
        assert!(!out[1].is_thought());
    }

    #[test]
    fn keeps_consecutive_calls_after_first() {
        let planner = PlanReActPlanner::new();
        let parts = vec![
            Part::text("/*PLANNING*/ plan"),
            Part::text("untagged"),
            Part::function_call("a", json!({})),
            Part::function_call("b", json!({})),
            Part::text("/*REASONING*/ dropped"),
            Part::function_call("c", json!({})),
        ];
        let out = planner.process_planning_response(&parts).unwrap();
        assert_eq!(out.len(), 4);
        assert!(out[0].is_thought());
        assert!(!out[1].is_thought());
        assert_eq!(out[3].function_call.as_ref().unwrap().name, "b");
    }

    #[test]
    fn leading_call_still_collects_followers() {
        let planner = PlanReActPlanner::new();
        let parts = vec![
            Part::function_call("a", json!({})),
            Part::function_call("b", json!({})),
        ];
        assert_eq!(planner.process_planning_response(&parts).unwrap().len(), 2);
    }

    #[test]
    fn unnamed_follower_does_not_end_the_call_run() {
        let planner = PlanReActPlanner::new();
        let parts = vec![
            Part::function_call("a", json!({})),
            Part::function_call("", json!({})),
            Part::function_call("b", json!({})),
            Part::text("after"),
        ];
        let out = planner.process_planning_response(&parts).unwrap();
        let names: Vec<&str> = out
            .iter()
            .filter_map(|p| p.function_call.as_ref().map(|c| c.name.as_str()))
            .collect();
        assert_eq!(names, vec!["a", "", "b"]);
    }

    #[test]
    fn unnamed_calls_are_skipped_and_empty_input_is_none() {
        let planner = PlanReActPlanner::new();
        let parts = vec![Part::function_call("", json!({})), Part::text("t")];
        let out = planner.process_planning_response(&parts).unwrap();
        assert_eq!(out, vec![Part::text("t")]);
        assert!(planner.process_planning_response(&[]).is_none());
    }

    #[test]
    fn instruction_mentions_tags_and_tools() {
        let ctx = PlanningContext::new().with_tools(vec![crate::types::FunctionDeclaration {
            name: "lookup".into(),
            description: None,
            parameters: None,
        }]);
        let text = PlanReActPlanner::new().build_planning_instruction(&ctx).unwrap();
        assert!(text.contains(FINAL_ANSWER_TAG) && text.contains(REPLANNING_TAG));
        assert!(text.ends_with("Available tools: lookup."));
    }
}
