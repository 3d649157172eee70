//! Planners shape how an agent's model plans before acting.
//!
//! A planner may add a planning instruction to the request, adjust the
//! generation config, and post-process the model's response parts.

mod builtin;
mod react;

pub use builtin::BuiltInPlanner;
pub use react::{
    parse_react, PlanReActPlanner, ReActSegment, ReActTag, ACTION_TAG, FINAL_ANSWER_TAG,
    PLANNING_TAG, REASONING_TAG, REPLANNING_TAG,
};

use crate::types::{FunctionDeclaration, GenerationConfig, Part};

/// What a planner knows about the request it is planning for.
#[derive(Debug, Clone, Default)]
pub struct PlanningContext {
    pub agent_name: Option<String>,
    pub tools: Vec<FunctionDeclaration>,
}

impl PlanningContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_agent_name(mut self, name: impl Into<String>) -> Self {
        self.agent_name = Some(name.into());
        self
    }

    pub fn with_tools(mut self, tools: Vec<FunctionDeclaration>) -> Self {
        self.tools = tools;
        self
    }
}

pub trait Planner: Send + Sync {
    /// Extra system instruction, if the planner needs one.
    fn build_planning_instruction(&self, context: &PlanningContext) -> Option<String>;

    /// Rewrite the model's response parts; `None` leaves them untouched.
    fn process_planning_response(&self, parts: &[Part]) -> Option<Vec<Part>>;

    fn apply_thinking_config(&self, _config: &mut GenerationConfig) {}
}
