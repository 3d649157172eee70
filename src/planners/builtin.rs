use super::{Planner, PlanningContext};
use crate::types::{GenerationConfig, Part, ThinkingConfig};

/// Delegates planning to the model's native thinking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuiltInPlanner {
    pub thinking_config: ThinkingConfig,
}

impl BuiltInPlanner {
    pub fn new(thinking_config: ThinkingConfig) -> Self {
        Self { thinking_config }
    }
}

impl Planner for BuiltInPlanner {
    fn build_planning_instruction(&self, _context: &PlanningContext) -> Option<String> {
        None
    }

    fn process_planning_response(&self, _parts: &[Part]) -> Option<Vec<Part>> {
        None
    }

    fn apply_thinking_config(&self, config: &mut GenerationConfig) {
        config.thinking_config = Some(self.thinking_config.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_sets_thinking_config() {
        let planner = BuiltInPlanner::new(ThinkingConfig {
            include_thoughts: Some(true),
            thinking_budget: Some(1024),
        });
        let mut config = GenerationConfig {
            temperature: Some(0.5),
            ..Default::default()
        };
        planner.apply_thinking_config(&mut config);
        assert_eq!(config.thinking_config.as_ref().unwrap().thinking_budget, Some(1024));
        assert_eq!(config.temperature, Some(0.5));
        assert!(planner.build_planning_instruction(&PlanningContext::new()).is_none());
        assert!(planner.process_planning_response(&[Part::text("x")]).is_none());
    }
}
