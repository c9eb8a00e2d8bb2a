//! Grouping of steps into per-entity output records.

use std::collections::{HashMap, HashSet};

use prospect_types::{OutputRecord, WorkflowDescriptor};

use crate::context::ExecutionContext;

/// Tracks which step closes each entity's chain and which records were
/// already emitted.
#[derive(Debug)]
pub(crate) struct RecordPlan {
    last_step_by_entity: HashMap<String, usize>,
    emitted: HashSet<String>,
}

impl RecordPlan {
    pub(crate) fn new(descriptor: &WorkflowDescriptor) -> Self {
        let last_step_by_entity = descriptor
            .steps
            .iter()
            .enumerate()
            .map(|(index, step)| (descriptor.entity_of(step).to_string(), index))
            .collect();
        Self {
            last_step_by_entity,
            emitted: HashSet::new(),
        }
    }

    /// Entity whose last step sits at `index`, when that is the case.
    pub(crate) fn closes_at(&self, index: usize) -> Option<&str> {
        self.last_step_by_entity
            .iter()
            .find(|(_, last)| **last == index)
            .map(|(entity, _)| entity.as_str())
    }

    /// Builds the record for `entity` once; later calls for the same entity
    /// return `None`.
    pub(crate) fn take(&mut self, descriptor: &WorkflowDescriptor, entity: &str, context: &ExecutionContext) -> Option<OutputRecord> {
        if !self.emitted.insert(entity.to_string()) {
            return None;
        }
        let mut record = OutputRecord::new(entity);
        for step in descriptor.steps.iter().filter(|step| descriptor.entity_of(step) == entity) {
            if let Some(output) = context.get(&step.name) {
                record.fields.insert(step.field_name().to_string(), output.clone());
            }
        }
        Some(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prospect_types::StepDefinition;
    use serde_json::json;

    fn descriptor() -> WorkflowDescriptor {
        WorkflowDescriptor {
            workflow: Some("batch".into()),
            steps: vec![
                StepDefinition::new("acme_revenue", "revenue_lookup").with_entity("acme").with_field("Revenue"),
                StepDefinition::new("globex_revenue", "revenue_lookup").with_entity("globex"),
                StepDefinition::new("acme_tier", "classify_tier").with_entity("acme").with_field("Tier"),
                StepDefinition::new("note", "noop"),
            ],
        }
    }

    #[test]
    fn entity_chains_close_on_their_last_step() {
        let plan = RecordPlan::new(&descriptor());
        assert_eq!(plan.closes_at(0), None);
        assert_eq!(plan.closes_at(1), Some("globex"));
        assert_eq!(plan.closes_at(2), Some("acme"));
        assert_eq!(plan.closes_at(3), Some("batch"));
    }

    #[test]
    fn records_collect_successful_outputs_once() {
        let descriptor = descriptor();
        let mut plan = RecordPlan::new(&descriptor);
        let mut context = ExecutionContext::default();
        context.commit("acme_revenue", json!(2_000_000_000.0));
        context.commit("acme_tier", json!("Super Platinum"));

        let record = plan.take(&descriptor, "acme", &context).expect("first take");
        assert_eq!(record.fields.get("Revenue"), Some(&json!(2_000_000_000.0)));
        assert_eq!(record.fields.get("Tier"), Some(&json!("Super Platinum")));
        assert!(plan.take(&descriptor, "acme", &context).is_none());

        let empty = plan.take(&descriptor, "globex", &context).expect("globex");
        assert!(empty.fields.is_empty());
    }
}
