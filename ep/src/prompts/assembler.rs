//! Prompt Assembler
//!
//! Renders the experiment form into the single prompt sent to the model.

use handlebars::Handlebars;
use thiserror::Error;
use tracing::debug;

use super::embedded;
use crate::domain::ExperimentForm;

const TEMPLATE_NAME: &str = "experiment";

/// Template failures; only reachable with a broken embedded template
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Failed to register prompt template: {0}")]
    Template(#[from] Box<handlebars::TemplateError>),

    #[error("Failed to render prompt: {0}")]
    Render(#[from] handlebars::RenderError),
}

/// Turns an [`ExperimentForm`] into the model prompt
///
/// Values are inserted verbatim: HTML escaping is disabled and blank fields
/// render as empty strings. Rendering has no side effects, so the same form
/// always yields the same prompt.
pub struct PromptAssembler {
    hbs: Handlebars<'static>,
}

impl PromptAssembler {
    /// Build an assembler around the embedded experiment template
    pub fn new() -> Result<Self, PromptError> {
        Self::with_template(embedded::EXPERIMENT)
    }

    fn with_template(template: &str) -> Result<Self, PromptError> {
        debug!(template_len = template.len(), "PromptAssembler::with_template: called");
        let mut hbs = Handlebars::new();
        hbs.register_escape_fn(handlebars::no_escape);
        hbs.register_template_string(TEMPLATE_NAME, template)
            .map_err(Box::new)?;
        Ok(Self { hbs })
    }

    /// Render the prompt for one form submission
    pub fn assemble(&self, form: &ExperimentForm) -> Result<String, PromptError> {
        debug!("PromptAssembler::assemble: called");
        let prompt = self.hbs.render(TEMPLATE_NAME, form)?;
        debug!(prompt_len = prompt.len(), "PromptAssembler::assemble: rendered");
        Ok(prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FormField;
    use proptest::prelude::*;

    fn scenario_form() -> ExperimentForm {
        ExperimentForm {
            hypothesis: "X increases Y".to_string(),
            research_objective: String::new(),
            research_domain: "Biology".to_string(),
            dependent_variable: "Y".to_string(),
            independent_variable: "X".to_string(),
            control: "no-X".to_string(),
            budget: "$500".to_string(),
        }
    }

    #[test]
    fn test_assemble_contains_labeled_values() {
        let assembler = PromptAssembler::new().unwrap();
        let prompt = assembler.assemble(&scenario_form()).unwrap();

        assert!(prompt.contains("Hypothesis: X increases Y"));
        assert!(prompt.contains("Research Domain: Biology"));
        assert!(prompt.contains("Control: no-X"));
        assert!(prompt.contains("Budget Range: $500"));
        assert!(prompt.contains("Respond with only the experiment plan"));
    }

    #[test]
    fn test_assemble_empty_form() {
        let assembler = PromptAssembler::new().unwrap();
        let prompt = assembler.assemble(&ExperimentForm::default()).unwrap();

        assert!(!prompt.is_empty());
        assert!(prompt.contains("Hypothesis: \n"));
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn test_assemble_does_not_escape() {
        let assembler = PromptAssembler::new().unwrap();
        let mut form = ExperimentForm::default();
        form.set(FormField::Control, "<5 mice> & \"sham\" group");

        let prompt = assembler.assemble(&form).unwrap();
        assert!(prompt.contains("Control: <5 mice> & \"sham\" group"));
    }

    #[test]
    fn test_broken_template_is_rejected() {
        assert!(PromptAssembler::with_template("{{#if hypothesis}}never closed").is_err());
    }

    proptest! {
        #[test]
        fn prop_every_value_appears_verbatim(values in proptest::collection::vec("[^{}]{0,40}", 7)) {
            let assembler = PromptAssembler::new().unwrap();
            let mut form = ExperimentForm::default();
            for (field, value) in FormField::ALL.iter().zip(values.iter()) {
                form.set(*field, value.clone());
            }

            let prompt = assembler.assemble(&form).unwrap();
            prop_assert!(!prompt.is_empty());
            for value in &values {
                prop_assert!(prompt.contains(value.as_str()));
            }
        }

        #[test]
        fn prop_assemble_is_deterministic(hypothesis in ".{0,60}", budget in ".{0,20}") {
            let assembler = PromptAssembler::new().unwrap();
            let form = ExperimentForm { hypothesis, budget, ..Default::default() };

            let first = assembler.assemble(&form).unwrap();
            let second = PromptAssembler::new().unwrap().assemble(&form).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
