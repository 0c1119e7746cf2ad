//! Experiment form record

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The structured description of a planned experiment
///
/// Every field is free text and may be empty. Missing JSON fields
/// deserialize to the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExperimentForm {
    pub hypothesis: String,
    pub research_objective: String,
    pub research_domain: String,
    pub dependent_variable: String,
    pub independent_variable: String,
    pub control: String,
    pub budget: String,
}

impl ExperimentForm {
    /// Get the value of one field
    pub fn get(&self, field: FormField) -> &str {
        match field {
            FormField::Hypothesis => &self.hypothesis,
            FormField::ResearchObjective => &self.research_objective,
            FormField::ResearchDomain => &self.research_domain,
            FormField::DependentVariable => &self.dependent_variable,
            FormField::IndependentVariable => &self.independent_variable,
            FormField::Control => &self.control,
            FormField::Budget => &self.budget,
        }
    }

    /// Replace the value of one field
    pub fn set(&mut self, field: FormField, value: impl Into<String>) {
        debug!(?field, "ExperimentForm::set: called");
        let slot = match field {
            FormField::Hypothesis => &mut self.hypothesis,
            FormField::ResearchObjective => &mut self.research_objective,
            FormField::ResearchDomain => &mut self.research_domain,
            FormField::DependentVariable => &mut self.dependent_variable,
            FormField::IndependentVariable => &mut self.independent_variable,
            FormField::Control => &mut self.control,
            FormField::Budget => &mut self.budget,
        };
        *slot = value.into();
    }

    /// True when every field is blank
    pub fn is_blank(&self) -> bool {
        FormField::ALL.iter().all(|f| self.get(*f).trim().is_empty())
    }
}

/// Names the fields of [`ExperimentForm`] in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormField {
    Hypothesis,
    ResearchObjective,
    ResearchDomain,
    DependentVariable,
    IndependentVariable,
    Control,
    Budget,
}

impl FormField {
    pub const ALL: [FormField; 7] = [
        FormField::Hypothesis,
        FormField::ResearchObjective,
        FormField::ResearchDomain,
        FormField::DependentVariable,
        FormField::IndependentVariable,
        FormField::Control,
        FormField::Budget,
    ];

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            FormField::Hypothesis => "Hypothesis",
            FormField::ResearchObjective => "Research Objective",
            FormField::ResearchDomain => "Research Domain",
            FormField::DependentVariable => "Dependent Variable",
            FormField::IndependentVariable => "Independent Variable",
            FormField::Control => "Control",
            FormField::Budget => "Rough Budget",
        }
    }

    /// Input hint shown by the interactive form editor
    pub fn hint(&self) -> &'static str {
        match self {
            FormField::Hypothesis => "State your research hypothesis",
            FormField::ResearchObjective => "Describe your research question and expected outcome",
            FormField::ResearchDomain => "e.g. Biology, Physics, Chemistry",
            FormField::DependentVariable => "Factor you will measure or observe",
            FormField::IndependentVariable => "Factor you will manipulate",
            FormField::Control => "Describe your control conditions",
            FormField::Budget => "Estimated budget",
        }
    }
}
