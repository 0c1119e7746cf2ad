//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

/// Experiment plan generation prompt
pub const EXPERIMENT: &str = include_str!("../../prompts/experiment.pmt");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_experiment_prompt_placeholders() {
        assert!(EXPERIMENT.contains("research assistant"));
        for key in [
            "hypothesis",
            "researchObjective",
            "researchDomain",
            "dependentVariable",
            "independentVariable",
            "control",
            "budget",
        ] {
            assert!(EXPERIMENT.contains(&format!("{{{{{}}}}}", key)), "missing placeholder {}", key);
        }
        assert!(EXPERIMENT.contains("Respond with only the experiment plan"));
    }

    #[test]
    fn test_experiment_prompt_guidance() {
        assert!(EXPERIMENT.contains("biology research assistant"));
        assert!(EXPERIMENT.contains("suggest extending the budget with justification"));
        assert!(EXPERIMENT.contains("Do not focus solely on budget constraints"));
        assert!(EXPERIMENT.contains("Confirm if the user wishes to explore this or stick with the original plan."));
        assert!(EXPERIMENT.contains("Impactful Suggestions:"));
    }
}
