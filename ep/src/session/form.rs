//! Persisted experiment form

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::{ExperimentForm, FormField};
use crate::store::{self, FORM_KEY, Storage};

/// The form being edited, mirrored to storage on every change
pub struct FormState {
    form: ExperimentForm,
    store: Arc<dyn Storage>,
}

impl FormState {
    /// Restore the persisted form, or start blank
    pub fn restore(store: Arc<dyn Storage>) -> Self {
        let form = store::load_json(store.as_ref(), FORM_KEY);
        Self { form, store }
    }

    pub fn form(&self) -> &ExperimentForm {
        &self.form
    }

    pub fn set(&mut self, field: FormField, value: impl Into<String>) {
        self.form.set(field, value);
        self.persist();
    }

    /// Blank every field and erase the persisted copy
    pub fn reset(&mut self) {
        debug!("FormState::reset: called");
        self.form = ExperimentForm::default();
        if let Err(e) = self.store.remove(FORM_KEY) {
            warn!(error = %e, "FormState::reset: failed to erase persisted form");
        }
    }

    fn persist(&self) {
        if let Err(e) = store::save_json(self.store.as_ref(), FORM_KEY, &self.form) {
            warn!(error = %e, "FormState::persist: failed to save form");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStorage;

    #[test]
    fn test_every_change_is_persisted() {
        let store: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let mut state = FormState::restore(store.clone());

        state.set(FormField::Hypothesis, "X increases Y");
        state.set(FormField::Budget, "$500");

        let reloaded = FormState::restore(store);
        assert_eq!(reloaded.form().hypothesis, "X increases Y");
        assert_eq!(reloaded.form().budget, "$500");
    }

    #[test]
    fn test_corrupt_form_falls_back_to_blank() {
        let store: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        store.write(FORM_KEY, "not json").unwrap();

        let state = FormState::restore(store);
        assert!(state.form().is_blank());
    }

    #[test]
    fn test_reset_erases_store() {
        let store: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let mut state = FormState::restore(store.clone());
        state.set(FormField::Control, "placebo");

        state.reset();
        assert!(state.form().is_blank());
        assert!(store.read(FORM_KEY).unwrap().is_none());
    }
}
