//! Live survey forms keyed by identity.
//!
//! Each signed-in identity gets one `SurveyForm` while it is still open. The
//! form is activated under its own lock on first open, so no request can
//! touch its input before the existence check resolves. A form that reaches
//! a terminal phase is dropped from the registry; opening it again re-runs
//! the existence check, which lands in `AlreadySubmitted`.
//!
//! Submission runs the insert and applies its outcome on a spawned task. A
//! caller that goes away mid-request cannot leave the form stuck in flight.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error};
use uuid::Uuid;

use super::survey_form::{FormView, SubmitError, SurveyForm};
use crate::store::{StoreError, SurveyStore};
use crate::survey::Profile;

pub type SharedForm = Arc<Mutex<SurveyForm>>;

/// A refused or failed submit, with the form as it stands afterwards.
#[derive(Debug)]
pub struct SubmitFailure {
    pub error: SubmitError,
    pub view: FormView,
}

#[derive(Clone, Default)]
pub struct FormRegistry {
    forms: Arc<RwLock<HashMap<Uuid, SharedForm>>>,
}

impl FormRegistry {
    /// Return the identity's form, creating and activating it on first use.
    pub async fn open(&self, store: &Arc<dyn SurveyStore>, profile: &Profile) -> SharedForm {
        let form = {
            let mut forms = self.forms.write().await;
            Arc::clone(forms.entry(profile.id).or_insert_with(|| {
                debug!(user_id = %profile.id, "survey form created");
                Arc::new(Mutex::new(SurveyForm::new(Arc::clone(store), profile.clone())))
            }))
        };

        // Activation is a no-op once the check has resolved.
        form.lock().await.activate().await;
        self.evict_if_terminal(profile.id, &form).await;
        form
    }

    /// Validate, insert, and apply the outcome to `form`.
    ///
    /// # Errors
    ///
    /// Returns the `SubmitError` together with the resulting view when the
    /// form refuses the submit or the insert fails.
    pub async fn submit(&self, user_id: Uuid, form: &SharedForm) -> Result<FormView, SubmitFailure> {
        let (payload, store) = {
            let mut guard = form.lock().await;
            match guard.begin_submit() {
                Ok(payload) => (payload, guard.store()),
                Err(error) => return Err(SubmitFailure { error, view: guard.view() }),
            }
        };

        let registry = self.clone();
        let task_form = Arc::clone(form);
        let task = tokio::spawn(async move {
            let outcome = store.insert(&payload).await;
            let applied = {
                let mut guard = task_form.lock().await;
                let result = guard.complete_submit(outcome);
                (result, guard.view())
            };
            registry.evict_if_terminal(user_id, &task_form).await;
            applied
        });

        let (result, view) = match task.await {
            Ok(applied) => applied,
            Err(e) => {
                error!(error = %e, %user_id, "survey insert task failed");
                let mut guard = form.lock().await;
                let result = guard.complete_submit(Err(StoreError::Request(e.to_string())));
                (result, guard.view())
            }
        };

        match result {
            Ok(()) => Ok(view),
            Err(error) => Err(SubmitFailure { error, view }),
        }
    }

    /// Drop the identity's form. Returns whether one existed.
    pub async fn close(&self, user_id: Uuid) -> bool {
        self.forms.write().await.remove(&user_id).is_some()
    }

    async fn evict_if_terminal(&self, user_id: Uuid, form: &SharedForm) {
        if !form.lock().await.phase().is_terminal() {
            return;
        }
        let mut forms = self.forms.write().await;
        if forms.get(&user_id).is_some_and(|live| Arc::ptr_eq(live, form)) {
            forms.remove(&user_id);
            debug!(%user_id, "survey form closed");
        }
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.forms.read().await.len()
    }
}

#[cfg(test)]
#[path = "forms_test.rs"]
mod tests;
