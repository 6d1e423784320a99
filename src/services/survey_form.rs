//! Response submission flow: one rating form per identity.
//!
//! DESIGN
//! ======
//! The form moves `Checking -> Open -> Submitted`, or `Checking ->
//! AlreadySubmitted` when a stored response exists. Both terminal phases are
//! one-way: once reached, no input is accepted and no insert can be issued.
//! Input is refused until the existence check has resolved.
//!
//! Submission is split into `begin_submit` (validate, mark in flight, build
//! the payload) and `complete_submit` (apply the store outcome) so callers
//! can release their lock on the form while the insert is outstanding. A
//! second submit observed while in flight is refused. `FormRegistry::submit`
//! drives both halves.
//!
//! ERROR HANDLING
//! ==============
//! A failed existence check is logged and the form opens anyway. Storage is
//! expected to reject a duplicate insert, so the worst case is a refused
//! write rather than a lost response. A failed insert leaves the form open
//! with `last_error` set; retry is user-initiated.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::store::{StoreError, SurveyStore};
use crate::survey::{NewSurveyResponse, Profile, Question, Rating, RatingOutOfRange, Ratings, Role};

pub const INCOMPLETE_RATINGS_MESSAGE: &str = "Please rate every aspect before submitting";
pub const SUBMIT_FAILED_MESSAGE: &str = "Something went wrong while saving the survey";

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormPhase {
    /// Existence check outstanding; input refused.
    Checking,
    /// No prior response; accepting input.
    Open,
    /// Submitted during this session.
    Submitted,
    /// A stored response was found on activation.
    AlreadySubmitted,
}

impl FormPhase {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Submitted | Self::AlreadySubmitted)
    }
}

/// Input refused by the current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("the form is not ready for input yet")]
    NotReady,
    #[error("a response has already been recorded for this account")]
    Closed,
    #[error("a submission is already in progress")]
    InFlight,
    #[error(transparent)]
    InvalidRating(#[from] RatingOutOfRange),
}

/// Submit attempted with unanswered questions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", INCOMPLETE_RATINGS_MESSAGE)]
pub struct ValidationError {
    pub missing: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    Refused(#[from] FormError),
    #[error(transparent)]
    Incomplete(#[from] ValidationError),
    /// The insert failed; the message is what the submitter sees.
    #[error("{0}")]
    Write(String),
}

/// Serializable snapshot of the form for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormView {
    pub phase: FormPhase,
    pub full_name: String,
    pub role: Role,
    pub ratings: Ratings,
    pub saran: String,
    pub submitting: bool,
    pub error: Option<String>,
}

// =============================================================================
// FORM
// =============================================================================

pub struct SurveyForm {
    store: Arc<dyn SurveyStore>,
    profile: Profile,
    phase: FormPhase,
    ratings: Ratings,
    comment: String,
    in_flight: bool,
    last_error: Option<String>,
}

impl SurveyForm {
    #[must_use]
    pub fn new(store: Arc<dyn SurveyStore>, profile: Profile) -> Self {
        Self {
            store,
            profile,
            phase: FormPhase::Checking,
            ratings: Ratings::default(),
            comment: String::new(),
            in_flight: false,
            last_error: None,
        }
    }

    /// Resolve whether this identity already has a stored response. Only the
    /// first call queries the store.
    pub async fn activate(&mut self) {
        if self.phase != FormPhase::Checking {
            return;
        }

        let user_id = self.profile.id;
        self.phase = match self.store.find_by_user(user_id).await {
            Ok(Some(_)) => {
                info!(%user_id, "existing survey response found");
                FormPhase::AlreadySubmitted
            }
            Ok(None) => FormPhase::Open,
            Err(e) => {
                error!(error = %e, %user_id, "existing response check failed; opening form");
                FormPhase::Open
            }
        };
    }

    /// Record `value` for `question`. Re-setting the same value is a no-op.
    ///
    /// # Errors
    ///
    /// Refused before activation, after a terminal phase, or when `value` is
    /// outside 1..=5.
    pub fn set_rating(&mut self, question: Question, value: u8) -> Result<(), FormError> {
        self.ensure_accepting_input()?;
        let rating = Rating::try_from(value)?;
        self.ratings.set(question, rating);
        Ok(())
    }

    /// Replace the free-text comment.
    ///
    /// # Errors
    ///
    /// Refused before activation or after a terminal phase.
    pub fn set_comment(&mut self, text: impl Into<String>) -> Result<(), FormError> {
        self.ensure_accepting_input()?;
        self.comment = text.into();
        Ok(())
    }

    /// Validate and mark the form in flight, returning the insert payload.
    ///
    /// # Errors
    ///
    /// `Refused` when not accepting input or already in flight, `Incomplete`
    /// when any question is unanswered. Neither issues an insert.
    pub fn begin_submit(&mut self) -> Result<NewSurveyResponse, SubmitError> {
        self.ensure_accepting_input()?;
        if self.in_flight {
            return Err(FormError::InFlight.into());
        }
        self.last_error = None;

        let Some(ratings) = self.ratings.complete() else {
            let err = ValidationError { missing: self.ratings.missing() };
            debug!(user_id = %self.profile.id, missing = err.missing.len(), "survey submit rejected: incomplete");
            self.last_error = Some(err.to_string());
            return Err(err.into());
        };

        self.in_flight = true;
        Ok(NewSurveyResponse::new(&self.profile, ratings, self.comment.clone()))
    }

    /// Apply the outcome of the insert started by `begin_submit`.
    ///
    /// # Errors
    ///
    /// `Write` with the collaborator's message, or a generic fallback, when
    /// the insert failed. The form stays open for a retry.
    pub fn complete_submit(&mut self, outcome: Result<(), StoreError>) -> Result<(), SubmitError> {
        self.in_flight = false;
        match outcome {
            Ok(()) => {
                info!(user_id = %self.profile.id, role = %self.profile.role, "survey response submitted");
                self.phase = FormPhase::Submitted;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, user_id = %self.profile.id, "survey insert failed");
                let message = e.collaborator_message().unwrap_or(SUBMIT_FAILED_MESSAGE).to_owned();
                self.last_error = Some(message.clone());
                Err(SubmitError::Write(message))
            }
        }
    }

    /// Validate, insert, and apply the outcome in one step.
    ///
    /// # Errors
    ///
    /// See [`SurveyForm::begin_submit`] and [`SurveyForm::complete_submit`].
    #[cfg(test)]
    pub async fn submit(&mut self) -> Result<(), SubmitError> {
        let payload = self.begin_submit()?;
        let outcome = self.store.insert(&payload).await;
        self.complete_submit(outcome)
    }

    fn ensure_accepting_input(&self) -> Result<(), FormError> {
        if self.phase == FormPhase::Checking {
            Err(FormError::NotReady)
        } else if self.phase.is_terminal() {
            Err(FormError::Closed)
        } else {
            Ok(())
        }
    }

    /// Store handle, for callers that run the insert outside their lock.
    #[must_use]
    pub fn store(&self) -> Arc<dyn SurveyStore> {
        Arc::clone(&self.store)
    }

    #[must_use]
    pub fn phase(&self) -> FormPhase {
        self.phase
    }

    /// `None` until the existence check has resolved.
    #[cfg(test)]
    #[must_use]
    pub fn existing_response_found(&self) -> Option<bool> {
        match self.phase {
            FormPhase::Checking => None,
            FormPhase::AlreadySubmitted => Some(true),
            FormPhase::Open | FormPhase::Submitted => Some(false),
        }
    }

    #[cfg(test)]
    #[must_use]
    pub fn ratings(&self) -> &Ratings {
        &self.ratings
    }

    #[cfg(test)]
    #[must_use]
    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    #[cfg(test)]
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    #[must_use]
    pub fn view(&self) -> FormView {
        FormView {
            phase: self.phase,
            full_name: self.profile.full_name.clone(),
            role: self.profile.role,
            ratings: self.ratings,
            saran: self.comment.clone(),
            submitting: self.in_flight,
            error: self.last_error.clone(),
        }
    }
}

#[cfg(test)]
#[path = "survey_form_test.rs"]
mod tests;
