//! Survey form routes.
//!
//! Each handler resolves the caller's live form from the registry, applies
//! one input, and answers with the form view. Submission goes through the
//! registry, which holds no lock while the insert is outstanding; a
//! concurrent submit sees the in-flight flag and is refused.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;

use crate::routes::auth::AuthUser;
use crate::services::forms::SharedForm;
use crate::services::survey_form::{FormError, FormView, SubmitError};
use crate::state::AppState;
use crate::survey::Question;

#[derive(Deserialize)]
pub struct RatingBody {
    pub rating: u8,
}

#[derive(Deserialize)]
pub struct CommentBody {
    pub saran: String,
}

async fn form_for(state: &AppState, auth: &AuthUser) -> SharedForm {
    state.forms.open(&state.surveys, &auth.profile).await
}

/// `GET /api/survey` — activate on first visit and return the form view.
pub async fn show(State(state): State<AppState>, auth: AuthUser) -> Json<FormView> {
    let form = form_for(&state, &auth).await;
    let view = form.lock().await.view();
    Json(view)
}

/// `PUT /api/survey/ratings/:question` — set one rating.
pub async fn set_rating(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(question): Path<String>,
    Json(body): Json<RatingBody>,
) -> Result<Json<FormView>, Response> {
    let Some(question) = Question::parse(&question) else {
        return Err(StatusCode::NOT_FOUND.into_response());
    };

    let form = form_for(&state, &auth).await;
    let mut form = form.lock().await;
    form.set_rating(question, body.rating).map_err(|e| refusal(&e, form.view()))?;
    Ok(Json(form.view()))
}

/// `PUT /api/survey/comment` — replace the free-text suggestion.
pub async fn set_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CommentBody>,
) -> Result<Json<FormView>, Response> {
    let form = form_for(&state, &auth).await;
    let mut form = form.lock().await;
    form.set_comment(body.saran).map_err(|e| refusal(&e, form.view()))?;
    Ok(Json(form.view()))
}

/// `POST /api/survey/submit` — validate and insert the response.
pub async fn submit(State(state): State<AppState>, auth: AuthUser) -> Result<Json<FormView>, Response> {
    let form = form_for(&state, &auth).await;
    match state.forms.submit(auth.profile.id, &form).await {
        Ok(view) => Ok(Json(view)),
        Err(failure) => Err(submit_failure(&failure.error, failure.view)),
    }
}

fn refusal(err: &FormError, view: FormView) -> Response {
    (form_error_to_status(err), Json(view)).into_response()
}

fn submit_failure(err: &SubmitError, view: FormView) -> Response {
    (submit_error_to_status(err), Json(view)).into_response()
}

pub(crate) fn form_error_to_status(err: &FormError) -> StatusCode {
    match err {
        FormError::InvalidRating(_) => StatusCode::UNPROCESSABLE_ENTITY,
        FormError::NotReady | FormError::Closed | FormError::InFlight => StatusCode::CONFLICT,
    }
}

pub(crate) fn submit_error_to_status(err: &SubmitError) -> StatusCode {
    match err {
        SubmitError::Refused(e) => form_error_to_status(e),
        SubmitError::Incomplete(_) => StatusCode::UNPROCESSABLE_ENTITY,
        SubmitError::Write(_) => StatusCode::BAD_GATEWAY,
    }
}

#[cfg(test)]
#[path = "survey_test.rs"]
mod tests;
