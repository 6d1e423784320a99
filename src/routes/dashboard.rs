//! Aggregation view route. Administrators only.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;

use crate::routes::auth::AuthUser;
use crate::services::dashboard::{AdminDashboard, DashboardSummary};
use crate::state::AppState;

/// `GET /api/dashboard` — load every response and return the summary.
pub async fn summary(State(state): State<AppState>, auth: AuthUser) -> Result<Json<DashboardSummary>, StatusCode> {
    if !auth.profile.role.can_view_dashboard() {
        tracing::debug!(user_id = %auth.profile.id, role = %auth.profile.role, "dashboard access denied");
        return Err(StatusCode::FORBIDDEN);
    }

    let mut dashboard = AdminDashboard::new(state.surveys.clone());
    dashboard.load().await;
    dashboard.summary().map(Json).ok_or(StatusCode::INTERNAL_SERVER_ERROR)
}

#[cfg(test)]
#[path = "dashboard_test.rs"]
mod tests;
