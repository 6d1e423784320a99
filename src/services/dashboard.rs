//! Aggregation view: summary statistics over every stored response.
//!
//! DESIGN
//! ======
//! `AdminDashboard::load` fetches the full row set newest-first; everything
//! else is a pure function of that set, recomputed on each `summary` call.
//! Averages iterate `RATING_FIELDS`, so adding a question means adding one
//! table entry.
//!
//! ERROR HANDLING
//! ==============
//! A failed load is logged and the view shows empty results instead of an
//! error page.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use time::OffsetDateTime;
use time::macros::format_description;
use tracing::{error, info};
use uuid::Uuid;

use crate::store::SurveyStore;
use crate::survey::{Question, RATING_FIELDS, Rating, Role, SurveyResponse};

pub const NO_FEEDBACK_MESSAGE: &str = "No suggestions have been submitted yet";

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionAverage {
    pub question: Question,
    /// Mean rating rounded to two decimals; `0` with no rows.
    pub average: f64,
    /// `average` formatted with two decimals, e.g. `"4.00"`.
    pub display: String,
    /// `average / 5`, for the progress bar.
    pub fill_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleCount {
    pub role: Role,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedbackEntry {
    pub id: Uuid,
    pub role: Role,
    /// Short local date, `d/m/yyyy`.
    pub date: String,
    #[serde(with = "time::serde::rfc3339")]
    pub submitted_at: OffsetDateTime,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FeedbackFeed {
    Entries { entries: Vec<FeedbackEntry> },
    Empty { message: &'static str },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub total: usize,
    pub averages: Vec<QuestionAverage>,
    pub roles: Vec<RoleCount>,
    pub feedback: FeedbackFeed,
}

// =============================================================================
// VIEW
// =============================================================================

pub struct AdminDashboard {
    store: Arc<dyn SurveyStore>,
    responses: Vec<SurveyResponse>,
    loaded: bool,
}

impl AdminDashboard {
    #[must_use]
    pub fn new(store: Arc<dyn SurveyStore>) -> Self {
        Self { store, responses: Vec::new(), loaded: false }
    }

    /// Fetch every response, newest first. On failure the row set is empty.
    pub async fn load(&mut self) {
        self.responses = match self.store.list_newest_first().await {
            Ok(rows) => {
                info!(count = rows.len(), "survey responses loaded");
                rows
            }
            Err(e) => {
                error!(error = %e, "loading survey responses failed; showing empty results");
                Vec::new()
            }
        };
        self.loaded = true;
    }

    #[cfg(test)]
    #[must_use]
    pub fn responses(&self) -> &[SurveyResponse] {
        &self.responses
    }

    /// `None` until `load` has completed.
    #[must_use]
    pub fn summary(&self) -> Option<DashboardSummary> {
        self.loaded.then(|| summarize(&self.responses))
    }
}

// =============================================================================
// DERIVATIONS
// =============================================================================

#[must_use]
pub fn summarize(rows: &[SurveyResponse]) -> DashboardSummary {
    DashboardSummary {
        total: rows.len(),
        averages: averages(rows),
        roles: role_distribution(rows),
        feedback: feedback_feed(rows),
    }
}

/// Mean of one question's ratings, rounded to two decimals. `0.0` for no rows.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn average(rows: &[SurveyResponse], read: fn(&SurveyResponse) -> Rating) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    let sum: u64 = rows.iter().map(|r| u64::from(read(r).get())).sum();
    let mean = sum as f64 / rows.len() as f64;
    (mean * 100.0).round() / 100.0
}

#[must_use]
pub fn averages(rows: &[SurveyResponse]) -> Vec<QuestionAverage> {
    RATING_FIELDS
        .iter()
        .map(|&(question, read)| {
            let average = average(rows, read);
            QuestionAverage {
                question,
                average,
                display: format!("{average:.2}"),
                fill_ratio: average / f64::from(Rating::MAX),
            }
        })
        .collect()
}

/// Respondent count per role, in role order. Roles with no rows are omitted.
#[must_use]
pub fn role_distribution(rows: &[SurveyResponse]) -> Vec<RoleCount> {
    let mut counts: BTreeMap<Role, usize> = BTreeMap::new();
    for row in rows {
        *counts.entry(row.role).or_default() += 1;
    }
    counts.into_iter().map(|(role, count)| RoleCount { role, count }).collect()
}

/// Rows with non-blank `saran`, in the order given.
#[must_use]
pub fn feedback_feed(rows: &[SurveyResponse]) -> FeedbackFeed {
    let entries: Vec<FeedbackEntry> = rows
        .iter()
        .filter(|r| r.has_feedback())
        .map(|r| FeedbackEntry {
            id: r.id,
            role: r.role,
            date: short_date(r.submitted_at),
            submitted_at: r.submitted_at,
            body: r.saran.clone(),
        })
        .collect();

    if entries.is_empty() { FeedbackFeed::Empty { message: NO_FEEDBACK_MESSAGE } } else { FeedbackFeed::Entries { entries } }
}

fn short_date(at: OffsetDateTime) -> String {
    at.format(format_description!("[day padding:none]/[month padding:none]/[year]"))
        .unwrap_or_else(|_| at.date().to_string())
}

#[cfg(test)]
#[path = "dashboard_test.rs"]
mod tests;
