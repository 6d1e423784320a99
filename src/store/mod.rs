//! Collaborator seams: survey table access and identity lookup.
//!
//! ARCHITECTURE
//! ============
//! Storage and identity live in a hosted backend. Components never reach for
//! a global client: they receive an `Arc<dyn SurveyStore>` (and routes an
//! `Arc<dyn IdentityProvider>`) at construction, which tests replace with
//! in-memory stubs.
//!
//! `supabase` talks to PostgREST/GoTrue over HTTP. `postgres` is a direct
//! sqlx adapter for the same table, used when `DATABASE_URL` is configured.

pub mod postgres;
pub mod supabase;

use uuid::Uuid;

use crate::survey::{NewSurveyResponse, Profile, SurveyResponse};

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by collaborator calls.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The HTTP request could not be sent or its body could not be read.
    #[error("request failed: {0}")]
    Request(String),

    /// The collaborator answered with a non-success status.
    #[error("collaborator returned status {status}: {message}")]
    Response { status: u16, message: String },

    /// The collaborator's response body did not match the expected shape.
    #[error("response parse failed: {0}")]
    Parse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// The collaborator's own explanation, when it gave one.
    #[must_use]
    pub fn collaborator_message(&self) -> Option<&str> {
        let message = match self {
            Self::Response { message, .. } => message.as_str(),
            Self::Database(e) => e.as_database_error()?.message(),
            Self::Request(_) | Self::Parse(_) | Self::HttpClientBuild(_) => return None,
        };
        let message = message.trim();
        (!message.is_empty()).then_some(message)
    }
}

// =============================================================================
// TRAITS
// =============================================================================

/// Row-level access to the `survey_responses` table.
#[async_trait::async_trait]
pub trait SurveyStore: Send + Sync {
    /// `select * where user_id = :id limit 1`.
    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<SurveyResponse>, StoreError>;

    /// `select * order by submitted_at desc`.
    async fn list_newest_first(&self) -> Result<Vec<SurveyResponse>, StoreError>;

    /// Insert one response. Storage assigns `id` and `submitted_at`.
    async fn insert(&self, response: &NewSurveyResponse) -> Result<(), StoreError>;
}

/// Session-bound identity lookups.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve an access token to its profile. `Ok(None)` when the token is
    /// not recognised or the identity has no profile row.
    async fn profile(&self, access_token: &str) -> Result<Option<Profile>, StoreError>;

    /// Revoke the session behind `access_token`.
    async fn sign_out(&self, access_token: &str) -> Result<(), StoreError>;
}
