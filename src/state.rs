//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the explicitly constructed collaborator handles and the registry of
//! live survey forms, one per signed-in identity.

use std::sync::Arc;

use crate::services::forms::FormRegistry;
use crate::store::{IdentityProvider, SurveyStore};

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Copy.
#[derive(Clone)]
pub struct AppState {
    pub surveys: Arc<dyn SurveyStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub forms: FormRegistry,
    /// `Secure` flag applied when clearing the session cookie.
    pub cookie_secure: bool,
}

impl AppState {
    #[must_use]
    pub fn new(surveys: Arc<dyn SurveyStore>, identity: Arc<dyn IdentityProvider>, cookie_secure: bool) -> Self {
        Self { surveys, identity, forms: FormRegistry::default(), cookie_secure }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
