//! Supabase client: PostgREST table access and GoTrue identity lookups.
//!
//! Thin HTTP wrapper over `/rest/v1` and `/auth/v1`. Every call carries the
//! configured API key unchanged in the `apikey` header. Table calls
//! authenticate with that key; identity calls forward the caller's access
//! token. Body parsing lives in pure functions for testability.

use std::time::Duration;

use reqwest::{RequestBuilder, StatusCode};
use uuid::Uuid;

use super::{IdentityProvider, StoreError, SurveyStore};
use crate::config::{HttpTimeouts, SupabaseConfig};
use crate::survey::{NewSurveyResponse, Profile, SurveyResponse};

const RESPONSES_TABLE: &str = "survey_responses";
const PROFILES_TABLE: &str = "profiles";

// =============================================================================
// CLIENT
// =============================================================================

pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SupabaseClient {
    /// Build a client for the configured project.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &SupabaseConfig, timeouts: HttpTimeouts) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .user_agent(concat!("survei/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StoreError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: config.url.trim_end_matches('/').to_owned(), api_key: config.api_key.clone() })
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url)
    }

    /// Request authenticated with the project key.
    fn table_request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    /// Request authenticated as the session behind `access_token`.
    fn session_request(&self, builder: RequestBuilder, access_token: &str) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
    }

    /// Send and return the body of a 2xx response.
    async fn send(builder: RequestBuilder) -> Result<String, StoreError> {
        let response = builder
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        if !status.is_success() {
            return Err(StoreError::Response { status: status.as_u16(), message: parse_error_message(&text) });
        }
        Ok(text)
    }
}

#[async_trait::async_trait]
impl SurveyStore for SupabaseClient {
    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<SurveyResponse>, StoreError> {
        let request = self
            .table_request(self.http.get(self.rest_url(RESPONSES_TABLE)))
            .query(&[("select", "*".to_owned()), ("user_id", eq_filter(user_id)), ("limit", "1".to_owned())]);
        let body = Self::send(request).await?;
        Ok(parse_rows::<SurveyResponse>(&body)?.into_iter().next())
    }

    async fn list_newest_first(&self) -> Result<Vec<SurveyResponse>, StoreError> {
        let request = self
            .table_request(self.http.get(self.rest_url(RESPONSES_TABLE)))
            .query(&[("select", "*"), ("order", "submitted_at.desc")]);
        let body = Self::send(request).await?;
        parse_rows(&body)
    }

    async fn insert(&self, response: &NewSurveyResponse) -> Result<(), StoreError> {
        let request = self
            .table_request(self.http.post(self.rest_url(RESPONSES_TABLE)))
            .header("Prefer", "return=minimal")
            .json(response);
        Self::send(request).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl IdentityProvider for SupabaseClient {
    async fn profile(&self, access_token: &str) -> Result<Option<Profile>, StoreError> {
        let request = self.session_request(self.http.get(self.auth_url("user")), access_token);
        let body = match Self::send(request).await {
            Ok(body) => body,
            Err(StoreError::Response { status, .. }) if is_rejected_token(status) => return Ok(None),
            Err(e) => return Err(e),
        };
        let user_id = parse_auth_user_id(&body)?;

        let request = self
            .table_request(self.http.get(self.rest_url(PROFILES_TABLE)))
            .query(&[("select", "*".to_owned()), ("id", eq_filter(user_id)), ("limit", "1".to_owned())]);
        let body = Self::send(request).await?;
        Ok(parse_rows::<Profile>(&body)?.into_iter().next())
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), StoreError> {
        let request = self.session_request(self.http.post(self.auth_url("logout")), access_token);
        match Self::send(request).await {
            // An already-expired session is as signed out as it gets.
            Err(StoreError::Response { status, .. }) if is_rejected_token(status) => Ok(()),
            other => other.map(|_| ()),
        }
    }
}

// =============================================================================
// PARSING
// =============================================================================

#[derive(serde::Deserialize)]
struct AuthUser {
    id: Uuid,
}

fn eq_filter(id: Uuid) -> String {
    format!("eq.{id}")
}

fn is_rejected_token(status: u16) -> bool {
    status == StatusCode::UNAUTHORIZED.as_u16() || status == StatusCode::FORBIDDEN.as_u16()
}

fn parse_rows<T: serde::de::DeserializeOwned>(body: &str) -> Result<Vec<T>, StoreError> {
    serde_json::from_str(body).map_err(|e| StoreError::Parse(e.to_string()))
}

fn parse_auth_user_id(body: &str) -> Result<Uuid, StoreError> {
    serde_json::from_str::<AuthUser>(body)
        .map(|user| user.id)
        .map_err(|e| StoreError::Parse(e.to_string()))
}

/// Pull a human-readable message out of a PostgREST or GoTrue error body.
/// Falls back to the raw body when it is not a recognised JSON error.
fn parse_error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_owned();
    };
    ["message", "msg", "error_description", "error"]
        .into_iter()
        .find_map(|key| value.get(key).and_then(serde_json::Value::as_str))
        .map_or_else(|| body.trim().to_owned(), str::to_owned)
}

#[cfg(test)]
#[path = "supabase_test.rs"]
mod tests;
