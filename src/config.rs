//! Service configuration parsed from environment variables.
//!
//! `main` loads `.env` through `dotenvy` first, so every key below may come
//! from either the process environment or that file.

use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required env var {var}")]
    Missing { var: &'static str },
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Hosted backend endpoint and the API key passed through on every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupabaseConfig {
    pub url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_HTTP_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_HTTP_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub supabase: SupabaseConfig,
    /// When set, survey rows are read and written through Postgres directly.
    pub database_url: Option<String>,
    pub port: u16,
    /// SPA assets served at `/` when present.
    pub static_dir: Option<PathBuf>,
    pub cookie_secure: bool,
    pub timeouts: HttpTimeouts,
}

impl AppConfig {
    /// Build typed config from the process environment.
    ///
    /// Required:
    /// - `SUPABASE_URL`
    /// - `SUPABASE_KEY` (falls back to `SUPABASE_ANON_KEY`)
    ///
    /// Optional:
    /// - `DATABASE_URL`, `PORT` (3000), `STATIC_DIR`, `COOKIE_SECURE` (false)
    /// - `HTTP_REQUEST_TIMEOUT_SECS` (30), `HTTP_CONNECT_TIMEOUT_SECS` (10)
    ///
    /// # Errors
    ///
    /// Returns an error if a required key is missing or a value does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build typed config from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a required key is missing or a value does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let url = get("SUPABASE_URL").ok_or(ConfigError::Missing { var: "SUPABASE_URL" })?;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Invalid { var: "SUPABASE_URL", value: url });
        }
        let api_key = get("SUPABASE_KEY")
            .or_else(|| get("SUPABASE_ANON_KEY"))
            .ok_or(ConfigError::Missing { var: "SUPABASE_KEY" })?;

        let port = parse_or("PORT", get("PORT"), DEFAULT_PORT)?;
        let cookie_secure = match get("COOKIE_SECURE") {
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::Invalid { var: "COOKIE_SECURE", value: raw })?,
            None => false,
        };
        let timeouts = HttpTimeouts {
            request_secs: parse_or(
                "HTTP_REQUEST_TIMEOUT_SECS",
                get("HTTP_REQUEST_TIMEOUT_SECS"),
                DEFAULT_HTTP_REQUEST_TIMEOUT_SECS,
            )?,
            connect_secs: parse_or(
                "HTTP_CONNECT_TIMEOUT_SECS",
                get("HTTP_CONNECT_TIMEOUT_SECS"),
                DEFAULT_HTTP_CONNECT_TIMEOUT_SECS,
            )?,
        };

        Ok(Self {
            supabase: SupabaseConfig { url: url.trim_end_matches('/').to_owned(), api_key },
            database_url: get("DATABASE_URL"),
            port,
            static_dir: get("STATIC_DIR").map(PathBuf::from),
            cookie_secure,
            timeouts,
        })
    }
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_or<T: std::str::FromStr>(var: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid { var, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
