mod config;
mod db;
mod routes;
mod services;
mod state;
mod store;
mod survey;

use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::store::SurveyStore;
use crate::store::postgres::PgSurveyStore;
use crate::store::supabase::SupabaseClient;

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")))
        .init();

    let config = match config::AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "configuration invalid");
            return ExitCode::FAILURE;
        }
    };

    let supabase = match SupabaseClient::new(&config.supabase, config.timeouts) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::error!(error = %e, "supabase client init failed");
            return ExitCode::FAILURE;
        }
    };

    // Direct Postgres when configured, otherwise rows go through PostgREST.
    let surveys: Arc<dyn SurveyStore> = match config.database_url.as_deref() {
        Some(url) => match db::connect_and_migrate(url).await {
            Ok(pool) => {
                tracing::info!("survey rows stored through Postgres");
                Arc::new(PgSurveyStore::new(pool))
            }
            Err(e) => {
                tracing::error!(error = %e, "database init failed");
                return ExitCode::FAILURE;
            }
        },
        None => supabase.clone(),
    };

    let state = state::AppState::new(surveys, supabase, config.cookie_secure);
    let app = routes::app(state, config.static_dir.as_deref());

    let port = config.port;
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "survei listening");
    axum::serve(listener, app).await.expect("server failed");
    ExitCode::SUCCESS
}
