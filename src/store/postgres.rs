//! Direct Postgres adapter for `survey_responses`.
//!
//! Same table, same semantics as the PostgREST path. Used when the service
//! runs next to the database and `DATABASE_URL` is configured; the
//! `UNIQUE (user_id)` constraint from the migration backs the
//! one-response-per-identity rule.

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::{StoreError, SurveyStore};
use crate::survey::{NewSurveyResponse, Rating, Role, SurveyResponse};

const SELECT_COLUMNS: &str = "id, user_id, role, q1_fasilitas, q2_pelayanan_akademik, q3_kualitas_pengajaran, \
     q4_lingkungan_kampus, q5_teknologi_informasi, saran, submitted_at";

pub struct PgSurveyStore {
    pool: PgPool,
}

impl PgSurveyStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SurveyStore for PgSurveyStore {
    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<SurveyResponse>, StoreError> {
        let row = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM survey_responses WHERE user_id = $1 LIMIT 1"))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(response_from_row).transpose()
    }

    async fn list_newest_first(&self) -> Result<Vec<SurveyResponse>, StoreError> {
        let rows = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM survey_responses ORDER BY submitted_at DESC"))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(response_from_row).collect()
    }

    async fn insert(&self, response: &NewSurveyResponse) -> Result<(), StoreError> {
        sqlx::query(
            r"INSERT INTO survey_responses
                  (user_id, role, q1_fasilitas, q2_pelayanan_akademik, q3_kualitas_pengajaran,
                   q4_lingkungan_kampus, q5_teknologi_informasi, saran)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(response.user_id)
        .bind(response.role.as_str())
        .bind(i16::from(response.q1_fasilitas.get()))
        .bind(i16::from(response.q2_pelayanan_akademik.get()))
        .bind(i16::from(response.q3_kualitas_pengajaran.get()))
        .bind(i16::from(response.q4_lingkungan_kampus.get()))
        .bind(i16::from(response.q5_teknologi_informasi.get()))
        .bind(&response.saran)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn response_from_row(row: &PgRow) -> Result<SurveyResponse, StoreError> {
    let role: String = row.try_get("role")?;
    Ok(SurveyResponse {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        role: Role::parse(&role).ok_or_else(|| StoreError::Parse(format!("unknown role: {role}")))?,
        q1_fasilitas: rating_column(row, "q1_fasilitas")?,
        q2_pelayanan_akademik: rating_column(row, "q2_pelayanan_akademik")?,
        q3_kualitas_pengajaran: rating_column(row, "q3_kualitas_pengajaran")?,
        q4_lingkungan_kampus: rating_column(row, "q4_lingkungan_kampus")?,
        q5_teknologi_informasi: rating_column(row, "q5_teknologi_informasi")?,
        saran: row.try_get::<Option<String>, _>("saran")?.unwrap_or_default(),
        submitted_at: row.try_get("submitted_at")?,
    })
}

fn rating_column(row: &PgRow, column: &str) -> Result<Rating, StoreError> {
    let raw: i16 = row.try_get(column)?;
    parse_rating(column, raw)
}

fn parse_rating(column: &str, raw: i16) -> Result<Rating, StoreError> {
    u8::try_from(raw)
        .ok()
        .and_then(|v| Rating::try_from(v).ok())
        .ok_or_else(|| StoreError::Parse(format!("{column} out of range: {raw}")))
}

#[cfg(test)]
#[path = "postgres_test.rs"]
mod tests;
