//! Survey domain: roles, profiles, questions, ratings, and response rows.
//!
//! DESIGN
//! ======
//! The five questions are a closed enum. Per-question access into a
//! response row goes through `RATING_FIELDS`, an explicit table of
//! `(Question, accessor)` pairs, so no code ever picks a field by a runtime
//! string. Column names only appear at the wire boundary.
//!
//! Ratings are validated on the way in: a `Rating` is always 1..=5, and the
//! form tracks unanswered questions as `None` rather than a sentinel zero.

use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::OffsetDateTime;
use uuid::Uuid;

// =============================================================================
// ROLE
// =============================================================================

/// Role classification of an identity. Wire values follow the deployed
/// `profiles.role` column; the English names are accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "mahasiswa", alias = "student")]
    Student,
    #[serde(rename = "dosen", alias = "lecturer")]
    Lecturer,
    #[serde(rename = "staff")]
    Staff,
    #[serde(rename = "admin")]
    Admin,
}

impl Role {
    #[cfg(test)]
    pub const ALL: [Self; 4] = [Self::Student, Self::Lecturer, Self::Staff, Self::Admin];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Student => "mahasiswa",
            Self::Lecturer => "dosen",
            Self::Staff => "staff",
            Self::Admin => "admin",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "mahasiswa" | "student" => Some(Self::Student),
            "dosen" | "lecturer" => Some(Self::Lecturer),
            "staff" => Some(Self::Staff),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Only administrators may open the aggregation view.
    #[must_use]
    pub fn can_view_dashboard(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// PROFILE
// =============================================================================

/// Authenticated identity as owned by the identity collaborator. Read-only here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    #[serde(default)]
    pub nim_nip: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

// =============================================================================
// QUESTION
// =============================================================================

/// One of the five rated aspects. Serialized as its column name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Question {
    #[serde(rename = "q1_fasilitas")]
    Facilities,
    #[serde(rename = "q2_pelayanan_akademik")]
    AcademicServices,
    #[serde(rename = "q3_kualitas_pengajaran")]
    TeachingQuality,
    #[serde(rename = "q4_lingkungan_kampus")]
    CampusEnvironment,
    #[serde(rename = "q5_teknologi_informasi")]
    InformationTechnology,
}

impl Question {
    /// All questions in form order.
    pub const ALL: [Self; 5] = [
        Self::Facilities,
        Self::AcademicServices,
        Self::TeachingQuality,
        Self::CampusEnvironment,
        Self::InformationTechnology,
    ];

    /// Column name in `survey_responses`.
    #[must_use]
    pub fn column(self) -> &'static str {
        match self {
            Self::Facilities => "q1_fasilitas",
            Self::AcademicServices => "q2_pelayanan_akademik",
            Self::TeachingQuality => "q3_kualitas_pengajaran",
            Self::CampusEnvironment => "q4_lingkungan_kampus",
            Self::InformationTechnology => "q5_teknologi_informasi",
        }
    }

    /// Resolve a path segment to a question. Accepts the column name or the
    /// short `q1`..`q5` form.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|q| q.column() == raw || q.column().split('_').next() == Some(raw))
    }

    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Facilities => 0,
            Self::AcademicServices => 1,
            Self::TeachingQuality => 2,
            Self::CampusEnvironment => 3,
            Self::InformationTechnology => 4,
        }
    }
}

// =============================================================================
// RATING
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("rating must be between 1 and 5, got {0}")]
pub struct RatingOutOfRange(pub u8);

/// A star rating, always within 1..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = RatingOutOfRange;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&value) { Ok(Self(value)) } else { Err(RatingOutOfRange(value)) }
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

// =============================================================================
// FORM RATINGS
// =============================================================================

/// Per-question answers held by the form. Unanswered questions are `None`
/// and serialize as `0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ratings([Option<Rating>; 5]);

impl Ratings {
    pub fn set(&mut self, question: Question, rating: Rating) {
        self.0[question.index()] = Some(rating);
    }

    #[must_use]
    pub fn get(&self, question: Question) -> Option<Rating> {
        self.0[question.index()]
    }

    /// Questions still unanswered, in form order.
    #[must_use]
    pub fn missing(&self) -> Vec<Question> {
        Question::ALL
            .into_iter()
            .filter(|q| self.get(*q).is_none())
            .collect()
    }

    #[cfg(test)]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.0.iter().all(Option::is_some)
    }

    /// All five answers, or `None` while any question is unanswered.
    #[must_use]
    pub fn complete(&self) -> Option<[Rating; 5]> {
        let [a, b, c, d, e] = self.0;
        Some([a?, b?, c?, d?, e?])
    }
}

impl Serialize for Ratings {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Question::ALL.len()))?;
        for question in Question::ALL {
            let value = self.get(question).map_or(0, Rating::get);
            map.serialize_entry(question.column(), &value)?;
        }
        map.end()
    }
}

// =============================================================================
// RESPONSE ROWS
// =============================================================================

/// A stored `survey_responses` row. Never mutated after insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
    pub q1_fasilitas: Rating,
    pub q2_pelayanan_akademik: Rating,
    pub q3_kualitas_pengajaran: Rating,
    pub q4_lingkungan_kampus: Rating,
    pub q5_teknologi_informasi: Rating,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub saran: String,
    #[serde(with = "time::serde::rfc3339")]
    pub submitted_at: OffsetDateTime,
}

/// Accessor table for the rating columns, in `Question::ALL` order.
pub const RATING_FIELDS: [(Question, fn(&SurveyResponse) -> Rating); 5] = [
    (Question::Facilities, |r| r.q1_fasilitas),
    (Question::AcademicServices, |r| r.q2_pelayanan_akademik),
    (Question::TeachingQuality, |r| r.q3_kualitas_pengajaran),
    (Question::CampusEnvironment, |r| r.q4_lingkungan_kampus),
    (Question::InformationTechnology, |r| r.q5_teknologi_informasi),
];

impl SurveyResponse {
    #[cfg(test)]
    #[must_use]
    pub fn rating(&self, question: Question) -> Rating {
        let (_, read) = RATING_FIELDS[question.index()];
        read(self)
    }

    /// Whether the free-text field carries anything besides whitespace.
    #[must_use]
    pub fn has_feedback(&self) -> bool {
        !self.saran.trim().is_empty()
    }
}

/// Insert payload. `id` and `submitted_at` are assigned by storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewSurveyResponse {
    pub user_id: Uuid,
    pub role: Role,
    pub q1_fasilitas: Rating,
    pub q2_pelayanan_akademik: Rating,
    pub q3_kualitas_pengajaran: Rating,
    pub q4_lingkungan_kampus: Rating,
    pub q5_teknologi_informasi: Rating,
    pub saran: String,
}

impl NewSurveyResponse {
    /// Build the payload for `profile`, snapshotting its current role.
    #[must_use]
    pub fn new(profile: &Profile, ratings: [Rating; 5], saran: String) -> Self {
        let [q1, q2, q3, q4, q5] = ratings;
        Self {
            user_id: profile.id,
            role: profile.role,
            q1_fasilitas: q1,
            q2_pelayanan_akademik: q2,
            q3_kualitas_pengajaran: q3,
            q4_lingkungan_kampus: q4,
            q5_teknologi_informasi: q5,
            saran,
        }
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
#[path = "survey_test.rs"]
mod tests;
