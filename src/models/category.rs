use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: String,
    pub name: String,
    /// true면 제출 전에 증빙 첨부가 필수
    pub requires_proof: bool,
    /// true면 제출 전에 설명(description)이 필수
    pub requires_notes: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `PUT /api/v1/categories/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertCategoryRequest {
    pub name: String,
    #[serde(default)]
    pub requires_proof: bool,
    #[serde(default)]
    pub requires_notes: bool,
}
