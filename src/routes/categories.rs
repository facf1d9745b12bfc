//! # 카테고리 라우트 핸들러
//!
//! - `GET /api/v1/categories`     → 카테고리 목록 (증빙/메모 요구 여부 포함)
//! - `PUT /api/v1/categories/{id}` → 카테고리 생성/수정 (관리자 전용)
//!
//! 변경된 정책은 다음 제출 검증부터 바로 적용됩니다.

use crate::{db, error::AppError, middleware::auth::AuthUser, models::*, routes::AppState};
use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

pub async fn list_categories(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<Value>, AppError> {
    let categories = db::categories::list(&state.pool).await?;
    Ok(Json(json!({ "categories": categories })))
}

pub async fn upsert_category(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<UpsertCategoryRequest>,
) -> Result<Json<Category>, AppError> {
    user.require_admin()?;
    if req.name.trim().is_empty() {
        return Err(AppError::BadRequest("Category name is required".to_string()));
    }

    // 같은 id가 있으면 덮어쓰고 없으면 새로 만듭니다 (INSERT ... ON CONFLICT).
    db::categories::upsert(&state.pool, &id, &req, state.clock.now()).await?;
    tracing::info!(category_id = %id, requires_proof = req.requires_proof, "Category saved");

    // 방금 저장한 행을 다시 읽어 DB가 채운 created_at/updated_at까지 돌려줍니다.
    let category = db::categories::get(&state.pool, &id)
        .await?
        .ok_or(AppError::Internal("Failed to retrieve saved category".to_string()))?;
    Ok(Json(category))
}
