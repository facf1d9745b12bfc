//! # 작업 시간 기록(Entry) 라우트 핸들러
//!
//! ## 엔드포인트
//! - `GET    /api/v1/entries?week_start=YYYY-MM-DD` → 한 주의 엔트리 목록
//! - `POST   /api/v1/entries`                        → 수동 엔트리 생성
//! - `PATCH  /api/v1/entries/{id}`                    → 엔트리 수정 (DRAFT만)
//! - `DELETE /api/v1/entries/{id}`                    → 엔트리 삭제 (DRAFT만)
//! - `POST   /api/v1/entries/{id}/proof`              → 증빙 첨부

use crate::{error::AppError, middleware::auth::AuthUser, models::*, routes::AppState};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

/// `GET /entries?week_start=...`: `{ "entries": [...] }`
pub async fn list_entries(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<WeekQuery>,
) -> Result<Json<Value>, AppError> {
    // Query(query): `?week_start=2026-10-12`를 WeekQuery로 파싱합니다.
    // 날짜 형식이 틀리면 Axum이 400을, 월요일이 아니면 서비스가 400을 돌려줍니다.
    let entries = state
        .entries
        .list_week(&user.user_id, query.week_start)
        .await?;
    Ok(Json(json!({ "entries": entries })))
}

/// `POST /entries`
pub async fn create_entry(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreateEntryRequest>,
) -> Result<(StatusCode, Json<TimeEntry>), AppError> {
    // 엔트리의 주가 이미 제출/승인되었으면 409, 잠겼으면 423
    let entry = state.entries.create_manual_entry(&user.user_id, &req).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// `PATCH /entries/{id}`: 포함된 필드만 변경합니다.
pub async fn update_entry(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateEntryRequest>,
) -> Result<Json<TimeEntry>, AppError> {
    // Path(id): `/entries/abc-123` → id = "abc-123"
    // 남의 엔트리는 존재하지 않는 것처럼 404로 응답합니다.
    let entry = state.entries.update_entry(&user.user_id, &id, &req).await?;
    Ok(Json(entry))
}

/// `DELETE /entries/{id}`: 성공 시 204 No Content
pub async fn delete_entry(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.entries.delete_entry(&user.user_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /entries/{id}/proof` + `{ "proof_ref": "uploads/receipt.pdf" }`
pub async fn attach_proof(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<AttachProofRequest>,
) -> Result<Json<TimeEntry>, AppError> {
    let entry = state
        .entries
        .attach_proof(&user.user_id, &id, &req.proof_ref)
        .await?;
    Ok(Json(entry))
}
