//! # 타임시트 워크플로 라우트 핸들러
//!
//! ## 엔드포인트
//! | 메서드 | 경로 | 권한 | 설명 |
//! |--------|------|------|------|
//! | GET | /api/v1/timesheets | 본인 | 내 타임시트 이력 |
//! | GET | /api/v1/timesheets/pending | 관리자 | 승인 대기 목록 |
//! | GET | /api/v1/timesheets/{week_start} | 본인 | 한 주의 타임시트 |
//! | GET | /api/v1/timesheets/{week_start}/validation | 본인 | 제출 전 검증 결과 |
//! | POST | /api/v1/timesheets/{week_start}/submit | 본인 | 제출 |
//! | POST | /api/v1/timesheets/{employee_id}/{week_start}/approve | 관리자 | 승인 |
//! | POST | /api/v1/timesheets/{employee_id}/{week_start}/reject | 관리자 | 반려 |
//! | POST | /api/v1/timesheets/{employee_id}/{week_start}/lock | 관리자 | 잠금 |
//!
//! `week_start`는 `YYYY-MM-DD` 형식의 월요일이어야 합니다.

use crate::{error::AppError, middleware::auth::AuthUser, models::*, routes::AppState};
use axum::{
    extract::{Path, State},
    Json,
};
use chrono::NaiveDate; // 경로의 `2026-10-12`를 날짜로 바로 파싱
use serde_json::{json, Value};

/// `GET /timesheets`: `{ "timesheets": [...] }`
pub async fn list_my_timesheets(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Value>, AppError> {
    let sheets = state.workflow.list_for_employee(&user.user_id).await?;
    Ok(Json(json!({ "timesheets": sheets })))
}

/// `GET /timesheets/pending`: 관리자 전용
pub async fn list_pending_timesheets(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Value>, AppError> {
    // 관리자가 아니면 여기서 AppError::Forbidden → HTTP 403
    user.require_admin()?;
    let sheets = state.workflow.list_pending().await?;
    Ok(Json(json!({ "timesheets": sheets })))
}

/// `GET /timesheets/{week_start}`
pub async fn get_timesheet(
    State(state): State<AppState>,
    user: AuthUser,
    Path(week_start): Path<NaiveDate>,
) -> Result<Json<Timesheet>, AppError> {
    Ok(Json(state.workflow.get(&user.user_id, week_start).await?))
}

/// `GET /timesheets/{week_start}/validation`: `{ "valid": bool, "issues": [...] }`
///
/// 화면에 미리 보여주기 위한 참고용입니다. 제출 시 서버가 다시 검증합니다.
pub async fn validate_timesheet(
    State(state): State<AppState>,
    user: AuthUser,
    Path(week_start): Path<NaiveDate>,
) -> Result<Json<Value>, AppError> {
    let issues = state
        .workflow
        .validate_for_submission(&user.user_id, week_start)
        .await?;
    // 위반이 있어도 에러가 아니라 200 + 목록입니다. 에러(422)는 실제 submit에서만 납니다.
    Ok(Json(json!({ "valid": issues.is_empty(), "issues": issues })))
}

/// `POST /timesheets/{week_start}/submit`
pub async fn submit_timesheet(
    State(state): State<AppState>,
    user: AuthUser,
    Path(week_start): Path<NaiveDate>,
) -> Result<Json<Timesheet>, AppError> {
    Ok(Json(state.workflow.submit(&user.user_id, week_start).await?))
}

/// `POST /timesheets/{employee_id}/{week_start}/approve`: 승인자는 토큰의 사용자입니다.
pub async fn approve_timesheet(
    State(state): State<AppState>,
    user: AuthUser,
    // 경로 파라미터가 두 개면 튜플로 받습니다 (선언 순서대로).
    Path((employee_id, week_start)): Path<(String, NaiveDate)>,
) -> Result<Json<Timesheet>, AppError> {
    user.require_admin()?;
    let sheet = state
        .workflow
        .approve(&employee_id, week_start, &user.user_id)
        .await?;
    Ok(Json(sheet))
}

/// `POST /timesheets/{employee_id}/{week_start}/reject` + `{ "remarks": "..." }`
pub async fn reject_timesheet(
    State(state): State<AppState>,
    user: AuthUser,
    Path((employee_id, week_start)): Path<(String, NaiveDate)>,
    Json(req): Json<RejectRequest>,
) -> Result<Json<Timesheet>, AppError> {
    user.require_admin()?;
    let sheet = state
        .workflow
        .reject(&employee_id, week_start, &req.remarks)
        .await?;
    Ok(Json(sheet))
}

/// `POST /timesheets/{employee_id}/{week_start}/lock`
pub async fn lock_timesheet(
    State(state): State<AppState>,
    user: AuthUser,
    Path((employee_id, week_start)): Path<(String, NaiveDate)>,
) -> Result<Json<Timesheet>, AppError> {
    user.require_admin()?;
    Ok(Json(state.workflow.lock(&employee_id, week_start).await?))
}
