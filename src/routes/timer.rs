//! # 타이머 API 라우트 핸들러
//!
//! ## 엔드포인트 목록
//! | 메서드 | 경로 | 핸들러 | 설명 |
//! |--------|------|--------|------|
//! | GET | /api/v1/timer | `get_timer` | 현재 상태와 경과 초 |
//! | POST | /api/v1/timer/start | `start_timer` | 새 타이머 시작 |
//! | POST | /api/v1/timer/pause | `pause_timer` | 일시정지 |
//! | POST | /api/v1/timer/resume | `resume_timer` | 재개 |
//! | POST | /api/v1/timer/stop | `stop_timer` | 멈추고 엔트리 확정 |
//! | POST | /api/v1/timer/discard | `discard_timer` | 기록 없이 버리기 |
//! | POST | /api/v1/entries/{id}/continue | `continue_entry` | 기존 엔트리에 이어서 기록 |
//!
//! 모든 핸들러는 토큰의 사용자 본인의 타이머만 다룹니다.

// ── 의존성 가져오기 ──
use crate::{
    error::AppError,           // 에러 타입 (자동으로 HTTP 에러 응답으로 변환됨)
    middleware::auth::AuthUser, // 토큰에서 꺼낸 사용자 (없거나 틀리면 401)
    models::*,                 // TimerState, TimeEntry, 요청 구조체들
    routes::AppState,          // 공유 상태 (타이머 엔진 등)
};
use axum::{
    extract::{Path, State}, // URL 파라미터, 앱 상태 추출
    http::StatusCode,       // 201 Created, 204 No Content
    Json,                   // JSON 요청/응답 처리
};

/// `GET /timer`: 화면의 실시간 표시용. 얼마나 자주 호출해도 상태를 바꾸지 않습니다.
pub async fn get_timer(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<TimerStatus>, AppError> {
    // 경과 초는 저장된 값이 아니라 호출 시점의 시계로 계산됩니다.
    let status = state.timer.status(&user.user_id).await?;
    Ok(Json(status))
}

/// `POST /timer/start` + `{ "project_id": "...", "category_id": "..." }`
pub async fn start_timer(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<StartTimerRequest>,
) -> Result<(StatusCode, Json<TimerState>), AppError> {
    // 이미 타이머가 있으면 AppError::Conflict → HTTP 409
    let timer = state
        .timer
        .start(&user.user_id, &req.project_id, &req.category_id)
        .await?;
    // (StatusCode, Json) 튜플도 IntoResponse를 구현하므로 상태 코드를 직접 지정할 수 있습니다.
    Ok((StatusCode::CREATED, Json(timer)))
}

/// `POST /timer/pause`
pub async fn pause_timer(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<TimerState>, AppError> {
    Ok(Json(state.timer.pause(&user.user_id).await?))
}

/// `POST /timer/resume`
pub async fn resume_timer(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<TimerState>, AppError> {
    Ok(Json(state.timer.resume(&user.user_id).await?))
}

/// `POST /timer/stop` + `{ "description": "...", "is_billable": true }`
///
/// 요청 본문 전체가 선택 항목이라 `Option<Json<_>>`으로 받습니다.
pub async fn stop_timer(
    State(state): State<AppState>,
    user: AuthUser,
    req: Option<Json<StopTimerRequest>>,
) -> Result<Json<TimeEntry>, AppError> {
    // 본문이 없으면 None → 기본값(설명 없음, 청구 여부 미지정)
    let req = req.map(|Json(r)| r).unwrap_or_default();
    // is_billable을 보내지 않았다면 청구 가능한 작업으로 봅니다.
    let entry = state
        .timer
        .stop(&user.user_id, &req.description, req.is_billable.unwrap_or(true))
        .await?;
    Ok(Json(entry))
}

/// `POST /timer/discard`
pub async fn discard_timer(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<StatusCode, AppError> {
    state.timer.discard(&user.user_id).await?;
    // 돌려줄 본문이 없으므로 204
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /entries/{id}/continue`
pub async fn continue_entry(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<TimerState>), AppError> {
    let timer = state.timer.continue_entry(&user.user_id, &id).await?;
    Ok((StatusCode::CREATED, Json(timer)))
}
