//! # 에러 처리 모듈
//!
//! 타이머와 타임시트 워크플로에서 발생할 수 있는 모든 에러 타입을 정의합니다.
//! Rust에서는 예외(exception) 대신 `Result<T, E>` 타입으로 에러를 처리합니다.
//!
//! 이 모듈의 핵심:
//! - `AppError` 열거형(enum): 모든 에러 종류를 하나의 타입으로 통합
//! - `IntoResponse` 구현: 에러를 HTTP 응답으로 자동 변환
//!
//! `Storage`를 제외한 모든 에러는 호출자(API 계층)가 사용자 메시지로 바꿔
//! 돌려주는 "예상된 결과"입니다. `Storage`만이 복구 불가능한 저장소 실패를 뜻합니다.

use crate::models::ValidationIssue;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// 애플리케이션에서 발생할 수 있는 모든 에러 종류
///
/// 핸들러에서 `Result<T, AppError>`를 반환하면,
/// Axum이 자동으로 `IntoResponse`를 호출하여 HTTP 응답으로 변환합니다.
#[derive(Debug, Error)]
pub enum AppError {
    /// 요청한 사용자/엔트리/타임시트가 없음 (HTTP 404)
    #[error("Resource not found")]
    NotFound,

    /// 잘못된 입력값 (HTTP 400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// 이미 타이머가 돌고 있는데 새 타이머를 시작하려 함 (HTTP 409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// 현재 상태에서 허용되지 않는 전이 (HTTP 409)
    /// 예: Idle 상태에서 pause, LOCKED 타임시트에 submit
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// 제출 검증 실패 (HTTP 422)
    /// 첫 번째 위반만이 아니라 모든 위반 목록을 담습니다.
    #[error("Validation failed with {} issue(s)", .0.len())]
    Validation(Vec<ValidationIssue>),

    /// LOCKED 상태의 엔트리/타임시트를 변경하려 함 (HTTP 423)
    #[error("Record is locked: {0}")]
    ImmutableRecord(String),

    /// 권한 부족 (HTTP 403): 승인/반려/잠금은 관리자만 가능합니다.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// 저장소 오류 (HTTP 500)
    /// #[from]: sqlx::Error에 `?`를 쓰면 자동으로 AppError::Storage로 변환됩니다.
    /// 트랜잭션 안에서 발생하면 트랜잭션이 롤백되어 상태는 변하지 않습니다.
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// 서버 내부 오류 (HTTP 500)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// 응답 본문에 들어가는 기계용 에러 코드
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::Conflict(_) => "conflict",
            AppError::InvalidState(_) => "invalid_state",
            AppError::Validation(_) => "validation_failed",
            AppError::ImmutableRecord(_) => "immutable_record",
            AppError::Forbidden(_) => "forbidden",
            AppError::Storage(_) => "storage_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) | AppError::InvalidState(_) => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::ImmutableRecord(_) => StatusCode::LOCKED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    /// AppError를 HTTP 응답으로 변환합니다.
    ///
    /// 내부 에러(Storage, Internal)는 실제 내용을 로그에만 기록하고,
    /// 클라이언트에는 일반적인 메시지만 반환합니다.
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let message = match &self {
            AppError::Storage(e) => {
                tracing::error!("Storage error: {}", e);
                "A storage error occurred".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        // 검증 실패일 때만 "issues" 배열을 추가합니다.
        // 결과: { "error": { "code": "...", "message": "...", "issues": [...] } }
        let body = match self {
            AppError::Validation(issues) => json!({
                "error": { "code": code, "message": message, "issues": issues }
            }),
            _ => json!({
                "error": { "code": code, "message": message }
            }),
        };

        (status, Json(body)).into_response()
    }
}
