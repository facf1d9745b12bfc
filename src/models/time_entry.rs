//! # 작업 시간 기록(TimeEntry) 모델
//!
//! 타이머가 멈추거나(stop) 수동 입력이 저장되는 순간 `DRAFT` 상태로 만들어지고,
//! 이후 상태 변경은 타임시트 워크플로를 통해서만 일어납니다.
//!
//! ## 상태 흐름
//! ```text
//! DRAFT → SUBMITTED → APPROVED → LOCKED
//!            ↓
//!          DRAFT (반려 시 되돌림)
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// 엔트리와 타임시트가 공유하는 상태 값
///
/// DB에는 `'DRAFT'`, `'SUBMITTED'`처럼 대문자 텍스트로 저장됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
    Locked,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Draft => "DRAFT",
            EntryStatus::Submitted => "SUBMITTED",
            EntryStatus::Approved => "APPROVED",
            EntryStatus::Rejected => "REJECTED",
            EntryStatus::Locked => "LOCKED",
        }
    }

    /// 엔트리 내용을 수정/삭제할 수 있는 상태인지 여부.
    /// REJECTED는 편집 관점에서 DRAFT와 같습니다.
    pub fn is_editable(&self) -> bool {
        matches!(self, EntryStatus::Draft | EntryStatus::Rejected)
    }
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 작업 시간 엔티티: DB의 `time_entries` 테이블 한 행에 대응합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TimeEntry {
    /// 엔트리 고유 식별자 (UUIDv7, stop 시점에 생성)
    pub id: String,
    pub user_id: String,
    pub project_id: String,
    pub category_id: String,
    /// 엔트리가 속한 달력 날짜. 세션의 **첫** 시작 시각(로컬 시간)에서 결정됩니다.
    /// 주간 집계는 이 필드만 봅니다.
    pub date: NaiveDate,
    /// 세션이 처음 시작된 시각. 수동 입력 엔트리는 None
    pub start_time: Option<DateTime<Utc>>,
    /// 타이머가 멈춘 시각. 수동 입력 엔트리는 None
    pub end_time: Option<DateTime<Utc>>,
    /// 현재 구간 이전에 쌓인 초. 확정된 엔트리에서는 항상 0입니다.
    pub accumulated_seconds: i64,
    pub duration_minutes: i64,
    /// 생성 시점에 정해지며 이후 변경할 수 없습니다.
    pub is_billable: bool,
    pub status: EntryStatus,
    pub description: String,
    pub has_proof: bool,
    /// 첨부된 증빙 자료의 참조 (파일 ID, URL 등)
    pub proof_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 수동 엔트리 생성 요청: `POST /api/v1/entries`
#[derive(Debug, Clone, Deserialize)]
pub struct CreateEntryRequest {
    pub project_id: String,
    pub category_id: String,
    pub date: NaiveDate,
    pub duration_minutes: i64,
    pub description: Option<String>,
    /// 없으면 청구 가능(true)으로 처리
    pub is_billable: Option<bool>,
}

/// 엔트리 수정 요청: `PATCH /api/v1/entries/{id}`
///
/// 포함된 필드만 변경합니다. `is_billable`은 의도적으로 없습니다.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEntryRequest {
    pub project_id: Option<String>,
    pub category_id: Option<String>,
    pub date: Option<NaiveDate>,
    pub duration_minutes: Option<i64>,
    pub description: Option<String>,
}

/// 증빙 첨부 요청: `POST /api/v1/entries/{id}/proof`
#[derive(Debug, Clone, Deserialize)]
pub struct AttachProofRequest {
    pub proof_ref: String,
}

/// `GET /api/v1/entries?week_start=2026-10-12`
#[derive(Debug, Deserialize)]
pub struct WeekQuery {
    pub week_start: NaiveDate,
}
