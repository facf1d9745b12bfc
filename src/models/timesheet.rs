//! # 주간 타임시트 모델
//!
//! 타임시트는 `(employee_id, week_start)`로 식별되며, 해당 주의 엔트리 집합 위에
//! 독립적인 상태 머신으로 얹혀 있습니다.
//!
//! ```text
//! DRAFT ──submit──→ SUBMITTED ──approve──→ APPROVED ──lock──→ LOCKED
//!                      │  ↑
//!                reject│  │resubmit
//!                      ↓  │
//!                    REJECTED
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// 타임시트 상태. 엔트리와 같은 값 집합을 씁니다.
pub type TimesheetStatus = super::EntryStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Timesheet {
    pub employee_id: String,
    /// ISO 주의 월요일
    pub week_start: NaiveDate,
    pub status: TimesheetStatus,
    /// 아래 세 값은 제출 시점에 엔트리 집합에서 다시 계산됩니다.
    pub total_hours: f64,
    pub billable_hours: f64,
    pub non_billable_hours: f64,
    pub submitted_on: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
    /// 반려 사유. 재제출 전까지 유지됩니다.
    pub remarks: Option<String>,
}

impl Timesheet {
    /// 한 번도 제출되지 않은 주를 나타내는 가상의 DRAFT 타임시트 (DB에 저장되지 않음)
    pub fn draft(employee_id: &str, week_start: NaiveDate) -> Self {
        Self {
            employee_id: employee_id.to_string(),
            week_start,
            status: TimesheetStatus::Draft,
            total_hours: 0.0,
            billable_hours: 0.0,
            non_billable_hours: 0.0,
            submitted_on: None,
            approved_by: None,
            remarks: None,
        }
    }
}

/// 제출 검증에서 발견된 위반의 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// 주간 합계가 0시간
    NoHours,
    /// 증빙이 필요한 카테고리인데 첨부가 없음
    MissingProof,
    /// 메모가 필요한 카테고리인데 설명이 비어 있음
    MissingNotes,
    /// 반려 사유가 비어 있음
    MissingRemarks,
}

/// 검증 위반 하나. 엔트리 단위 위반이면 `entry_id`가 채워집니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub entry_id: Option<String>,
    pub message: String,
}

impl ValidationIssue {
    pub fn for_week(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            entry_id: None,
            message: message.into(),
        }
    }

    pub fn for_entry(kind: IssueKind, entry_id: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            entry_id: Some(entry_id.to_string()),
            message: message.into(),
        }
    }
}

/// `POST /api/v1/timesheets/{employee_id}/{week_start}/reject`
#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    pub remarks: String,
}
