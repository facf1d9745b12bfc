//! # 타임시트 워크플로
//!
//! 직원 한 명의 한 주(`employee_id`, `week_start`)를 단위로 제출/승인/반려/잠금을 처리합니다.
//!
//! ```text
//! DRAFT ──submit──→ SUBMITTED ──approve──→ APPROVED ──lock──→ LOCKED
//!                      │  ↑
//!                reject│  │submit
//!                      ↓  │
//!                    REJECTED
//! ```
//!
//! ## 엔트리와의 관계
//! | 전이 | 타임시트 | 엔트리 |
//! |------|----------|--------|
//! | submit | DRAFT/REJECTED → SUBMITTED | DRAFT → SUBMITTED |
//! | approve | SUBMITTED → APPROVED | SUBMITTED → APPROVED |
//! | reject | SUBMITTED → REJECTED | SUBMITTED → DRAFT |
//! | lock | APPROVED → LOCKED | 주의 모든 엔트리 → LOCKED |
//!
//! 각 전이는 타임시트 행과 엔트리 일괄 변경을 하나의 트랜잭션으로 묶습니다.
//! 중간에 실패하면 트랜잭션이 drop되면서 롤백되어 주가 섞인 상태로 남지 않습니다.
//! 이벤트는 커밋이 끝난 뒤에만 발행합니다.

use crate::clock::Clock;
use crate::db;
use crate::error::AppError;
use crate::models::*;
use crate::services::calendar::LocalCalendar;
use crate::services::events::{EventSink, WorkflowEvent, WorkflowEventType};
use crate::services::locks::KeyedLocks;
use crate::services::proof_policy::ProofPolicy;
use chrono::NaiveDate;
use sqlx::SqlitePool;
use std::sync::Arc;

/// 시간(hour) 단위 합계, 소수점 둘째 자리까지
fn hours(minutes: i64) -> f64 {
    (minutes as f64 / 60.0 * 100.0).round() / 100.0
}

/// 한 주의 DRAFT 엔트리 집합을 제출 규칙에 비추어 검사합니다.
///
/// 첫 위반에서 멈추지 않고 모든 위반을 모아 돌려줍니다.
pub fn validate_week(entries: &[TimeEntry], policy: &ProofPolicy) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    let total_minutes: i64 = entries.iter().map(|e| e.duration_minutes).sum();
    if total_minutes <= 0 {
        issues.push(ValidationIssue::for_week(
            IssueKind::NoHours,
            "No hours recorded for this week",
        ));
    }

    for entry in entries {
        issues.extend(policy.check_entry(entry));
    }

    issues
}

pub struct TimesheetWorkflow {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
    calendar: LocalCalendar,
    events: Arc<dyn EventSink>,
    locks: KeyedLocks,
}

impl TimesheetWorkflow {
    pub fn new(
        pool: SqlitePool,
        clock: Arc<dyn Clock>,
        calendar: LocalCalendar,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            pool,
            clock,
            calendar,
            events,
            locks: KeyedLocks::new(),
        }
    }

    fn lock_key(employee_id: &str, week_start: NaiveDate) -> String {
        format!("{employee_id}/{week_start}")
    }

    fn publish(&self, event_type: WorkflowEventType, employee_id: &str, week_start: NaiveDate) {
        self.events.publish(&WorkflowEvent {
            event_type,
            employee_id: employee_id.to_string(),
            week_start,
            timestamp: self.clock.now(),
        });
    }

    /// 타임시트를 조회합니다. 제출된 적 없는 주는 가상의 DRAFT를 돌려줍니다.
    pub async fn get(&self, employee_id: &str, week_start: NaiveDate) -> Result<Timesheet, AppError> {
        let week_start = self.calendar.ensure_week_start(week_start)?;
        Ok(db::timesheets::get(&self.pool, employee_id, week_start)
            .await?
            .unwrap_or_else(|| Timesheet::draft(employee_id, week_start)))
    }

    /// 승인 대기(SUBMITTED) 중인 모든 타임시트
    pub async fn list_pending(&self) -> Result<Vec<Timesheet>, AppError> {
        db::timesheets::list_by_status(&self.pool, TimesheetStatus::Submitted).await
    }

    pub async fn list_for_employee(&self, employee_id: &str) -> Result<Vec<Timesheet>, AppError> {
        db::timesheets::list_by_employee(&self.pool, employee_id).await
    }

    /// 제출 전 검증. 상태를 바꾸지 않으며, 위반 목록(비어 있으면 제출 가능)을 돌려줍니다.
    pub async fn validate_for_submission(
        &self,
        employee_id: &str,
        week_start: NaiveDate,
    ) -> Result<Vec<ValidationIssue>, AppError> {
        let week_start = self.calendar.ensure_week_start(week_start)?;

        let entries = db::time_entries::find_by_user_and_week_with_status(
            &self.pool,
            employee_id,
            week_start,
            EntryStatus::Draft,
        )
        .await?;
        let policy = db::categories::load_policy(&self.pool).await?;

        Ok(validate_week(&entries, &policy))
    }

    /// DRAFT/REJECTED → SUBMITTED
    ///
    /// 검증을 트랜잭션 안에서 다시 수행하고, 위반이 있으면 아무것도 바꾸지 않습니다.
    pub async fn submit(&self, employee_id: &str, week_start: NaiveDate) -> Result<Timesheet, AppError> {
        let week_start = self.calendar.ensure_week_start(week_start)?;
        let _guard = self.locks.acquire(&Self::lock_key(employee_id, week_start)).await;

        let mut tx = self.pool.begin().await?;

        let mut sheet = db::timesheets::get(&mut *tx, employee_id, week_start)
            .await?
            .unwrap_or_else(|| Timesheet::draft(employee_id, week_start));
        if !matches!(sheet.status, TimesheetStatus::Draft | TimesheetStatus::Rejected) {
            tracing::debug!(employee_id, %week_start, status = %sheet.status, "Rejected submit");
            return Err(AppError::InvalidState(format!(
                "Timesheet is {} and cannot be submitted",
                sheet.status
            )));
        }

        let entries = db::time_entries::find_by_user_and_week_with_status(
            &mut *tx,
            employee_id,
            week_start,
            EntryStatus::Draft,
        )
        .await?;
        let policy = db::categories::load_policy(&mut *tx).await?;

        let issues = validate_week(&entries, &policy);
        if !issues.is_empty() {
            tracing::debug!(employee_id, %week_start, issues = issues.len(), "Submission blocked");
            return Err(AppError::Validation(issues));
        }

        let total: i64 = entries.iter().map(|e| e.duration_minutes).sum();
        let billable: i64 = entries
            .iter()
            .filter(|e| e.is_billable)
            .map(|e| e.duration_minutes)
            .sum();

        let now = self.clock.now();
        db::time_entries::transition_week(
            &mut *tx,
            employee_id,
            week_start,
            Some(EntryStatus::Draft),
            EntryStatus::Submitted,
            now,
        )
        .await?;

        sheet.status = TimesheetStatus::Submitted;
        sheet.total_hours = hours(total);
        sheet.billable_hours = hours(billable);
        sheet.non_billable_hours = hours(total - billable);
        sheet.submitted_on = Some(now);
        sheet.approved_by = None;
        sheet.remarks = None;
        db::timesheets::save(&mut *tx, &sheet, now).await?;

        tx.commit().await?;

        tracing::info!(
            employee_id,
            %week_start,
            entries = entries.len(),
            total_hours = sheet.total_hours,
            "Timesheet submitted"
        );
        self.publish(WorkflowEventType::Submitted, employee_id, week_start);
        Ok(sheet)
    }

    /// SUBMITTED → APPROVED
    pub async fn approve(
        &self,
        employee_id: &str,
        week_start: NaiveDate,
        approver_id: &str,
    ) -> Result<Timesheet, AppError> {
        let week_start = self.calendar.ensure_week_start(week_start)?;
        let _guard = self.locks.acquire(&Self::lock_key(employee_id, week_start)).await;

        let mut tx = self.pool.begin().await?;
        let mut sheet = self.require_status(&mut tx, employee_id, week_start, "approved").await?;

        let now = self.clock.now();
        db::time_entries::transition_week(
            &mut *tx,
            employee_id,
            week_start,
            Some(EntryStatus::Submitted),
            EntryStatus::Approved,
            now,
        )
        .await?;

        sheet.status = TimesheetStatus::Approved;
        sheet.approved_by = Some(approver_id.to_string());
        db::timesheets::save(&mut *tx, &sheet, now).await?;

        tx.commit().await?;

        tracing::info!(employee_id, %week_start, approver_id, "Timesheet approved");
        self.publish(WorkflowEventType::Approved, employee_id, week_start);
        Ok(sheet)
    }

    /// SUBMITTED → REJECTED. 엔트리는 다시 편집할 수 있도록 DRAFT로 돌아갑니다.
    pub async fn reject(
        &self,
        employee_id: &str,
        week_start: NaiveDate,
        remarks: &str,
    ) -> Result<Timesheet, AppError> {
        let week_start = self.calendar.ensure_week_start(week_start)?;
        let remarks = remarks.trim();
        if remarks.is_empty() {
            return Err(AppError::Validation(vec![ValidationIssue::for_week(
                IssueKind::MissingRemarks,
                "Remarks are required to reject a timesheet",
            )]));
        }

        let _guard = self.locks.acquire(&Self::lock_key(employee_id, week_start)).await;

        let mut tx = self.pool.begin().await?;
        let mut sheet = self.require_status(&mut tx, employee_id, week_start, "rejected").await?;

        let now = self.clock.now();
        db::time_entries::transition_week(
            &mut *tx,
            employee_id,
            week_start,
            Some(EntryStatus::Submitted),
            EntryStatus::Draft,
            now,
        )
        .await?;

        sheet.status = TimesheetStatus::Rejected;
        sheet.remarks = Some(remarks.to_string());
        db::timesheets::save(&mut *tx, &sheet, now).await?;

        tx.commit().await?;

        tracing::info!(employee_id, %week_start, "Timesheet rejected");
        self.publish(WorkflowEventType::Rejected, employee_id, week_start);
        Ok(sheet)
    }

    /// APPROVED → LOCKED. 이미 LOCKED면 아무것도 바꾸지 않고 성공합니다.
    pub async fn lock(&self, employee_id: &str, week_start: NaiveDate) -> Result<Timesheet, AppError> {
        let week_start = self.calendar.ensure_week_start(week_start)?;
        let _guard = self.locks.acquire(&Self::lock_key(employee_id, week_start)).await;

        let mut tx = self.pool.begin().await?;
        let mut sheet = db::timesheets::get(&mut *tx, employee_id, week_start)
            .await?
            .ok_or(AppError::NotFound)?;

        match sheet.status {
            TimesheetStatus::Locked => {
                tracing::debug!(employee_id, %week_start, "Timesheet already locked");
                return Ok(sheet);
            }
            TimesheetStatus::Approved => {}
            other => {
                return Err(AppError::InvalidState(format!(
                    "Timesheet is {other} and cannot be locked"
                )))
            }
        }

        let now = self.clock.now();
        db::time_entries::transition_week(
            &mut *tx,
            employee_id,
            week_start,
            None,
            EntryStatus::Locked,
            now,
        )
        .await?;

        sheet.status = TimesheetStatus::Locked;
        db::timesheets::save(&mut *tx, &sheet, now).await?;

        tx.commit().await?;

        tracing::info!(employee_id, %week_start, "Timesheet locked");
        self.publish(WorkflowEventType::Locked, employee_id, week_start);
        Ok(sheet)
    }

    /// approve/reject 공통: 타임시트가 존재하고 SUBMITTED인지 확인합니다.
    async fn require_status(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        employee_id: &str,
        week_start: NaiveDate,
        action: &str,
    ) -> Result<Timesheet, AppError> {
        let sheet = db::timesheets::get(&mut **tx, employee_id, week_start)
            .await?
            .ok_or(AppError::NotFound)?;

        if sheet.status != TimesheetStatus::Submitted {
            tracing::debug!(employee_id, %week_start, status = %sheet.status, action, "Rejected transition");
            return Err(AppError::InvalidState(format!(
                "Timesheet is {} and cannot be {action}",
                sheet.status
            )));
        }
        Ok(sheet)
    }
}
