//! # 엔트리 편집 서비스
//!
//! 수동 엔트리 생성, 수정, 증빙 첨부, 삭제를 담당합니다.
//! 상태 전이(submit/approve/…)는 여기서 하지 않고 워크플로 서비스가 맡습니다.
//!
//! ## 상태별 허용 동작
//! | 상태 | 수정/증빙/삭제 | 실패 시 에러 |
//! |------|----------------|--------------|
//! | DRAFT, REJECTED | 가능 | - |
//! | SUBMITTED, APPROVED | 불가 | `InvalidState` |
//! | LOCKED | 불가 | `ImmutableRecord` |

use crate::clock::Clock;
use crate::db;
use crate::error::AppError;
use crate::models::*;
use crate::services::calendar::LocalCalendar;
use chrono::NaiveDate;
use sqlx::{Executor, Sqlite, SqlitePool};
use std::sync::Arc;

/// 하루 최대 기록 가능 시간 (분)
const MAX_ENTRY_MINUTES: i64 = 24 * 60;

/// 엔트리를 변경할 수 있는 상태인지 확인합니다.
pub fn ensure_editable(entry: &TimeEntry) -> Result<(), AppError> {
    if entry.status.is_editable() {
        return Ok(());
    }
    match entry.status {
        EntryStatus::Locked => Err(AppError::ImmutableRecord(format!(
            "Entry {} is locked",
            entry.id
        ))),
        status => Err(AppError::InvalidState(format!(
            "Entry {} is {status} and can no longer be edited",
            entry.id
        ))),
    }
}

/// 해당 주가 새 엔트리를 받을 수 있는지 확인합니다.
///
/// | 타임시트 상태 | 결과 |
/// |---------------|------|
/// | 없음, DRAFT, REJECTED | 허용 |
/// | SUBMITTED, APPROVED | `InvalidState` (검토 중이거나 검토가 끝난 주) |
/// | LOCKED | `ImmutableRecord` |
///
/// 검토 중인 주에 DRAFT가 끼어들면 승인은 그 엔트리를 건너뛰고
/// 잠금은 그 엔트리까지 봉인하게 되므로 막아야 합니다.
pub async fn ensure_week_open<'e, E>(
    executor: E,
    user_id: &str,
    week_start: NaiveDate,
) -> Result<(), AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let Some(sheet) = db::timesheets::get(executor, user_id, week_start).await? else {
        // 한 번도 제출되지 않은 주
        return Ok(());
    };

    match sheet.status {
        TimesheetStatus::Draft | TimesheetStatus::Rejected => Ok(()),
        TimesheetStatus::Locked => Err(AppError::ImmutableRecord(format!(
            "Timesheet for week {week_start} is locked"
        ))),
        status => Err(AppError::InvalidState(format!(
            "Timesheet for week {week_start} is {status} and accepts no new entries"
        ))),
    }
}

fn validate_duration(minutes: i64) -> Result<(), AppError> {
    if minutes <= 0 || minutes > MAX_ENTRY_MINUTES {
        return Err(AppError::BadRequest(format!(
            "duration_minutes must be between 1 and {MAX_ENTRY_MINUTES}"
        )));
    }
    Ok(())
}

fn required(value: &str, field: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    Ok(value.to_string())
}

pub struct EntryService {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
    calendar: LocalCalendar,
}

impl EntryService {
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>, calendar: LocalCalendar) -> Self {
        Self {
            pool,
            clock,
            calendar,
        }
    }

    /// 사용자 본인의 엔트리를 가져옵니다. 남의 엔트리는 없는 것으로 취급합니다.
    async fn owned(&self, user_id: &str, entry_id: &str) -> Result<TimeEntry, AppError> {
        db::time_entries::get(&self.pool, entry_id)
            .await?
            .filter(|e| e.user_id == user_id)
            .ok_or(AppError::NotFound)
    }

    /// 타이머 없이 직접 입력한 DRAFT 엔트리를 만듭니다.
    pub async fn create_manual_entry(
        &self,
        user_id: &str,
        req: &CreateEntryRequest,
    ) -> Result<TimeEntry, AppError> {
        let project_id = required(&req.project_id, "project_id")?;
        let category_id = required(&req.category_id, "category_id")?;
        validate_duration(req.duration_minutes)?;

        // 주 상태 확인과 저장을 한 트랜잭션으로 묶어, 그 사이에 제출된 주에 끼어들지 않게 합니다.
        let mut tx = self.pool.begin().await?;
        ensure_week_open(&mut *tx, user_id, self.calendar.week_start(req.date)).await?;

        let now = self.clock.now();
        let entry = TimeEntry {
            id: uuid::Uuid::now_v7().to_string(),
            user_id: user_id.to_string(),
            project_id,
            category_id,
            date: req.date,
            start_time: None,
            end_time: None,
            accumulated_seconds: 0,
            duration_minutes: req.duration_minutes,
            is_billable: req.is_billable.unwrap_or(true),
            status: EntryStatus::Draft,
            description: req.description.as_deref().unwrap_or("").trim().to_string(),
            has_proof: false,
            proof_ref: None,
            created_at: now,
            updated_at: now,
        };
        db::time_entries::create(&mut *tx, &entry).await?;
        tx.commit().await?;

        tracing::info!(user_id, entry_id = %entry.id, date = %entry.date, "Manual entry created");
        Ok(entry)
    }

    /// 요청에 포함된 필드만 수정합니다.
    pub async fn update_entry(
        &self,
        user_id: &str,
        entry_id: &str,
        req: &UpdateEntryRequest,
    ) -> Result<TimeEntry, AppError> {
        let mut entry = self.owned(user_id, entry_id).await?;
        ensure_editable(&entry)?;

        if let Some(project_id) = &req.project_id {
            entry.project_id = required(project_id, "project_id")?;
        }
        if let Some(category_id) = &req.category_id {
            entry.category_id = required(category_id, "category_id")?;
        }
        if let Some(minutes) = req.duration_minutes {
            validate_duration(minutes)?;
            entry.duration_minutes = minutes;
        }
        if let Some(description) = &req.description {
            entry.description = description.trim().to_string();
        }
        entry.updated_at = self.clock.now();

        let mut tx = self.pool.begin().await?;
        if let Some(date) = req.date {
            // 다른 주로 옮기는 경우 옮겨 갈 주도 열려 있어야 합니다.
            ensure_week_open(&mut *tx, user_id, self.calendar.week_start(date)).await?;
            entry.date = date;
        }

        if !db::time_entries::update(&mut *tx, &entry).await? {
            return Err(AppError::ImmutableRecord(format!("Entry {entry_id} is locked")));
        }
        tx.commit().await?;

        tracing::info!(user_id, entry_id, "Entry updated");
        Ok(entry)
    }

    /// 증빙 자료 참조를 기록하고 `has_proof`를 true로 만듭니다.
    pub async fn attach_proof(
        &self,
        user_id: &str,
        entry_id: &str,
        proof_ref: &str,
    ) -> Result<TimeEntry, AppError> {
        let proof_ref = required(proof_ref, "proof_ref")?;
        let mut entry = self.owned(user_id, entry_id).await?;
        ensure_editable(&entry)?;

        entry.has_proof = true;
        entry.proof_ref = Some(proof_ref);
        entry.updated_at = self.clock.now();

        if !db::time_entries::update(&self.pool, &entry).await? {
            return Err(AppError::ImmutableRecord(format!("Entry {entry_id} is locked")));
        }

        tracing::info!(user_id, entry_id, "Proof attached");
        Ok(entry)
    }

    /// DRAFT 엔트리를 삭제합니다.
    pub async fn delete_entry(&self, user_id: &str, entry_id: &str) -> Result<(), AppError> {
        let entry = self.owned(user_id, entry_id).await?;
        ensure_editable(&entry)?;

        if !db::time_entries::delete(&self.pool, entry_id).await? {
            // 조회 이후 상태가 바뀐 경우
            return Err(AppError::InvalidState(format!(
                "Entry {entry_id} is no longer a draft"
            )));
        }

        tracing::info!(user_id, entry_id, "Entry deleted");
        Ok(())
    }

    /// 한 주의 엔트리 목록
    pub async fn list_week(
        &self,
        user_id: &str,
        week_start: NaiveDate,
    ) -> Result<Vec<TimeEntry>, AppError> {
        let week_start = self.calendar.ensure_week_start(week_start)?;
        db::time_entries::find_by_user_and_week(&self.pool, user_id, week_start).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::test_support::{entry, memory_pool, monday, t0};

    async fn service() -> (EntryService, SqlitePool) {
        let pool = memory_pool().await;
        let clock = Arc::new(ManualClock::new(t0()));
        (
            EntryService::new(pool.clone(), clock, LocalCalendar::utc()),
            pool,
        )
    }

    fn manual(minutes: i64) -> CreateEntryRequest {
        CreateEntryRequest {
            project_id: "P1".into(),
            category_id: "C1".into(),
            date: monday(),
            duration_minutes: minutes,
            description: Some(" planning ".into()),
            is_billable: None,
        }
    }

    #[tokio::test]
    async fn creates_billable_draft_by_default() {
        let (service, _) = service().await;
        let entry = service.create_manual_entry("u1", &manual(90)).await.unwrap();

        assert_eq!(entry.status, EntryStatus::Draft);
        assert!(entry.is_billable);
        assert_eq!(entry.description, "planning");
        assert_eq!(entry.start_time, None);
        assert_eq!(service.list_week("u1", monday()).await.unwrap(), vec![entry]);
    }

    #[tokio::test]
    async fn rejects_out_of_range_durations() {
        let (service, _) = service().await;
        for minutes in [0, -5, 24 * 60 + 1] {
            let err = service.create_manual_entry("u1", &manual(minutes)).await.unwrap_err();
            assert!(matches!(err, AppError::BadRequest(_)));
        }
    }

    #[tokio::test]
    async fn attach_proof_marks_entry() {
        let (service, _) = service().await;
        let entry = service.create_manual_entry("u1", &manual(30)).await.unwrap();
        let updated = service
            .attach_proof("u1", &entry.id, "files/receipt.pdf")
            .await
            .unwrap();

        assert!(updated.has_proof);
        assert_eq!(updated.proof_ref.as_deref(), Some("files/receipt.pdf"));
    }

    #[tokio::test]
    async fn other_users_entries_are_not_found() {
        let (service, _) = service().await;
        let entry = service.create_manual_entry("u1", &manual(30)).await.unwrap();

        let err = service.delete_entry("u2", &entry.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    #[tokio::test]
    async fn status_decides_which_error_is_returned() {
        let (service, pool) = service().await;
        let mut submitted = entry("u1", "C1", monday(), 60);
        submitted.status = EntryStatus::Submitted;
        let mut locked = entry("u1", "C1", monday(), 60);
        locked.status = EntryStatus::Locked;
        db::time_entries::create(&pool, &submitted).await.unwrap();
        db::time_entries::create(&pool, &locked).await.unwrap();

        let patch = UpdateEntryRequest {
            description: Some("edit".into()),
            ..Default::default()
        };

        assert!(matches!(
            service.update_entry("u1", &submitted.id, &patch).await,
            Err(AppError::InvalidState(_))
        ));
        assert!(matches!(
            service.update_entry("u1", &locked.id, &patch).await,
            Err(AppError::ImmutableRecord(_))
        ));
        assert!(matches!(
            service.delete_entry("u1", &locked.id).await,
            Err(AppError::ImmutableRecord(_))
        ));
        assert!(matches!(
            service.attach_proof("u1", &locked.id, "x").await,
            Err(AppError::ImmutableRecord(_))
        ));
    }

    #[tokio::test]
    async fn locked_week_accepts_no_new_entries() {
        let (service, pool) = service().await;
        let mut sheet = Timesheet::draft("u1", monday());
        sheet.status = TimesheetStatus::Locked;
        db::timesheets::save(&pool, &sheet, t0()).await.unwrap();

        let err = service.create_manual_entry("u1", &manual(30)).await.unwrap_err();
        assert!(matches!(err, AppError::ImmutableRecord(_)));
    }

    #[tokio::test]
    async fn week_status_decides_whether_entries_can_join() {
        let next_week = monday().checked_add_days(chrono::Days::new(7)).unwrap();
        let cases = [
            (TimesheetStatus::Draft, true),
            (TimesheetStatus::Rejected, true),
            (TimesheetStatus::Submitted, false),
            (TimesheetStatus::Approved, false),
        ];

        for (status, open) in cases {
            let (service, pool) = service().await;
            let mut sheet = Timesheet::draft("u1", monday());
            sheet.status = status;
            db::timesheets::save(&pool, &sheet, t0()).await.unwrap();

            // 새 엔트리 생성
            let created = service.create_manual_entry("u1", &manual(30)).await;
            assert_eq!(created.is_ok(), open, "create into {status} week");
            if !open {
                assert!(matches!(created, Err(AppError::InvalidState(_))));
            }

            // 다음 주 엔트리를 이 주로 옮기기
            let mut request = manual(30);
            request.date = next_week;
            let elsewhere = service.create_manual_entry("u1", &request).await.unwrap();
            let move_in = UpdateEntryRequest {
                date: Some(monday()),
                ..Default::default()
            };
            let moved = service.update_entry("u1", &elsewhere.id, &move_in).await;
            assert_eq!(moved.is_ok(), open, "move into {status} week");
            if !open {
                assert!(matches!(moved, Err(AppError::InvalidState(_))));
                let stored = db::time_entries::get(&pool, &elsewhere.id).await.unwrap().unwrap();
                assert_eq!(stored.date, next_week);
            }
        }
    }

    #[tokio::test]
    async fn list_week_requires_monday() {
        let (service, _) = service().await;
        let tuesday = monday().succ_opt().unwrap();
        assert!(matches!(
            service.list_week("u1", tuesday).await,
            Err(AppError::BadRequest(_))
        ));
    }
}
