//! # 주간 타임시트 쿼리 모듈
//!
//! 타임시트는 처음 제출될 때 생성되고, 이후에는 삭제 없이 상태만 바뀝니다.
//! `save`는 INSERT … ON CONFLICT로 생성과 갱신을 한 번에 처리합니다.

use crate::error::AppError;
use crate::models::{Timesheet, TimesheetStatus};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Executor, Sqlite};

const SELECT_TIMESHEET: &str = r#"
    SELECT employee_id, week_start, status, total_hours, billable_hours,
           non_billable_hours, submitted_on, approved_by, remarks
    FROM timesheets
"#;

/// `(employee_id, week_start)`로 타임시트를 조회합니다. 아직 제출된 적 없으면 `None`.
pub async fn get<'e, E>(
    executor: E,
    employee_id: &str,
    week_start: NaiveDate,
) -> Result<Option<Timesheet>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    // format!으로 붙이는 것은 고정된 SQL 조각뿐입니다. 사용자 값은 항상 `?` + bind로 넘깁니다.
    let sql = format!("{SELECT_TIMESHEET} WHERE employee_id = ? AND week_start = ?");
    let sheet = sqlx::query_as::<_, Timesheet>(&sql)
        .bind(employee_id)
        .bind(week_start)
        .fetch_optional(executor)
        .await?;

    Ok(sheet)
}

/// 타임시트 전체를 저장합니다 (없으면 생성, 있으면 덮어쓰기).
pub async fn save<'e, E>(
    executor: E,
    sheet: &Timesheet,
    now: DateTime<Utc>,
) -> Result<(), AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO timesheets (
            employee_id, week_start, status, total_hours, billable_hours,
            non_billable_hours, submitted_on, approved_by, remarks, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (employee_id, week_start) DO UPDATE SET
            status = excluded.status,
            total_hours = excluded.total_hours,
            billable_hours = excluded.billable_hours,
            non_billable_hours = excluded.non_billable_hours,
            submitted_on = excluded.submitted_on,
            approved_by = excluded.approved_by,
            remarks = excluded.remarks,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&sheet.employee_id)
    .bind(sheet.week_start) // NaiveDate → 'YYYY-MM-DD' TEXT
    .bind(sheet.status) // sqlx::Type 파생으로 'SUBMITTED' 같은 문자열로 저장
    .bind(sheet.total_hours)
    .bind(sheet.billable_hours)
    .bind(sheet.non_billable_hours)
    .bind(sheet.submitted_on)
    .bind(&sheet.approved_by)
    .bind(&sheet.remarks)
    .bind(now)
    .execute(executor)
    .await?;

    Ok(())
}

/// 특정 상태의 타임시트 목록 (승인 대기 목록 등). 오래된 주가 먼저 옵니다.
pub async fn list_by_status<'e, E>(
    executor: E,
    status: TimesheetStatus,
) -> Result<Vec<Timesheet>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("{SELECT_TIMESHEET} WHERE status = ? ORDER BY week_start, employee_id");
    let sheets = sqlx::query_as::<_, Timesheet>(&sql)
        .bind(status)
        .fetch_all(executor)
        .await?;

    Ok(sheets)
}

/// 직원 한 명의 타임시트 이력. 최근 주가 먼저 옵니다.
pub async fn list_by_employee<'e, E>(
    executor: E,
    employee_id: &str,
) -> Result<Vec<Timesheet>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("{SELECT_TIMESHEET} WHERE employee_id = ? ORDER BY week_start DESC");
    let sheets = sqlx::query_as::<_, Timesheet>(&sql)
        .bind(employee_id)
        .fetch_all(executor)
        .await?;

    Ok(sheets)
}
