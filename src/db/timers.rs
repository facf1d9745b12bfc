//! # 진행 중 타이머 저장소
//!
//! `active_timers` 테이블은 사용자당 최대 한 행만 가집니다 (기본키 `user_id`).
//! 행이 없으면 Idle, `phase`가 `RUNNING`/`PAUSED`이면 각각 Running/Paused입니다.
//!
//! 한 번의 상태 전이는 항상 한 문장(INSERT/UPDATE/DELETE)으로 기록되므로,
//! 동시에 읽는 쪽은 전이 전 또는 전이 후의 행만 보게 됩니다.

use crate::error::AppError;
use crate::models::{TimerSession, TimerState};
use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite};

/// DB 행을 그대로 옮겨 담는 내부 구조체
#[derive(Debug, sqlx::FromRow)]
struct TimerRow {
    phase: String,
    project_id: String,
    category_id: String,
    entry_id: Option<String>,
    session_started_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    accumulated_seconds: i64,
}

impl TryFrom<TimerRow> for TimerState {
    type Error = AppError;

    fn try_from(row: TimerRow) -> Result<Self, Self::Error> {
        let session = TimerSession {
            project_id: row.project_id,
            category_id: row.category_id,
            entry_id: row.entry_id,
            first_started_at: row.session_started_at,
        };

        match (row.phase.as_str(), row.started_at) {
            ("RUNNING", Some(started_at)) => Ok(TimerState::Running {
                started_at,
                accumulated_seconds: row.accumulated_seconds,
                session,
            }),
            ("PAUSED", _) => Ok(TimerState::Paused {
                accumulated_seconds: row.accumulated_seconds,
                session,
            }),
            (phase, _) => Err(AppError::Internal(format!(
                "Corrupt timer row (phase = {phase})"
            ))),
        }
    }
}

/// 상태를 `(phase, started_at, accumulated_seconds, session)` 컬럼 값으로 풉니다.
fn columns(
    state: &TimerState,
) -> Result<(&'static str, Option<DateTime<Utc>>, i64, &TimerSession), AppError> {
    match state {
        TimerState::Running {
            started_at,
            accumulated_seconds,
            session,
        } => Ok(("RUNNING", Some(*started_at), *accumulated_seconds, session)),
        TimerState::Paused {
            accumulated_seconds,
            session,
        } => Ok(("PAUSED", None, *accumulated_seconds, session)),
        TimerState::Idle => Err(AppError::Internal(
            "Idle timers are not stored".to_string(),
        )),
    }
}

/// 사용자의 현재 타이머 상태. 행이 없으면 `TimerState::Idle`.
pub async fn find_active_by_user<'e, E>(executor: E, user_id: &str) -> Result<TimerState, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, TimerRow>(
        r#"
        SELECT phase, project_id, category_id, entry_id, session_started_at,
               started_at, accumulated_seconds
        FROM active_timers
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(executor)
    .await?;

    match row {
        Some(row) => row.try_into(),
        None => Ok(TimerState::Idle),
    }
}

/// 새 타이머 행을 만듭니다.
///
/// 이미 행이 있으면 기본키 충돌로 `AppError::Conflict`가 됩니다.
/// 다른 프로세스가 먼저 타이머를 시작한 경우에도 덮어쓰지 않습니다.
pub async fn insert<'e, E>(executor: E, user_id: &str, state: &TimerState) -> Result<(), AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let (phase, started_at, accumulated_seconds, session) = columns(state)?;

    sqlx::query(
        r#"
        INSERT INTO active_timers (
            user_id, phase, project_id, category_id, entry_id,
            session_started_at, started_at, accumulated_seconds
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(phase)
    .bind(&session.project_id)
    .bind(&session.category_id)
    .bind(&session.entry_id)
    .bind(session.first_started_at)
    .bind(started_at)
    .bind(accumulated_seconds)
    .execute(executor)
    .await
    // 기본키(user_id) 중복만 409로 바꾸고, 나머지 DB 에러는 그대로 Storage로 보냅니다.
    .map_err(|e| match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            AppError::Conflict("A timer is already active for this user".to_string())
        }
        other => other.into(),
    })?;

    Ok(())
}

/// 기존 타이머 행을 새 상태로 교체합니다 (pause / resume).
/// 행이 없으면 `false`.
pub async fn replace<'e, E>(executor: E, user_id: &str, state: &TimerState) -> Result<bool, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let (phase, started_at, accumulated_seconds, session) = columns(state)?;

    let result = sqlx::query(
        r#"
        UPDATE active_timers
        SET phase = ?, project_id = ?, category_id = ?, entry_id = ?,
            session_started_at = ?, started_at = ?, accumulated_seconds = ?
        WHERE user_id = ?
        "#,
    )
    .bind(phase)
    .bind(&session.project_id)
    .bind(&session.category_id)
    .bind(&session.entry_id)
    .bind(session.first_started_at)
    .bind(started_at)
    .bind(accumulated_seconds)
    .bind(user_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// 타이머 행을 지웁니다 (stop / discard). 행이 없었으면 `false`.
pub async fn delete<'e, E>(executor: E, user_id: &str) -> Result<bool, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM active_timers WHERE user_id = ?")
        .bind(user_id)
        .execute(executor)
        .await?;

    // rows_affected(): 이 문장으로 실제 지워진 행 수
    Ok(result.rows_affected() > 0)
}
