//! # 작업 시간 기록(TimeEntry) 쿼리 모듈
//!
//! 엔트리의 생성, 조회, 수정, 삭제와 주 단위 일괄 상태 전이를 담당합니다.
//!
//! 대부분의 함수는 `SqlitePool` 대신 `Executor`를 제네릭으로 받습니다.
//! 덕분에 같은 함수를 `&pool`로도, 트랜잭션 안에서 `&mut *tx`로도 호출할 수 있습니다.
//! 워크플로의 일괄 전이는 항상 트랜잭션 안에서 호출되어야 합니다.

use crate::db::timers;
use crate::error::AppError;
use crate::models::{EntryStatus, TimeEntry, TimerSession, TimerState};
use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::Deserialize;
use sqlx::{Executor, Sqlite, SqlitePool};

const SELECT_ENTRY: &str = r#"
    SELECT id, user_id, project_id, category_id, date, start_time, end_time,
           accumulated_seconds, duration_minutes, is_billable, status,
           description, has_proof, proof_ref, created_at, updated_at
    FROM time_entries
"#;

/// 주의 마지막 날(일요일). 주의 범위는 `[week_start, week_start + 6]`입니다.
pub fn week_end(week_start: NaiveDate) -> NaiveDate {
    week_start
        .checked_add_days(Days::new(6))
        .unwrap_or(NaiveDate::MAX)
}

/// 새 엔트리를 저장합니다.
pub async fn create<'e, E>(executor: E, entry: &TimeEntry) -> Result<(), AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO time_entries (
            id, user_id, project_id, category_id, date, start_time, end_time,
            accumulated_seconds, duration_minutes, is_billable, status,
            description, has_proof, proof_ref, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    // bind 순서는 위 컬럼 목록 순서와 정확히 같아야 합니다.
    .bind(&entry.id)
    .bind(&entry.user_id)
    .bind(&entry.project_id)
    .bind(&entry.category_id)
    .bind(entry.date)
    .bind(entry.start_time)
    .bind(entry.end_time)
    .bind(entry.accumulated_seconds)
    .bind(entry.duration_minutes)
    .bind(entry.is_billable)
    .bind(entry.status)
    .bind(&entry.description)
    .bind(entry.has_proof)
    .bind(&entry.proof_ref)
    .bind(entry.created_at)
    .bind(entry.updated_at)
    .execute(executor)
    .await?;

    Ok(())
}

/// ID로 엔트리 하나를 조회합니다. 없으면 `None`.
pub async fn get<'e, E>(executor: E, id: &str) -> Result<Option<TimeEntry>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("{SELECT_ENTRY} WHERE id = ?");
    let entry = sqlx::query_as::<_, TimeEntry>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(entry)
}

/// 엔트리의 변경 가능한 필드를 저장합니다.
///
/// `is_billable`, `status`, `user_id`, `created_at`은 건드리지 않습니다.
/// LOCKED 행은 SQL 조건으로 걸러지므로, 반환값이 `false`면 아무것도 바뀌지 않은 것입니다.
pub async fn update<'e, E>(executor: E, entry: &TimeEntry) -> Result<bool, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE time_entries
        SET project_id = ?, category_id = ?, date = ?, start_time = ?, end_time = ?,
            accumulated_seconds = ?, duration_minutes = ?, description = ?,
            has_proof = ?, proof_ref = ?, updated_at = ?
        WHERE id = ? AND status <> 'LOCKED'
        "#,
        // ↑ SQL 설명:
        //   status <> 'LOCKED': 서비스 검사를 통과했더라도 잠긴 행은 DB 단에서 한 번 더 걸러집니다.
        //   is_billable, status는 SET 목록에 없으므로 이 함수로는 바뀌지 않습니다.
    )
    .bind(&entry.project_id)
    .bind(&entry.category_id)
    .bind(entry.date)
    .bind(entry.start_time)
    .bind(entry.end_time)
    .bind(entry.accumulated_seconds)
    .bind(entry.duration_minutes)
    .bind(&entry.description)
    .bind(entry.has_proof)
    .bind(&entry.proof_ref)
    .bind(entry.updated_at)
    .bind(&entry.id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// DRAFT 엔트리를 삭제합니다. 다른 상태의 행은 삭제되지 않습니다.
pub async fn delete<'e, E>(executor: E, id: &str) -> Result<bool, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM time_entries WHERE id = ? AND status = 'DRAFT'")
        .bind(id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// 사용자의 한 주치 엔트리를 날짜순으로 조회합니다.
///
/// 주 소속은 오직 `date` 필드로만 판단합니다 (`start_time`과 무관).
pub async fn find_by_user_and_week<'e, E>(
    executor: E,
    user_id: &str,
    week_start: NaiveDate,
) -> Result<Vec<TimeEntry>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    // BETWEEN은 양 끝을 포함합니다: 월요일 ≤ date ≤ 일요일
    let sql = format!(
        "{SELECT_ENTRY} WHERE user_id = ? AND date BETWEEN ? AND ? ORDER BY date, created_at"
    );
    let entries = sqlx::query_as::<_, TimeEntry>(&sql)
        .bind(user_id)
        .bind(week_start)
        .bind(week_end(week_start))
        .fetch_all(executor)
        .await?;

    Ok(entries)
}

/// `find_by_user_and_week`에 상태 조건을 더한 버전
pub async fn find_by_user_and_week_with_status<'e, E>(
    executor: E,
    user_id: &str,
    week_start: NaiveDate,
    status: EntryStatus,
) -> Result<Vec<TimeEntry>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "{SELECT_ENTRY} WHERE user_id = ? AND date BETWEEN ? AND ? AND status = ? \
         ORDER BY date, created_at"
    );
    let entries = sqlx::query_as::<_, TimeEntry>(&sql)
        .bind(user_id)
        .bind(week_start)
        .bind(week_end(week_start))
        .bind(status)
        .fetch_all(executor)
        .await?;

    Ok(entries)
}

/// 한 주의 엔트리 상태를 일괄 변경합니다.
///
/// - `from = Some(s)`: 상태가 `s`인 엔트리만 `to`로 바꿉니다.
/// - `from = None`: 주의 모든 엔트리를 `to`로 바꿉니다 (잠금용).
///
/// 반환값은 변경된 행 수입니다.
pub async fn transition_week<'e, E>(
    executor: E,
    user_id: &str,
    week_start: NaiveDate,
    from: Option<EntryStatus>,
    to: EntryStatus,
    now: DateTime<Utc>,
) -> Result<u64, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    // 두 쿼리는 상태 조건 유무만 다릅니다. 어느 쪽이든 한 문장이라 주 전체가 한 번에 바뀝니다.
    let result = match from {
        Some(from) => {
            sqlx::query(
                r#"
                UPDATE time_entries SET status = ?, updated_at = ?
                WHERE user_id = ? AND date BETWEEN ? AND ? AND status = ?
                "#,
            )
            .bind(to)
            .bind(now)
            .bind(user_id)
            .bind(week_start)
            .bind(week_end(week_start))
            .bind(from)
            .execute(executor)
            .await?
        }
        None => {
            sqlx::query(
                r#"
                UPDATE time_entries SET status = ?, updated_at = ?
                WHERE user_id = ? AND date BETWEEN ? AND ?
                "#,
            )
            .bind(to)
            .bind(now)
            .bind(user_id)
            .bind(week_start)
            .bind(week_end(week_start))
            .execute(executor)
            .await?
        }
    };

    Ok(result.rows_affected())
}

/// 구버전 `activity_log` JSON 안에 들어 있던 누적 시간 형식.
/// 필드 이름이 두 가지로 저장된 적이 있어 둘 다 받습니다.
#[derive(Debug, Deserialize)]
struct LegacyActivityLog {
    #[serde(rename = "accumulatedSeconds", alias = "accumulated_seconds")]
    accumulated_seconds: Option<i64>,
}

/// 기동 시 한 번 실행되는 레거시 데이터 이관.
///
/// 구버전은 진행 중 세션의 누적 초를 `activity_log` JSON에 묻어 두었습니다.
/// 이관 후 `activity_log`는 비워지고, `accumulated_seconds`는 어느 행에서나 0이 됩니다.
///
/// | 레거시 행 | 처리 |
/// |-----------|------|
/// | 끝나지 않은 DRAFT 세션 (`start_time`만 있음) | 그 엔트리에 이어 쓰는 Running 타이머로 되살림 |
/// | 끝난 DRAFT 엔트리 | 누적 초 + 마지막 구간을 `duration_minutes`에 합침 |
/// | 제출 이후 상태의 엔트리 | 검토된 `duration_minutes`는 그대로 두고 누적 초만 버림 |
///
/// 사용자에게 이미 진행 중 타이머가 있으면 되살리지 않고 끝난 엔트리처럼 합칩니다.
/// 파싱할 수 없는 JSON은 0초로 간주합니다. 반환값은 이관된 행 수입니다.
pub async fn migrate_legacy_durations(pool: &SqlitePool) -> Result<u64, AppError> {
    // 아직 이관되지 않은 행만 고릅니다. 이관된 행은 activity_log가 NULL입니다.
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT id, activity_log FROM time_entries WHERE activity_log IS NOT NULL",
    )
    .fetch_all(pool)
    .await?;

    if rows.is_empty() {
        return Ok(0);
    }

    // 전부 옮기거나 하나도 옮기지 않습니다.
    let mut tx = pool.begin().await?;
    for (id, raw) in &rows {
        let seconds = match serde_json::from_str::<LegacyActivityLog>(raw) {
            Ok(log) => log.accumulated_seconds.unwrap_or(0).max(0),
            Err(e) => {
                tracing::warn!(entry_id = %id, "Unreadable legacy activity_log ({}), using 0", e);
                0
            }
        };

        let Some(mut entry) = get(&mut *tx, id).await? else {
            continue;
        };

        let revived = match (entry.start_time, entry.end_time) {
            (Some(started_at), None) if entry.status.is_editable() => {
                revive_legacy_session(&mut tx, &entry, started_at, seconds).await?
            }
            _ => false,
        };

        if !revived && entry.status.is_editable() {
            // 마지막 구간(start → end)까지 더한 전체 경과 시간
            let last_segment = match (entry.start_time, entry.end_time) {
                (Some(start), Some(end)) => (end - start).num_seconds().max(0),
                _ => 0,
            };
            // 이미 합산되어 기록된 값일 수 있으므로 더 큰 쪽을 씁니다.
            entry.duration_minutes = entry.duration_minutes.max((seconds + last_segment) / 60);
        } else if !revived && seconds > 0 {
            tracing::debug!(
                entry_id = %id,
                status = %entry.status,
                "Keeping reviewed duration of legacy entry"
            );
        }

        sqlx::query(
            r#"
            UPDATE time_entries
            SET accumulated_seconds = 0, duration_minutes = ?, activity_log = NULL
            WHERE id = ?
            "#,
        )
        .bind(entry.duration_minutes)
        .bind(id)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    Ok(rows.len() as u64)
}

/// 끝나지 않은 레거시 세션을 `active_timers`의 Running 행으로 옮깁니다.
///
/// stop하면 이어 쓰기 세션처럼 이 엔트리의 시간에 더해집니다.
/// 사용자에게 이미 타이머가 있으면 `false`를 돌려주고 아무것도 하지 않습니다.
async fn revive_legacy_session(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    entry: &TimeEntry,
    started_at: DateTime<Utc>,
    accumulated_seconds: i64,
) -> Result<bool, AppError> {
    if !timers::find_active_by_user(&mut **tx, &entry.user_id)
        .await?
        .is_idle()
    {
        tracing::warn!(
            entry_id = %entry.id,
            user_id = %entry.user_id,
            "User already has an active timer, folding legacy session into its entry"
        );
        return Ok(false);
    }

    let state = TimerState::Running {
        started_at,
        accumulated_seconds,
        session: TimerSession {
            project_id: entry.project_id.clone(),
            category_id: entry.category_id.clone(),
            entry_id: Some(entry.id.clone()),
            first_started_at: started_at,
        },
    };
    timers::insert(&mut **tx, &entry.user_id, &state).await?;

    tracing::info!(entry_id = %entry.id, user_id = %entry.user_id, "Revived legacy running session");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{entry, memory_pool};
    use chrono::TimeZone;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 12).unwrap()
    }

    #[test]
    fn week_end_is_the_following_sunday() {
        assert_eq!(week_end(monday()), NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
    }

    #[tokio::test]
    async fn finds_entries_by_date_only() {
        let pool = memory_pool().await;
        let sunday = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let next_monday = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();

        // 일요일 밤에 시작해 월요일에 끝난 세션도 date 기준으로 이번 주에 속합니다.
        let mut late = entry("u1", "c1", sunday, 90);
        late.start_time = Some(Utc.with_ymd_and_hms(2026, 10, 18, 23, 30, 0).unwrap());
        late.end_time = Some(Utc.with_ymd_and_hms(2026, 10, 19, 1, 0, 0).unwrap());
        create(&pool, &late).await.unwrap();
        create(&pool, &entry("u1", "c1", next_monday, 30)).await.unwrap();
        create(&pool, &entry("u2", "c1", monday(), 30)).await.unwrap();

        let found = find_by_user_and_week(&pool, "u1", monday()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, late.id);
        assert_eq!(found[0], late);
    }

    #[tokio::test]
    async fn locked_rows_are_not_updated_or_deleted() {
        let pool = memory_pool().await;
        let mut e = entry("u1", "c1", monday(), 60);
        e.status = EntryStatus::Locked;
        create(&pool, &e).await.unwrap();

        e.description = "changed".into();
        assert!(!update(&pool, &e).await.unwrap());
        assert!(!delete(&pool, &e.id).await.unwrap());
        assert_eq!(get(&pool, &e.id).await.unwrap().unwrap().description, "");
    }

    #[tokio::test]
    async fn transition_week_only_touches_matching_status() {
        let pool = memory_pool().await;
        let draft = entry("u1", "c1", monday(), 60);
        let mut approved = entry("u1", "c1", monday(), 60);
        approved.status = EntryStatus::Approved;
        create(&pool, &draft).await.unwrap();
        create(&pool, &approved).await.unwrap();

        let moved = transition_week(
            &pool,
            "u1",
            monday(),
            Some(EntryStatus::Draft),
            EntryStatus::Submitted,
            Utc::now(),
        )
        .await
        .unwrap();

        assert_eq!(moved, 1);
        let approved_after = get(&pool, &approved.id).await.unwrap().unwrap();
        assert_eq!(approved_after.status, EntryStatus::Approved);
    }

    async fn set_activity_log(pool: &SqlitePool, id: &str, raw: &str) {
        sqlx::query("UPDATE time_entries SET activity_log = ? WHERE id = ?")
            .bind(raw)
            .bind(id)
            .execute(pool)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn migration_folds_banked_seconds_into_finished_drafts() {
        let pool = memory_pool().await;
        // 12분 34초를 쌓아 둔 뒤 마지막 구간 30분을 더 일하고 끝난 엔트리
        let start = Utc.with_ymd_and_hms(2026, 10, 12, 9, 0, 0).unwrap();
        let mut finished = entry("u1", "c1", monday(), 0);
        finished.start_time = Some(start);
        finished.end_time = Some(start + chrono::Duration::minutes(30));
        let unreadable = entry("u1", "c1", monday(), 10);
        let mut approved = entry("u1", "c1", monday(), 45);
        approved.status = EntryStatus::Approved;
        for e in [&finished, &unreadable, &approved] {
            create(&pool, e).await.unwrap();
        }
        set_activity_log(&pool, &finished.id, r#"{"accumulatedSeconds": 754}"#).await;
        set_activity_log(&pool, &unreadable.id, "not json").await;
        set_activity_log(&pool, &approved.id, r#"{"accumulated_seconds": 600}"#).await;

        assert_eq!(migrate_legacy_durations(&pool).await.unwrap(), 3);

        let finished = get(&pool, &finished.id).await.unwrap().unwrap();
        assert_eq!(finished.duration_minutes, (754 + 1800) / 60);
        assert_eq!(get(&pool, &unreadable.id).await.unwrap().unwrap().duration_minutes, 10);
        assert_eq!(get(&pool, &approved.id).await.unwrap().unwrap().duration_minutes, 45);

        // 어느 행에도 누적 초가 남지 않습니다.
        let banked: Vec<i64> = find_by_user_and_week(&pool, "u1", monday())
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.accumulated_seconds)
            .collect();
        assert_eq!(banked, vec![0, 0, 0]);
        assert!(timers::find_active_by_user(&pool, "u1").await.unwrap().is_idle());

        // 두 번째 실행에서는 옮길 것이 없습니다.
        assert_eq!(migrate_legacy_durations(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn migration_revives_unfinished_session_as_running_timer() {
        let pool = memory_pool().await;
        let start = Utc.with_ymd_and_hms(2026, 10, 12, 9, 0, 0).unwrap();
        let mut open = entry("u1", "c1", monday(), 0);
        open.start_time = Some(start);
        open.end_time = None;
        create(&pool, &open).await.unwrap();
        set_activity_log(&pool, &open.id, r#"{"accumulatedSeconds": 300}"#).await;

        assert_eq!(migrate_legacy_durations(&pool).await.unwrap(), 1);

        let stored = get(&pool, &open.id).await.unwrap().unwrap();
        assert_eq!(stored.accumulated_seconds, 0);
        match timers::find_active_by_user(&pool, "u1").await.unwrap() {
            TimerState::Running {
                started_at,
                accumulated_seconds,
                session,
            } => {
                assert_eq!(started_at, start);
                assert_eq!(accumulated_seconds, 300);
                assert_eq!(session.entry_id.as_deref(), Some(open.id.as_str()));
            }
            other => panic!("expected a running timer, got {other:?}"),
        }
    }
}
