//! # 타이머 엔진
//!
//! 사용자별 타이머의 start / pause / resume / stop을 처리하고,
//! stop 시점에 확정된 `TimeEntry`를 만듭니다.
//!
//! ## 불변 조건
//! - 사용자당 진행 중(Running/Paused) 타이머는 최대 하나입니다.
//!   `active_timers`의 기본키와, 전이마다 잡는 사용자별 잠금이 함께 보장합니다.
//! - 경과 시간은 초 단위로 쌓고, 분 단위 절사는 stop에서 한 번만 합니다.
//! - 백그라운드 틱(tick)은 없습니다. `elapsed()`는 호출될 때마다 벽시계 차이로 계산합니다.

use crate::clock::Clock;
use crate::db;
use crate::error::AppError;
use crate::models::{EntryStatus, TimeEntry, TimerSession, TimerState, TimerStatus};
use crate::services::calendar::LocalCalendar;
use crate::services::entries::{ensure_editable, ensure_week_open};
use crate::services::locks::KeyedLocks;
use sqlx::SqlitePool;
use std::sync::Arc;

pub struct TimerEngine {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
    calendar: LocalCalendar,
    locks: KeyedLocks,
}

impl TimerEngine {
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>, calendar: LocalCalendar) -> Self {
        Self {
            pool,
            clock,
            calendar,
            locks: KeyedLocks::new(),
        }
    }

    /// 새 타이머를 시작합니다. Idle 상태에서만 가능합니다.
    ///
    /// 이미 Running/Paused 타이머가 있으면 `Conflict`를 돌려주고 상태는 그대로 둡니다.
    pub async fn start(
        &self,
        user_id: &str,
        project_id: &str,
        category_id: &str,
    ) -> Result<TimerState, AppError> {
        let project_id = project_id.trim();
        let category_id = category_id.trim();
        if project_id.is_empty() || category_id.is_empty() {
            return Err(AppError::BadRequest(
                "project_id and category_id are required".to_string(),
            ));
        }

        let _guard = self.locks.acquire(user_id).await;

        let current = db::timers::find_active_by_user(&self.pool, user_id).await?;
        if !current.is_idle() {
            tracing::debug!(user_id, state = current.name(), "Rejected timer start");
            return Err(AppError::Conflict(
                "A timer is already active for this user".to_string(),
            ));
        }

        let now = self.clock.now();
        let state = TimerState::Running {
            started_at: now,
            accumulated_seconds: 0,
            session: TimerSession {
                project_id: project_id.to_string(),
                category_id: category_id.to_string(),
                entry_id: None,
                first_started_at: now,
            },
        };
        db::timers::insert(&self.pool, user_id, &state).await?;

        tracing::info!(user_id, project_id, category_id, "Timer started");
        Ok(state)
    }

    /// 기존 DRAFT 엔트리에 이어서 기록하는 타이머를 시작합니다.
    ///
    /// stop 시 새 엔트리를 만드는 대신 이 엔트리의 시간에 더합니다.
    pub async fn continue_entry(&self, user_id: &str, entry_id: &str) -> Result<TimerState, AppError> {
        let _guard = self.locks.acquire(user_id).await;

        let current = db::timers::find_active_by_user(&self.pool, user_id).await?;
        if !current.is_idle() {
            return Err(AppError::Conflict(
                "A timer is already active for this user".to_string(),
            ));
        }

        let entry = db::time_entries::get(&self.pool, entry_id)
            .await?
            .filter(|e| e.user_id == user_id)
            .ok_or(AppError::NotFound)?;
        ensure_editable(&entry)?;

        let now = self.clock.now();
        let state = TimerState::Running {
            started_at: now,
            accumulated_seconds: 0,
            session: TimerSession {
                project_id: entry.project_id.clone(),
                category_id: entry.category_id.clone(),
                entry_id: Some(entry.id.clone()),
                first_started_at: now,
            },
        };
        db::timers::insert(&self.pool, user_id, &state).await?;

        tracing::info!(user_id, entry_id, "Timer started against existing entry");
        Ok(state)
    }

    /// Running → Paused. 현재 구간의 경과 초를 누적값에 더합니다.
    pub async fn pause(&self, user_id: &str) -> Result<TimerState, AppError> {
        let _guard = self.locks.acquire(user_id).await;

        let current = db::timers::find_active_by_user(&self.pool, user_id).await?;
        let now = self.clock.now();
        let elapsed = current.elapsed_seconds(now);
        let next = match current {
            TimerState::Running { session, .. } => TimerState::Paused {
                accumulated_seconds: elapsed,
                session,
            },
            TimerState::Paused { .. } => {
                return Err(AppError::InvalidState("Timer is already paused".to_string()))
            }
            TimerState::Idle => {
                return Err(AppError::InvalidState("No active timer to pause".to_string()))
            }
        };
        db::timers::replace(&self.pool, user_id, &next).await?;

        tracing::info!(user_id, elapsed_seconds = elapsed, "Timer paused");
        Ok(next)
    }

    /// Paused → Running. 누적값은 그대로 두고 새 구간을 시작합니다.
    pub async fn resume(&self, user_id: &str) -> Result<TimerState, AppError> {
        let _guard = self.locks.acquire(user_id).await;

        let current = db::timers::find_active_by_user(&self.pool, user_id).await?;
        let next = match current {
            TimerState::Paused {
                accumulated_seconds,
                session,
            } => TimerState::Running {
                started_at: self.clock.now(),
                accumulated_seconds,
                session,
            },
            TimerState::Running { .. } => {
                return Err(AppError::InvalidState("Timer is already running".to_string()))
            }
            TimerState::Idle => {
                return Err(AppError::InvalidState("No paused timer to resume".to_string()))
            }
        };
        db::timers::replace(&self.pool, user_id, &next).await?;

        tracing::info!(user_id, "Timer resumed");
        Ok(next)
    }

    /// 타이머를 멈추고 엔트리를 확정합니다.
    ///
    /// - 새 세션: `duration_minutes = floor(elapsed / 60)`인 DRAFT 엔트리를 만듭니다.
    /// - 이어 쓰기 세션: 대상 엔트리의 시간에 `floor(elapsed / 60)`분을 더합니다.
    ///   그 사이 엔트리가 잠겼다면 `ImmutableRecord`로 실패하고 타이머는 그대로 둡니다.
    /// - 새 엔트리가 들어갈 주가 이미 제출/승인되었으면 `InvalidState`,
    ///   잠겼으면 `ImmutableRecord`로 실패합니다. 이때도 타이머는 남아 있어 discard할 수 있습니다.
    ///
    /// 엔트리 기록과 타이머 삭제는 한 트랜잭션으로 묶입니다.
    pub async fn stop(
        &self,
        user_id: &str,
        description: &str,
        is_billable: bool,
    ) -> Result<TimeEntry, AppError> {
        let _guard = self.locks.acquire(user_id).await;

        let current = db::timers::find_active_by_user(&self.pool, user_id).await?;
        let Some(session) = current.session().cloned() else {
            return Err(AppError::InvalidState("No active timer to stop".to_string()));
        };

        let now = self.clock.now();
        let elapsed = current.elapsed_seconds(now);
        let minutes = elapsed / 60;
        let description = description.trim();

        let mut tx = self.pool.begin().await?;

        let entry = match &session.entry_id {
            Some(entry_id) => {
                let mut entry = db::time_entries::get(&mut *tx, entry_id)
                    .await?
                    .filter(|e| e.user_id == user_id)
                    .ok_or(AppError::NotFound)?;
                ensure_editable(&entry)?;

                entry.duration_minutes += minutes;
                entry.end_time = Some(now);
                entry.accumulated_seconds = 0;
                if entry.start_time.is_none() {
                    entry.start_time = Some(session.first_started_at);
                }
                if !description.is_empty() {
                    entry.description = description.to_string();
                }
                entry.updated_at = now;

                if !db::time_entries::update(&mut *tx, &entry).await? {
                    return Err(AppError::ImmutableRecord(format!(
                        "Entry {} is locked",
                        entry.id
                    )));
                }
                entry
            }
            None => {
                let date = self.calendar.local_date(session.first_started_at);
                ensure_week_open(&mut *tx, user_id, self.calendar.week_start(date)).await?;

                let entry = TimeEntry {
                    id: uuid::Uuid::now_v7().to_string(),
                    user_id: user_id.to_string(),
                    project_id: session.project_id.clone(),
                    category_id: session.category_id.clone(),
                    date,
                    start_time: Some(session.first_started_at),
                    end_time: Some(now),
                    accumulated_seconds: 0,
                    duration_minutes: minutes,
                    is_billable,
                    status: EntryStatus::Draft,
                    description: description.to_string(),
                    has_proof: false,
                    proof_ref: None,
                    created_at: now,
                    updated_at: now,
                };
                db::time_entries::create(&mut *tx, &entry).await?;
                entry
            }
        };

        // 다른 프로세스가 먼저 stop한 경우 행이 이미 없으므로 롤백합니다.
        if !db::timers::delete(&mut *tx, user_id).await? {
            return Err(AppError::InvalidState("No active timer to stop".to_string()));
        }
        tx.commit().await?;

        tracing::info!(
            user_id,
            entry_id = %entry.id,
            elapsed_seconds = elapsed,
            duration_minutes = entry.duration_minutes,
            "Timer stopped"
        );
        Ok(entry)
    }

    /// 엔트리를 만들지 않고 타이머를 버립니다.
    pub async fn discard(&self, user_id: &str) -> Result<(), AppError> {
        let _guard = self.locks.acquire(user_id).await;

        if !db::timers::delete(&self.pool, user_id).await? {
            return Err(AppError::InvalidState("No active timer to discard".to_string()));
        }

        tracing::info!(user_id, "Timer discarded");
        Ok(())
    }

    /// 현재 경과 초. 상태를 바꾸지 않으며 잠금도 잡지 않습니다.
    pub async fn elapsed(&self, user_id: &str) -> Result<i64, AppError> {
        Ok(self.status(user_id).await?.elapsed_seconds)
    }

    /// 현재 상태와 경과 초
    pub async fn status(&self, user_id: &str) -> Result<TimerStatus, AppError> {
        let state = db::timers::find_active_by_user(&self.pool, user_id).await?;
        let elapsed_seconds = state.elapsed_seconds(self.clock.now());
        Ok(TimerStatus {
            state,
            elapsed_seconds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::test_support::{memory_pool, t0};

    async fn engine() -> (TimerEngine, Arc<ManualClock>, SqlitePool) {
        let pool = memory_pool().await;
        let clock = Arc::new(ManualClock::new(t0()));
        let engine = TimerEngine::new(pool.clone(), clock.clone(), LocalCalendar::utc());
        (engine, clock, pool)
    }

    #[tokio::test]
    async fn one_hour_session_becomes_sixty_minute_draft() {
        let (engine, clock, _) = engine().await;

        engine.start("u1", "P1", "C1").await.unwrap();
        clock.advance(3600);
        let entry = engine.stop("u1", "", true).await.unwrap();

        assert_eq!(entry.duration_minutes, 60);
        assert_eq!(entry.status, EntryStatus::Draft);
        assert!(!entry.has_proof);
        assert_eq!(entry.start_time, Some(t0()));
        assert_eq!(entry.accumulated_seconds, 0);
        assert_eq!(entry.date, t0().date_naive());
        assert!(engine.status("u1").await.unwrap().state.is_idle());
    }

    #[tokio::test]
    async fn paused_gap_is_excluded_from_duration() {
        let (engine, clock, _) = engine().await;

        engine.start("u1", "P1", "C1").await.unwrap();
        clock.advance(1800);
        engine.pause("u1").await.unwrap();
        clock.advance(600);
        assert_eq!(engine.elapsed("u1").await.unwrap(), 1800);
        engine.resume("u1").await.unwrap();
        clock.advance(1800);
        let entry = engine.stop("u1", "focus work", false).await.unwrap();

        assert_eq!(entry.duration_minutes, 60);
        assert_eq!(entry.description, "focus work");
        assert!(!entry.is_billable);
    }

    #[tokio::test]
    async fn stop_while_paused_uses_banked_seconds_only() {
        let (engine, clock, _) = engine().await;

        engine.start("u1", "P1", "C1").await.unwrap();
        clock.advance(125);
        engine.pause("u1").await.unwrap();
        clock.advance(10_000);
        let entry = engine.stop("u1", "", true).await.unwrap();

        // 125초는 2분으로 절사됩니다.
        assert_eq!(entry.duration_minutes, 2);
    }

    #[tokio::test]
    async fn pause_resume_matches_uninterrupted_session() {
        let (engine, clock, _) = engine().await;
        engine.start("u1", "P1", "C1").await.unwrap();
        clock.advance(1000);
        engine.pause("u1").await.unwrap();
        clock.advance(777);
        engine.resume("u1").await.unwrap();
        clock.advance(2600);
        let interrupted = engine.stop("u1", "", true).await.unwrap();

        engine.start("u1", "P1", "C1").await.unwrap();
        clock.advance(3600);
        let straight = engine.stop("u1", "", true).await.unwrap();

        assert_eq!(interrupted.duration_minutes, straight.duration_minutes);
    }

    #[tokio::test]
    async fn only_the_first_start_wins() {
        let (engine, clock, _) = engine().await;

        let first = engine.start("u1", "P1", "C1").await.unwrap();
        clock.advance(60);
        for _ in 0..3 {
            let err = engine.start("u1", "P2", "C2").await.unwrap_err();
            assert!(matches!(err, AppError::Conflict(_)));
        }

        assert_eq!(engine.status("u1").await.unwrap().state, first);
        // 다른 사용자는 독립적입니다.
        engine.start("u2", "P2", "C2").await.unwrap();
    }

    #[tokio::test]
    async fn start_while_paused_is_a_conflict() {
        let (engine, _, _) = engine().await;
        engine.start("u1", "P1", "C1").await.unwrap();
        engine.pause("u1").await.unwrap();
        let err = engine.start("u1", "P1", "C1").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn start_requires_project_and_category() {
        let (engine, _, _) = engine().await;
        let err = engine.start("u1", " ", "C1").await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        let err = engine.start("u1", "P1", "").await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(engine.status("u1").await.unwrap().state.is_idle());
    }

    #[tokio::test]
    async fn transitions_from_wrong_state_are_rejected() {
        let (engine, _, _) = engine().await;

        assert!(matches!(engine.pause("u1").await, Err(AppError::InvalidState(_))));
        assert!(matches!(engine.resume("u1").await, Err(AppError::InvalidState(_))));
        assert!(matches!(engine.stop("u1", "", true).await, Err(AppError::InvalidState(_))));
        assert!(matches!(engine.discard("u1").await, Err(AppError::InvalidState(_))));

        engine.start("u1", "P1", "C1").await.unwrap();
        assert!(matches!(engine.resume("u1").await, Err(AppError::InvalidState(_))));
        engine.pause("u1").await.unwrap();
        assert!(matches!(engine.pause("u1").await, Err(AppError::InvalidState(_))));
    }

    #[tokio::test]
    async fn elapsed_is_monotonic_while_running() {
        let (engine, clock, _) = engine().await;
        engine.start("u1", "P1", "C1").await.unwrap();

        let mut last = engine.elapsed("u1").await.unwrap();
        for step in [1, 0, 59, 3, 600] {
            clock.advance(step);
            let now = engine.elapsed("u1").await.unwrap();
            assert!(now >= last, "{now} < {last}");
            last = now;
        }
        assert_eq!(last, 663);
        assert_eq!(engine.elapsed("nobody").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn discard_leaves_no_entry() {
        let (engine, clock, pool) = engine().await;
        engine.start("u1", "P1", "C1").await.unwrap();
        clock.advance(900);
        engine.discard("u1").await.unwrap();

        let week = LocalCalendar::utc().week_start(t0().date_naive());
        let entries = db::time_entries::find_by_user_and_week(&pool, "u1", week)
            .await
            .unwrap();
        assert!(entries.is_empty());
        assert!(engine.status("u1").await.unwrap().state.is_idle());
    }

    #[tokio::test]
    async fn concurrent_stops_create_exactly_one_entry() {
        let (engine, clock, pool) = engine().await;
        let engine = Arc::new(engine);
        engine.start("u1", "P1", "C1").await.unwrap();
        clock.advance(1200);

        let a = tokio::spawn({
            let engine = engine.clone();
            async move { engine.stop("u1", "", true).await }
        });
        let b = tokio::spawn({
            let engine = engine.clone();
            async move { engine.stop("u1", "", true).await }
        });
        let results = [a.await.unwrap(), b.await.unwrap()];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(AppError::InvalidState(_)))));

        let week = LocalCalendar::utc().week_start(t0().date_naive());
        let entries = db::time_entries::find_by_user_and_week(&pool, "u1", week)
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_starts_leave_one_timer() {
        let (engine, _, _) = engine().await;
        let engine = Arc::new(engine);

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let engine = engine.clone();
                tokio::spawn(async move { engine.start("u1", &format!("P{i}"), "C1").await })
            })
            .collect();

        let mut ok = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(AppError::Conflict(_)) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(ok, 1);
    }

    #[tokio::test]
    async fn continue_entry_adds_to_existing_duration() {
        let (engine, clock, _) = engine().await;
        engine.start("u1", "P1", "C1").await.unwrap();
        clock.advance(1800);
        let first = engine.stop("u1", "morning", true).await.unwrap();

        clock.advance(3600);
        let state = engine.continue_entry("u1", &first.id).await.unwrap();
        assert_eq!(state.session().unwrap().entry_id.as_deref(), Some(first.id.as_str()));
        clock.advance(900);
        let updated = engine.stop("u1", "", true).await.unwrap();

        assert_eq!(updated.id, first.id);
        assert_eq!(updated.duration_minutes, 45);
        assert_eq!(updated.description, "morning");
        assert_eq!(updated.start_time, first.start_time);
    }

    #[tokio::test]
    async fn continue_entry_of_another_user_is_not_found() {
        let (engine, clock, _) = engine().await;
        engine.start("u1", "P1", "C1").await.unwrap();
        clock.advance(60);
        let entry = engine.stop("u1", "", true).await.unwrap();

        let err = engine.continue_entry("u2", &entry.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    #[tokio::test]
    async fn stop_against_entry_locked_meanwhile_fails_and_keeps_timer() {
        let (engine, clock, pool) = engine().await;
        engine.start("u1", "P1", "C1").await.unwrap();
        clock.advance(600);
        let entry = engine.stop("u1", "", true).await.unwrap();
        engine.continue_entry("u1", &entry.id).await.unwrap();

        sqlx::query("UPDATE time_entries SET status = 'LOCKED' WHERE id = ?")
            .bind(&entry.id)
            .execute(&pool)
            .await
            .unwrap();

        clock.advance(600);
        let err = engine.stop("u1", "", true).await.unwrap_err();
        assert!(matches!(err, AppError::ImmutableRecord(_)));
        assert!(!engine.status("u1").await.unwrap().state.is_idle());

        let stored = db::time_entries::get(&pool, &entry.id).await.unwrap().unwrap();
        assert_eq!(stored.duration_minutes, 10);
    }
}
