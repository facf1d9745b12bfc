//! # 타이머 상태 모델
//!
//! 사용자별 타이머는 세 가지 상태 중 하나입니다.
//!
//! ```text
//!          start            pause
//! [Idle] ────────→ [Running] ────→ [Paused]
//!    ↑                │  ↑  resume    │
//!    └──── stop ──────┘  └────────────┘
//!    ↑                                │
//!    └──────────── stop ──────────────┘
//! ```
//!
//! 진행 중인 타이머는 확정된 `TimeEntry`와 별도의 `active_timers` 테이블에 보관됩니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Running/Paused 상태가 공통으로 가지는 세션 정보
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSession {
    pub project_id: String,
    pub category_id: String,
    /// 기존 엔트리에 이어서 기록하는 세션이면 그 엔트리의 ID
    pub entry_id: Option<String>,
    /// 세션이 처음 시작된 시각. 엔트리의 `date`와 `start_time`이 여기서 나옵니다.
    pub first_started_at: DateTime<Utc>,
}

/// 사용자 한 명의 타이머 상태
///
/// `#[serde(tag = "state")]`: JSON에서 `{"state": "running", ...}` 형태로 직렬화합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TimerState {
    Idle,
    Running {
        /// 현재 구간이 시작된 시각 (resume 시 갱신)
        started_at: DateTime<Utc>,
        /// 이전 구간들에서 쌓인 초
        accumulated_seconds: i64,
        session: TimerSession,
    },
    Paused {
        accumulated_seconds: i64,
        session: TimerSession,
    },
}

impl TimerState {
    /// 상태를 바꾸지 않고 현재까지의 경과 초를 계산합니다.
    ///
    /// 시계가 뒤로 가더라도(NTP 보정 등) 현재 구간은 0초 미만으로 계산하지 않습니다.
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> i64 {
        match self {
            TimerState::Idle => 0,
            TimerState::Running {
                started_at,
                accumulated_seconds,
                ..
            } => accumulated_seconds + (now - *started_at).num_seconds().max(0),
            TimerState::Paused {
                accumulated_seconds,
                ..
            } => *accumulated_seconds,
        }
    }

    pub fn session(&self) -> Option<&TimerSession> {
        match self {
            TimerState::Idle => None,
            TimerState::Running { session, .. } | TimerState::Paused { session, .. } => {
                Some(session)
            }
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, TimerState::Idle)
    }

    pub fn name(&self) -> &'static str {
        match self {
            TimerState::Idle => "idle",
            TimerState::Running { .. } => "running",
            TimerState::Paused { .. } => "paused",
        }
    }
}

/// `GET /api/v1/timer` 응답
#[derive(Debug, Clone, Serialize)]
pub struct TimerStatus {
    #[serde(flatten)]
    pub state: TimerState,
    pub elapsed_seconds: i64,
}

/// `POST /api/v1/timer/start`
#[derive(Debug, Deserialize)]
pub struct StartTimerRequest {
    pub project_id: String,
    pub category_id: String,
}

/// `POST /api/v1/timer/stop`
#[derive(Debug, Default, Deserialize)]
pub struct StopTimerRequest {
    #[serde(default)]
    pub description: String,
    /// 없으면 청구 가능(true)으로 처리
    pub is_billable: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn session() -> TimerSession {
        TimerSession {
            project_id: "p1".into(),
            category_id: "c1".into(),
            entry_id: None,
            first_started_at: Utc.with_ymd_and_hms(2026, 10, 12, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn running_elapsed_includes_banked_seconds() {
        let started_at = Utc.with_ymd_and_hms(2026, 10, 12, 10, 0, 0).unwrap();
        let state = TimerState::Running {
            started_at,
            accumulated_seconds: 120,
            session: session(),
        };
        assert_eq!(state.elapsed_seconds(started_at + Duration::seconds(30)), 150);
    }

    #[test]
    fn running_elapsed_never_goes_below_banked_seconds() {
        let started_at = Utc.with_ymd_and_hms(2026, 10, 12, 10, 0, 0).unwrap();
        let state = TimerState::Running {
            started_at,
            accumulated_seconds: 120,
            session: session(),
        };
        assert_eq!(state.elapsed_seconds(started_at - Duration::seconds(5)), 120);
    }

    #[test]
    fn paused_elapsed_ignores_wall_clock() {
        let state = TimerState::Paused {
            accumulated_seconds: 42,
            session: session(),
        };
        assert_eq!(state.elapsed_seconds(Utc::now()), 42);
        assert_eq!(TimerState::Idle.elapsed_seconds(Utc::now()), 0);
    }

    #[test]
    fn serializes_with_state_tag() {
        let value = serde_json::to_value(TimerState::Idle).unwrap();
        assert_eq!(value, serde_json::json!({ "state": "idle" }));
    }
}
