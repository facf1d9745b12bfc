//! # 워크플로 이벤트
//!
//! submit / approve / reject / lock이 커밋된 뒤 알림·감사 로그 쪽으로 보내는 이벤트입니다.
//! 전달 실패가 워크플로 결과에 영향을 주지 않도록 `publish`는 값을 돌려주지 않습니다.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowEventType {
    Submitted,
    Approved,
    Rejected,
    Locked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowEvent {
    pub event_type: WorkflowEventType,
    pub employee_id: String,
    pub week_start: NaiveDate,
    pub timestamp: DateTime<Utc>,
}

/// 이벤트 수신자. 구현체는 실패를 스스로 처리(로그 등)해야 합니다.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: &WorkflowEvent);
}

/// 기본 수신자: 이벤트를 구조화 로그로 남깁니다.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn publish(&self, event: &WorkflowEvent) {
        tracing::info!(
            event_type = ?event.event_type,
            employee_id = %event.employee_id,
            week_start = %event.week_start,
            timestamp = %event.timestamp,
            "timesheet event"
        );
    }
}

#[cfg(test)]
pub use recording::RecordingSink;
