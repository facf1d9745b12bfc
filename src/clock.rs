//! # 시계(Clock) 모듈
//!
//! 타이머 엔진과 워크플로는 현재 시각을 직접 `Utc::now()`로 읽지 않고
//! `Clock` 트레이트를 통해 받습니다. 운영 환경에서는 `SystemClock`을,
//! 테스트에서는 원하는 만큼 시간을 앞으로 돌릴 수 있는 `ManualClock`을 씁니다.

use chrono::{DateTime, Utc};

/// 현재 시각을 제공하는 추상화
///
/// `Send + Sync`: 여러 비동기 태스크가 `Arc<dyn Clock>`으로 공유하기 때문에 필요합니다.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// 실제 벽시계 시각
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
pub use manual::ManualClock;

#[cfg(test)]
mod manual {
    use super::Clock;
    use chrono::{DateTime, Duration, Utc};
    use std::sync::Mutex;

    /// 테스트용 수동 시계. `advance()`를 호출해야만 시간이 흐릅니다.
    #[derive(Debug)]
    pub struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        pub fn new(start: DateTime<Utc>) -> Self {
            Self {
                now: Mutex::new(start),
            }
        }

        pub fn advance(&self, seconds: i64) {
            let mut now = self.now.lock().unwrap();
            *now += Duration::seconds(seconds);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }
}
