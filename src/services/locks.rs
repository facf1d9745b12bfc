//! 키별 비동기 잠금.
//!
//! 같은 키(사용자 ID, 직원+주)에 대한 상태 전이는 하나씩 순서대로 실행되고,
//! 서로 다른 키는 서로를 기다리지 않습니다.
//!
//! 맵에는 지금 누군가 잡고 있거나 기다리는 키만 남습니다.
//! 마지막 가드가 풀리면 그 키의 항목도 함께 지워집니다.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = HashMap<String, Arc<AsyncMutex<()>>>;

#[derive(Debug, Default)]
pub struct KeyedLocks {
    inner: Mutex<LockMap>,
}

/// `KeyedLocks::acquire`가 돌려주는 가드
///
/// drop되면 잠금을 풀고, 같은 키를 기다리는 쪽이 없으면 맵에서 키를 지웁니다.
#[derive(Debug)]
pub struct KeyedGuard<'a> {
    locks: &'a KeyedLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    // 맵 잠금 중에 패닉이 나도 맵 자체는 항상 일관된 상태이므로 그대로 씁니다.
    fn map(&self) -> MutexGuard<'_, LockMap> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 키의 잠금을 얻을 때까지 기다립니다. 반환된 가드가 drop되면 풀립니다.
    pub async fn acquire(&self, key: &str) -> KeyedGuard<'_> {
        // Arc 복제는 맵 잠금 안에서 합니다.
        // 정리하는 쪽도 맵 잠금 안에서 참조 수를 보므로, 기다리는 쪽이 있는 키는 지워지지 않습니다.
        let lock = {
            let mut map = self.map();
            map.entry(key.to_string()).or_default().clone()
        };
        // 맵 잠금은 await 전에 이미 풀려 있습니다.
        let guard = lock.lock_owned().await;

        KeyedGuard {
            locks: self,
            key: key.to_string(),
            guard: Some(guard),
        }
    }

    /// 현재 맵에 남아 있는 키 수
    #[cfg(test)]
    fn len(&self) -> usize {
        self.map().len()
    }
}

impl Drop for KeyedGuard<'_> {
    fn drop(&mut self) {
        // 먼저 잠금을 풀어야 참조 수에서 가드 몫이 빠집니다.
        self.guard.take();

        let mut map = self.locks.map();
        let idle = map
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1);
        if idle {
            map.remove(&self.key);
        }
    }
}
