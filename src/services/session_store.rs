//! # 세션 저장소(Session Store)
//!
//! 라이브 세션을 세션 ID(기본 키)와 활성 PIN(보조 인덱스)으로 찾을 수 있게 보관합니다.
//!
//! ## 동시성 모델
//! ```text
//! InMemorySessionStore
//! └── RwLock<StoreInner>                 ← 인덱스 전체 잠금 (짧게만 잡음)
//!     ├── sessions: id  → Arc<Mutex<LiveSession>>   ← 세션별 잠금
//!     └── pins:     PIN → id
//! ```
//! - 인덱스 잠금은 조회/삽입/삭제 순간에만 잡고, `.await` 너머로 들고 가지 않습니다.
//! - 세션 상태 변경은 세션별 `tokio::sync::Mutex`로 직렬화합니다.
//!   서로 다른 세션의 작업은 서로를 기다리지 않습니다.
//! - PIN 생성과 예약은 인덱스 쓰기 잠금 안에서 이루어지므로
//!   같은 PIN이 두 활성 세션에 배정될 수 없습니다.
//!
//! 엔진은 `SessionStore` 트레이트에만 의존하므로, 외부 키-값 저장소 구현으로
//! 교체할 수 있습니다.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::models::LiveSession;

/// 세션 하나에 대한 공유 핸들. 잠금을 잡아야 상태를 읽고 쓸 수 있습니다.
pub type SessionHandle = Arc<Mutex<LiveSession>>;

pub trait SessionStore: Send + Sync + Debug {
    /// 세션을 등록하고, 활성 세션 사이에서 유일한 PIN을 배정합니다.
    /// `generate_pin`은 아직 쓰이지 않은 PIN이 나올 때까지 반복 호출됩니다.
    fn insert(
        &self,
        session: LiveSession,
        generate_pin: &mut dyn FnMut() -> String,
    ) -> SessionHandle;

    fn get(&self, session_id: &str) -> Option<SessionHandle>;

    fn find_by_pin(&self, pin: &str) -> Option<SessionHandle>;

    /// 세션이 더 이상 참가를 받지 않을 때 PIN 예약을 해제합니다.
    /// PIN이 다른 세션에 재배정되었다면 아무것도 하지 않습니다.
    fn release_pin(&self, pin: &str, session_id: &str);

    /// 세션과 PIN 예약을 함께 제거합니다.
    fn remove(&self, session_id: &str) -> Option<SessionHandle>;

    /// `cutoff`보다 오래 활동이 없던 세션을 제거하고 마지막 상태를 돌려줍니다.
    /// 잠금을 잡고 있는(= 작업 중인) 세션은 건너뜁니다.
    fn sweep_idle(&self, cutoff: DateTime<Utc>) -> Vec<LiveSession>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
struct StoreInner {
    sessions: HashMap<String, SessionHandle>,
    pins: HashMap<String, String>,
}

impl StoreInner {
    fn drop_pin_for(&mut self, session_id: &str, pin: &str) {
        if self.pins.get(pin).map(String::as_str) == Some(session_id) {
            self.pins.remove(pin);
        }
    }
}

/// 프로세스 메모리에 세션을 보관하는 기본 구현
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    inner: RwLock<StoreInner>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn insert(
        &self,
        mut session: LiveSession,
        generate_pin: &mut dyn FnMut() -> String,
    ) -> SessionHandle {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        let mut pin = generate_pin();
        while guard.pins.contains_key(&pin) {
            tracing::debug!("PIN collision, regenerating");
            pin = generate_pin();
        }

        session.pin = pin.clone();
        let id = session.id.clone();
        let handle = Arc::new(Mutex::new(session));
        guard.pins.insert(pin, id.clone());
        guard.sessions.insert(id, Arc::clone(&handle));
        handle
    }

    fn get(&self, session_id: &str) -> Option<SessionHandle> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        guard.sessions.get(session_id).cloned()
    }

    fn find_by_pin(&self, pin: &str) -> Option<SessionHandle> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let id = guard.pins.get(pin.trim())?;
        guard.sessions.get(id).cloned()
    }

    fn release_pin(&self, pin: &str, session_id: &str) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        guard.drop_pin_for(session_id, pin);
    }

    fn remove(&self, session_id: &str) -> Option<SessionHandle> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        guard.pins.retain(|_, id| id != session_id);
        guard.sessions.remove(session_id)
    }

    fn sweep_idle(&self, cutoff: DateTime<Utc>) -> Vec<LiveSession> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        let mut expired = Vec::new();
        for handle in guard.sessions.values() {
            // try_lock 실패 = 지금 누군가 이 세션을 변경 중 → 활동 중이므로 유지
            let Ok(session) = handle.try_lock() else {
                continue;
            };
            if session.last_activity_at < cutoff {
                expired.push(session.clone());
            }
        }

        for session in &expired {
            guard.sessions.remove(&session.id);
            guard.drop_pin_for(&session.id, &session.pin);
        }
        expired
    }

    fn len(&self) -> usize {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        guard.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Quiz;
    use chrono::Duration;

    fn session(id: &str, now: DateTime<Utc>) -> LiveSession {
        let quiz = Quiz {
            id: "quiz".into(),
            title: "Quiz".into(),
            description: String::new(),
            created_by: "host".into(),
            questions: Vec::new(),
        };
        LiveSession::new(id.into(), quiz, "host".into(), String::new(), 50, now)
    }

    #[tokio::test]
    async fn indexes_by_id_and_pin() {
        let store = InMemorySessionStore::new();
        let handle = store.insert(session("s1", Utc::now()), &mut || "123456".to_string());

        assert_eq!(handle.lock().await.pin, "123456");
        assert!(store.get("s1").is_some());
        let by_pin = store.find_by_pin("123456").expect("indexed by PIN");
        assert_eq!(by_pin.lock().await.id, "s1");
        assert!(store.find_by_pin("654321").is_none());
    }

    #[tokio::test]
    async fn regenerates_colliding_pins() {
        let store = InMemorySessionStore::new();
        store.insert(session("s1", Utc::now()), &mut || "111111".to_string());

        let mut candidates = vec!["222222", "111111"];
        let handle = store.insert(session("s2", Utc::now()), &mut || {
            candidates.pop().expect("generator called too often").to_string()
        });

        assert_eq!(handle.lock().await.pin, "222222");
        assert_eq!(store.find_by_pin("111111").unwrap().lock().await.id, "s1");
    }

    #[tokio::test]
    async fn released_pin_no_longer_resolves() {
        let store = InMemorySessionStore::new();
        store.insert(session("s1", Utc::now()), &mut || "111111".to_string());

        // 다른 세션 이름으로는 해제되지 않음
        store.release_pin("111111", "other");
        assert!(store.find_by_pin("111111").is_some());

        store.release_pin("111111", "s1");
        assert!(store.find_by_pin("111111").is_none());
        assert!(store.get("s1").is_some());
    }

    #[tokio::test]
    async fn sweep_removes_only_idle_sessions() {
        let store = InMemorySessionStore::new();
        let now = Utc::now();
        store.insert(session("old", now - Duration::hours(25)), &mut || "111111".to_string());
        store.insert(session("fresh", now), &mut || "222222".to_string());

        let expired = store.sweep_idle(now - Duration::hours(24));

        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, "old");
        assert!(store.get("old").is_none());
        assert!(store.find_by_pin("111111").is_none());
        assert!(store.get("fresh").is_some());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn sweep_skips_locked_sessions() {
        let store = InMemorySessionStore::new();
        let now = Utc::now();
        let handle = store.insert(session("busy", now - Duration::hours(48)), &mut || {
            "333333".to_string()
        });

        let _guard = handle.lock().await;
        assert!(store.sweep_idle(now).is_empty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn remove_drops_pin_reservation() {
        let store = InMemorySessionStore::new();
        store.insert(session("s1", Utc::now()), &mut || "444444".to_string());
        assert!(store.remove("s1").is_some());
        assert!(store.find_by_pin("444444").is_none());
        assert!(store.is_empty());
    }
}
