//! # 실시간 이벤트 버스
//!
//! 게임 엔진이 상태 전이에 성공할 때마다 `GameEvent`를 발행하면,
//! 해당 세션을 구독 중인 모든 클라이언트 채널로 복사해 전달합니다.
//!
//! - 세션 ID 하나가 토픽 하나입니다.
//! - 전달은 최대 한 번(at-most-once), 최선 노력(best-effort)입니다.
//!   수신 측이 끊긴 채널은 다음 발행 때 정리됩니다.
//! - 정본(authoritative) 상태는 항상 세션 저장소이며, 클라이언트는
//!   `GET /sessions/:id`로 언제든 다시 가져올 수 있습니다.
//! - 전송 방식(SSE 등)은 `routes::sessions::session_events`가 담당하고,
//!   엔진은 채널에 메시지를 넣을 뿐 전송 코드를 직접 호출하지 않습니다.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use tokio::sync::mpsc;

use crate::models::RankedResults;

pub type EventSender = mpsc::UnboundedSender<GameEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<GameEvent>;

/// 세션 참가자에게 알리는 도메인 이벤트 (닫힌 집합)
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum GameEvent {
    #[serde(rename_all = "camelCase")]
    ParticipantJoined { name: String, total_players: usize },
    GameStarted,
    QuestionChanged { index: usize },
    #[serde(rename_all = "camelCase")]
    AnswerSubmitted {
        name: String,
        question_id: String,
        is_correct: bool,
        score: u32,
    },
    GameEnded { results: RankedResults },
    #[serde(rename_all = "camelCase")]
    ParticipantLeft { name: String, total_players: usize },
    HostDisconnected,
}

impl GameEvent {
    /// SSE `event:` 필드에 쓰는 이벤트 이름
    pub fn kind(&self) -> &'static str {
        match self {
            GameEvent::ParticipantJoined { .. } => "participant-joined",
            GameEvent::GameStarted => "game-started",
            GameEvent::QuestionChanged { .. } => "question-changed",
            GameEvent::AnswerSubmitted { .. } => "answer-submitted",
            GameEvent::GameEnded { .. } => "game-ended",
            GameEvent::ParticipantLeft { .. } => "participant-left",
            GameEvent::HostDisconnected => "host-disconnected",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventBus {
    inner: Arc<EventBusInner>,
}

#[derive(Debug, Default)]
struct EventBusInner {
    subscribers: RwLock<HashMap<String, Vec<(usize, EventSender)>>>,
    next_id: AtomicUsize,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, session_id: &str) -> (usize, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.inner.next_id.fetch_add(1, Ordering::AcqRel);
        let mut guard = self
            .inner
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        guard.entry(session_id.to_string()).or_default().push((id, tx));
        (id, rx)
    }

    pub fn publish(&self, session_id: &str, event: GameEvent) {
        let subscribers = {
            let guard = self
                .inner
                .subscribers
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            guard.get(session_id).cloned()
        };

        tracing::debug!(session_id, event = event.kind(), "publishing event");

        if let Some(list) = subscribers {
            let mut failed = Vec::new();
            for (id, sender) in list {
                if sender.send(event.clone()).is_err() {
                    failed.push(id);
                }
            }
            if !failed.is_empty() {
                tracing::warn!(session_id, dropped = failed.len(), "dropping closed subscribers");
                self.remove_subscribers(session_id, &failed);
            }
        }
    }

    pub fn unsubscribe(&self, session_id: &str, subscriber_id: usize) {
        self.remove_subscribers(session_id, &[subscriber_id]);
    }

    /// 세션이 사라질 때 남은 구독자 채널을 모두 닫습니다.
    pub fn close_topic(&self, session_id: &str) {
        let mut guard = self
            .inner
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        guard.remove(session_id);
    }

    pub fn subscriber_count(&self, session_id: &str) -> usize {
        let guard = self
            .inner
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        guard.get(session_id).map_or(0, Vec::len)
    }

    fn remove_subscribers(&self, session_id: &str, ids: &[usize]) {
        let mut guard = self
            .inner
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(list) = guard.get_mut(session_id) {
            list.retain(|(id, _)| !ids.contains(id));
            if list.is_empty() {
                guard.remove(session_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn delivers_only_to_the_session_topic() {
        let bus = EventBus::new();
        let (_a, mut rx_a) = bus.subscribe("a");
        let (_b, mut rx_b) = bus.subscribe("b");

        bus.publish("a", GameEvent::QuestionChanged { index: 2 });

        let received = tokio::time::timeout(Duration::from_millis(100), rx_a.recv())
            .await
            .expect("channel receive timed out")
            .expect("channel unexpectedly closed");
        match received {
            GameEvent::QuestionChanged { index } => assert_eq!(index, 2),
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn prunes_closed_subscribers() {
        let bus = EventBus::new();
        let (_id, rx) = bus.subscribe("s");
        let (_id2, _rx2) = bus.subscribe("s");
        drop(rx);

        bus.publish("s", GameEvent::GameStarted);
        assert_eq!(bus.subscriber_count("s"), 1);
    }

    #[test]
    fn serializes_with_kebab_case_tag() {
        let json = serde_json::to_value(GameEvent::ParticipantJoined {
            name: "Ana".into(),
            total_players: 3,
        })
        .unwrap();
        assert_eq!(json["type"], "participant-joined");
        assert_eq!(json["totalPlayers"], 3);
        assert_eq!(GameEvent::HostDisconnected.kind(), "host-disconnected");
    }
}
