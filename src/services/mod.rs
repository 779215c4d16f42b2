//! # 서비스 계층
//!
//! HTTP와 무관한 게임 로직입니다.
//! - `evaluator`: 답안 채점 (순수 함수)
//! - `events`: 세션별 이벤트 발행/구독
//! - `game`: 세션 상태 기계 (`GameEngine`)
//! - `pin`: 6자리 참가 PIN 생성
//! - `practice`: 혼자 푸는 연습 모드 (채점은 `evaluator` 재사용)
//! - `session_store`: 라이브 세션 보관소

pub mod evaluator;
pub mod events;
pub mod game;
pub mod pin;
pub mod practice;
pub mod session_store;
