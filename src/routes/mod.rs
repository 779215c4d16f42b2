//! # 라우트 핸들러 모듈
//!
//! HTTP 요청을 처리하는 핸들러 함수들을 모아둔 모듈입니다.
//! 라우터 조립은 `crate::router`에서 합니다.
//!
//! 각 하위 모듈:
//! - `health`: 서버 상태 확인 (헬스체크)
//! - `history`: 게임 기록 조회
//! - `learning`: 혼자 푸는 연습 모드
//! - `sessions`: 라이브 게임 세션 (생성/참가/진행/종료, SSE 이벤트)

pub mod health;
pub mod history;
pub mod learning;
pub mod sessions;

// `routes::create_session`처럼 바로 접근할 수 있게 재공개합니다.
pub use health::*;
pub use history::*;
pub use learning::*;
pub use sessions::*;
