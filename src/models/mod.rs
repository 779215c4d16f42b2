//! # 데이터 모델 모듈
//!
//! 애플리케이션에서 사용하는 데이터 구조체(struct)들을 정의합니다.
//! 각 하위 모듈은 특정 도메인의 데이터 타입을 담당합니다:
//! - `answer`: 정답/제출 답안 값 (문자열, 숫자, 불리언, 배열)
//! - `quiz`: 퀴즈와 문제 정의 (카탈로그에서 읽은 스냅샷)
//! - `session`: 라이브 게임 세션, 참가자, 답안 기록, 요청/응답 본문
//! - `history`: 게임 종료 후 저장되는 기록과 요약
//! - `practice`: 혼자 푸는 연습 모드의 점수 기록
//!
//! `pub use X::*;`로 재공개하므로 `crate::models::LiveSession`처럼 짧게 씁니다.

pub mod answer;
pub mod history;
pub mod practice;
pub mod quiz;
pub mod session;

pub use answer::*;
pub use history::*;
pub use practice::*;
pub use quiz::*;
pub use session::*;
