//! # 에러 처리 모듈
//!
//! 게임 서버에서 발생할 수 있는 모든 에러 타입을 정의합니다.
//! Rust에서는 예외(exception) 대신 `Result<T, E>` 타입으로 에러를 처리합니다.
//!
//! 이 모듈의 핵심:
//! - `AppError` 열거형(enum): 모든 에러 종류를 하나의 타입으로 통합
//! - `code()`: 클라이언트가 분기할 수 있는 고정된 기계용 에러 종류 문자열
//! - `IntoResponse` 구현: 에러를 HTTP 응답으로 자동 변환
//!
//! 모든 에러는 호출자 수준에서 복구 가능하며 프로세스를 종료시키지 않습니다.

use axum::{
    http::StatusCode,                     // HTTP 상태 코드 (200, 404, 500 등)
    response::{IntoResponse, Response},   // Axum의 응답 변환 트레이트
    Json,                                 // JSON 응답 래퍼
};
use serde_json::json; // json! 매크로: JSON 객체를 간편하게 생성
use thiserror::Error; // thiserror: 커스텀 에러 타입을 쉽게 만들어주는 매크로 크레이트

/// 애플리케이션에서 발생할 수 있는 모든 에러 종류
///
/// 각 에러 variant는 적절한 HTTP 상태 코드와 메시지로 변환됩니다.
/// 핸들러에서 `Result<T, AppError>`를 반환하면,
/// Axum이 자동으로 `IntoResponse`를 호출하여 HTTP 응답으로 변환합니다.
#[derive(Debug, Error)]
pub enum AppError {
    /// 세션/퀴즈/문제/기록을 찾을 수 없음 (HTTP 404)
    /// `&'static str`에 무엇이 없는지 담습니다. 예: `NotFound("session")`
    #[error("{0} not found")]
    NotFound(&'static str),

    /// 호스트 전용 작업을 호스트가 아닌 사용자가 시도함 (HTTP 403)
    #[error("{0}")]
    Forbidden(String),

    /// 현재 상태에서 허용되지 않는 전이 (HTTP 409)
    /// 예: 이미 시작된 게임을 다시 시작, 이미 끝난 게임을 다시 종료
    #[error("{0}")]
    InvalidState(String),

    /// 이미 시작된 게임에 참가 시도 (HTTP 409)
    #[error("Game has already started")]
    AlreadyStarted,

    /// 이미 끝난 게임에 참가 시도 (HTTP 409)
    #[error("Game has already ended")]
    AlreadyEnded,

    /// 참가 인원 상한 도달 (HTTP 409)
    #[error("Game is full")]
    Full,

    /// 같은 사용자(또는 같은 이름의 게스트)가 이미 참가함 (HTTP 409)
    #[error("Player already joined this game")]
    DuplicateParticipant,

    /// 참가하지 않은 신원으로 답안 제출 (HTTP 403)
    #[error("You are not in this game")]
    NotInGame,

    /// 필수 입력값 누락 (HTTP 400)
    #[error("{0}")]
    Validation(String),

    /// 인증 실패 (HTTP 401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// 데이터베이스 오류 (HTTP 503) — 카탈로그 조회/기록 저장 실패.
    /// 세션 상태는 변경되지 않았으므로 재시도해도 안전합니다.
    /// #[from]: sqlx::Error → AppError::Database 자동 변환 (`?` 사용 가능)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// JSON 컬럼 직렬화/역직렬화 오류 (HTTP 500)
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 서버 내부 오류 (HTTP 500)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// 클라이언트용 고정 에러 코드
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::Forbidden(_) => "forbidden",
            AppError::InvalidState(_) => "invalid_state",
            AppError::AlreadyStarted => "already_started",
            AppError::AlreadyEnded => "already_ended",
            AppError::Full => "full",
            AppError::DuplicateParticipant => "duplicate_participant",
            AppError::NotInGame => "not_in_game",
            AppError::Validation(_) => "validation_error",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Database(_) => "unavailable",
            AppError::Serialization(_) | AppError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) | AppError::NotInGame => StatusCode::FORBIDDEN,
            AppError::InvalidState(_)
            | AppError::AlreadyStarted
            | AppError::AlreadyEnded
            | AppError::Full
            | AppError::DuplicateParticipant => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Serialization(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    /// AppError를 HTTP 응답으로 변환합니다.
    ///
    /// 내부 에러(Database, Serialization, Internal)는 실제 에러 내용을 로그에만 기록하고,
    /// 클라이언트에는 일반적인 메시지만 반환합니다.
    fn into_response(self) -> Response {
        let message = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                "Storage is temporarily unavailable, please retry".to_string()
            }
            AppError::Serialization(ref e) => {
                tracing::error!("Serialization error: {}", e);
                "An internal error occurred".to_string()
            }
            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }
            ref other => other.to_string(),
        };

        // 결과: { "error": { "code": "not_found", "message": "session not found" } }
        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": message
            }
        }));

        (self.status(), body).into_response()
    }
}
