//! # 연습(learning) 모드 API 라우트 핸들러
//!
//! ## 엔드포인트 목록 (모두 인증 필수)
//! | 메서드 | 경로 | 핸들러 | 설명 |
//! |--------|------|--------|------|
//! | POST | /api/v1/learning/start/{quiz_id} | `start_learning` | 정답을 뺀 퀴즈 |
//! | POST | /api/v1/learning/submit | `submit_learning` | 채점 + 기록 저장 |
//! | GET | /api/v1/learning/history | `learning_history` | 내 연습 기록 |
//! | GET | /api/v1/learning/stats | `learning_stats` | 내 연습 통계 |
//! | GET | /api/v1/learning/{id} | `learning_result` | 연습 결과 상세 (해설 포함) |

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::{
    error::AppError,
    middleware::{auth::AuthUser, json::AppJson},
    models::*,
    services::practice,
    AppState,
};

/// `POST /api/v1/learning/start/{quiz_id}` → `{ "quiz": {...} }`
pub async fn start_learning(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(quiz_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let quiz = practice::start(&state.pool, &quiz_id).await?;
    Ok(Json(json!({ "quiz": quiz })))
}

/// 답안 제출
///
/// `POST /api/v1/learning/submit`
/// + `{ "quizId": "...", "answers": [{ "questionId": "q1", "value": 1, "timeSpent": 3 }] }`
/// → `201 { "results": {...} }`
pub async fn submit_learning(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(req): AppJson<SubmitPracticeRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let quiz_id = req
        .quiz_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty());
    let (Some(quiz_id), Some(answers)) = (quiz_id, req.answers) else {
        return Err(AppError::Validation(
            "Please provide quiz ID and answers".to_string(),
        ));
    };

    let record = practice::submit(&state.pool, &user.user_id, &quiz_id, answers).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "results": PracticeSubmitted::from(&record) })),
    ))
}

pub async fn learning_history(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<PracticeHistory>, AppError> {
    Ok(Json(practice::history(&state.pool, &user.user_id).await?))
}

/// `GET /api/v1/learning/stats` → `{ "stats": {...} }`
pub async fn learning_stats(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Value>, AppError> {
    let stats = practice::stats(&state.pool, &user.user_id).await?;
    Ok(Json(json!({ "stats": stats })))
}

/// `GET /api/v1/learning/{id}` → `{ "result": {...} }`
pub async fn learning_result(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let review = practice::result(&state.pool, &user.user_id, &id).await?;
    Ok(Json(json!({ "result": review })))
}
