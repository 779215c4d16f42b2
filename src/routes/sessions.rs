//! # 라이브 게임 세션 API 라우트 핸들러
//!
//! 게임 생성부터 종료까지 세션 상태를 바꾸는 HTTP 핸들러입니다.
//! 상태 전이 규칙은 모두 `services::game::GameEngine`에 있고,
//! 여기서는 요청 본문 검증과 신원 추출만 합니다.
//!
//! ## 엔드포인트 목록
//! | 메서드 | 경로 | 핸들러 | 인증 | 설명 |
//! |--------|------|--------|------|------|
//! | POST | /api/v1/sessions | `create_session` | 필수 | 세션 생성 (PIN 발급) |
//! | POST | /api/v1/sessions/join | `join_session` | 선택 | PIN으로 참가 |
//! | GET | /api/v1/sessions/{id} | `get_session` | - | 세션 전체 상태 |
//! | DELETE | /api/v1/sessions/{id} | `close_session` | 호스트 | 세션 닫기 |
//! | POST | /api/v1/sessions/{id}/start | `start_game` | 호스트 | 게임 시작 |
//! | POST | /api/v1/sessions/{id}/save-draft | `save_draft` | 선택 | 답안 임시저장 |
//! | POST | /api/v1/sessions/{id}/submit | `submit_answer` | 선택 | 답안 제출 |
//! | POST | /api/v1/sessions/{id}/advance | `advance_question` | 호스트 | 다음 문제 |
//! | POST | /api/v1/sessions/{id}/end | `end_game` | 호스트 | 게임 종료 |
//! | POST | /api/v1/sessions/{id}/leave | `leave_session` | 선택 | 대기실 나가기 |
//! | GET | /api/v1/sessions/{id}/events | `session_events` | - | 실시간 이벤트 (SSE) |
//!
//! "선택" 인증: 토큰이 있으면 로그인 사용자, 없으면 `displayName`으로 찾는 게스트입니다.

use std::convert::Infallible;

use axum::{
    body::Bytes,
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures_util::stream::{self, Stream};
use serde_json::{json, Value};

use crate::{
    error::AppError,
    middleware::auth::{AuthUser, MaybeAuthUser},
    middleware::json::AppJson,
    models::*,
    services::events::{EventBus, EventReceiver, GameEvent},
    services::game::Submission,
    AppState,
};

/// 필수 문자열 필드: 없거나 공백뿐이면 `Validation` 에러
fn required(value: Option<String>, message: &str) -> Result<String, AppError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation(message.to_string()))
}

/// 세션 생성
///
/// `POST /api/v1/sessions` + `{ "quizId": "...", "maxPlayers": 30 }`
/// → `{ "sessionId", "PIN", "quizTitle", "totalQuestions" }`
pub async fn create_session(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(req): AppJson<CreateSessionRequest>,
) -> Result<Json<CreatedSession>, AppError> {
    let quiz_id = required(req.quiz_id, "Please provide quiz ID")?;
    let created = state
        .engine
        .create_session(&quiz_id, &user.user_id, req.max_players)
        .await?;
    Ok(Json(created))
}

/// PIN으로 참가
///
/// `POST /api/v1/sessions/join` + `{ "PIN": "123456", "displayName": "Ana", "avatar": "🦊" }`
pub async fn join_session(
    State(state): State<AppState>,
    user: MaybeAuthUser,
    AppJson(req): AppJson<JoinSessionRequest>,
) -> Result<Json<JoinedSession>, AppError> {
    let pin = required(req.pin, "Please provide PIN and display name")?;
    let display_name = required(req.display_name, "Please provide PIN and display name")?;

    let joined = state
        .engine
        .join(&pin, &display_name, req.avatar, user.user_id())
        .await?;
    Ok(Json(joined))
}

/// 세션 전체 상태 (퀴즈, 문제, 참가자, 답안 포함)
///
/// `GET /api/v1/sessions/{id}` → `{ "session": {...} }`
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let session = state.engine.snapshot(&id).await?;
    Ok(Json(json!({ "session": session })))
}

/// 게임 시작 (호스트 전용) → 바뀐 세션 전체 `{ "session": {...} }`
pub async fn start_game(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let session = state.engine.start(&id, &user.user_id).await?;
    Ok(Json(json!({ "session": session })))
}

/// 답안 임시저장
///
/// `POST /api/v1/sessions/{id}/save-draft`
/// + `{ "questionId": "q1", "value": "Paris", "displayName": "Ana" }` → `{ "saved": true }`
pub async fn save_draft(
    State(state): State<AppState>,
    user: MaybeAuthUser,
    Path(id): Path<String>,
    AppJson(req): AppJson<SaveDraftRequest>,
) -> Result<Json<DraftSaved>, AppError> {
    let question_id = required(req.question_id, "Please provide question ID")?;
    let identity = Identity::new(user.user_id(), req.display_name);

    let saved = state
        .engine
        .save_draft(&id, &identity, &question_id, req.value)
        .await?;
    Ok(Json(saved))
}

/// 최종 답안 제출
///
/// `POST /api/v1/sessions/{id}/submit`
/// + `{ "questionId": "q1", "value": 2, "timeSpent": 4.2, "displayName": "Ana" }`
/// → `{ "isCorrect", "pointsAwarded", "currentScore", "timeSpent" }`
///
/// 같은 문제를 다시 제출하면 저장된 결과에 `"alreadyAnswered": true`를 붙여 돌려줍니다.
pub async fn submit_answer(
    State(state): State<AppState>,
    user: MaybeAuthUser,
    Path(id): Path<String>,
    AppJson(req): AppJson<SubmitAnswerRequest>,
) -> Result<Json<SubmitOutcome>, AppError> {
    let question_id = required(req.question_id, "Please provide question ID")?;
    let identity = Identity::new(user.user_id(), req.display_name);
    let submission = Submission {
        question_id,
        value: req.value,
        time_spent: req.time_spent,
    };

    let outcome = state
        .engine
        .submit_answer(&id, &identity, submission)
        .await?;
    Ok(Json(outcome))
}

/// 다음 문제로 (호스트 전용). 마지막 문제였다면 게임 종료 결과를 돌려줍니다.
pub async fn advance_question(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<AdvanceOutcome>, AppError> {
    let outcome = state.engine.advance(&id, &user.user_id).await?;
    Ok(Json(outcome))
}

/// 게임 종료 (호스트 전용) → `{ "results": {...}, "historyId": "..." }`
pub async fn end_game(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<GameResults>, AppError> {
    let results = state.engine.end(&id, &user.user_id).await?;
    Ok(Json(results))
}

/// 대기실 나가기
///
/// 본문(`{ "displayName": "Ana" }`)은 게스트일 때만 필요하므로 비워 둘 수 있습니다.
pub async fn leave_session(
    State(state): State<AppState>,
    user: MaybeAuthUser,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let req: LeaveSessionRequest = if body.is_empty() {
        LeaveSessionRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|_| AppError::Validation("Invalid request body".to_string()))?
    };
    let identity = Identity::new(user.user_id(), req.display_name);

    state.engine.leave(&id, &identity).await?;
    Ok(Json(json!({ "left": true })))
}

/// 세션 닫기 (호스트 전용, 어느 상태에서든). 게임 기록은 남지 않습니다.
pub async fn close_session(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    state.engine.close(&id, &user.user_id).await?;
    Ok(Json(json!({ "closed": true })))
}

/// 구독이 끝나면(클라이언트 연결 종료) 이벤트 버스에서 구독자를 지웁니다.
struct Subscription {
    events: EventBus,
    session_id: String,
    subscriber_id: usize,
    receiver: EventReceiver,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.events.unsubscribe(&self.session_id, self.subscriber_id);
    }
}

fn to_sse(event: &GameEvent) -> Event {
    Event::default()
        .event(event.kind())
        .json_data(event)
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to encode game event");
            Event::default().event("error")
        })
}

/// 세션 이벤트 스트림 (Server-Sent Events)
///
/// `GET /api/v1/sessions/{id}/events`
///
/// 각 이벤트는 `event: <종류>` + `data: <JSON>` 형태입니다.
/// 게임이 끝나면 `game-ended` 이후, 세션이 닫히거나 정리되면
/// `host-disconnected` 이후 스트림이 끝납니다.
pub async fn session_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let (subscriber_id, receiver) = state.engine.subscribe(&id)?;
    tracing::debug!(session_id = %id, subscriber_id, "event stream opened");

    let subscription = Subscription {
        events: state.engine.events().clone(),
        session_id: id,
        subscriber_id,
        receiver,
    };

    let stream = stream::unfold(subscription, |mut sub| async move {
        let event = sub.receiver.recv().await?;
        Some((Ok(to_sse(&event)), sub))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
