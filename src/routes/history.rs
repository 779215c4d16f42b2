//! # 게임 기록 API 라우트 핸들러
//!
//! ## 엔드포인트 목록
//! | 메서드 | 경로 | 핸들러 | 설명 |
//! |--------|------|--------|------|
//! | GET | /api/v1/history/me | `my_history` | 내가 호스트/참가한 게임 요약 (인증 필수) |
//! | GET | /api/v1/history/{id} | `get_history` | 게임 기록 한 건 |

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{db, error::AppError, middleware::auth::AuthUser, models::*, AppState};

/// `GET /api/v1/history/{id}` → 저장된 `HistoryRecord`
pub async fn get_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<HistoryRecord>, AppError> {
    let record = db::get_history(&state.pool, &id)
        .await?
        .ok_or(AppError::NotFound("history"))?;
    Ok(Json(record))
}

/// "내 게임" 목록
///
/// `GET /api/v1/history/me`
/// → `{ "history": [...], "totalGames", "playerGames", "hostGames" }`
///
/// 호스트로 진행한 게임과 로그인 상태로 참가한 게임을 합쳐 최신순으로 돌려줍니다.
pub async fn my_history(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<MyHistory>, AppError> {
    let hosted = db::list_histories_for_host(&state.pool, &user.user_id).await?;
    let played = db::list_histories_for_participant(&state.pool, &user.user_id).await?;

    let mut history: Vec<HistorySummary> = hosted
        .iter()
        .map(HistorySummary::for_host)
        .chain(
            played
                .iter()
                .map(|record| HistorySummary::for_player(record, &user.user_id)),
        )
        .collect();
    history.sort_by(|a, b| b.date.cmp(&a.date));

    Ok(Json(MyHistory {
        total_games: history.len(),
        player_games: played.len(),
        host_games: hosted.len(),
        history,
    }))
}
