//! # 헬스체크(Health Check) 핸들러
//!
//! ## 엔드포인트
//! - `GET /api/v1/health` → `{ "status": "ok", "activeSessions": 3 }`
//!
//! 로드밸런서/컨테이너 헬스체크용입니다. DB에 의존하지 않으므로
//! 저장소 장애 중에도 프로세스 생존 여부를 알려줍니다.

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::AppState;

/// `GET /health` — 서버 상태와 메모리에 있는 세션 수
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "activeSessions": state.engine.active_sessions(),
    }))
}
