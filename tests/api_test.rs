mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
};
use common::{spawn_app, token_for, HOST_ID, QUIZ_ID};
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn full_game_is_scored_ranked_and_archived() {
    let app = spawn_app().await;
    let host = token_for(HOST_ID);
    let player = token_for("player-carla");
    let (session_id, pin) = app.create_session().await;

    // 게스트 두 명 + 로그인 사용자 한 명
    for name in ["Ana", "Budi"] {
        let (status, body) = app
            .post("/api/v1/sessions/join", None, json!({ "PIN": pin, "displayName": name }))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["isGuest"], true);
    }
    let (status, body) = app
        .post(
            "/api/v1/sessions/join",
            Some(&player),
            json!({ "pin": pin, "displayName": "Carla", "avatar": { "emoji": "🦊", "color": "#f80" } }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["isGuest"], false);
    assert_eq!(body["totalPlayers"], 3);
    assert_eq!(body["status"], "waiting");

    let (status, body) = app
        .post(&format!("/api/v1/sessions/{session_id}/start"), Some(&host), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["session"]["id"], session_id.as_str());
    assert_eq!(body["session"]["status"], "running");
    assert_eq!(body["session"]["currentQuestionIndex"], 0);
    assert_eq!(body["session"]["participants"].as_array().unwrap().len(), 3);
    assert!(body["session"]["questionStartedAt"].is_string());

    let submit = format!("/api/v1/sessions/{session_id}/submit");
    let (status, body) = app
        .post(&submit, None, json!({ "questionId": "q1", "value": "paris", "displayName": "Ana", "timeSpent": 2.5 }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["isCorrect"], true);
    assert_eq!(body["pointsAwarded"], 10);
    assert_eq!(body["currentScore"], 10);
    assert!(body.get("alreadyAnswered").is_none());

    // 재시도는 점수를 두 번 주지 않습니다.
    let (status, body) = app
        .post(&submit, None, json!({ "questionId": "q1", "value": "paris", "displayName": "ana" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["alreadyAnswered"], true);
    assert_eq!(body["currentScore"], 10);

    let (status, _) = app
        .post(&submit, Some(&player), json!({ "questionId": "q1", "value": "Rome" }))
        .await;
    assert_eq!(status, StatusCode::OK);

    // Budi는 임시저장만 하고 호스트가 넘깁니다.
    let (status, body) = app
        .post(
            &format!("/api/v1/sessions/{session_id}/save-draft"),
            None,
            json!({ "questionId": "q1", "value": "Paris", "displayName": "Budi" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["saved"], true);

    let advance = format!("/api/v1/sessions/{session_id}/advance");
    let (status, body) = app.post(&advance, Some(&host), json!({})).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["currentQuestionIndex"], 1);
    assert_eq!(body["totalQuestions"], 3);

    let (status, _) = app
        .post(&submit, Some(&player), json!({ "questionId": "q2", "value": "benar" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.post(&advance, Some(&host), json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post(&submit, Some(&player), json!({ "questionId": "q3", "value": " danube " }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.post(&advance, Some(&host), json!({})).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["gameEnded"], true);
    let players = body["results"]["players"].as_array().unwrap();
    let ranking: Vec<(&str, u64, u64)> = players
        .iter()
        .map(|p| {
            (
                p["playerName"].as_str().unwrap(),
                p["score"].as_u64().unwrap(),
                p["rank"].as_u64().unwrap(),
            )
        })
        .collect();
    assert_eq!(ranking, vec![("Carla", 20, 1), ("Ana", 10, 2), ("Budi", 10, 3)]);
    let history_id = body["historyId"].as_str().unwrap().to_string();

    let (status, body) = app.post(&advance, Some(&host), json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "invalid_state");

    let (status, record) = app.get(&format!("/api/v1/history/{history_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["PIN"], pin.as_str());
    assert_eq!(record["totalPlayers"], 3);
    for result in record["playerResults"].as_array().unwrap() {
        assert_eq!(result["answers"].as_array().unwrap().len(), 3);
        assert_eq!(result["totalPoints"], 30);
    }
    assert_eq!(record["playerResults"][0]["avatar"], "🦊");

    let (status, mine) = app.get("/api/v1/history/me", Some(&player)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine["totalGames"], 1);
    assert_eq!(mine["playerGames"], 1);
    assert_eq!(mine["history"][0]["role"], "player");
    assert_eq!(mine["history"][0]["yourRank"], 1);
    assert_eq!(mine["history"][0]["yourScore"], 20);

    let (status, hosted) = app.get("/api/v1/history/me", Some(&host)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hosted["hostGames"], 1);
    assert_eq!(hosted["history"][0]["role"], "host");
    assert_eq!(hosted["history"][0]["topScore"], 20);
    assert_eq!(hosted["history"][0]["avgScore"], 13);
}

#[tokio::test]
async fn session_routes_require_identity_and_ownership() {
    let app = spawn_app().await;

    let (status, body) = app
        .post("/api/v1/sessions", None, json!({ "quizId": QUIZ_ID }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "missing_token");

    let (status, _) = app
        .post("/api/v1/sessions", Some("not-a-jwt"), json!({ "quizId": QUIZ_ID }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let stranger = token_for("stranger");
    let (status, body) = app
        .post("/api/v1/sessions", Some(&stranger), json!({ "quizId": QUIZ_ID }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "forbidden");

    let (status, body) = app.post("/api/v1/sessions", Some(&stranger), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");

    let (status, body) = app
        .post("/api/v1/sessions", Some(&stranger), json!({ "quizId": "nope" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");

    let (session_id, _) = app.create_session().await;
    let (status, _) = app
        .post(&format!("/api/v1/sessions/{session_id}/start"), Some(&stranger), json!({}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn join_enforces_lobby_rules() {
    let app = spawn_app().await;
    let (session_id, pin) = app.create_session().await;
    let join = |name: &'static str| json!({ "PIN": pin, "displayName": name });

    let (status, body) = app
        .post("/api/v1/sessions/join", None, json!({ "PIN": "999999x", "displayName": "Ana" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "session not found");

    let (status, _) = app
        .post("/api/v1/sessions/join", None, json!({ "PIN": pin, "displayName": "  " }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for name in ["Ana", "Budi"] {
        let (status, _) = app.post("/api/v1/sessions/join", None, join(name)).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) = app.post("/api/v1/sessions/join", None, join("ANA")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "duplicate_participant");

    let (status, _) = app.post("/api/v1/sessions/join", None, join("Citra")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app.post("/api/v1/sessions/join", None, join("Dewi")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "full");

    // 대기실에서는 나갈 수 있고, 자리가 비면 다시 참가할 수 있습니다.
    let (status, _) = app
        .post(
            &format!("/api/v1/sessions/{session_id}/leave"),
            None,
            json!({ "displayName": "Citra" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.post("/api/v1/sessions/join", None, join("Dewi")).await;
    assert_eq!(status, StatusCode::OK);

    let host = token_for(HOST_ID);
    app.post(&format!("/api/v1/sessions/{session_id}/start"), Some(&host), json!({}))
        .await;
    let (status, body) = app.post("/api/v1/sessions/join", None, join("Eka")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "already_started");
}

#[tokio::test]
async fn accounts_with_the_same_name_can_both_join() {
    let app = spawn_app().await;
    let (session_id, pin) = app.create_session().await;

    for user in ["budi-1", "budi-2"] {
        let (status, body) = app
            .post(
                "/api/v1/sessions/join",
                Some(&token_for(user)),
                json!({ "PIN": pin, "displayName": "Budi" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["isGuest"], false);
    }

    let (status, body) = app
        .post("/api/v1/sessions/join", None, json!({ "PIN": pin, "displayName": "budi" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "duplicate_participant");

    let (_, body) = app.get(&format!("/api/v1/sessions/{session_id}"), None).await;
    let participants = body["session"]["participants"].as_array().unwrap();
    assert_eq!(participants.len(), 2);
    assert_eq!(participants[1]["userId"], "budi-2");
}

#[tokio::test]
async fn malformed_bodies_use_the_error_envelope() {
    let app = spawn_app().await;
    let (session_id, pin) = app.create_session().await;

    let raw = |uri: &str, content_type: &str, body: &'static str| {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap()
    };

    for req in [
        raw("/api/v1/sessions/join", "application/json", "{\"PIN\": "),
        raw("/api/v1/sessions/join", "application/json", "{\"PIN\": 12, \"displayName\": [1]}"),
        raw("/api/v1/sessions/join", "text/plain", "PIN=123456"),
    ] {
        let resp = app.router.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "validation_error");
        assert!(body["error"]["message"].is_string());
    }

    // 배열 안의 null은 빈 답안 원소로 채점됩니다.
    app.post("/api/v1/sessions/join", None, json!({ "PIN": pin, "displayName": "Ana" }))
        .await;
    app.post(
        &format!("/api/v1/sessions/{session_id}/start"),
        Some(&token_for(HOST_ID)),
        json!({}),
    )
    .await;
    let (status, body) = app
        .post(
            &format!("/api/v1/sessions/{session_id}/submit"),
            None,
            json!({ "questionId": "q1", "value": ["Paris", null], "displayName": "Ana" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["isCorrect"], false);
    assert_eq!(body["currentScore"], 0);
}

#[tokio::test]
async fn answers_are_rejected_outside_a_running_game() {
    let app = spawn_app().await;
    let host = token_for(HOST_ID);
    let (session_id, pin) = app.create_session().await;
    app.post("/api/v1/sessions/join", None, json!({ "PIN": pin, "displayName": "Ana" }))
        .await;

    let submit = format!("/api/v1/sessions/{session_id}/submit");
    let (status, body) = app
        .post(&submit, None, json!({ "questionId": "q1", "value": "Paris", "displayName": "Ana" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "invalid_state");

    app.post(&format!("/api/v1/sessions/{session_id}/start"), Some(&host), json!({}))
        .await;

    let (status, body) = app
        .post(&submit, None, json!({ "questionId": "q1", "value": "Paris", "displayName": "Zed" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "not_in_game");

    let (status, _) = app
        .post(&submit, None, json!({ "value": "Paris", "displayName": "Ana" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post(&submit, None, json!({ "questionId": "q42", "value": "Paris", "displayName": "Ana" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "question not found");

    let (status, body) = app
        .post(&format!("/api/v1/sessions/{session_id}/end"), Some(&host), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["historyId"].is_string());

    let (status, body) = app
        .post(&format!("/api/v1/sessions/{session_id}/end"), Some(&host), json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "invalid_state");

    let (status, body) = app.get(&format!("/api/v1/sessions/{session_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session"]["status"], "ended");
}

#[tokio::test]
async fn host_can_close_a_session() {
    let app = spawn_app().await;
    let host = token_for(HOST_ID);
    let (session_id, pin) = app.create_session().await;

    let (status, _) = app
        .call(Method::DELETE, &format!("/api/v1/sessions/{session_id}"), Some(&token_for("x")), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .call(Method::DELETE, &format!("/api/v1/sessions/{session_id}"), Some(&host), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["closed"], true);

    let (status, _) = app.get(&format!("/api/v1/sessions/{session_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .post("/api/v1/sessions/join", None, json!({ "PIN": pin, "displayName": "Ana" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn event_stream_is_served_as_sse() {
    let app = spawn_app().await;
    let (session_id, _) = app.create_session().await;

    let (status, _) = app.get("/api/v1/sessions/missing/events", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let req = Request::builder()
        .uri(format!("/api/v1/sessions/{session_id}/events"))
        .body(Body::empty())
        .unwrap();
    let resp = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );
    assert_eq!(app.state.engine.events().subscriber_count(&session_id), 1);

    drop(resp);
    assert_eq!(app.state.engine.events().subscriber_count(&session_id), 0);
}

#[tokio::test]
async fn health_reports_active_sessions() {
    let app = spawn_app().await;
    app.create_session().await;

    let (status, body) = app.get("/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["activeSessions"], 1);
}

#[tokio::test]
async fn unknown_history_is_not_found() {
    let app = spawn_app().await;
    let (status, body) = app.get("/api/v1/history/does-not-exist", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "history not found");

    let (status, _) = app.get("/api/v1/history/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
