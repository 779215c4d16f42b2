#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use quizrush::{
    db,
    middleware::auth::create_access_token,
    models::{AnswerValue, Question, QuestionType, Quiz},
    router,
    services::game::GameSettings,
    AppState,
};
use serde_json::Value;
use tower::ServiceExt;

pub const SECRET: &str = "test-secret";
pub const HOST_ID: &str = "host-user";
pub const QUIZ_ID: &str = "quiz-geo";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

fn question(
    id: &str,
    question_type: QuestionType,
    options: &[&str],
    correct: AnswerValue,
    points: u32,
) -> Question {
    Question {
        id: id.to_string(),
        question: format!("Question {id}"),
        question_type,
        options: options.iter().map(|o| o.to_string()).collect(),
        correct_answer: Some(correct),
        accepted_answers: Vec::new(),
        explanation: None,
        points,
        time_limit: 20,
    }
}

/// 세 문제짜리 퀴즈: 단일 선택(10점), 참/거짓(5점), 단답(15점)
pub fn geography_quiz() -> Quiz {
    Quiz {
        id: QUIZ_ID.to_string(),
        title: "Geography".to_string(),
        description: "Capitals and rivers".to_string(),
        created_by: HOST_ID.to_string(),
        questions: vec![
            question(
                "q1",
                QuestionType::SingleChoice,
                &["Berlin", "Paris", "Rome"],
                AnswerValue::Scalar(1u64.into()),
                10,
            ),
            question("q2", QuestionType::TrueFalse, &[], AnswerValue::Scalar(true.into()), 5),
            question("q3", QuestionType::ShortAnswer, &[], AnswerValue::text("Danube"), 15),
        ],
    }
}

pub async fn spawn_app() -> TestApp {
    let pool = db::connect("sqlite::memory:", 1)
        .await
        .expect("in-memory database should open");
    db::insert_quiz(&pool, &geography_quiz())
        .await
        .expect("seed quiz");

    let settings = GameSettings {
        default_max_players: 3,
        ..GameSettings::default()
    };
    let state = AppState::new(pool, SECRET.to_string(), settings);

    TestApp {
        router: router(state.clone()),
        state,
    }
}

pub fn token_for(user_id: &str) -> String {
    create_access_token(user_id, SECRET).expect("token should sign")
}

impl TestApp {
    /// 요청을 보내고 (상태 코드, JSON 본문)을 돌려줍니다. 본문이 비어 있으면 `Value::Null`
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                req = req.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let resp = self
            .router
            .clone()
            .oneshot(req.body(body).expect("request build should succeed"))
            .await
            .expect("router should respond");

        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("body should read");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("body should be JSON")
        };
        (status, json)
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, token, Some(body)).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.call(Method::GET, uri, token, None).await
    }

    /// 호스트 토큰으로 세션을 만들고 (sessionId, PIN)을 돌려줍니다.
    pub async fn create_session(&self) -> (String, String) {
        let host = token_for(HOST_ID);
        let (status, body) = self
            .post(
                "/api/v1/sessions",
                Some(&host),
                serde_json::json!({ "quizId": QUIZ_ID }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "create failed: {body}");
        (
            body["sessionId"].as_str().unwrap().to_string(),
            body["PIN"].as_str().unwrap().to_string(),
        )
    }
}
