//! # 라이브 게임 세션 모델 정의
//!
//! 진행 중인 게임 한 판의 가변 상태를 표현하는 구조체들입니다.
//!
//! ## 세션 흐름
//! ```text
//! waiting ──start──▶ running ──advance(마지막 문제)/end──▶ ended
//! ```
//! - `waiting`: 호스트가 세션을 만들고 플레이어가 PIN으로 참가하는 대기실
//! - `running`: 문제 진행 중. 답안 임시저장/제출 가능
//! - `ended`: 종료. 순위가 확정되고 게임 기록(HistoryRecord)이 저장됨
//!
//! 세션은 참가자 목록과 그 답안 기록을 **독점 소유**합니다.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::answer::AnswerValue;
use super::quiz::Quiz;

/// 세션 상태 — 앞으로만 이동하며 단계를 건너뛰지 않습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Waiting,
    Running,
    Ended,
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::Waiting => "waiting",
            GameStatus::Running => "running",
            GameStatus::Ended => "ended",
        }
    }
}

/// 참가자 아바타 — 단순 문자열(이모지) 또는 이모지+색상+이름 객체
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Avatar {
    Detailed {
        emoji: String,
        #[serde(default)]
        color: Option<String>,
        #[serde(default)]
        name: Option<String>,
    },
    Plain(String),
}

pub const DEFAULT_AVATAR: &str = "👤";

impl Default for Avatar {
    fn default() -> Self {
        Avatar::Plain(DEFAULT_AVATAR.to_string())
    }
}

impl Avatar {
    /// 빈 이모지/문자열은 기본 아바타로 바꿉니다.
    pub fn normalized(self) -> Self {
        match self {
            Avatar::Detailed { emoji, color, name } => Avatar::Detailed {
                emoji: if emoji.trim().is_empty() {
                    DEFAULT_AVATAR.to_string()
                } else {
                    emoji
                },
                color,
                name,
            },
            Avatar::Plain(s) if s.trim().is_empty() => Avatar::default(),
            plain => plain,
        }
    }

    /// 기록과 순위표에 표시할 이모지
    pub fn display(&self) -> &str {
        match self {
            Avatar::Detailed { emoji, .. } => emoji,
            Avatar::Plain(s) => s,
        }
    }
}

/// 요청자의 신원 — 로그인 사용자 ID(있으면 우선)와 게스트 조회용 표시 이름
#[derive(Debug, Clone, Default)]
pub struct Identity {
    pub user_id: Option<String>,
    pub display_name: Option<String>,
}

impl Identity {
    pub fn new(user_id: Option<String>, display_name: Option<String>) -> Self {
        Self {
            user_id,
            display_name: display_name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
        }
    }
}

/// (참가자, 문제) 쌍마다 최대 하나 존재하는 답안 기록
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    pub question_id: String,
    pub answer: Option<AnswerValue>,
    /// 임시저장 상태에서는 `None` — 최종 제출(또는 자동 확정) 때 채점됩니다.
    pub is_correct: Option<bool>,
    /// 이 답안으로 얻은 점수 (임시저장이면 0)
    pub points_awarded: u32,
    /// 최종 제출 시각 — 임시저장이면 `None`
    pub answered_at: Option<DateTime<Utc>>,
    /// 답하는 데 걸린 시간(초)
    pub time_spent: Option<f64>,
    /// `true`: 임시저장(draft), `false`: 최종 제출
    pub auto_saved: bool,
}

impl AnswerRecord {
    pub fn is_final(&self) -> bool {
        !self.auto_saved
    }
}

/// 참가자 한 명
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    /// 로그인 사용자면 Some, 게스트면 None
    pub user_id: Option<String>,
    pub player_name: String,
    pub avatar: Avatar,
    pub is_guest: bool,
    /// 세션 동안 줄어들지 않는 누적 점수
    pub score: u32,
    pub joined_at: DateTime<Utc>,
    /// 제출 순서대로 정렬된 답안 기록
    answers: Vec<AnswerRecord>,
    /// 문제별 시작 시각 — 새로고침/재접속 후 타이머 복구용
    question_started_at: HashMap<String, DateTime<Utc>>,
    /// question_id → answers 인덱스. 중복 기록을 막는 O(1) 조회용
    #[serde(skip)]
    answer_index: HashMap<String, usize>,
}

impl Participant {
    pub fn new(
        user_id: Option<String>,
        player_name: String,
        avatar: Avatar,
        joined_at: DateTime<Utc>,
    ) -> Self {
        Self {
            is_guest: user_id.is_none(),
            user_id,
            player_name,
            avatar,
            score: 0,
            joined_at,
            answers: Vec::new(),
            question_started_at: HashMap::new(),
            answer_index: HashMap::new(),
        }
    }

    pub fn answers(&self) -> &[AnswerRecord] {
        &self.answers
    }

    pub fn answer(&self, question_id: &str) -> Option<&AnswerRecord> {
        self.answer_index
            .get(question_id)
            .and_then(|&idx| self.answers.get(idx))
    }

    pub fn answer_mut(&mut self, question_id: &str) -> Option<&mut AnswerRecord> {
        match self.answer_index.get(question_id) {
            Some(&idx) => self.answers.get_mut(idx),
            None => None,
        }
    }

    /// 같은 문제의 기록이 있으면 교체하고, 없으면 뒤에 추가합니다.
    pub fn upsert_answer(&mut self, record: AnswerRecord) {
        match self.answer_index.get(&record.question_id) {
            Some(&idx) => self.answers[idx] = record,
            None => {
                self.answer_index
                    .insert(record.question_id.clone(), self.answers.len());
                self.answers.push(record);
            }
        }
    }

    /// 점수는 더하기만 합니다 (감소 없음).
    pub fn award(&mut self, points: u32) {
        self.score = self.score.saturating_add(points);
    }

    pub fn question_started_at(&self, question_id: &str) -> Option<DateTime<Utc>> {
        self.question_started_at.get(question_id).copied()
    }

    /// 처음 건드린 문제의 시작 시각만 기록합니다. 이미 있으면 유지합니다.
    pub fn mark_question_started(&mut self, question_id: &str, at: DateTime<Utc>) {
        self.question_started_at
            .entry(question_id.to_string())
            .or_insert(at);
    }

    pub fn clear_question_started(&mut self, question_id: &str) {
        self.question_started_at.remove(question_id);
    }

    pub fn matches_name(&self, name: &str) -> bool {
        self.player_name.to_lowercase() == name.trim().to_lowercase()
    }
}

/// 라이브 게임 세션
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveSession {
    pub id: String,
    /// 세션 생성 시점의 퀴즈 스냅샷
    pub quiz: Quiz,
    pub host_id: String,
    #[serde(rename = "PIN")]
    pub pin: String,
    pub status: GameStatus,
    /// 0부터 시작하는 현재 문제 번호
    pub current_question_index: usize,
    pub question_started_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub max_players: usize,
    pub participants: Vec<Participant>,
    pub created_at: DateTime<Utc>,
    /// TTL 판정 기준 — 상태를 바꾸는 모든 작업이 갱신합니다.
    pub last_activity_at: DateTime<Utc>,
    /// 종료 후 저장된 게임 기록 ID
    pub history_id: Option<String>,
}

impl LiveSession {
    pub fn new(
        id: String,
        quiz: Quiz,
        host_id: String,
        pin: String,
        max_players: usize,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            quiz,
            host_id,
            pin,
            status: GameStatus::Waiting,
            current_question_index: 0,
            question_started_at: None,
            started_at: None,
            ended_at: None,
            max_players,
            participants: Vec::new(),
            created_at: now,
            last_activity_at: now,
            history_id: None,
        }
    }

    pub fn total_questions(&self) -> usize {
        self.quiz.questions.len()
    }

    pub fn is_last_question(&self) -> bool {
        self.current_question_index + 1 >= self.total_questions()
    }

    pub fn is_host(&self, user_id: &str) -> bool {
        self.host_id == user_id
    }

    /// 참가자 찾기: 로그인 ID가 우선이고, 없으면 표시 이름(대소문자 무시)으로 찾습니다.
    pub fn find_participant(&self, identity: &Identity) -> Option<usize> {
        if let Some(user_id) = identity.user_id.as_deref() {
            if let Some(idx) = self
                .participants
                .iter()
                .position(|p| p.user_id.as_deref() == Some(user_id))
            {
                return Some(idx);
            }
        }

        let name = identity.display_name.as_deref()?;
        self.participants.iter().position(|p| p.matches_name(name))
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity_at = now;
    }
}

// ── 요청 본문 ──

/// `POST /api/v1/sessions`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub quiz_id: Option<String>,
    /// 참가 인원 상한 (없으면 서버 기본값)
    pub max_players: Option<usize>,
}

/// `POST /api/v1/sessions/join`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinSessionRequest {
    #[serde(rename = "PIN", alias = "pin")]
    pub pin: Option<String>,
    pub display_name: Option<String>,
    pub avatar: Option<Avatar>,
}

/// `POST /api/v1/sessions/:id/save-draft`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveDraftRequest {
    pub question_id: Option<String>,
    #[serde(default)]
    pub value: Option<AnswerValue>,
    pub display_name: Option<String>,
}

/// `POST /api/v1/sessions/:id/submit`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerRequest {
    pub question_id: Option<String>,
    #[serde(default)]
    pub value: Option<AnswerValue>,
    pub time_spent: Option<f64>,
    pub display_name: Option<String>,
}

/// `POST /api/v1/sessions/:id/leave`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveSessionRequest {
    pub display_name: Option<String>,
}

// ── 응답 본문 ──

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedSession {
    pub session_id: String,
    #[serde(rename = "PIN")]
    pub pin: String,
    pub quiz_title: String,
    pub total_questions: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinedSession {
    pub session_id: String,
    #[serde(rename = "PIN")]
    pub pin: String,
    pub total_players: usize,
    pub status: GameStatus,
    pub is_guest: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSaved {
    pub saved: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOutcome {
    pub is_correct: bool,
    pub points_awarded: u32,
    pub current_score: u32,
    pub time_spent: Option<f64>,
    /// 이미 최종 제출한 문제를 다시 제출한 경우 `true` (재채점하지 않음)
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub already_answered: bool,
}
