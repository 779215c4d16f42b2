//! # 게임 기록(History) 모델
//!
//! 게임이 끝나는 순간 한 번만 만들어지고 이후 절대 수정되지 않는 스냅샷입니다.
//! 라이브 세션과 독립된 복사본이므로 세션이 정리(TTL 만료)된 뒤에도 남습니다.
//!
//! - `HistoryRecord`: 기록 한 건 (`game_histories` 테이블 한 행)
//! - `PlayerResult`: 참가자 한 명의 최종 점수/순위/문제별 결과
//! - `AnswerDetail`: 문제 하나에 대한 결과 (답하지 않은 문제도 포함)
//! - `HistorySummary`: "내 게임" 목록의 한 줄 요약

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::answer::AnswerValue;

/// 문제 하나에 대한 참가자의 최종 결과
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerDetail {
    pub question_id: String,
    /// 문제 본문
    pub question: String,
    pub user_answer: Option<AnswerValue>,
    pub correct_answer: Option<AnswerValue>,
    pub is_correct: bool,
    /// 최종 답안이 없으면 `false` ("답 없음" 자리표시자)
    pub answered: bool,
    pub time_spent: Option<f64>,
}

/// 참가자 한 명의 최종 결과
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerResult {
    pub user_id: Option<String>,
    pub player_name: String,
    pub avatar: String,
    pub is_guest: bool,
    pub score: u32,
    /// 퀴즈 전체 만점
    pub total_points: u32,
    pub correct_count: usize,
    /// 1부터 시작하는 위치 기반 순위 (동점자도 순위를 공유하지 않음)
    pub rank: usize,
    pub answers: Vec<AnswerDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: String,
    pub host_id: String,
    pub quiz_id: String,
    pub quiz_title: String,
    #[serde(rename = "PIN")]
    pub pin: String,
    pub player_results: Vec<PlayerResult>,
    pub total_players: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl HistoryRecord {
    pub fn top_score(&self) -> u32 {
        self.player_results.first().map_or(0, |p| p.score)
    }

    /// 평균 점수 (반올림). 참가자가 없으면 0
    pub fn average_score(&self) -> u32 {
        if self.player_results.is_empty() {
            return 0;
        }
        let sum: u64 = self.player_results.iter().map(|p| u64::from(p.score)).sum();
        (sum as f64 / self.player_results.len() as f64).round() as u32
    }

    /// 진행 시간(분, 반올림). 시작 시각이 없으면 `None`
    pub fn duration_minutes(&self) -> Option<i64> {
        let started = self.started_at?;
        let seconds = (self.ended_at - started).num_seconds();
        Some((seconds as f64 / 60.0).round() as i64)
    }

    pub fn result_for(&self, user_id: &str) -> Option<&PlayerResult> {
        self.player_results
            .iter()
            .find(|p| p.user_id.as_deref() == Some(user_id))
    }
}

/// `game_histories` 테이블 한 행 — `player_results`는 JSON 문자열로 저장됩니다.
#[derive(Debug, sqlx::FromRow)]
pub struct HistoryRow {
    pub id: String,
    pub host_id: String,
    pub quiz_id: String,
    pub quiz_title: String,
    pub pin: String,
    pub player_results: String,
    pub total_players: i64,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl TryFrom<HistoryRow> for HistoryRecord {
    type Error = serde_json::Error;

    fn try_from(row: HistoryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            player_results: serde_json::from_str(&row.player_results)?,
            id: row.id,
            host_id: row.host_id,
            quiz_id: row.quiz_id,
            quiz_title: row.quiz_title,
            pin: row.pin,
            total_players: usize::try_from(row.total_players).unwrap_or(0),
            started_at: row.started_at,
            ended_at: row.ended_at,
            completed_at: row.completed_at,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizRef {
    pub id: String,
    pub title: String,
}

/// 게임 종료 응답/이벤트에 담기는 순위표
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedResults {
    pub players: Vec<PlayerResult>,
    pub quiz: QuizRef,
}

impl RankedResults {
    pub fn from_history(record: &HistoryRecord) -> Self {
        Self {
            players: record.player_results.clone(),
            quiz: QuizRef {
                id: record.quiz_id.clone(),
                title: record.quiz_title.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameResults {
    pub results: RankedResults,
    pub history_id: String,
}

/// 문제 진행 결과: 다음 문제로 넘어갔거나, 마지막 문제여서 게임이 끝났거나
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AdvanceOutcome {
    #[serde(rename_all = "camelCase")]
    Next {
        current_question_index: usize,
        total_questions: usize,
    },
    #[serde(rename_all = "camelCase")]
    Ended {
        game_ended: bool,
        results: RankedResults,
        history_id: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryRole {
    Host,
    Player,
}

/// "내 게임" 목록의 요약 한 줄
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySummary {
    pub id: String,
    pub quiz_title: String,
    #[serde(rename = "PIN")]
    pub pin: String,
    pub date: DateTime<Utc>,
    pub players: usize,
    pub top_score: u32,
    pub avg_score: u32,
    pub duration_minutes: Option<i64>,
    pub role: HistoryRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub your_rank: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub your_score: Option<u32>,
}

impl HistorySummary {
    pub fn for_host(record: &HistoryRecord) -> Self {
        Self::build(record, HistoryRole::Host, None)
    }

    pub fn for_player(record: &HistoryRecord, user_id: &str) -> Self {
        Self::build(record, HistoryRole::Player, record.result_for(user_id))
    }

    fn build(record: &HistoryRecord, role: HistoryRole, mine: Option<&PlayerResult>) -> Self {
        Self {
            id: record.id.clone(),
            quiz_title: record.quiz_title.clone(),
            pin: record.pin.clone(),
            date: record.completed_at,
            players: record.total_players,
            top_score: record.top_score(),
            avg_score: record.average_score(),
            duration_minutes: record.duration_minutes(),
            role,
            your_rank: mine.map(|p| p.rank),
            your_score: mine.map(|p| p.score),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyHistory {
    pub history: Vec<HistorySummary>,
    pub total_games: usize,
    pub player_games: usize,
    pub host_games: usize,
}
