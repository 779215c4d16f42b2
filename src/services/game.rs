//! # 게임 세션 엔진
//!
//! 라이브 게임의 상태 기계(state machine)입니다. 모든 전이는 이 모듈을 거칩니다.
//!
//! ```text
//!            create            start              advance(마지막) / end
//!   (없음) ─────────▶ waiting ───────▶ running ──────────────────────▶ ended
//!                       │  ▲              │ ▲
//!                  join/leave          save-draft / submit / advance
//! ```
//!
//! ## 동작 원칙
//! - 같은 세션을 바꾸는 작업(join, start, save-draft, submit, advance, end, leave)은
//!   세션별 잠금으로 직렬화됩니다. 다른 세션끼리는 서로 기다리지 않습니다.
//!   잠금을 얻은 뒤에는 세션이 아직 저장소에 있는지 다시 확인합니다.
//! - 카탈로그 조회(create)와 퀴즈 공개 여부 변경은 세션 잠금 밖에서 수행합니다.
//! - 종료(end) 시에는 게임 기록 저장이 성공한 뒤에만 메모리 상태를 `ended`로
//!   바꿉니다. 저장이 실패하면 세션은 그대로이므로 재시도할 수 있고,
//!   "기록 없이 끝난 세션"은 생기지 않습니다.
//! - 임시저장 답안은 최종 확정되기 전까지 점수에 반영되지 않습니다.
//! - 이미 최종 제출한 문제를 다시 제출하면 저장된 결과를 그대로 돌려줍니다.
//! - 성공한 전이마다 `GameEvent`를 이벤트 버스로 발행합니다. 게임이 끝나면 구독을 닫습니다.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use tokio::sync::MutexGuard;

use crate::db;
use crate::error::AppError;
use crate::models::*;
use crate::services::evaluator::{evaluate, points_for};
use crate::services::events::{EventBus, EventReceiver, GameEvent};
use crate::services::pin::generate_pin;
use crate::services::session_store::{SessionHandle, SessionStore};

/// 엔진 동작 설정
#[derive(Debug, Clone)]
pub struct GameSettings {
    /// 세션 생성 요청에 값이 없을 때 쓰는 참가 인원 상한
    pub default_max_players: usize,
    /// 이 시간 동안 활동이 없는 세션은 정리됩니다.
    pub session_ttl: Duration,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            default_max_players: 50,
            session_ttl: Duration::hours(24),
        }
    }
}

/// 답안 제출 요청의 내용
#[derive(Debug, Clone)]
pub struct Submission {
    pub question_id: String,
    pub value: Option<AnswerValue>,
    pub time_spent: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct GameEngine {
    pool: SqlitePool,
    store: Arc<dyn SessionStore>,
    events: EventBus,
    settings: GameSettings,
}

impl GameEngine {
    pub fn new(
        pool: SqlitePool,
        store: Arc<dyn SessionStore>,
        events: EventBus,
        settings: GameSettings,
    ) -> Self {
        Self {
            pool,
            store,
            events,
            settings,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// 메모리에 있는 세션 수 (종료됐지만 아직 정리되지 않은 세션 포함)
    pub fn active_sessions(&self) -> usize {
        self.store.len()
    }

    fn session(&self, session_id: &str) -> Result<SessionHandle, AppError> {
        self.store.get(session_id).ok_or(AppError::NotFound("session"))
    }

    /// 세션 잠금을 잡은 뒤, 그 사이 저장소에서 빠지지 않았는지 다시 확인합니다.
    /// 정리(sweep)나 닫기로 제거된 세션은 `NotFound`입니다.
    async fn lock_live<'a>(
        &self,
        handle: &'a SessionHandle,
    ) -> Result<MutexGuard<'a, LiveSession>, AppError> {
        let session = handle.lock().await;
        let listed = self
            .store
            .get(&session.id)
            .is_some_and(|current| Arc::ptr_eq(&current, handle));
        if !listed {
            tracing::debug!(session_id = %session.id, "session was removed while waiting for its lock");
            return Err(AppError::NotFound("session"));
        }
        Ok(session)
    }

    /// 세션 생성: 호스트가 소유한 퀴즈로 `waiting` 상태의 세션을 만들고 PIN을 배정합니다.
    pub async fn create_session(
        &self,
        quiz_id: &str,
        host_id: &str,
        max_players: Option<usize>,
    ) -> Result<CreatedSession, AppError> {
        if quiz_id.trim().is_empty() {
            return Err(AppError::Validation("Please provide quiz ID".to_string()));
        }
        let max_players = max_players.unwrap_or(self.settings.default_max_players);
        if max_players == 0 {
            return Err(AppError::Validation(
                "maxPlayers must be at least 1".to_string(),
            ));
        }

        // 카탈로그 조회는 어떤 세션 잠금도 잡지 않은 상태에서 수행합니다.
        let quiz = db::get_quiz(&self.pool, quiz_id)
            .await?
            .ok_or(AppError::NotFound("quiz"))?;

        if quiz.created_by != host_id {
            return Err(AppError::Forbidden(
                "Not authorized to host this quiz".to_string(),
            ));
        }
        if quiz.questions.is_empty() {
            return Err(AppError::Validation("Quiz has no questions".to_string()));
        }

        let now = Utc::now();
        let session_id = uuid::Uuid::now_v7().to_string();
        let created = CreatedSession {
            session_id: session_id.clone(),
            pin: String::new(),
            quiz_title: quiz.title.clone(),
            total_questions: quiz.questions.len(),
        };

        let session = LiveSession::new(
            session_id,
            quiz,
            host_id.to_string(),
            String::new(),
            max_players,
            now,
        );
        let handle = self.store.insert(session, &mut generate_pin);
        let pin = handle.lock().await.pin.clone();

        self.set_quiz_visibility(quiz_id, false).await;

        tracing::info!(session_id = %created.session_id, %pin, quiz_id, "live session created");
        Ok(CreatedSession { pin, ..created })
    }

    /// PIN으로 대기 중인 세션에 참가합니다. 로그인 사용자와 게스트 모두 허용합니다.
    pub async fn join(
        &self,
        pin: &str,
        display_name: &str,
        avatar: Option<Avatar>,
        user_id: Option<String>,
    ) -> Result<JoinedSession, AppError> {
        let display_name = display_name.trim();
        if pin.trim().is_empty() || display_name.is_empty() {
            return Err(AppError::Validation(
                "Please provide PIN and display name".to_string(),
            ));
        }

        let handle = self
            .store
            .find_by_pin(pin)
            .ok_or(AppError::NotFound("session"))?;
        let mut session = self.lock_live(&handle).await?;

        match session.status {
            GameStatus::Waiting => {}
            GameStatus::Running => return Err(AppError::AlreadyStarted),
            GameStatus::Ended => return Err(AppError::AlreadyEnded),
        }

        // 게스트는 이름으로 찾으므로, 게스트가 끼는 경우에만 이름이 겹치면 안 됩니다.
        // 로그인 사용자끼리는 같은 표시 이름을 써도 됩니다.
        let duplicate = session.participants.iter().any(|p| match user_id.as_deref() {
            Some(uid) => {
                p.user_id.as_deref() == Some(uid) || (p.is_guest && p.matches_name(display_name))
            }
            None => p.matches_name(display_name),
        });
        if duplicate {
            return Err(AppError::DuplicateParticipant);
        }

        if session.participants.len() >= session.max_players {
            return Err(AppError::Full);
        }

        let now = Utc::now();
        let participant = Participant::new(
            user_id,
            display_name.to_string(),
            avatar.unwrap_or_default().normalized(),
            now,
        );
        let is_guest = participant.is_guest;
        session.participants.push(participant);
        session.touch(now);

        let total_players = session.participants.len();
        tracing::info!(session_id = %session.id, player = display_name, total_players, "player joined");
        self.events.publish(
            &session.id,
            GameEvent::ParticipantJoined {
                name: display_name.to_string(),
                total_players,
            },
        );

        Ok(JoinedSession {
            session_id: session.id.clone(),
            pin: session.pin.clone(),
            total_players,
            status: session.status,
            is_guest,
        })
    }

    /// 세션 전체 상태(퀴즈, 문제, 참가자 포함)의 복사본
    pub async fn snapshot(&self, session_id: &str) -> Result<LiveSession, AppError> {
        let handle = self.session(session_id)?;
        let session = self.lock_live(&handle).await?;
        Ok(session.clone())
    }

    /// 게임 시작 (호스트 전용): waiting → running
    pub async fn start(&self, session_id: &str, host_id: &str) -> Result<LiveSession, AppError> {
        let handle = self.session(session_id)?;
        let mut session = self.lock_live(&handle).await?;

        ensure_host(&session, host_id)?;
        match session.status {
            GameStatus::Waiting => {}
            GameStatus::Running => {
                return Err(AppError::InvalidState("Game already started".to_string()))
            }
            GameStatus::Ended => {
                return Err(AppError::InvalidState("Game has already ended".to_string()))
            }
        }

        let now = Utc::now();
        session.status = GameStatus::Running;
        session.started_at = Some(now);
        session.question_started_at = Some(now);
        session.current_question_index = 0;
        session.touch(now);

        tracing::info!(session_id, players = session.participants.len(), "game started");
        self.events.publish(session_id, GameEvent::GameStarted);

        Ok(session.clone())
    }

    /// 답안 임시저장: 점수에 영향 없이 답안을 보관합니다.
    ///
    /// 최종 제출된 답안은 덮어쓰지 않으며, 이때 `saved: false`를 돌려줍니다.
    pub async fn save_draft(
        &self,
        session_id: &str,
        identity: &Identity,
        question_id: &str,
        value: Option<AnswerValue>,
    ) -> Result<DraftSaved, AppError> {
        require_question_id(question_id)?;

        let handle = self.session(session_id)?;
        let mut session = self.lock_live(&handle).await?;

        ensure_running(&session)?;
        let idx = session
            .find_participant(identity)
            .ok_or(AppError::NotInGame)?;
        if session.quiz.question(question_id).is_none() {
            return Err(AppError::NotFound("question"));
        }

        let now = Utc::now();
        let participant = &mut session.participants[idx];
        participant.mark_question_started(question_id, now);

        if participant.answer(question_id).is_some_and(AnswerRecord::is_final) {
            return Ok(DraftSaved { saved: false });
        }

        participant.upsert_answer(AnswerRecord {
            question_id: question_id.to_string(),
            answer: value,
            is_correct: None,
            points_awarded: 0,
            answered_at: None,
            time_spent: None,
            auto_saved: true,
        });
        session.touch(now);

        tracing::debug!(session_id, question_id, "draft answer saved");
        Ok(DraftSaved { saved: true })
    }

    /// 최종 답안 제출: 채점하고 점수를 반영합니다. 재제출은 저장된 결과를 돌려줍니다.
    pub async fn submit_answer(
        &self,
        session_id: &str,
        identity: &Identity,
        submission: Submission,
    ) -> Result<SubmitOutcome, AppError> {
        require_question_id(&submission.question_id)?;

        let handle = self.session(session_id)?;
        let mut session = self.lock_live(&handle).await?;

        let idx = session
            .find_participant(identity)
            .ok_or(AppError::NotInGame)?;
        let question = session
            .quiz
            .question(&submission.question_id)
            .cloned()
            .ok_or(AppError::NotFound("question"))?;

        // 재시도(replay)는 상태와 무관하게 성공으로 응답합니다.
        let participant = &session.participants[idx];
        if let Some(previous) = participant
            .answer(&question.id)
            .filter(|record| record.is_final())
        {
            tracing::debug!(session_id, question_id = %question.id, "replayed submission");
            return Ok(SubmitOutcome {
                is_correct: previous.is_correct.unwrap_or(false),
                points_awarded: previous.points_awarded,
                current_score: participant.score,
                time_spent: previous.time_spent,
                already_answered: true,
            });
        }

        ensure_running(&session)?;

        let now = Utc::now();
        let time_spent = submission
            .time_spent
            .filter(|t| t.is_finite() && *t >= 0.0);
        let is_correct = evaluate(&question, submission.value.as_ref());
        let points = points_for(&question, is_correct);

        let participant = &mut session.participants[idx];
        participant.award(points);
        participant.upsert_answer(AnswerRecord {
            question_id: question.id.clone(),
            answer: submission.value,
            is_correct: Some(is_correct),
            points_awarded: points,
            answered_at: Some(now),
            time_spent,
            auto_saved: false,
        });
        participant.clear_question_started(&question.id);

        let name = participant.player_name.clone();
        let current_score = participant.score;
        session.touch(now);

        tracing::info!(
            session_id,
            player = %name,
            question_id = %question.id,
            is_correct,
            score = current_score,
            "answer submitted"
        );
        self.events.publish(
            session_id,
            GameEvent::AnswerSubmitted {
                name,
                question_id: question.id,
                is_correct,
                score: current_score,
            },
        );

        Ok(SubmitOutcome {
            is_correct,
            points_awarded: points,
            current_score,
            time_spent,
            already_answered: false,
        })
    }

    /// 다음 문제로 진행 (호스트 전용).
    ///
    /// 현재 문제의 임시저장 답안을 먼저 확정·채점합니다.
    /// 마지막 문제에서 호출하면 게임을 종료합니다.
    pub async fn advance(&self, session_id: &str, host_id: &str) -> Result<AdvanceOutcome, AppError> {
        let handle = self.session(session_id)?;
        let mut session = self.lock_live(&handle).await?;

        ensure_host(&session, host_id)?;
        ensure_running(&session)?;

        let now = Utc::now();

        if session.is_last_question() {
            let results = self.finish(&mut session, now).await?;
            let quiz_id = session.quiz.id.clone();
            drop(session);

            self.after_end(session_id, &quiz_id, &results).await;
            return Ok(AdvanceOutcome::Ended {
                game_ended: true,
                results: results.results,
                history_id: results.history_id,
            });
        }

        let current = session.quiz.questions[session.current_question_index].clone();
        let finalized = finalize_drafts_for(&mut session.participants, &current, now);

        session.current_question_index += 1;
        session.question_started_at = Some(now);
        session.touch(now);

        let index = session.current_question_index;
        let total_questions = session.total_questions();
        tracing::info!(session_id, index, finalized, "moved to next question");
        self.events
            .publish(session_id, GameEvent::QuestionChanged { index });

        Ok(AdvanceOutcome::Next {
            current_question_index: index,
            total_questions,
        })
    }

    /// 게임 종료 (호스트 전용). 두 번 호출하면 `InvalidState`입니다.
    pub async fn end(&self, session_id: &str, host_id: &str) -> Result<GameResults, AppError> {
        let handle = self.session(session_id)?;
        let mut session = self.lock_live(&handle).await?;

        ensure_host(&session, host_id)?;
        ensure_running(&session)?;

        let results = self.finish(&mut session, Utc::now()).await?;
        let quiz_id = session.quiz.id.clone();
        drop(session);

        self.after_end(session_id, &quiz_id, &results).await;
        Ok(results)
    }

    /// 종료 처리의 공통 부분. 복사본에서 확정·순위 계산을 마치고,
    /// 기록 저장이 성공했을 때만 세션에 반영합니다.
    async fn finish(
        &self,
        session: &mut LiveSession,
        now: DateTime<Utc>,
    ) -> Result<GameResults, AppError> {
        let mut ended = session.clone();
        let questions = ended.quiz.questions.clone();
        for question in &questions {
            finalize_drafts_for(&mut ended.participants, question, now);
        }
        ended.status = GameStatus::Ended;
        ended.ended_at = Some(now);
        ended.touch(now);

        let record = build_history(&ended, uuid::Uuid::now_v7().to_string(), now);

        // 세션 잠금을 잡은 채로 저장합니다. 같은 세션의 다른 전이만 기다리게 되고,
        // 저장 실패 시 세션은 running 그대로 남습니다.
        db::insert_history(&self.pool, &record).await?;

        ended.history_id = Some(record.id.clone());
        *session = ended;
        self.store.release_pin(&session.pin, &session.id);

        tracing::info!(
            session_id = %session.id,
            history_id = %record.id,
            players = record.total_players,
            "game ended"
        );

        Ok(GameResults {
            results: RankedResults::from_history(&record),
            history_id: record.id,
        })
    }

    async fn after_end(&self, session_id: &str, quiz_id: &str, results: &GameResults) {
        self.events.publish(
            session_id,
            GameEvent::GameEnded {
                results: results.results.clone(),
            },
        );
        // 끝난 게임에는 더 보낼 이벤트가 없으므로 구독 스트림을 닫습니다.
        self.events.close_topic(session_id);
        self.set_quiz_visibility(quiz_id, true).await;
    }

    /// 대기실에서 나가기. 게임이 시작된 뒤에는 점수 보존을 위해 허용하지 않습니다.
    pub async fn leave(&self, session_id: &str, identity: &Identity) -> Result<(), AppError> {
        let handle = self.session(session_id)?;
        let mut session = self.lock_live(&handle).await?;

        let idx = session
            .find_participant(identity)
            .ok_or(AppError::NotInGame)?;
        if session.status != GameStatus::Waiting {
            return Err(AppError::InvalidState(
                "Cannot leave a game that has already started".to_string(),
            ));
        }

        let participant = session.participants.remove(idx);
        session.touch(Utc::now());

        let total_players = session.participants.len();
        tracing::info!(session_id, player = %participant.player_name, total_players, "player left");
        self.events.publish(
            session_id,
            GameEvent::ParticipantLeft {
                name: participant.player_name,
                total_players,
            },
        );
        Ok(())
    }

    /// 호스트가 세션을 닫습니다 (어느 상태에서든). 기록은 남기지 않습니다.
    pub async fn close(&self, session_id: &str, host_id: &str) -> Result<(), AppError> {
        let handle = self.session(session_id)?;
        let quiz_id = {
            let session = self.lock_live(&handle).await?;
            ensure_host(&session, host_id)?;
            // 잠금을 잡은 채로 제거해야 대기 중인 작업이 제거된 세션을 보게 됩니다.
            self.store.remove(session_id);
            session.quiz.id.clone()
        };

        self.events.publish(session_id, GameEvent::HostDisconnected);
        self.events.close_topic(session_id);
        self.set_quiz_visibility(&quiz_id, true).await;

        tracing::info!(session_id, "session closed by host");
        Ok(())
    }

    /// TTL이 지난 세션을 정리합니다. 정리된 세션 수를 반환합니다.
    pub async fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Utc::now()).await
    }

    pub async fn sweep_expired_at(&self, now: DateTime<Utc>) -> usize {
        let expired = self.store.sweep_idle(now - self.settings.session_ttl);

        for session in &expired {
            tracing::info!(
                session_id = %session.id,
                status = session.status.as_str(),
                "expired idle session"
            );
            self.events.publish(&session.id, GameEvent::HostDisconnected);
            self.events.close_topic(&session.id);
            if session.status != GameStatus::Ended {
                self.set_quiz_visibility(&session.quiz.id, true).await;
            }
        }
        expired.len()
    }

    /// 세션 이벤트 구독. 세션이 없으면 `NotFound`
    pub fn subscribe(&self, session_id: &str) -> Result<(usize, EventReceiver), AppError> {
        self.session(session_id)?;
        Ok(self.events.subscribe(session_id))
    }

    /// 퀴즈 공개 여부 변경은 최선 노력입니다. 실패해도 전이는 성공으로 둡니다.
    async fn set_quiz_visibility(&self, quiz_id: &str, discoverable: bool) {
        if let Err(e) = db::set_quiz_discoverable(&self.pool, quiz_id, discoverable).await {
            tracing::warn!(quiz_id, discoverable, error = %e, "failed to update quiz visibility");
        }
    }
}

fn ensure_host(session: &LiveSession, user_id: &str) -> Result<(), AppError> {
    if session.is_host(user_id) {
        Ok(())
    } else {
        tracing::debug!(session_id = %session.id, user_id, "rejected non-host transition");
        Err(AppError::Forbidden(
            "Only the host can do this".to_string(),
        ))
    }
}

fn ensure_running(session: &LiveSession) -> Result<(), AppError> {
    if session.status != GameStatus::Running {
        tracing::debug!(session_id = %session.id, status = session.status.as_str(), "game is not running");
    }
    match session.status {
        GameStatus::Running => Ok(()),
        GameStatus::Waiting => Err(AppError::InvalidState(
            "Game has not started yet".to_string(),
        )),
        GameStatus::Ended => Err(AppError::InvalidState(
            "Game has already ended".to_string(),
        )),
    }
}

fn require_question_id(question_id: &str) -> Result<(), AppError> {
    if question_id.trim().is_empty() {
        return Err(AppError::Validation(
            "Please provide question ID".to_string(),
        ));
    }
    Ok(())
}

/// 한 문제에 대해 모든 참가자의 임시저장 답안을 최종 제출과 같은 경로로 채점합니다.
/// 확정된 답안 수를 반환합니다.
pub fn finalize_drafts_for(
    participants: &mut [Participant],
    question: &Question,
    now: DateTime<Utc>,
) -> usize {
    let mut finalized = 0;
    for participant in participants.iter_mut() {
        let started_at = participant.question_started_at(&question.id);
        let Some(record) = participant.answer_mut(&question.id) else {
            continue;
        };
        if record.is_final() {
            continue;
        }

        let is_correct = evaluate(question, record.answer.as_ref());
        let points = points_for(question, is_correct);
        // 시간 초과로 확정된 답안은 제한 시간을 넘지 않는 경과 시간으로 기록합니다.
        let time_spent = started_at.map(|start| {
            let elapsed = (now - start).num_milliseconds().max(0) as f64 / 1000.0;
            elapsed.min(f64::from(question.time_limit))
        });

        record.is_correct = Some(is_correct);
        record.points_awarded = points;
        record.answered_at = Some(now);
        record.time_spent = time_spent;
        record.auto_saved = false;

        participant.award(points);
        participant.clear_question_started(&question.id);
        finalized += 1;
    }
    finalized
}

/// 점수 내림차순 안정 정렬. 동점이면 참가 순서를 유지하고,
/// 순위는 정렬 후 위치(1부터)이며 공동 순위는 없습니다.
pub fn rank_participants(participants: &[Participant]) -> Vec<(usize, &Participant)> {
    let mut ordered: Vec<&Participant> = participants.iter().collect();
    // sort_by는 안정 정렬입니다.
    ordered.sort_by(|a, b| b.score.cmp(&a.score));
    ordered
        .into_iter()
        .enumerate()
        .map(|(pos, p)| (pos + 1, p))
        .collect()
}

/// 종료된 세션으로 게임 기록을 만듭니다.
/// 참가자마다 퀴즈의 **모든** 문제에 대한 결과를 담습니다 (답하지 않은 문제 포함).
pub fn build_history(session: &LiveSession, id: String, now: DateTime<Utc>) -> HistoryRecord {
    let total_points = session.quiz.total_points();

    let player_results = rank_participants(&session.participants)
        .into_iter()
        .map(|(rank, participant)| {
            let answers: Vec<AnswerDetail> = session
                .quiz
                .questions
                .iter()
                .map(|question| answer_detail(participant, question))
                .collect();

            PlayerResult {
                user_id: participant.user_id.clone(),
                player_name: participant.player_name.clone(),
                avatar: participant.avatar.display().to_string(),
                is_guest: participant.is_guest,
                score: participant.score,
                total_points,
                correct_count: answers.iter().filter(|a| a.is_correct).count(),
                rank,
                answers,
            }
        })
        .collect();

    HistoryRecord {
        id,
        host_id: session.host_id.clone(),
        quiz_id: session.quiz.id.clone(),
        quiz_title: session.quiz.title.clone(),
        pin: session.pin.clone(),
        player_results,
        total_players: session.participants.len(),
        started_at: session.started_at,
        ended_at: session.ended_at.unwrap_or(now),
        completed_at: now,
    }
}

fn answer_detail(participant: &Participant, question: &Question) -> AnswerDetail {
    match participant.answer(&question.id).filter(|r| r.is_final()) {
        Some(record) => AnswerDetail {
            question_id: question.id.clone(),
            question: question.question.clone(),
            user_answer: record.answer.clone(),
            correct_answer: question.correct_answer.clone(),
            is_correct: record.is_correct.unwrap_or(false),
            answered: true,
            time_spent: record.time_spent,
        },
        None => AnswerDetail {
            question_id: question.id.clone(),
            question: question.question.clone(),
            user_answer: None,
            correct_answer: question.correct_answer.clone(),
            is_correct: false,
            answered: false,
            time_spent: None,
        },
    }
}
