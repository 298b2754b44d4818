//! Quiz round state machine.
//!
//! ```text
//! Waiting -> QuestionActive -> Answered | TimedOut -> Revealing -> QuestionActive | Ended
//! ```
//!
//! The server drives pacing: nothing here advances to the next question on
//! its own. The only local transition is `QuestionActive -> TimedOut`, taken
//! when the countdown observed on a display tick reaches zero.

use std::collections::HashMap;

use super::{
    model::{
        GameEndSummary, Proposal, Question, QuestionStart, QuestionType, RoundResult, UserId,
    },
    time_sync::RoundWindow,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    Waiting,
    QuestionActive,
    Answered,
    TimedOut,
    Revealing,
    Ended,
}

/// What to show next to the question text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hint {
    None,
    Citation(String),
    /// Image reference waiting for its bytes
    ImagePending { source: String },
    Image { source: String, data: Vec<u8> },
}

/// Answer ready to be emitted, tagged with the round it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerAttempt {
    pub round: u64,
    pub answer: String,
}

pub const STATUS_CORRECT: &str = "Correct!";
pub const STATUS_WRONG: &str = "Wrong!";

#[derive(Debug)]
pub struct QuizRound {
    phase: RoundPhase,
    /// Incremented on every question start; used to discard late acks and media
    round: u64,
    question: Option<Question>,
    window: Option<RoundWindow>,
    drift_ms: i64,
    hint: Hint,
    proposals: Vec<Proposal>,
    result: Option<RoundResult>,
    game_end: Option<GameEndSummary>,
    answered_correctly: bool,
    draft: String,
    status: Option<String>,
}

impl Default for QuizRound {
    fn default() -> Self {
        Self::new()
    }
}

impl QuizRound {
    pub fn new() -> Self {
        Self {
            phase: RoundPhase::Waiting,
            round: 0,
            question: None,
            window: None,
            drift_ms: 0,
            hint: Hint::None,
            proposals: Vec::new(),
            result: None,
            game_end: None,
            answered_correctly: false,
            draft: String::new(),
            status: None,
        }
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn question(&self) -> Option<&Question> {
        self.question.as_ref()
    }

    pub fn hint(&self) -> &Hint {
        &self.hint
    }

    pub fn proposals(&self) -> &[Proposal] {
        &self.proposals
    }

    pub fn result(&self) -> Option<&RoundResult> {
        self.result.as_ref()
    }

    pub fn game_end(&self) -> Option<&GameEndSummary> {
        self.game_end.as_ref()
    }

    pub fn answered_correctly(&self) -> bool {
        self.answered_correctly
    }

    pub fn drift_ms(&self) -> i64 {
        self.drift_ms
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Forget everything, as when the quiz view is entered afresh.
    pub fn reset(&mut self) {
        let round = self.round;
        *self = Self::new();
        // keep the counter monotonic so acks from before the reset stay stale
        self.round = round + 1;
    }

    /// Start a new round.
    ///
    /// # Returns
    ///
    /// The image reference to load when the question is an IMAGE question
    pub fn on_question_start(&mut self, start: QuestionStart, local_now_ms: i64) -> Option<String> {
        self.round += 1;
        self.result = None;
        self.proposals.clear();
        self.answered_correctly = false;
        self.draft.clear();
        self.status = None;
        self.game_end = None;

        let server_now = start.server_now_ms;
        self.drift_ms = server_now.map_or(0, |now| now - local_now_ms);
        self.window = start.ends_at_ms.map(|ends_at| {
            let server_now = server_now.unwrap_or(local_now_ms + self.drift_ms);
            RoundWindow::new(
                start.starts_at_ms.unwrap_or(server_now),
                ends_at,
                server_now,
                local_now_ms,
            )
        });

        let question = start.question;
        let mut image_to_load = None;
        self.hint = match question.question_type {
            QuestionType::Citation => match question.citation_text.as_deref().map(str::trim) {
                Some(text) if !text.is_empty() => Hint::Citation(text.to_string()),
                _ => Hint::None,
            },
            QuestionType::Image => match question.image_path.as_deref().map(str::trim) {
                Some(path) if !path.is_empty() => {
                    image_to_load = Some(path.to_string());
                    Hint::ImagePending {
                        source: path.to_string(),
                    }
                }
                _ => Hint::None,
            },
            QuestionType::Text => Hint::None,
        };
        tracing::debug!(
            "Round {} started: question {} ({:?})",
            self.round,
            question.id,
            question.question_type
        );
        self.question = Some(question);
        self.phase = RoundPhase::QuestionActive;
        image_to_load
    }

    /// Attach loaded image bytes. `None` or a stale round leaves no image.
    pub fn on_media_loaded(&mut self, round: u64, data: Option<Vec<u8>>) {
        if round != self.round {
            return;
        }
        let Hint::ImagePending { source } = &self.hint else {
            return;
        };
        self.hint = match data {
            Some(data) if !data.is_empty() => Hint::Image {
                source: source.clone(),
                data,
            },
            _ => Hint::None,
        };
    }

    /// Replace the whole proposal list with a broadcast snapshot.
    pub fn on_proposals_update(&mut self, proposals: Vec<Proposal>) {
        self.proposals = proposals;
    }

    /// Latest guess per user: array order, last occurrence wins.
    pub fn latest_guesses(&self) -> HashMap<&UserId, &str> {
        let mut latest = HashMap::new();
        for proposal in &self.proposals {
            latest.insert(&proposal.user_id, proposal.guess.as_str());
        }
        latest
    }

    /// One proposal per user, in order of first appearance, carrying the latest guess.
    pub fn displayed_proposals(&self) -> Vec<&Proposal> {
        let mut order: Vec<&UserId> = Vec::new();
        let mut latest: HashMap<&UserId, &Proposal> = HashMap::new();
        for proposal in &self.proposals {
            if latest.insert(&proposal.user_id, proposal).is_none() {
                order.push(&proposal.user_id);
            }
        }
        order
            .into_iter()
            .filter_map(|user_id| latest.get(user_id).copied())
            .collect()
    }

    pub fn can_submit(&self) -> bool {
        self.question.is_some()
            && !self.answered_correctly
            && self.result.is_none()
            && matches!(self.phase, RoundPhase::QuestionActive | RoundPhase::TimedOut)
    }

    /// Take the draft as an answer if submitting is allowed.
    pub fn prepare_answer(&mut self) -> Option<AnswerAttempt> {
        if !self.can_submit() {
            return None;
        }
        let answer = self.draft.trim();
        if answer.is_empty() {
            return None;
        }
        self.status = None;
        Some(AnswerAttempt {
            round: self.round,
            answer: answer.to_string(),
        })
    }

    /// Apply `{correct: bool}` from the answer ack. Stale rounds are ignored.
    pub fn on_answer_ack(&mut self, round: u64, correct: bool) -> bool {
        if round != self.round || self.result.is_some() {
            return false;
        }
        if correct {
            self.answered_correctly = true;
            self.draft.clear();
            self.status = Some(STATUS_CORRECT.to_string());
            if self.phase == RoundPhase::QuestionActive {
                self.phase = RoundPhase::Answered;
            }
        } else {
            self.status = Some(STATUS_WRONG.to_string());
        }
        true
    }

    pub fn on_result(&mut self, result: RoundResult) {
        self.result = Some(result);
        self.phase = RoundPhase::Revealing;
    }

    pub fn on_game_ended(&mut self, summary: GameEndSummary) {
        self.game_end = Some(summary);
        self.phase = RoundPhase::Ended;
    }

    /// `room:started` opens a new game.
    pub fn clear_game_end(&mut self) {
        self.game_end = None;
        if self.phase == RoundPhase::Ended {
            self.phase = RoundPhase::Waiting;
        }
    }

    /// Countdown for display, `None` while no round window is known.
    pub fn remaining_ms(&self, local_now_ms: i64) -> Option<i64> {
        self.window.map(|w| w.remaining_ms(local_now_ms))
    }

    /// Display tick: detect the end of the answer window.
    pub fn on_tick(&mut self, local_now_ms: i64) {
        if self.phase == RoundPhase::QuestionActive && self.remaining_ms(local_now_ms) == Some(0) {
            tracing::debug!("Round {} timed out", self.round);
            self.phase = RoundPhase::TimedOut;
        }
    }
}
