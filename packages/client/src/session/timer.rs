//! One-shot timers held as deadlines.
//!
//! Nothing sleeps: the runner calls [`Timers::take_due`] on every drain tick
//! with the current time from the injected clock.

use crate::domain::RoomCode;

/// Deferred actions of the session, each bound to the room it was armed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Complete a leave even if its ack never arrives
    LeaveFallback,
    /// `room:sync` shortly after `room:join`
    RoomSyncAfterJoin,
    /// One `quiz:sync` after entering the quiz view
    QuizEntryResync,
    /// `quiz:sync` after a successful start ack
    StartAckQuizSync,
    /// `quiz:sync` after a start request, whatever the ack says
    StartFallbackQuizSync,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timer {
    pub kind: TimerKind,
    pub code: RoomCode,
    pub deadline_ms: i64,
}

#[derive(Debug, Default)]
pub struct Timers {
    pending: Vec<Timer>,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a timer. Re-arming a kind replaces its previous deadline.
    pub fn schedule(&mut self, kind: TimerKind, code: RoomCode, deadline_ms: i64) {
        self.cancel(kind);
        self.pending.push(Timer {
            kind,
            code,
            deadline_ms,
        });
    }

    pub fn cancel(&mut self, kind: TimerKind) {
        self.pending.retain(|timer| timer.kind != kind);
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.pending.iter().any(|timer| timer.kind == kind)
    }

    /// Remove and return every timer due at `now_ms`, earliest first.
    pub fn take_due(&mut self, now_ms: i64) -> Vec<Timer> {
        let (mut due, pending): (Vec<Timer>, Vec<Timer>) = self
            .pending
            .drain(..)
            .partition(|timer| timer.deadline_ms <= now_ms);
        self.pending = pending;
        due.sort_by_key(|timer| timer.deadline_ms);
        due
    }
}
