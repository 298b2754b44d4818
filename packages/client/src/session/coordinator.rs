//! Session Coordinator.
//!
//! Owns the room and quiz state machines and binds them to the event
//! channel. Every mutation happens inside [`SessionCoordinator::handle`] or a
//! user action, both called from the single consumer of the event queue.

use std::{collections::HashMap, sync::Arc};

use serde_json::Value;

use niwot_shared::time::Clock;

use super::{
    ApiOutcome, ApiRequest, SessionInput,
    timer::{TimerKind, Timers},
};
use crate::{
    domain::{
        Identity, QuizRound, RoomCode, RoomConfig, RoomMachine, RoomSnapshot, RoomState,
        UpdateOutcome, Visibility,
    },
    error::{ClientError, ProfileUpdateError},
    infrastructure::{
        api::Suggestion,
        dto::{
            InboundEvent, OutboundEvent, PayloadError,
            conversion::{self, ProfileChanges},
            payload,
        },
        media::{self, MediaSource},
        transport::{EventSink, TransportEvent},
    },
};

const LEAVE_FALLBACK_MS: i64 = 500;
const JOIN_ROOM_SYNC_DELAY_MS: i64 = 150;
const QUIZ_ENTRY_RESYNC_DELAY_MS: i64 = 800;
const START_ACK_QUIZ_SYNC_DELAY_MS: i64 = 150;
const START_FALLBACK_QUIZ_SYNC_MS: i64 = 2_000;
const ROOM_REFRESH_THROTTLE_MS: i64 = 800;

pub const SUGGESTION_SENT: &str = "Question sent! It will be visible once approved.";

/// Views the front end can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Lobby,
    Room,
    Quiz,
    Profile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveReason {
    Left,
    Kicked,
    Banned,
    /// Missing from a fresh roster
    Removed,
}

/// Navigation and lifecycle notifications for the front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    EnteredRoom(RoomCode),
    LeftRoom { to_lobby: bool, reason: LeaveReason },
    StartedQuiz,
    ReturnedToRoom,
    LoggedOut,
}

/// What an outstanding ack id was requested for.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PendingAck {
    Join,
    Leave,
    Answer { round: u64 },
    Start(RoomCode),
    Unban,
    Profile,
}

pub struct SessionCoordinator {
    sink: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    api_base: String,
    screen: Screen,
    room: RoomMachine,
    quiz: QuizRound,
    timers: Timers,
    pending_acks: HashMap<u64, PendingAck>,
    requests: Vec<ApiRequest>,
    signals: Vec<Signal>,
    last_room_fetch_ms: Option<i64>,
    /// The quiz-entry resync fires once per room entry
    quiz_resync_armed: bool,
    status: Option<String>,
    profile_result: Option<Result<(), ProfileUpdateError>>,
}

impl SessionCoordinator {
    pub fn new(sink: Arc<dyn EventSink>, clock: Arc<dyn Clock>, api_base: impl Into<String>) -> Self {
        Self {
            sink,
            clock,
            api_base: api_base.into(),
            screen: Screen::Login,
            room: RoomMachine::new(),
            quiz: QuizRound::new(),
            timers: Timers::new(),
            pending_acks: HashMap::new(),
            requests: Vec::new(),
            signals: Vec::new(),
            last_room_fetch_ms: None,
            quiz_resync_armed: false,
            status: None,
            profile_result: None,
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn room(&self) -> &RoomMachine {
        &self.room
    }

    pub fn quiz(&self) -> &QuizRound {
        &self.quiz
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.room.identity()
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn profile_result(&self) -> Option<&Result<(), ProfileUpdateError>> {
        self.profile_result.as_ref()
    }

    /// Navigation signals raised since the last call.
    pub fn take_signals(&mut self) -> Vec<Signal> {
        std::mem::take(&mut self.signals)
    }

    /// REST work requested since the last call.
    pub fn take_requests(&mut self) -> Vec<ApiRequest> {
        std::mem::take(&mut self.requests)
    }

    // ========================================
    // Outbound helpers
    // ========================================

    fn emit(&self, event: OutboundEvent, data: Value) {
        if let Err(e) = self.sink.emit(event, data) {
            tracing::warn!("Failed to emit {}: {}", event.name(), e);
        }
    }

    fn emit_with_ack(&mut self, event: OutboundEvent, data: Value, pending: PendingAck) -> bool {
        match self.sink.emit_with_ack(event, data) {
            Ok(id) => {
                self.pending_acks.insert(id, pending);
                true
            }
            Err(e) => {
                tracing::warn!("Failed to emit {}: {}", event.name(), e);
                false
            }
        }
    }

    fn emit_room_sync(&self, code: &RoomCode) {
        self.emit(OutboundEvent::RoomSync, conversion::code_payload(code));
    }

    fn emit_quiz_sync(&self, code: &RoomCode) {
        self.emit(OutboundEvent::QuizSync, conversion::code_payload(code));
    }

    fn emit_join(&mut self, code: &RoomCode) {
        let data = conversion::join_payload(code, self.room.identity());
        self.emit_with_ack(OutboundEvent::RoomJoin, data, PendingAck::Join);
    }

    fn schedule(&mut self, kind: TimerKind, code: RoomCode, delay_ms: i64) {
        let deadline = self.clock.now_millis() + delay_ms;
        self.timers.schedule(kind, code, deadline);
    }

    fn active_code(&self) -> Option<RoomCode> {
        self.room.active_code().cloned()
    }

    // ========================================
    // Lifecycle
    // ========================================

    pub fn on_logged_in(&mut self, identity: Identity) {
        tracing::info!("Logged in as '{}'", identity.username);
        self.room.set_identity(identity);
        self.screen = Screen::Lobby;
    }

    /// Close the channel, drop every piece of session state, back to login.
    pub fn logout(&mut self) {
        self.sink.disconnect();
        self.requests.push(ApiRequest::Logout);
        self.room = RoomMachine::new();
        self.quiz = QuizRound::new();
        self.timers.clear();
        self.pending_acks.clear();
        self.last_room_fetch_ms = None;
        self.quiz_resync_armed = false;
        self.status = None;
        self.profile_result = None;
        self.screen = Screen::Login;
        self.signals.push(Signal::LoggedOut);
    }

    pub fn show_lobby(&mut self) {
        if self.screen != Screen::Login {
            self.screen = Screen::Lobby;
            self.requests.push(ApiRequest::PublicRooms);
        }
    }

    pub fn request_public_rooms(&mut self) {
        self.requests.push(ApiRequest::PublicRooms);
    }

    pub fn request_leaderboard(&mut self) {
        self.requests.push(ApiRequest::Leaderboard);
    }

    pub fn request_categories(&mut self) {
        self.requests.push(ApiRequest::Categories);
    }

    /// Send a question proposal for review.
    pub fn suggest_question(&mut self, suggestion: Suggestion) {
        self.requests.push(ApiRequest::Suggest(suggestion));
    }

    pub fn show_profile(&mut self) {
        if self.screen != Screen::Login {
            self.screen = Screen::Profile;
        }
    }

    // ========================================
    // Room actions
    // ========================================

    pub fn create_room(&mut self, name: Option<String>, visibility: Visibility) -> Result<(), ClientError> {
        self.require_logged_in()?;
        self.requests.push(ApiRequest::CreateRoom { name, visibility });
        Ok(())
    }

    /// Validate the typed code and ask the backend to admit us.
    pub fn join_room(&mut self, input: &str) -> Result<(), ClientError> {
        self.require_logged_in()?;
        let code = RoomCode::parse(input)?;
        self.requests.push(ApiRequest::JoinRoom(code));
        Ok(())
    }

    /// Join the room on the event channel. Does not wait for any ack.
    ///
    /// Entering another room while one is active leaves the old one first.
    pub fn enter_room(&mut self, code: RoomCode) {
        if let Some(old) = self.room.active_code().filter(|old| **old != code).cloned() {
            tracing::info!("Leaving room {} to enter {}", old, code);
            self.emit(OutboundEvent::RoomLeave, conversion::code_payload(&old));
            self.pending_acks
                .retain(|_, pending| matches!(pending, PendingAck::Profile));
        }
        self.timers.clear();
        self.quiz.reset();
        self.quiz_resync_armed = true;
        self.last_room_fetch_ms = None;
        self.room.begin_join(code.clone());
        self.emit_join(&code);
        self.schedule(TimerKind::RoomSyncAfterJoin, code.clone(), JOIN_ROOM_SYNC_DELAY_MS);
        self.screen = Screen::Room;
        self.signals.push(Signal::EnteredRoom(code));
    }

    /// Fire-and-forget leave: completes on the ack or after a short fallback.
    pub fn leave_room(&mut self) -> Result<(), ClientError> {
        let code = self.room.begin_leave().ok_or(ClientError::NotInRoom)?;
        tracing::info!("Leaving room {}", code);
        self.timers.clear();
        if self.emit_with_ack(
            OutboundEvent::RoomLeave,
            conversion::code_payload(&code),
            PendingAck::Leave,
        ) {
            self.schedule(TimerKind::LeaveFallback, code, LEAVE_FALLBACK_MS);
        } else {
            self.complete_leave();
        }
        Ok(())
    }

    fn complete_leave(&mut self) {
        if !self.room.finish_leave() {
            return;
        }
        self.timers.cancel(TimerKind::LeaveFallback);
        self.pending_acks.retain(|_, pending| *pending != PendingAck::Leave);
        self.quiz.reset();
        self.screen = Screen::Lobby;
        self.signals.push(Signal::LeftRoom {
            to_lobby: true,
            reason: LeaveReason::Left,
        });
        self.requests.push(ApiRequest::PublicRooms);
    }

    /// The server removed us: drop the room and go straight to the lobby.
    fn force_to_lobby(&mut self, reason: LeaveReason) {
        tracing::info!("Removed from room ({:?})", reason);
        self.room.mark_kicked();
        self.room.reset();
        self.quiz.reset();
        self.timers.clear();
        self.pending_acks.clear();
        self.screen = Screen::Lobby;
        self.status = Some(match reason {
            LeaveReason::Banned => "You have been banned from the room".to_string(),
            _ => "You are no longer in the room".to_string(),
        });
        self.signals.push(Signal::LeftRoom {
            to_lobby: true,
            reason,
        });
    }

    /// Host only: ask the server to start the quiz.
    pub fn start_quiz(&mut self) -> Result<(), ClientError> {
        let code = self.room.require_host()?.code.clone();
        self.emit_with_ack(
            OutboundEvent::RoomStart,
            conversion::code_payload(&code),
            PendingAck::Start(code.clone()),
        );
        self.schedule(
            TimerKind::StartFallbackQuizSync,
            code,
            START_FALLBACK_QUIZ_SYNC_MS,
        );
        Ok(())
    }

    /// Current config mirror, the base for host edits.
    pub fn current_config(&self) -> Result<RoomConfig, ClientError> {
        Ok(self.room.active_session()?.config.clone())
    }

    /// Host only: push a full config over the channel plus a REST write.
    pub fn update_config(&mut self, config: RoomConfig) -> Result<(), ClientError> {
        let code = self.room.update_config(config.clone())?;
        self.emit(
            OutboundEvent::RoomConfig,
            conversion::config_payload(&code, &config),
        );
        self.requests.push(ApiRequest::PutSettings { code, config });
        Ok(())
    }

    pub fn unban(&mut self, username: &str) -> Result<(), ClientError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ClientError::Validation("username is required".to_string()));
        }
        let code = self.room.require_host()?.code.clone();
        self.emit_with_ack(
            OutboundEvent::RoomUnban,
            conversion::unban_payload(&code, username),
            PendingAck::Unban,
        );
        Ok(())
    }

    /// Explicit resync of whatever the current view shows.
    pub fn request_sync(&mut self) -> Result<(), ClientError> {
        let code = self.active_code().ok_or(ClientError::NotInRoom)?;
        self.emit_room_sync(&code);
        if self.screen == Screen::Quiz {
            self.emit_quiz_sync(&code);
        }
        Ok(())
    }

    // ========================================
    // Quiz actions
    // ========================================

    /// Submit an answer. Returns `false` when the submission was a no-op.
    pub fn submit_answer(&mut self, text: &str) -> bool {
        let Some(code) = self.active_code() else {
            return false;
        };
        self.quiz.set_draft(text);
        let Some(attempt) = self.quiz.prepare_answer() else {
            return false;
        };
        self.emit_with_ack(
            OutboundEvent::QuizAnswer,
            conversion::answer_payload(&code, &attempt.answer),
            PendingAck::Answer {
                round: attempt.round,
            },
        )
    }

    // ========================================
    // Profile
    // ========================================

    pub fn update_profile(&mut self, changes: ProfileChanges) -> Result<(), ProfileUpdateError> {
        let touches_password = [
            &changes.old_password,
            &changes.new_password,
            &changes.confirm_password,
        ]
        .iter()
        .any(|field| field.as_deref().is_some_and(|v| !v.trim().is_empty()));
        if touches_password
            && changes.new_password.as_deref().map(str::trim)
                != changes.confirm_password.as_deref().map(str::trim)
        {
            return Err(ProfileUpdateError::PasswordMismatch);
        }

        match self
            .sink
            .emit_with_ack(OutboundEvent::ProfileUpdate, conversion::profile_payload(&changes))
        {
            Ok(id) => {
                self.pending_acks.insert(id, PendingAck::Profile);
                self.profile_result = None;
                Ok(())
            }
            Err(e) => Err(ProfileUpdateError::Other(e.to_string())),
        }
    }

    // ========================================
    // Inbound
    // ========================================

    /// Apply one queued input.
    pub fn handle(&mut self, input: SessionInput) {
        match input {
            SessionInput::Transport(event) => self.handle_transport(event),
            SessionInput::Api(outcome) => self.handle_api(outcome),
        }
    }

    fn handle_transport(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected => self.on_connected(),
            TransportEvent::Disconnected => {
                tracing::warn!("Event channel disconnected");
                // acks of the lost connection never arrive
                self.pending_acks.clear();
            }
            TransportEvent::Ack { id, payload } => match self.pending_acks.remove(&id) {
                Some(pending) => self.handle_ack(pending, &payload),
                None => tracing::debug!("Ignoring ack {} with no pending request", id),
            },
            TransportEvent::Message { name, payload } => match InboundEvent::from_name(&name) {
                Some(event) => self.handle_event(event, payload),
                None => tracing::debug!("Ignoring unknown event '{}'", name),
            },
        }
    }

    /// A fresh channel knows nothing about our room: join and resync again.
    fn on_connected(&mut self) {
        tracing::info!("Event channel connected");
        let Some(code) = self.active_code() else {
            return;
        };
        self.emit_join(&code);
        self.emit_room_sync(&code);
        if self.screen == Screen::Quiz {
            self.emit_quiz_sync(&code);
        }
    }

    fn is_for_other_room(&self, payload: &Value) -> bool {
        let Some(code) = payload.get("code").and_then(Value::as_str) else {
            return false;
        };
        match self.room.active_code() {
            Some(active) => !code.trim().is_empty() && !code.trim().eq_ignore_ascii_case(active.as_str()),
            None => false,
        }
    }

    fn handle_event(&mut self, event: InboundEvent, payload: Value) {
        let Some(code) = self.active_code() else {
            tracing::debug!("Ignoring {} outside of a room", event.name());
            return;
        };
        if self.is_for_other_room(&payload) {
            tracing::debug!("Ignoring {} for another room", event.name());
            return;
        }

        if event.forces_quiz_view() && self.screen != Screen::Quiz {
            self.enter_quiz_view(&code);
        }

        match event {
            InboundEvent::RoomUpdate => self.apply_room_payload(&payload, false),
            e if e.is_membership() => self.apply_room_payload(&payload, true),
            InboundEvent::RoomKicked => self.force_to_lobby(LeaveReason::Kicked),
            InboundEvent::RoomBanned => self.force_to_lobby(LeaveReason::Banned),
            InboundEvent::RoomStarted => {
                self.quiz.clear_game_end();
                self.emit_quiz_sync(&code);
            }
            InboundEvent::QuizQuestion => match payload::question_start(&payload) {
                Ok(start) => {
                    let now = self.clock.now_millis();
                    if let Some(reference) = self.quiz.on_question_start(start, now) {
                        self.load_image(&reference);
                    }
                }
                Err(e) => self.protocol_fault(&code, e),
            },
            InboundEvent::QuizProposals => {
                self.quiz.on_proposals_update(payload::proposals(&payload));
            }
            InboundEvent::QuizResult => match payload::round_result(&payload) {
                Ok(result) => self.quiz.on_result(result),
                Err(e) => self.protocol_fault(&code, e),
            },
            InboundEvent::QuizEnded => self.quiz.on_game_ended(payload::game_end(&payload)),
            InboundEvent::QuizGotoRoom => {
                if self.screen == Screen::Quiz {
                    self.screen = Screen::Room;
                    self.signals.push(Signal::ReturnedToRoom);
                }
            }
            // room:running, quiz:started, game:started only navigate
            _ => {}
        }
    }

    /// Switch to the quiz view with a clean round and ask for the current state.
    fn enter_quiz_view(&mut self, code: &RoomCode) {
        tracing::info!("Entering quiz view for room {}", code);
        self.quiz.reset();
        self.screen = Screen::Quiz;
        self.emit_quiz_sync(code);
        if self.quiz_resync_armed {
            self.quiz_resync_armed = false;
            self.schedule(
                TimerKind::QuizEntryResync,
                code.clone(),
                QUIZ_ENTRY_RESYNC_DELAY_MS,
            );
        }
        self.signals.push(Signal::StartedQuiz);
    }

    fn apply_room_payload(&mut self, payload: &Value, membership: bool) {
        let snapshot = match payload::room_snapshot(payload) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                if let Some(code) = self.active_code() {
                    self.protocol_fault(&code, e);
                }
                return;
            }
        };
        match self.room.apply_update(snapshot) {
            UpdateOutcome::Ignored => {}
            UpdateOutcome::Applied {
                forcibly_removed: true,
                ..
            } => self.force_to_lobby(LeaveReason::Removed),
            UpdateOutcome::Applied { changed: false, .. } if membership => {
                if let Some(code) = self.active_code() {
                    self.emit_room_sync(&code);
                    self.request_room_refresh(code);
                }
            }
            UpdateOutcome::Applied { .. } => {}
        }
    }

    /// Throttled REST refresh of the room document.
    fn request_room_refresh(&mut self, code: RoomCode) {
        let now = self.clock.now_millis();
        if self
            .last_room_fetch_ms
            .is_some_and(|last| now - last < ROOM_REFRESH_THROTTLE_MS)
        {
            return;
        }
        self.last_room_fetch_ms = Some(now);
        self.requests.push(ApiRequest::FetchRoom(code));
    }

    fn load_image(&mut self, reference: &str) {
        let round = self.quiz.round();
        match media::resolve(reference, &self.api_base) {
            Some(MediaSource::Inline(data)) => self.quiz.on_media_loaded(round, Some(data)),
            Some(MediaSource::Remote(url)) => {
                self.requests.push(ApiRequest::LoadMedia { round, url });
            }
            None => self.quiz.on_media_loaded(round, None),
        }
    }

    /// Malformed payload: show it, resync, carry on.
    fn protocol_fault(&mut self, code: &RoomCode, error: PayloadError) {
        tracing::warn!("Malformed payload: {}", error);
        let status = format!("Error: {}", error.kind());
        self.quiz.set_status(status.clone());
        self.status = Some(status);
        if self.screen == Screen::Quiz {
            self.emit_quiz_sync(code);
        } else {
            self.emit_room_sync(code);
        }
    }

    fn handle_ack(&mut self, pending: PendingAck, data: &Value) {
        match pending {
            PendingAck::Join => tracing::debug!("room:join acknowledged"),
            PendingAck::Leave => self.complete_leave(),
            PendingAck::Answer { round } => match payload::answer_ack(data) {
                Some(correct) => {
                    self.quiz.on_answer_ack(round, correct);
                }
                None => tracing::warn!("Malformed answer ack: {}", data),
            },
            PendingAck::Start(code) => match payload::ok_ack(data) {
                Ok(()) => {
                    if self.room.active_code() != Some(&code) {
                        return;
                    }
                    if self.screen != Screen::Quiz {
                        self.enter_quiz_view(&code);
                    }
                    self.schedule(
                        TimerKind::StartAckQuizSync,
                        code,
                        START_ACK_QUIZ_SYNC_DELAY_MS,
                    );
                }
                Err(error) => {
                    let reason = error.unwrap_or_else(|| "error".to_string());
                    tracing::warn!("Start refused: {}", reason);
                    self.status = Some(format!("Cannot start: {}", reason));
                }
            },
            PendingAck::Unban => {
                if let Some(names) = payload::excluded_usernames(data) {
                    self.room.set_excluded_usernames(names);
                }
            }
            PendingAck::Profile => match payload::ok_ack(data) {
                Ok(()) => {
                    self.status = Some("Profile updated".to_string());
                    self.profile_result = Some(Ok(()));
                    self.requests.push(ApiRequest::FetchMe);
                }
                Err(code) => {
                    let error = ProfileUpdateError::from_code(code.as_deref());
                    self.status = Some(error.to_string());
                    self.profile_result = Some(Err(error));
                }
            },
        }
    }

    fn handle_api(&mut self, outcome: ApiOutcome) {
        match outcome {
            ApiOutcome::RoomReady(Ok(code)) => self.enter_room(code),
            ApiOutcome::RoomReady(Err(message)) => self.status = Some(message),
            ApiOutcome::RoomFetched { code, snapshot } => {
                if self.room.active_code() != Some(&code) {
                    return;
                }
                match snapshot {
                    Ok(snapshot) => self.apply_room_snapshot(snapshot),
                    Err(message) => tracing::debug!("Room refresh failed: {}", message),
                }
            }
            ApiOutcome::SettingsSaved { code, result } => match result {
                Ok(()) => tracing::debug!("Settings of {} saved", code),
                Err(message) => tracing::warn!("Saving settings of {} failed: {}", code, message),
            },
            ApiOutcome::MediaLoaded { round, data } => self.quiz.on_media_loaded(round, data),
            ApiOutcome::Me(Ok(identity)) => self.room.set_identity(identity),
            ApiOutcome::Me(Err(message)) => tracing::warn!("Cannot refresh profile: {}", message),
            ApiOutcome::LoggedOut => tracing::debug!("Logged out on the backend"),
            ApiOutcome::Suggested(Ok(())) => {
                self.status = Some(SUGGESTION_SENT.to_string());
            }
            ApiOutcome::Suggested(Err(message)) => self.status = Some(message),
            ApiOutcome::PublicRooms(_) | ApiOutcome::Leaderboard(_) | ApiOutcome::Categories(_) => {}
        }
    }

    fn apply_room_snapshot(&mut self, snapshot: RoomSnapshot) {
        if let UpdateOutcome::Applied {
            forcibly_removed: true,
            ..
        } = self.room.apply_update(snapshot)
        {
            self.force_to_lobby(LeaveReason::Removed);
        }
    }

    // ========================================
    // Time
    // ========================================

    /// Display tick: fire due timers and advance the countdown.
    pub fn tick(&mut self) {
        let now = self.clock.now_millis();
        for timer in self.timers.take_due(now) {
            if timer.kind == TimerKind::LeaveFallback {
                if self.room.state() == RoomState::Leaving {
                    tracing::debug!("Leave ack not received, completing anyway");
                    self.complete_leave();
                }
                continue;
            }
            if self.room.active_code() != Some(&timer.code) {
                continue;
            }
            match timer.kind {
                TimerKind::RoomSyncAfterJoin => self.emit_room_sync(&timer.code),
                TimerKind::QuizEntryResync
                | TimerKind::StartAckQuizSync
                | TimerKind::StartFallbackQuizSync => self.emit_quiz_sync(&timer.code),
                TimerKind::LeaveFallback => {}
            }
        }
        self.quiz.on_tick(now);
    }

    fn require_logged_in(&self) -> Result<(), ClientError> {
        if self.room.identity().is_none() {
            return Err(ClientError::NotConfigured("not logged in".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicBool, AtomicU64, Ordering},
    };

    use serde_json::json;

    use niwot_shared::time::{FixedClock, ManualClock};

    use super::*;
    use crate::{
        domain::{RoundPhase, UserId},
        infrastructure::transport::TransportError,
    };

    /// Sink that records every emitted frame.
    struct RecordingSink {
        sent: Mutex<Vec<(String, Value, Option<u64>)>>,
        next_id: AtomicU64,
        connected: AtomicBool,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
                connected: AtomicBool::new(true),
            }
        }

        fn names(&self) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|(name, _, _)| name.clone())
                .collect()
        }

        fn last_id(&self, name: &str) -> u64 {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .rev()
                .find(|(n, _, _)| n == name)
                .and_then(|(_, _, id)| *id)
                .unwrap()
        }

        fn clear(&self) {
            self.sent.lock().unwrap().clear();
        }
    }

    impl EventSink for RecordingSink {
        fn emit(&self, event: OutboundEvent, data: Value) -> Result<(), TransportError> {
            if !self.is_connected() {
                return Err(TransportError::NotConnected);
            }
            self.sent
                .lock()
                .unwrap()
                .push((event.name().to_string(), data, None));
            Ok(())
        }

        fn emit_with_ack(&self, event: OutboundEvent, data: Value) -> Result<u64, TransportError> {
            if !self.is_connected() {
                return Err(TransportError::NotConnected);
            }
            let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            self.sent
                .lock()
                .unwrap()
                .push((event.name().to_string(), data, Some(id)));
            Ok(id)
        }

        fn is_connected(&self) -> bool {
            self.connected.load(Ordering::SeqCst)
        }

        fn disconnect(&self) {
            self.connected.store(false, Ordering::SeqCst);
        }
    }

    const CODE: &str = "ABC123";

    fn setup() -> (SessionCoordinator, Arc<RecordingSink>, ManualClock) {
        let sink = Arc::new(RecordingSink::new());
        let clock = ManualClock::new(1_000_000);
        let mut coordinator = SessionCoordinator::new(
            sink.clone(),
            Arc::new(clock.clone()),
            "http://api.test",
        );
        coordinator.on_logged_in(Identity {
            user_id: UserId::new("1"),
            username: "alice".to_string(),
            avatar: None,
        });
        (coordinator, sink, clock)
    }

    fn event(name: &str, payload: Value) -> SessionInput {
        SessionInput::Transport(TransportEvent::Message {
            name: name.to_string(),
            payload,
        })
    }

    fn ack(id: u64, payload: Value) -> SessionInput {
        SessionInput::Transport(TransportEvent::Ack { id, payload })
    }

    fn room_update(players: Value) -> Value {
        json!({"code": CODE, "title": "Friday quiz", "hostUserId": 1, "players": players})
    }

    /// Enter the room and receive a roster with alice (host) and bob.
    fn joined() -> (SessionCoordinator, Arc<RecordingSink>, ManualClock) {
        let (mut coordinator, sink, clock) = setup();
        coordinator.enter_room(RoomCode::parse(CODE).unwrap());
        coordinator.handle(event(
            "room:update",
            room_update(json!([
                {"userId": 1, "username": "alice"},
                {"userId": 2, "username": "bob"}
            ])),
        ));
        clock.advance(JOIN_ROOM_SYNC_DELAY_MS);
        coordinator.tick();
        coordinator.take_signals();
        coordinator.take_requests();
        sink.clear();
        (coordinator, sink, clock)
    }

    fn question(ends_in_ms: i64, clock: &ManualClock) -> Value {
        let now = clock.now_millis();
        json!({
            "code": CODE,
            "serverNow": now,
            "startsAt": now,
            "endsAt": now + ends_in_ms,
            "question": {"id": "q1", "text": "Capital of France?", "type": "TEXT"}
        })
    }

    #[test]
    fn test_enter_room_joins_and_schedules_sync() {
        // テスト項目: 入室で room:join が送信され、150ms 後に room:sync が送信される
        // given (前提条件):
        let (mut coordinator, sink, clock) = setup();

        // when (操作):
        coordinator.enter_room(RoomCode::parse(CODE).unwrap());
        clock.advance(JOIN_ROOM_SYNC_DELAY_MS);
        coordinator.tick();

        // then (期待する結果):
        assert_eq!(sink.names(), vec!["room:join", "room:sync"]);
        assert_eq!(coordinator.screen(), Screen::Room);
        assert_eq!(
            coordinator.take_signals(),
            vec![Signal::EnteredRoom(RoomCode::parse(CODE).unwrap())]
        );
        let join = sink.sent.lock().unwrap()[0].1.clone();
        assert_eq!(join["username"], "alice");
    }

    #[test]
    fn test_self_removal_returns_to_lobby() {
        // テスト項目: 新しい名簿から自分が消えたらロビーに戻る
        // given (前提条件):
        let (mut coordinator, _sink, _clock) = joined();
        assert!(coordinator.room().is_host());

        // when (操作):
        coordinator.handle(event(
            "room:update",
            room_update(json!([{"userId": 2, "username": "bob"}])),
        ));

        // then (期待する結果):
        assert_eq!(coordinator.screen(), Screen::Lobby);
        assert_eq!(coordinator.room().state(), RoomState::Idle);
        assert_eq!(
            coordinator.take_signals(),
            vec![Signal::LeftRoom {
                to_lobby: true,
                reason: LeaveReason::Removed
            }]
        );
    }

    #[test]
    fn test_banned_event_returns_to_lobby() {
        // テスト項目: room:banned を受信するとロビーに戻りステータスが表示される
        // given (前提条件):
        let (mut coordinator, _sink, _clock) = joined();

        // when (操作):
        coordinator.handle(event("room:banned", json!({"code": CODE})));

        // then (期待する結果):
        assert_eq!(coordinator.screen(), Screen::Lobby);
        assert!(coordinator.room().active_code().is_none());
        assert!(coordinator.status().unwrap().contains("banned"));
    }

    #[test]
    fn test_event_for_other_room_is_ignored() {
        // テスト項目: 別の部屋宛てのイベントは無視される
        // given (前提条件):
        let (mut coordinator, sink, _clock) = joined();

        // when (操作):
        coordinator.handle(event("room:kicked", json!({"code": "ZZZ999"})));

        // then (期待する結果):
        assert_eq!(coordinator.screen(), Screen::Room);
        assert!(coordinator.room().active_code().is_some());
        assert!(sink.names().is_empty());
    }

    #[test]
    fn test_question_on_lobby_screen_opens_quiz() {
        // テスト項目: ロビー表示中でも quiz:question を受信するとクイズ画面に遷移する
        // given (前提条件):
        let (mut coordinator, sink, clock) = joined();
        coordinator.show_lobby();

        // when (操作):
        coordinator.handle(event("quiz:question", question(30_000, &clock)));

        // then (期待する結果):
        assert_eq!(coordinator.screen(), Screen::Quiz);
        assert_eq!(coordinator.take_signals(), vec![Signal::StartedQuiz]);
        assert_eq!(sink.names(), vec!["quiz:sync"]);
        assert_eq!(coordinator.quiz().phase(), RoundPhase::QuestionActive);
        assert_eq!(coordinator.quiz().question().unwrap().id, "q1");
    }

    #[test]
    fn test_quiz_entry_resync_fires_once() {
        // テスト項目: クイズ画面への入場後 800ms の再同期は入室ごとに一度だけ
        // given (前提条件):
        let (mut coordinator, sink, clock) = joined();
        coordinator.handle(event("room:started", json!({"code": CODE})));
        sink.clear();

        // when (操作):
        clock.advance(QUIZ_ENTRY_RESYNC_DELAY_MS);
        coordinator.tick();
        coordinator.handle(event("quiz:gotoRoom", json!({"code": CODE})));
        coordinator.handle(event("room:started", json!({"code": CODE})));
        clock.advance(QUIZ_ENTRY_RESYNC_DELAY_MS);
        coordinator.tick();

        // then (期待する結果):
        assert_eq!(
            sink.names(),
            vec!["quiz:sync", "quiz:sync", "quiz:sync"],
            "resync, view entry, room:started sync"
        );
    }

    #[test]
    fn test_second_answer_after_correct_is_noop() {
        // テスト項目: 正解の ack 後は同じラウンドで再回答しても送信されない
        // given (前提条件):
        let (mut coordinator, sink, clock) = joined();
        coordinator.handle(event("quiz:question", question(30_000, &clock)));
        assert!(coordinator.submit_answer("Paris"));
        let id = sink.last_id("quiz:answer");

        // when (操作):
        coordinator.handle(ack(id, json!({"correct": true})));
        sink.clear();
        let resent = coordinator.submit_answer("Paris again");

        // then (期待する結果):
        assert!(!resent);
        assert!(sink.names().is_empty());
        assert!(coordinator.quiz().answered_correctly());
        assert_eq!(coordinator.quiz().status(), Some("Correct!"));
    }

    #[test]
    fn test_wrong_answer_allows_retry() {
        // テスト項目: 不正解の ack 後は再回答できる
        // given (前提条件):
        let (mut coordinator, sink, clock) = joined();
        coordinator.handle(event("quiz:question", question(30_000, &clock)));
        coordinator.submit_answer("Lyon");
        let id = sink.last_id("quiz:answer");

        // when (操作):
        coordinator.handle(ack(id, json!({"correct": false})));

        // then (期待する結果):
        assert_eq!(coordinator.quiz().status(), Some("Wrong!"));
        assert!(coordinator.submit_answer("Paris"));
    }

    #[test]
    fn test_countdown_reaches_timed_out() {
        // テスト項目: 残り時間が 0 になった表示 tick で TimedOut に遷移する
        // given (前提条件):
        let (mut coordinator, _sink, clock) = joined();
        coordinator.handle(event("quiz:question", question(5_000, &clock)));

        // when (操作):
        clock.advance(5_000);
        coordinator.tick();

        // then (期待する結果):
        assert_eq!(coordinator.quiz().phase(), RoundPhase::TimedOut);
        assert_eq!(coordinator.quiz().remaining_ms(clock.now_millis()), Some(0));
    }

    #[test]
    fn test_countdown_uses_server_drift() {
        // テスト項目: 問題受信時の serverNow から時計のずれが推定され、残り時間に反映される
        // given (前提条件):
        let sink = Arc::new(RecordingSink::new());
        let local_now = 1_000_000;
        let mut coordinator =
            SessionCoordinator::new(sink, Arc::new(FixedClock::new(local_now)), "");
        coordinator.enter_room(RoomCode::parse(CODE).unwrap());

        // when (操作):
        coordinator.handle(event(
            "quiz:question",
            json!({
                "serverNow": local_now + 2_000,
                "endsAt": local_now + 12_000,
                "question": {"id": "q7", "text": "Longest river?"}
            }),
        ));

        // then (期待する結果):
        assert_eq!(coordinator.quiz().drift_ms(), 2_000);
        assert_eq!(coordinator.quiz().remaining_ms(local_now), Some(10_000));
    }

    #[test]
    fn test_reconnect_rejoins_and_resyncs() {
        // テスト項目: 再接続時に room:join と room:sync が再送される
        // given (前提条件):
        let (mut coordinator, sink, _clock) = joined();
        coordinator.handle(SessionInput::Transport(TransportEvent::Disconnected));

        // when (操作):
        coordinator.handle(SessionInput::Transport(TransportEvent::Connected));

        // then (期待する結果):
        assert_eq!(sink.names(), vec!["room:join", "room:sync"]);
    }

    #[test]
    fn test_connected_outside_room_sends_nothing() {
        // テスト項目: 部屋にいないときの接続イベントでは何も送信されない
        // given (前提条件):
        let (mut coordinator, sink, _clock) = setup();

        // when (操作):
        coordinator.handle(SessionInput::Transport(TransportEvent::Connected));

        // then (期待する結果):
        assert!(sink.names().is_empty());
    }

    #[test]
    fn test_leave_completes_on_ack() {
        // テスト項目: room:leave の ack で退室が完了する
        // given (前提条件):
        let (mut coordinator, sink, _clock) = joined();
        coordinator.leave_room().unwrap();
        let id = sink.last_id("room:leave");

        // when (操作):
        coordinator.handle(ack(id, json!({"ok": true})));

        // then (期待する結果):
        assert_eq!(coordinator.screen(), Screen::Lobby);
        assert_eq!(coordinator.room().state(), RoomState::Idle);
        assert_eq!(
            coordinator.take_signals(),
            vec![Signal::LeftRoom {
                to_lobby: true,
                reason: LeaveReason::Left
            }]
        );
    }

    #[test]
    fn test_leave_fallback_without_ack() {
        // テスト項目: ack が来なくても 500ms 後に退室が完了し、シグナルは一度だけ
        // given (前提条件):
        let (mut coordinator, sink, clock) = joined();
        coordinator.leave_room().unwrap();
        let id = sink.last_id("room:leave");

        // when (操作):
        clock.advance(LEAVE_FALLBACK_MS);
        coordinator.tick();
        coordinator.handle(ack(id, json!({"ok": true})));

        // then (期待する結果):
        assert_eq!(coordinator.room().state(), RoomState::Idle);
        assert_eq!(coordinator.take_signals().len(), 1);
    }

    #[test]
    fn test_leave_while_disconnected_completes_immediately() {
        // テスト項目: 切断中の退室は即座に完了する
        // given (前提条件):
        let (mut coordinator, sink, _clock) = joined();
        sink.disconnect();

        // when (操作):
        coordinator.leave_room().unwrap();

        // then (期待する結果):
        assert_eq!(coordinator.screen(), Screen::Lobby);
        assert_eq!(coordinator.room().state(), RoomState::Idle);
    }

    #[test]
    fn test_start_ack_opens_quiz_and_syncs() {
        // テスト項目: room:start の ok ack でクイズ画面に遷移し 150ms 後に quiz:sync が送信される
        // given (前提条件):
        let (mut coordinator, sink, clock) = joined();
        coordinator.start_quiz().unwrap();
        let id = sink.last_id("room:start");
        sink.clear();

        // when (操作):
        coordinator.handle(ack(id, json!({"ok": true})));
        clock.advance(START_ACK_QUIZ_SYNC_DELAY_MS);
        coordinator.tick();

        // then (期待する結果):
        assert_eq!(coordinator.screen(), Screen::Quiz);
        assert_eq!(coordinator.take_signals(), vec![Signal::StartedQuiz]);
        assert_eq!(sink.names(), vec!["quiz:sync", "quiz:sync"]);
    }

    #[test]
    fn test_start_refused_shows_error() {
        // テスト項目: room:start が拒否されるとエラーがステータスに表示される
        // given (前提条件):
        let (mut coordinator, sink, _clock) = joined();
        coordinator.start_quiz().unwrap();
        let id = sink.last_id("room:start");

        // when (操作):
        coordinator.handle(ack(id, json!({"ok": false, "error": "not_enough_players"})));

        // then (期待する結果):
        assert_eq!(coordinator.screen(), Screen::Room);
        assert_eq!(coordinator.status(), Some("Cannot start: not_enough_players"));
    }

    #[test]
    fn test_start_fallback_sync() {
        // テスト項目: ack が無くても開始要求の 2000ms 後に quiz:sync が送信される
        // given (前提条件):
        let (mut coordinator, sink, clock) = joined();
        coordinator.start_quiz().unwrap();
        sink.clear();

        // when (操作):
        clock.advance(START_FALLBACK_QUIZ_SYNC_MS);
        coordinator.tick();

        // then (期待する結果):
        assert_eq!(sink.names(), vec!["quiz:sync"]);
    }

    #[test]
    fn test_start_requires_host() {
        // テスト項目: ホスト以外は開始できない
        // given (前提条件):
        let (mut coordinator, sink, _clock) = joined();
        coordinator.handle(event(
            "room:update",
            json!({"code": CODE, "hostUserId": 2}),
        ));

        // when (操作):
        let result = coordinator.start_quiz();

        // then (期待する結果):
        assert!(matches!(result, Err(ClientError::NotHost)));
        assert!(sink.names().is_empty());
    }

    #[test]
    fn test_membership_without_change_resyncs_with_throttle() {
        // テスト項目: 変化の無いメンバーシップイベントで room:sync と REST 再取得（800ms 間引き）が要求される
        // given (前提条件):
        let (mut coordinator, sink, clock) = joined();
        let roster = room_update(json!([
            {"userId": 1, "username": "alice"},
            {"userId": 2, "username": "bob"}
        ]));

        // when (操作):
        coordinator.handle(event("room:memberJoined", roster.clone()));
        coordinator.handle(event("room:memberJoined", roster.clone()));
        let throttled = coordinator.take_requests();
        clock.advance(ROOM_REFRESH_THROTTLE_MS);
        coordinator.handle(event("room:memberJoined", roster));

        // then (期待する結果):
        assert_eq!(
            throttled,
            vec![ApiRequest::FetchRoom(RoomCode::parse(CODE).unwrap())]
        );
        assert_eq!(
            coordinator.take_requests(),
            vec![ApiRequest::FetchRoom(RoomCode::parse(CODE).unwrap())]
        );
        assert_eq!(sink.names(), vec!["room:sync", "room:sync", "room:sync"]);
    }

    #[test]
    fn test_malformed_result_sets_status_and_resyncs() {
        // テスト項目: 不正な quiz:result でエラー表示と再同期が行われる
        // given (前提条件):
        let (mut coordinator, sink, clock) = joined();
        coordinator.handle(event("quiz:question", question(30_000, &clock)));
        sink.clear();

        // when (操作):
        coordinator.handle(event("quiz:result", json!("garbage")));

        // then (期待する結果):
        assert_eq!(coordinator.quiz().status(), Some("Error: NotAnObject"));
        assert_eq!(sink.names(), vec!["quiz:sync"]);
    }

    #[test]
    fn test_image_hint_requests_media() {
        // テスト項目: 画像問題の相対パスは API ベースと結合して取得要求され、読み込み結果が反映される
        // given (前提条件):
        let (mut coordinator, _sink, clock) = joined();
        let mut payload = question(30_000, &clock);
        payload["question"]["type"] = json!("IMAGE");
        payload["question"]["imagePath"] = json!("/media/q1.png");

        // when (操作):
        coordinator.handle(event("quiz:question", payload));
        let requests = coordinator.take_requests();
        let round = coordinator.quiz().round();
        coordinator.handle(SessionInput::Api(ApiOutcome::MediaLoaded {
            round,
            data: Some(vec![1, 2, 3]),
        }));

        // then (期待する結果):
        assert_eq!(
            requests,
            vec![ApiRequest::LoadMedia {
                round,
                url: "http://api.test/media/q1.png".to_string()
            }]
        );
        assert!(matches!(coordinator.quiz().hint(), crate::domain::Hint::Image { .. }));
    }

    #[test]
    fn test_profile_password_mismatch_is_local() {
        // テスト項目: 新しいパスワードと確認が一致しない場合は送信せずにエラーになる
        // given (前提条件):
        let (mut coordinator, sink, _clock) = setup();
        let changes = ProfileChanges {
            old_password: Some("old".to_string()),
            new_password: Some("new-one".to_string()),
            confirm_password: Some("new-two".to_string()),
            ..Default::default()
        };

        // when (操作):
        let result = coordinator.update_profile(changes);

        // then (期待する結果):
        assert_eq!(result, Err(ProfileUpdateError::PasswordMismatch));
        assert!(sink.names().is_empty());
    }

    #[test]
    fn test_profile_ack_error_code() {
        // テスト項目: profile:update の ack エラーコードが ProfileUpdateError に変換され、成功時は /auth/me を要求する
        // given (前提条件):
        let (mut coordinator, sink, _clock) = setup();
        let changes = ProfileChanges {
            username: Some("alicia".to_string()),
            ..Default::default()
        };
        coordinator.update_profile(changes.clone()).unwrap();
        let first = sink.last_id("profile:update");

        // when (操作):
        coordinator.handle(ack(first, json!({"ok": false, "error": "bad_image"})));
        let refused = coordinator.profile_result().cloned();
        coordinator.update_profile(changes).unwrap();
        let second = sink.last_id("profile:update");
        coordinator.handle(ack(second, json!({"ok": true})));

        // then (期待する結果):
        assert_eq!(refused, Some(Err(ProfileUpdateError::BadImage)));
        assert_eq!(coordinator.profile_result(), Some(&Ok(())));
        assert_eq!(coordinator.take_requests(), vec![ApiRequest::FetchMe]);
    }

    #[test]
    fn test_logout_resets_everything() {
        // テスト項目: ログアウトで切断・状態リセット・loggedOut シグナルが行われる
        // given (前提条件):
        let (mut coordinator, sink, _clock) = joined();

        // when (操作):
        coordinator.logout();

        // then (期待する結果):
        assert!(!sink.is_connected());
        assert_eq!(coordinator.screen(), Screen::Login);
        assert!(coordinator.identity().is_none());
        assert!(coordinator.room().active_code().is_none());
        assert_eq!(coordinator.take_signals(), vec![Signal::LoggedOut]);
        assert_eq!(coordinator.take_requests(), vec![ApiRequest::Logout]);
    }

    #[test]
    fn test_join_room_validates_code() {
        // テスト項目: 不正な部屋コードでは参加要求が作られない
        // given (前提条件):
        let (mut coordinator, _sink, _clock) = setup();

        // when (操作):
        let bad = coordinator.join_room("ab");
        let good = coordinator.join_room(" abc-123 ");

        // then (期待する結果):
        assert!(matches!(bad, Err(ClientError::InvalidRoomCode(_))));
        assert!(good.is_ok());
        assert_eq!(
            coordinator.take_requests(),
            vec![ApiRequest::JoinRoom(RoomCode::parse(CODE).unwrap())]
        );
    }

    #[test]
    fn test_suggestion_outcome_sets_status() {
        // テスト項目: 問題の提案は REST 要求になり、結果はステータスとして表示される
        // given (前提条件):
        let (mut coordinator, _sink, _clock) = setup();
        let suggestion = Suggestion {
            text: "Who wrote it?".to_string(),
            kind: crate::infrastructure::api::SuggestionKind::Citation,
            answer: "Hugo".to_string(),
            alternatives: vec![],
            explanation: String::new(),
            category_ids: vec![3],
            citation_text: Some("Demain".to_string()),
            image: None,
        };

        // when (操作):
        coordinator.suggest_question(suggestion.clone());
        let requests = coordinator.take_requests();
        coordinator.handle(SessionInput::Api(ApiOutcome::Suggested(Ok(()))));
        let sent = coordinator.status().map(str::to_string);
        coordinator.handle(SessionInput::Api(ApiOutcome::Suggested(Err(
            "Cannot send the question: 400".to_string(),
        ))));

        // then (期待する結果):
        assert_eq!(requests, vec![ApiRequest::Suggest(suggestion)]);
        assert_eq!(sent.as_deref(), Some(SUGGESTION_SENT));
        assert_eq!(coordinator.status(), Some("Cannot send the question: 400"));
    }

    #[test]
    fn test_entering_another_room_leaves_the_current_one() {
        // テスト項目: 部屋に居る状態で別の部屋に入ると、先に元の部屋へ room:leave が送られる
        // given (前提条件):
        let (mut coordinator, sink, _clock) = joined();
        let other = RoomCode::parse("ZZZ999").unwrap();
        coordinator.join_room("zzz999").unwrap();
        assert_eq!(
            coordinator.take_requests(),
            vec![ApiRequest::JoinRoom(other.clone())]
        );

        // when (操作):
        coordinator.handle(SessionInput::Api(ApiOutcome::RoomReady(Ok(other.clone()))));

        // then (期待する結果):
        assert_eq!(sink.names(), vec!["room:leave", "room:join"]);
        let sent = sink.sent.lock().unwrap().clone();
        assert_eq!(sent[0].1, json!({"code": CODE}));
        assert_eq!(sent[1].1["code"], "ZZZ999");
        assert_eq!(coordinator.room().active_code(), Some(&other));
    }

    #[test]
    fn test_reentering_the_same_room_does_not_leave() {
        // テスト項目: 同じ部屋に入り直す場合は room:leave を送らない
        // given (前提条件):
        let (mut coordinator, sink, _clock) = joined();

        // when (操作):
        coordinator.enter_room(RoomCode::parse(CODE).unwrap());

        // then (期待する結果):
        assert_eq!(sink.names(), vec!["room:join"]);
    }

    #[test]
    fn test_host_config_update_emits_params_and_saves() {
        // テスト項目: ホストの設定変更で room:config に全パラメータが送られ、REST 保存も要求される
        // given (前提条件):
        let (mut coordinator, sink, _clock) = joined();
        let mut config = coordinator.current_config().unwrap();
        config.max_players = 4;
        config.scoring_mode = crate::domain::ScoringMode::Fixed;

        // when (操作):
        coordinator.update_config(config.clone()).unwrap();

        // then (期待する結果):
        assert_eq!(sink.names(), vec!["room:config"]);
        let sent = sink.sent.lock().unwrap()[0].1.clone();
        assert_eq!(sent["code"], CODE);
        assert_eq!(
            sent["params"],
            json!({
                "private": false,
                "maxPlayers": 4,
                "answerTimeSec": 15,
                "targetPoints": 100,
                "scoring": "fixe",
                "showProposals": true,
                "categories": [],
                "resultDelaySec": 5,
                "excludedUsernames": []
            })
        );
        let code = RoomCode::parse(CODE).unwrap();
        assert_eq!(
            coordinator.take_requests(),
            vec![ApiRequest::PutSettings {
                code,
                config: config.clone()
            }]
        );
        assert_eq!(coordinator.current_config().unwrap(), config);
    }

    #[test]
    fn test_non_host_config_update_sends_nothing() {
        // テスト項目: ホスト以外の設定変更は NotHost になり、何も送信されない
        // given (前提条件):
        let (mut coordinator, sink, _clock) = joined();
        coordinator.handle(event(
            "room:update",
            json!({"code": CODE, "hostUserId": 2}),
        ));
        sink.clear();
        coordinator.take_requests();
        let mut config = coordinator.current_config().unwrap();
        config.max_players = 4;

        // when (操作):
        let result = coordinator.update_config(config);

        // then (期待する結果):
        assert!(matches!(result, Err(ClientError::NotHost)));
        assert!(sink.names().is_empty());
        assert!(coordinator.take_requests().is_empty());
        assert_eq!(coordinator.current_config().unwrap().max_players, 10);
    }

    #[test]
    fn test_unban_ack_replaces_exclusion_list() {
        // テスト項目: room:unban の ack に含まれる除外リストで既存のリストが置き換えられる
        // given (前提条件):
        let (mut coordinator, sink, _clock) = joined();
        let mut config = coordinator.current_config().unwrap();
        config.excluded_usernames = vec!["mallory".to_string(), "carol".to_string()];
        coordinator.update_config(config).unwrap();
        coordinator.take_requests();
        sink.clear();

        // when (操作):
        coordinator.unban("mallory").unwrap();
        let id = sink.last_id("room:unban");
        coordinator.handle(ack(id, json!({"ok": true, "excludedUsernames": ["carol"]})));

        // then (期待する結果):
        let sent = sink.sent.lock().unwrap()[0].1.clone();
        assert_eq!(sent, json!({"code": CODE, "username": "mallory"}));
        assert_eq!(
            coordinator.current_config().unwrap().excluded_usernames,
            vec!["carol".to_string()]
        );
    }

    #[test]
    fn test_kicked_event_returns_to_lobby() {
        // テスト項目: 現在の部屋宛ての room:kicked を受信するとロビーに戻る
        // given (前提条件):
        let (mut coordinator, _sink, _clock) = joined();

        // when (操作):
        coordinator.handle(event("room:kicked", json!({"code": CODE})));

        // then (期待する結果):
        assert_eq!(coordinator.screen(), Screen::Lobby);
        assert!(coordinator.room().active_code().is_none());
        assert_eq!(coordinator.room().state(), RoomState::Idle);
        assert_eq!(coordinator.status(), Some("You are no longer in the room"));
        assert_eq!(
            coordinator.take_signals(),
            vec![Signal::LeftRoom {
                to_lobby: true,
                reason: LeaveReason::Kicked
            }]
        );
    }

    #[test]
    fn test_profile_update_during_round_keeps_quiz_view() {
        // テスト項目: ラウンド中のプロフィール更新では画面が変わらず、回答を続けられる
        // given (前提条件):
        let (mut coordinator, _sink, clock) = joined();
        coordinator.handle(event("quiz:question", question(30_000, &clock)));
        assert_eq!(coordinator.screen(), Screen::Quiz);

        // when (操作):
        coordinator
            .update_profile(crate::session::command::rename_changes("alicia"))
            .unwrap();

        // then (期待する結果):
        assert_eq!(coordinator.screen(), Screen::Quiz);
        assert!(coordinator.submit_answer("Paris"));
    }
}
