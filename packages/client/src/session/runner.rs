//! Async driver of a logged-in session.
//!
//! A single task owns the [`SessionCoordinator`]. It drains the input queue
//! every 10 ms, refreshes the countdown every 200 ms and reads commands from
//! a line-editor thread. REST requests run on spawned tasks and their
//! outcomes come back through the same queue as transport events.

use std::{sync::Arc, time::Duration};

use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::mpsc;

use super::{
    ApiOutcome, ApiRequest, Screen, SessionCoordinator, SessionInput, Signal,
    command::{self, Command},
};
use crate::{
    domain::{
        GameEndSummary, Hint, Proposal, RoomCode, RoomSession, RoundPhase, RoundResult, time_sync,
    },
    error::ClientError,
    formatter::MessageFormatter,
    infrastructure::{
        api::{RoomApi, SuggestionKind},
        dto::conversion::ProfileChanges,
        transport::{EventProducer, EventQueue},
    },
    ui,
};

const DRAIN_INTERVAL: Duration = Duration::from_millis(10);
const DISPLAY_TICK: Duration = Duration::from_millis(200);
/// Time given to the transport to flush a leave before exiting
const EXIT_FLUSH_DELAY: Duration = Duration::from_millis(200);

/// Execute one REST request, rendering failures for display.
pub async fn execute_request(api: &dyn RoomApi, request: ApiRequest) -> ApiOutcome {
    match request {
        ApiRequest::CreateRoom { name, visibility } => {
            let result = match api.create_room(name, visibility).await {
                Ok(code) => RoomCode::parse(&code).map_err(|e| e.to_string()),
                Err(e) => Err(format!("Cannot create room: {}", e)),
            };
            ApiOutcome::RoomReady(result)
        }
        ApiRequest::JoinRoom(code) => match api.join_room(code.as_str()).await {
            Ok(()) => ApiOutcome::RoomReady(Ok(code)),
            Err(e) => ApiOutcome::RoomReady(Err(format!("Cannot join {}: {}", code, e))),
        },
        ApiRequest::FetchRoom(code) => {
            let snapshot = api.get_room(code.as_str()).await.map_err(|e| e.to_string());
            ApiOutcome::RoomFetched { code, snapshot }
        }
        ApiRequest::PutSettings { code, config } => {
            let result = api
                .put_settings(code.as_str(), config)
                .await
                .map_err(|e| e.to_string());
            ApiOutcome::SettingsSaved { code, result }
        }
        ApiRequest::LoadMedia { round, url } => {
            let data = match api.fetch_media(&url).await {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    tracing::debug!("Cannot load {}: {}", url, e);
                    None
                }
            };
            ApiOutcome::MediaLoaded { round, data }
        }
        ApiRequest::FetchMe => ApiOutcome::Me(api.me().await.map_err(|e| e.to_string())),
        ApiRequest::Logout => {
            if let Err(e) = api.logout().await {
                tracing::warn!("Logout request failed: {}", e);
            }
            ApiOutcome::LoggedOut
        }
        ApiRequest::PublicRooms => {
            ApiOutcome::PublicRooms(api.public_rooms().await.map_err(|e| e.to_string()))
        }
        ApiRequest::Leaderboard => {
            let result = match (api.leaderboard().await, api.proposers().await) {
                (Ok(leaders), Ok(proposers)) => Ok((leaders, proposers)),
                (Err(e), _) | (_, Err(e)) => Err(e.to_string()),
            };
            ApiOutcome::Leaderboard(result)
        }
        ApiRequest::Categories => {
            ApiOutcome::Categories(api.categories().await.map_err(|e| e.to_string()))
        }
        ApiRequest::Suggest(suggestion) => ApiOutcome::Suggested(
            api.suggest(suggestion)
                .await
                .map_err(|e| format!("Cannot send the question: {}", e)),
        ),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

/// What has already been printed, so only changes are rendered.
#[derive(Debug, Default)]
struct Rendered {
    room: Option<RoomSession>,
    round: u64,
    hint: Option<Hint>,
    proposals: Vec<Proposal>,
    result: Option<RoundResult>,
    game_end: Option<GameEndSummary>,
    status: Option<String>,
    quiz_status: Option<String>,
    countdown: Option<i64>,
}

pub struct SessionRunner {
    coordinator: SessionCoordinator,
    api: Arc<dyn RoomApi>,
    producer: EventProducer<SessionInput>,
    queue: EventQueue<SessionInput>,
    rendered: Rendered,
    username: String,
}

impl SessionRunner {
    /// `producer` must feed `queue`; the transport holds another clone of it.
    pub fn new(
        coordinator: SessionCoordinator,
        api: Arc<dyn RoomApi>,
        producer: EventProducer<SessionInput>,
        queue: EventQueue<SessionInput>,
    ) -> Self {
        let username = coordinator
            .identity()
            .map(|me| me.username.clone())
            .unwrap_or_default();
        Self {
            coordinator,
            api,
            producer,
            queue,
            rendered: Rendered::default(),
            username,
        }
    }

    /// Run until the user quits, logs out or closes the input.
    pub async fn run(mut self) {
        let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
        spawn_line_editor(ui::prompt(&self.username), line_tx);
        self.coordinator.show_lobby();

        let mut drain = tokio::time::interval(DRAIN_INTERVAL);
        let mut display = tokio::time::interval(DISPLAY_TICK);

        loop {
            let flow = tokio::select! {
                _ = drain.tick() => self.drain().await,
                _ = display.tick() => {
                    self.render_countdown();
                    Flow::Continue
                }
                line = line_rx.recv() => match line {
                    Some(line) => self.on_line(&line).await,
                    None => self.quit().await,
                },
            };
            if flow == Flow::Exit {
                break;
            }
        }
    }

    /// Apply every queued input in arrival order, then fire timers.
    async fn drain(&mut self) -> Flow {
        for input in self.queue.drain() {
            if let SessionInput::Api(outcome) = &input {
                self.show_api_outcome(outcome);
            }
            self.coordinator.handle(input);
        }
        self.coordinator.tick();

        let mut flow = Flow::Continue;
        for signal in self.coordinator.take_signals() {
            match signal {
                Signal::LeftRoom { reason, .. } => {
                    self.rendered = Rendered::default();
                    self.print(&MessageFormatter::format_left_room(reason));
                }
                Signal::EnteredRoom(code) => {
                    self.rendered = Rendered::default();
                    self.print(&format!("\n+ Entered room {}\n", code));
                }
                Signal::StartedQuiz => self.print("\n+ The quiz is on!\n"),
                Signal::ReturnedToRoom => {
                    // print the room again below the quiz output
                    self.rendered.room = None;
                }
                Signal::LoggedOut => flow = Flow::Exit,
            }
        }
        self.dispatch_requests().await;
        self.render();
        flow
    }

    async fn dispatch_requests(&mut self) {
        for request in self.coordinator.take_requests() {
            if request == ApiRequest::Logout {
                // awaited inline: the process exits right after
                execute_request(self.api.as_ref(), request).await;
                continue;
            }
            let api = self.api.clone();
            let producer = self.producer.clone();
            tokio::spawn(async move {
                let outcome = execute_request(api.as_ref(), request).await;
                producer.push(outcome);
            });
        }
    }

    async fn on_line(&mut self, line: &str) -> Flow {
        let Some(command) = command::parse(line) else {
            return Flow::Continue;
        };
        let result = match command {
            Command::Create(name) => self.coordinator.create_room(name, Default::default()),
            Command::Join(code) => self.coordinator.join_room(&code),
            Command::Leave => self.coordinator.leave_room(),
            Command::Start => self.coordinator.start_quiz(),
            Command::Set { key, value } => {
                self.coordinator
                    .current_config()
                    .and_then(|mut config| {
                        command::apply_setting(&mut config, &key, &value)?;
                        self.coordinator.update_config(config)
                    })
            }
            Command::Unban(username) => self.coordinator.unban(&username),
            Command::Sync => self.coordinator.request_sync(),
            Command::Rooms => {
                self.coordinator.request_public_rooms();
                Ok(())
            }
            Command::Leaders => {
                self.coordinator.request_leaderboard();
                Ok(())
            }
            Command::Categories => {
                self.coordinator.request_categories();
                Ok(())
            }
            Command::Suggest { kind, fields } => self.suggest(kind, fields).await,
            Command::Lobby => {
                self.coordinator.show_lobby();
                Ok(())
            }
            Command::Profile => {
                self.coordinator.show_profile();
                if let Some(me) = self.coordinator.identity() {
                    self.print(&MessageFormatter::format_profile(me));
                }
                Ok(())
            }
            Command::Rename(username) => {
                self.update_profile(command::rename_changes(&username));
                Ok(())
            }
            Command::Password { old, new, confirm } => {
                self.update_profile(command::password_changes(&old, &new, &confirm));
                Ok(())
            }
            Command::Avatar(path) => {
                match tokio::fs::read(&path).await {
                    Ok(bytes) => self.update_profile(command::avatar_changes(&path, &bytes)),
                    Err(e) => self.print(&MessageFormatter::format_status(&format!(
                        "Cannot read {}: {}",
                        path, e
                    ))),
                }
                Ok(())
            }
            Command::Help => {
                self.print(&format!("\n{}\n", command::HELP));
                Ok(())
            }
            Command::Logout => {
                self.coordinator.logout();
                return self.drain().await;
            }
            Command::Quit => return self.quit().await,
            Command::Answer(text) => {
                if self.coordinator.screen() != Screen::Quiz {
                    Err(ClientError::Validation(
                        "no question to answer (try /help)".to_string(),
                    ))
                } else {
                    if !self.coordinator.submit_answer(&text) {
                        tracing::debug!(
                            "Answer not submitted in phase {:?}",
                            self.coordinator.quiz().phase()
                        );
                    }
                    Ok(())
                }
            }
            Command::Invalid(line) => {
                self.print(&MessageFormatter::format_status(&format!(
                    "Unknown command or bad arguments: {} (try /help)",
                    line
                )));
                Ok(())
            }
        };
        if let Err(e) = result {
            self.print(&MessageFormatter::format_status(&e.to_string()));
        }
        Flow::Continue
    }

    /// Profile edits keep the current view, so a round in progress stays answerable.
    fn update_profile(&mut self, changes: ProfileChanges) {
        if let Err(e) = self.coordinator.update_profile(changes) {
            self.print(&MessageFormatter::format_status(&e.to_string()));
        }
    }

    async fn suggest(
        &mut self,
        kind: SuggestionKind,
        fields: Vec<String>,
    ) -> Result<(), ClientError> {
        let image = match kind {
            SuggestionKind::Image => {
                let path = fields.get(3).map(String::as_str).unwrap_or_default();
                if path.is_empty() {
                    None
                } else {
                    let bytes = tokio::fs::read(path).await.map_err(|e| {
                        ClientError::Validation(format!("Cannot read {}: {}", path, e))
                    })?;
                    Some(bytes)
                }
            }
            SuggestionKind::Citation => None,
        };
        let suggestion = command::build_suggestion(kind, &fields, image)?;
        self.coordinator.suggest_question(suggestion);
        Ok(())
    }

    /// Leave the room, if any, and stop.
    async fn quit(&mut self) -> Flow {
        if self.coordinator.leave_room().is_ok() {
            tokio::time::sleep(EXIT_FLUSH_DELAY).await;
        }
        Flow::Exit
    }

    fn show_api_outcome(&self, outcome: &ApiOutcome) {
        match outcome {
            ApiOutcome::PublicRooms(Ok(rooms)) => {
                self.print(&MessageFormatter::format_public_rooms(rooms));
            }
            ApiOutcome::Leaderboard(Ok((leaders, proposers))) => {
                self.print(&MessageFormatter::format_leaderboards(leaders, proposers));
            }
            ApiOutcome::Categories(Ok(categories)) => {
                self.print(&MessageFormatter::format_categories(categories));
            }
            ApiOutcome::PublicRooms(Err(message))
            | ApiOutcome::Leaderboard(Err(message))
            | ApiOutcome::Categories(Err(message)) => {
                self.print(&MessageFormatter::format_status(message));
            }
            _ => {}
        }
    }

    fn print(&self, text: &str) {
        ui::print_block(text, &self.username);
    }

    /// Print whatever changed since the last render.
    fn render(&mut self) {
        let mut output = String::new();
        let me = self.coordinator.identity().map(|me| me.user_id.clone());
        let room = self.coordinator.room().active_session().ok().cloned();

        if let Some(session) = &room
            && self.rendered.room.as_ref() != Some(session)
            && matches!(self.coordinator.screen(), Screen::Room | Screen::Lobby)
        {
            output.push_str(&MessageFormatter::format_room(session, me.as_ref()));
            self.rendered.room = Some(session.clone());
        }

        let quiz = self.coordinator.quiz();
        if let Some(question) = quiz.question() {
            if quiz.round() != self.rendered.round {
                output.push_str(&MessageFormatter::format_question(
                    quiz.round(),
                    question,
                    quiz.hint(),
                ));
                self.rendered.round = quiz.round();
                self.rendered.hint = Some(quiz.hint().clone());
                self.rendered.countdown = None;
            } else if self.rendered.hint.as_ref() != Some(quiz.hint()) {
                output.push_str(&MessageFormatter::format_hint(quiz.hint()));
                self.rendered.hint = Some(quiz.hint().clone());
            }
        }

        let show_proposals = room.as_ref().is_none_or(|s| s.config.show_proposals);
        if quiz.proposals() != self.rendered.proposals.as_slice() {
            if show_proposals && let Some(session) = &room {
                output.push_str(&MessageFormatter::format_proposals(
                    &session.players,
                    &quiz.latest_guesses(),
                ));
            }
            self.rendered.proposals = quiz.proposals().to_vec();
        }

        if quiz.result() != self.rendered.result.as_ref() {
            if let Some(result) = quiz.result() {
                output.push_str(&MessageFormatter::format_result(result));
            }
            self.rendered.result = quiz.result().cloned();
        }

        if quiz.game_end() != self.rendered.game_end.as_ref() {
            if let Some(summary) = quiz.game_end() {
                output.push_str(&MessageFormatter::format_game_end(summary));
            }
            self.rendered.game_end = quiz.game_end().cloned();
        }

        if quiz.status() != self.rendered.quiz_status.as_deref() {
            if let Some(status) = quiz.status() {
                output.push_str(&MessageFormatter::format_status(status));
            }
            self.rendered.quiz_status = quiz.status().map(str::to_string);
        }

        if self.coordinator.status() != self.rendered.status.as_deref() {
            if let Some(status) = self.coordinator.status() {
                output.push_str(&MessageFormatter::format_status(status));
            }
            self.rendered.status = self.coordinator.status().map(str::to_string);
        }

        if !output.is_empty() {
            self.print(&output);
        }
    }

    /// Countdown line at every ten seconds and over the last five.
    fn render_countdown(&mut self) {
        let quiz = self.coordinator.quiz();
        if quiz.phase() != RoundPhase::QuestionActive {
            return;
        }
        let Some(remaining) = quiz.remaining_ms(self.coordinator.now_millis()) else {
            return;
        };
        let seconds = time_sync::display_seconds(remaining);
        if self.rendered.countdown == Some(seconds) {
            return;
        }
        self.rendered.countdown = Some(seconds);
        if seconds > 0 && (seconds % 10 == 0 || seconds <= 5) {
            self.print(&MessageFormatter::format_countdown(seconds));
        }
    }
}

/// Read lines on a blocking thread and forward them to the runner.
fn spawn_line_editor(prompt: String, lines: mpsc::UnboundedSender<String>) {
    std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };

        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        rl.add_history_entry(line).ok();
                        if lines.send(line.to_string()).is_err() {
                            break;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });
}
