//! Room session state machine.
//!
//! Tracks membership, host identity, configuration and the exclusion list of
//! the room the local user is in. Updates arrive as already-normalized
//! [`RoomSnapshot`]s; the state machine never looks at wire payloads.
//!
//! ```text
//! Idle -> Joining -> Active -> Leaving -> Idle
//!                        \--> Kicked  -> Idle
//! ```

use std::collections::HashSet;

use crate::error::ClientError;

use super::{
    model::{Identity, Player, RoomConfig, RoomSnapshot, UserId},
    room_code::RoomCode,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
    Idle,
    Joining,
    Active,
    Leaving,
    Kicked,
}

/// Client-side mirror of one room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSession {
    pub code: RoomCode,
    pub title: String,
    pub host_user_id: Option<UserId>,
    pub players: Vec<Player>,
    pub config: RoomConfig,
}

impl RoomSession {
    pub fn new(code: RoomCode) -> Self {
        Self {
            code,
            title: String::new(),
            host_user_id: None,
            players: Vec::new(),
            config: RoomConfig::default(),
        }
    }

    pub fn host(&self) -> Option<&Player> {
        let host_id = self.host_user_id.as_ref()?;
        self.players.iter().find(|p| &p.user_id == host_id)
    }

    pub fn contains(&self, user_id: &UserId) -> bool {
        self.players.iter().any(|p| &p.user_id == user_id)
    }

    /// Title to show, falling back to the room code.
    pub fn display_title(&self) -> String {
        if self.title.is_empty() {
            format!("Room {}", self.code)
        } else {
            self.title.clone()
        }
    }
}

/// Result of applying a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Payload belongs to another room or no room is active
    Ignored,
    Applied {
        changed: bool,
        /// The local user disappeared from a roster that contained them
        forcibly_removed: bool,
    },
}

impl UpdateOutcome {
    pub fn changed(&self) -> bool {
        matches!(self, Self::Applied { changed: true, .. })
    }

    pub fn forcibly_removed(&self) -> bool {
        matches!(
            self,
            Self::Applied {
                forcibly_removed: true,
                ..
            }
        )
    }
}

#[derive(Debug)]
pub struct RoomMachine {
    state: RoomState,
    session: Option<RoomSession>,
    identity: Option<Identity>,
    is_host: bool,
}

impl Default for RoomMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomMachine {
    pub fn new() -> Self {
        Self {
            state: RoomState::Idle,
            session: None,
            identity: None,
            is_host: false,
        }
    }

    pub fn state(&self) -> RoomState {
        self.state
    }

    pub fn session(&self) -> Option<&RoomSession> {
        self.session.as_ref()
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn set_identity(&mut self, identity: Identity) {
        self.identity = Some(identity);
        self.recompute_host();
    }

    pub fn is_host(&self) -> bool {
        self.is_host
    }

    /// Code of the room being joined or already joined.
    pub fn active_code(&self) -> Option<&RoomCode> {
        match self.state {
            RoomState::Joining | RoomState::Active => self.session.as_ref().map(|s| &s.code),
            _ => None,
        }
    }

    /// Start joining a room with a fresh provisional mirror.
    pub fn begin_join(&mut self, code: RoomCode) {
        tracing::info!("Joining room {}", code);
        self.session = Some(RoomSession::new(code));
        self.state = RoomState::Joining;
        self.is_host = false;
    }

    /// Merge a normalized snapshot into the mirror.
    ///
    /// The roster, when present, replaces the whole player set. Every other
    /// field is overwritten only when present.
    pub fn apply_update(&mut self, snapshot: RoomSnapshot) -> UpdateOutcome {
        if !matches!(self.state, RoomState::Joining | RoomState::Active) {
            return UpdateOutcome::Ignored;
        }
        let Some(session) = self.session.as_mut() else {
            return UpdateOutcome::Ignored;
        };
        if let Some(code) = snapshot.code.as_deref()
            && !code.is_empty()
            && !code.eq_ignore_ascii_case(session.code.as_str())
        {
            tracing::debug!(
                "Ignoring update for room {} while in {}",
                code,
                session.code
            );
            return UpdateOutcome::Ignored;
        }

        let before = session.clone();
        let my_id = self.identity.as_ref().map(|i| i.user_id.clone());
        let was_present = my_id.as_ref().is_some_and(|id| session.contains(id));

        if let Some(title) = snapshot.title {
            session.title = title;
        }
        if let Some(host) = snapshot.host_user_id {
            session.host_user_id = Some(host);
        }
        if let Some(patch) = snapshot.config {
            patch.apply_to(&mut session.config);
        }
        let mut forcibly_removed = false;
        if let Some(players) = snapshot.players {
            session.players = dedupe_players(players);
            forcibly_removed =
                was_present && my_id.as_ref().is_some_and(|id| !session.contains(id));
        }

        if let Some(host_id) = session.host_user_id.as_ref()
            && !session.players.is_empty()
            && !session.contains(host_id)
        {
            tracing::warn!("Host {} is not in the roster of {}", host_id, session.code);
        }

        let changed = *session != before;
        if self.state == RoomState::Joining {
            tracing::info!("Room {} is active", session.code);
            self.state = RoomState::Active;
        }
        if forcibly_removed {
            tracing::info!("Local user no longer in room {}", session.code);
            self.state = RoomState::Kicked;
        }
        self.recompute_host();

        UpdateOutcome::Applied {
            changed,
            forcibly_removed,
        }
    }

    /// Move to `Leaving`, returning the code to send the leave event for.
    pub fn begin_leave(&mut self) -> Option<RoomCode> {
        let code = self.active_code()?.clone();
        self.state = RoomState::Leaving;
        Some(code)
    }

    /// Complete a leave. Returns `false` if the leave was already completed.
    pub fn finish_leave(&mut self) -> bool {
        if self.state != RoomState::Leaving {
            return false;
        }
        self.reset();
        true
    }

    /// The server excluded the local user from the room.
    pub fn mark_kicked(&mut self) {
        if self.state != RoomState::Idle {
            self.state = RoomState::Kicked;
        }
    }

    /// Drop the mirror and go back to `Idle`.
    pub fn reset(&mut self) {
        self.state = RoomState::Idle;
        self.session = None;
        self.is_host = false;
    }

    /// Active session, failing with [`ClientError::NotHost`] unless the local user hosts it.
    pub fn require_host(&self) -> Result<&RoomSession, ClientError> {
        let session = self.active_session()?;
        if !self.is_host {
            return Err(ClientError::NotHost);
        }
        Ok(session)
    }

    pub fn active_session(&self) -> Result<&RoomSession, ClientError> {
        match self.state {
            RoomState::Joining | RoomState::Active => {
                self.session.as_ref().ok_or(ClientError::NotInRoom)
            }
            _ => Err(ClientError::NotInRoom),
        }
    }

    /// Replace the cached config with a host-edited one.
    pub fn update_config(&mut self, config: RoomConfig) -> Result<RoomCode, ClientError> {
        self.require_host()?;
        validate_config(&config)?;
        let session = self.session.as_mut().ok_or(ClientError::NotInRoom)?;
        session.config = config;
        Ok(session.code.clone())
    }

    pub fn set_excluded_usernames(&mut self, usernames: Vec<String>) {
        if let Some(session) = self.session.as_mut() {
            session.config.excluded_usernames = usernames;
        }
    }

    fn recompute_host(&mut self) {
        self.is_host = match (&self.identity, &self.session) {
            (Some(me), Some(session)) => session.host_user_id.as_ref() == Some(&me.user_id),
            _ => false,
        };
    }
}

/// Check host-edited parameters against the ranges the server accepts.
pub fn validate_config(config: &RoomConfig) -> Result<(), ClientError> {
    if config.max_players < 2 {
        return Err(ClientError::Validation(
            "max players must be at least 2".to_string(),
        ));
    }
    if !(5..=60).contains(&config.answer_time_sec) {
        return Err(ClientError::Validation(
            "answer time must be between 5 and 60 seconds".to_string(),
        ));
    }
    if !(10..=1000).contains(&config.target_points) {
        return Err(ClientError::Validation(
            "target points must be between 10 and 1000".to_string(),
        ));
    }
    if config.result_delay_sec > 10 {
        return Err(ClientError::Validation(
            "result delay must be between 0 and 10 seconds".to_string(),
        ));
    }
    Ok(())
}

/// Keep one entry per user id: first position, last data.
fn dedupe_players(players: Vec<Player>) -> Vec<Player> {
    let mut seen = HashSet::new();
    let mut out: Vec<Player> = Vec::with_capacity(players.len());
    for player in players {
        if seen.insert(player.user_id.clone()) {
            out.push(player);
        } else if let Some(slot) = out.iter_mut().find(|p| p.user_id == player.user_id) {
            *slot = player;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::RoomConfigPatch;

    fn player(id: i64, name: &str) -> Player {
        Player {
            user_id: UserId::from(id),
            username: name.to_string(),
            avatar: None,
            points: 0,
        }
    }

    fn identity(id: i64) -> Identity {
        Identity {
            user_id: UserId::from(id),
            username: format!("user{id}"),
            avatar: None,
        }
    }

    fn roster(players: Vec<Player>) -> RoomSnapshot {
        RoomSnapshot {
            players: Some(players),
            ..Default::default()
        }
    }

    fn joined_machine(me: i64) -> RoomMachine {
        let mut machine = RoomMachine::new();
        machine.set_identity(identity(me));
        machine.begin_join(RoomCode::parse("ABC123").unwrap());
        machine
    }

    #[test]
    fn test_first_update_activates_room() {
        // テスト項目: 最初のスナップショット適用で Joining から Active に遷移する
        // given (前提条件):
        let mut machine = joined_machine(1);
        assert_eq!(machine.state(), RoomState::Joining);

        // when (操作):
        let outcome = machine.apply_update(roster(vec![player(1, "alice")]));

        // then (期待する結果):
        assert!(outcome.changed());
        assert_eq!(machine.state(), RoomState::Active);
    }

    #[test]
    fn test_roster_replaces_player_set_without_accumulation() {
        // テスト項目: 名簿の更新は毎回プレイヤー集合全体を置き換える
        // given (前提条件):
        let mut machine = joined_machine(1);
        let rosters = vec![
            vec![player(1, "alice"), player(2, "bob"), player(3, "carol")],
            vec![player(1, "alice"), player(4, "dave")],
            vec![player(1, "alice")],
        ];

        for expected in rosters {
            // when (操作):
            machine.apply_update(roster(expected.clone()));

            // then (期待する結果):
            assert_eq!(machine.session().unwrap().players, expected);
        }
    }

    #[test]
    fn test_same_update_twice_reports_no_change() {
        // テスト項目: 同じ更新を2回適用すると2回目は変更なしになる
        // given (前提条件):
        let mut machine = joined_machine(1);
        let snapshot = RoomSnapshot {
            host_user_id: Some(UserId::from(1)),
            title: Some("Friday quiz".to_string()),
            config: Some(RoomConfigPatch {
                target_points: Some(200),
                ..Default::default()
            }),
            players: Some(vec![player(1, "alice"), player(2, "bob")]),
            ..Default::default()
        };

        // when (操作):
        let first = machine.apply_update(snapshot.clone());
        let state_after_first = machine.session().cloned();
        let second = machine.apply_update(snapshot);

        // then (期待する結果):
        assert!(first.changed());
        assert!(!second.changed());
        assert_eq!(machine.session().cloned(), state_after_first);
    }

    #[test]
    fn test_absent_fields_are_left_unchanged() {
        // テスト項目: ペイロードに無いフィールドは変更されない
        // given (前提条件):
        let mut machine = joined_machine(1);
        machine.apply_update(RoomSnapshot {
            host_user_id: Some(UserId::from(1)),
            players: Some(vec![player(1, "alice")]),
            ..Default::default()
        });

        // when (操作):
        machine.apply_update(RoomSnapshot {
            title: Some("Renamed".to_string()),
            ..Default::default()
        });

        // then (期待する結果):
        let session = machine.session().unwrap();
        assert_eq!(session.title, "Renamed");
        assert_eq!(session.host_user_id, Some(UserId::from(1)));
        assert_eq!(session.players.len(), 1);
    }

    #[test]
    fn test_self_removal_is_detected() {
        // テスト項目: 自分が名簿から消えると forcibly_removed が立つ
        // given (前提条件):
        let mut machine = joined_machine(1);
        machine.apply_update(roster(vec![player(1, "alice"), player(2, "bob")]));

        // when (操作):
        let outcome = machine.apply_update(roster(vec![player(2, "bob")]));

        // then (期待する結果):
        assert!(outcome.forcibly_removed());
        assert_eq!(machine.state(), RoomState::Kicked);
    }

    #[test]
    fn test_absence_before_first_appearance_is_not_removal() {
        // テスト項目: 一度も名簿に載っていない状態での不在は強制退出とみなさない
        // given (前提条件):
        let mut machine = joined_machine(1);

        // when (操作):
        let outcome = machine.apply_update(roster(vec![player(2, "bob")]));

        // then (期待する結果):
        assert!(!outcome.forcibly_removed());
        assert_eq!(machine.state(), RoomState::Active);
    }

    #[test]
    fn test_update_for_other_room_is_ignored() {
        // テスト項目: 別ルームのコードを持つ更新は無視される
        // given (前提条件):
        let mut machine = joined_machine(1);
        let snapshot = RoomSnapshot {
            code: Some("ZZZ999".to_string()),
            players: Some(vec![player(9, "mallory")]),
            ..Default::default()
        };

        // when (操作):
        let outcome = machine.apply_update(snapshot);

        // then (期待する結果):
        assert_eq!(outcome, UpdateOutcome::Ignored);
        assert!(machine.session().unwrap().players.is_empty());
    }

    #[test]
    fn test_host_flag_follows_host_user_id() {
        // テスト項目: hostUserId が自分の ID と一致するとホストになる
        // given (前提条件):
        let mut machine = joined_machine(1);

        // when (操作):
        machine.apply_update(RoomSnapshot {
            host_user_id: Some(UserId::from(1)),
            players: Some(vec![player(1, "alice")]),
            ..Default::default()
        });

        // then (期待する結果):
        assert!(machine.is_host());
        assert_eq!(machine.session().unwrap().host().unwrap().username, "alice");
    }

    #[test]
    fn test_update_config_requires_host() {
        // テスト項目: ホスト以外は設定を変更できない
        // given (前提条件):
        let mut machine = joined_machine(1);
        machine.apply_update(RoomSnapshot {
            host_user_id: Some(UserId::from(2)),
            players: Some(vec![player(1, "alice"), player(2, "bob")]),
            ..Default::default()
        });

        // when (操作):
        let result = machine.update_config(RoomConfig::default());

        // then (期待する結果):
        assert!(matches!(result, Err(ClientError::NotHost)));
    }

    #[test]
    fn test_update_config_validates_ranges() {
        // テスト項目: 範囲外の設定値は拒否される
        // given (前提条件):
        let config = RoomConfig {
            max_players: 1,
            ..Default::default()
        };

        // when (操作):
        let result = validate_config(&config);

        // then (期待する結果):
        assert!(matches!(result, Err(ClientError::Validation(_))));
        assert!(validate_config(&RoomConfig::default()).is_ok());
    }

    #[test]
    fn test_finish_leave_fires_once() {
        // テスト項目: 退出完了は一度だけ処理される
        // given (前提条件):
        let mut machine = joined_machine(1);
        machine.apply_update(roster(vec![player(1, "alice")]));
        let code = machine.begin_leave();

        // when (操作):
        let first = machine.finish_leave();
        let second = machine.finish_leave();

        // then (期待する結果):
        assert_eq!(code.unwrap().as_str(), "ABC123");
        assert!(first);
        assert!(!second);
        assert_eq!(machine.state(), RoomState::Idle);
        assert!(machine.session().is_none());
    }

    #[test]
    fn test_duplicate_user_ids_collapse_to_last_entry() {
        // テスト項目: 同じ userId の重複は最後のデータで1件にまとめられる
        // given (前提条件):
        let players = vec![player(1, "old"), player(2, "bob"), player(1, "new")];

        // when (操作):
        let result = dedupe_players(players);

        // then (期待する結果):
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].username, "new");
        assert_eq!(result[1].username, "bob");
    }
}
