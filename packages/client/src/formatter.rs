//! Text rendering of the session for the terminal front end.

use std::collections::HashMap;

use niwot_shared::time::timestamp_to_rfc3339;

use crate::{
    domain::{
        GameEndSummary, Hint, Identity, Player, Question, RoomConfig, RoomSession, RoundResult,
        ScoringMode, UserId, Visibility,
    },
    infrastructure::api::{Category, LeaderEntry, ProposerEntry, PublicRoom, RoomStatus},
    session::LeaveReason,
};

const RULE: &str = "============================================================";
const THIN_RULE: &str = "------------------------------------------------------------";

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Greeting shown once the login succeeded
    ///
    /// # Arguments
    ///
    /// * `identity` - The logged-in user
    /// * `at_ms` - Unix timestamp of the login (milliseconds)
    pub fn format_logged_in(identity: &Identity, at_ms: i64) -> String {
        let at = timestamp_to_rfc3339(at_ms).unwrap_or_else(|| at_ms.to_string());
        format!(
            "\nLogged in as '{}' at {}. Type /help for the list of commands.\n",
            identity.username, at
        )
    }

    pub fn format_profile(identity: &Identity) -> String {
        let avatar = match identity.avatar.as_deref() {
            Some(avatar) if avatar.starts_with("data:") => "(uploaded image)",
            Some(avatar) if !avatar.is_empty() => avatar,
            _ => "(none)",
        };
        format!(
            "\n{}\nProfile\n  username: {}\n  id: {}\n  avatar: {}\n{}\n",
            THIN_RULE, identity.username, identity.user_id, avatar, THIN_RULE
        )
    }

    /// Format the room view: title, code, roster and parameters
    ///
    /// # Arguments
    ///
    /// * `session` - The room mirror
    /// * `me` - The local user (to mark as "me")
    ///
    /// # Returns
    ///
    /// A formatted string with the roster and the configuration
    pub fn format_room(session: &RoomSession, me: Option<&UserId>) -> String {
        let mut output = String::new();
        output.push_str(&format!("\n\n{}\n", RULE));
        output.push_str(&format!(
            "{} [{}]\n",
            session.display_title(),
            session.code
        ));
        output.push_str("Players:\n");

        if session.players.is_empty() {
            output.push_str("(No players)\n");
        } else {
            for player in &session.players {
                let mut tags = Vec::new();
                if session.host_user_id.as_ref() == Some(&player.user_id) {
                    tags.push("host");
                }
                if me == Some(&player.user_id) {
                    tags.push("me");
                }
                let suffix = if tags.is_empty() {
                    String::new()
                } else {
                    format!(" ({})", tags.join(", "))
                };
                output.push_str(&format!(
                    "{}{} - {} pts\n",
                    player.username, suffix, player.points
                ));
            }
        }

        output.push_str(&Self::format_config(&session.config));
        output.push_str(&format!("{}\n", RULE));
        output
    }

    pub fn format_config(config: &RoomConfig) -> String {
        let visibility = match config.visibility {
            Visibility::Public => "public",
            Visibility::Private => "private",
        };
        let scoring = match config.scoring_mode {
            ScoringMode::Degressive => "degressive",
            ScoringMode::Fixed => "fixed",
        };
        let categories = if config.category_ids.is_empty() {
            "all".to_string()
        } else {
            config
                .category_ids
                .iter()
                .map(i64::to_string)
                .collect::<Vec<_>>()
                .join(",")
        };
        let mut output = format!(
            "Settings: {}, max {} players, {}s per question, {} points to win, {} scoring,\n\
             \x20         proposals {}, categories {}, {}s between rounds\n",
            visibility,
            config.max_players,
            config.answer_time_sec,
            config.target_points,
            scoring,
            if config.show_proposals { "shown" } else { "hidden" },
            categories,
            config.result_delay_sec,
        );
        if !config.excluded_usernames.is_empty() {
            output.push_str(&format!(
                "Excluded: {}\n",
                config.excluded_usernames.join(", ")
            ));
        }
        output
    }

    /// Format a new question with its hint
    pub fn format_question(round: u64, question: &Question, hint: &Hint) -> String {
        let mut output = format!(
            "\n\n{}\nQuestion #{}: {}\n",
            THIN_RULE, round, question.text
        );
        match hint {
            Hint::None => {}
            Hint::Citation(text) => output.push_str(&format!("  \"{}\"\n", text)),
            Hint::ImagePending { source } => {
                output.push_str(&format!("  [image loading: {}]\n", source));
            }
            Hint::Image { .. } => output.push_str(&Self::format_hint(hint)),
        }
        output.push_str(&format!("{}\n", THIN_RULE));
        output
    }

    /// One-line rendering of a resolved hint
    pub fn format_hint(hint: &Hint) -> String {
        match hint {
            Hint::None => "  [no hint]\n".to_string(),
            Hint::Citation(text) => format!("  \"{}\"\n", text),
            Hint::ImagePending { source } => format!("  [image loading: {}]\n", source),
            Hint::Image { source, data } => {
                format!("  [image: {} ({} bytes)]\n", source, data.len())
            }
        }
    }

    /// Proposals joined with the roster: every player, with their latest guess or none
    pub fn format_proposals(players: &[Player], latest: &HashMap<&UserId, &str>) -> String {
        let mut output = String::from("\nProposals:\n");
        for player in players {
            let guess = latest.get(&player.user_id).copied().unwrap_or("-");
            output.push_str(&format!("  {}: {}\n", player.username, guess));
        }
        output
    }

    pub fn format_countdown(seconds: i64) -> String {
        format!("\n[{}s left]\n", seconds)
    }

    pub fn format_result(result: &RoundResult) -> String {
        let mut output = format!(
            "\n\n{}\nAnswer: {}\n",
            THIN_RULE, result.correct_answer
        );
        match &result.first_solver {
            Some(first) => output.push_str(&format!("First to find it: {}\n", first)),
            None => output.push_str("Nobody found it\n"),
        }
        if let Some(explanation) = &result.explanation {
            output.push_str(&format!("{}\n", explanation));
        }
        output.push_str(&format!("{}\n", THIN_RULE));
        output
    }

    pub fn format_game_end(summary: &GameEndSummary) -> String {
        let mut output = format!("\n\n{}\n{}\n", RULE, summary.reason);
        for (rank, player) in summary.top_players.iter().enumerate() {
            output.push_str(&format!(
                "{}. {} - {} pts\n",
                rank + 1,
                player.username,
                player.points
            ));
        }
        output.push_str(&format!("{}\n", RULE));
        output
    }

    pub fn format_status(status: &str) -> String {
        format!("\n* {}\n", status)
    }

    pub fn format_left_room(reason: LeaveReason) -> String {
        let text = match reason {
            LeaveReason::Left => "You left the room",
            LeaveReason::Kicked => "You were kicked from the room",
            LeaveReason::Banned => "You were banned from the room",
            LeaveReason::Removed => "You are no longer in the room",
        };
        format!("\n- {}. Back to the lobby.\n", text)
    }

    pub fn format_public_rooms(rooms: &[PublicRoom]) -> String {
        let mut output = format!("\n{}\nPublic rooms:\n", THIN_RULE);
        if rooms.is_empty() {
            output.push_str("(No open rooms)\n");
        }
        for room in rooms {
            let status = match room.status {
                RoomStatus::Lobby => "waiting",
                RoomStatus::Running => "playing",
                RoomStatus::Ended => "ended",
            };
            output.push_str(&format!(
                "  {} {} - {}/{} players, {}\n",
                room.code,
                room.name.as_deref().unwrap_or(""),
                room.players,
                room.max_players,
                status
            ));
        }
        output.push_str(&format!("{}\n", THIN_RULE));
        output
    }

    pub fn format_leaderboards(leaders: &[LeaderEntry], proposers: &[ProposerEntry]) -> String {
        let mut output = format!("\n{}\nMost wins:\n", THIN_RULE);
        for (rank, entry) in leaders.iter().enumerate() {
            output.push_str(&format!("  {}. {} ({})\n", rank + 1, entry.username, entry.wins));
        }
        output.push_str("Most approved questions:\n");
        for (rank, entry) in proposers.iter().enumerate() {
            output.push_str(&format!(
                "  {}. {} ({})\n",
                rank + 1,
                entry.username,
                entry.approved_count
            ));
        }
        output.push_str(&format!("{}\n", THIN_RULE));
        output
    }

    /// Category list with the ids `/suggest` expects
    pub fn format_categories(categories: &[Category]) -> String {
        if categories.is_empty() {
            return "\n(no categories)\n".to_string();
        }
        let mut output = format!("\n{}\nCategories:\n", THIN_RULE);
        for category in categories {
            match category.approved_count {
                Some(count) => output.push_str(&format!(
                    "  [{}] {} ({} questions)\n",
                    category.id, category.name, count
                )),
                None => output.push_str(&format!("  [{}] {}\n", category.id, category.name)),
            }
        }
        output.push_str(&format!("{}\n", THIN_RULE));
        output
    }
}
