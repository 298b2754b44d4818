//! Pure client-side state: value objects and the room/quiz state machines.
//!
//! Nothing in this layer performs I/O. Handlers receive normalized values
//! and a local timestamp, and return what the caller should do next.

pub mod model;
pub mod quiz;
pub mod room;
pub mod room_code;
pub mod time_sync;

pub use model::{
    GameEndSummary, Identity, Player, Proposal, Question, QuestionStart, QuestionType,
    RoomConfig, RoomConfigPatch, RoomSnapshot, RoundResult, ScoringMode, TopPlayer, UserId,
    Visibility,
};
pub use quiz::{AnswerAttempt, Hint, QuizRound, RoundPhase};
pub use room::{RoomMachine, RoomSession, RoomState, UpdateOutcome};
pub use room_code::RoomCode;
pub use time_sync::RoundWindow;
