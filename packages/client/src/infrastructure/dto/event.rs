//! Event names of the real-time channel.

/// Every inbound event the client reacts to.
///
/// `connect`/`disconnect` are not listed: they come from the transport itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InboundEvent {
    RoomUpdate,
    RoomStarted,
    RoomRunning,
    RoomJoin,
    RoomJoined,
    RoomLeft,
    RoomLeave,
    RoomMemberJoined,
    RoomMemberLeft,
    RoomMembers,
    RoomPlayers,
    RoomSync,
    RoomKicked,
    RoomBanned,
    QuizQuestion,
    QuizProposals,
    QuizResult,
    QuizEnded,
    QuizGotoRoom,
    QuizStarted,
    GameStarted,
}

const INBOUND: [(InboundEvent, &str); 21] = [
    (InboundEvent::RoomUpdate, "room:update"),
    (InboundEvent::RoomStarted, "room:started"),
    (InboundEvent::RoomRunning, "room:running"),
    (InboundEvent::RoomJoin, "room:join"),
    (InboundEvent::RoomJoined, "room:joined"),
    (InboundEvent::RoomLeft, "room:left"),
    (InboundEvent::RoomLeave, "room:leave"),
    (InboundEvent::RoomMemberJoined, "room:memberJoined"),
    (InboundEvent::RoomMemberLeft, "room:memberLeft"),
    (InboundEvent::RoomMembers, "room:members"),
    (InboundEvent::RoomPlayers, "room:players"),
    (InboundEvent::RoomSync, "room:sync"),
    (InboundEvent::RoomKicked, "room:kicked"),
    (InboundEvent::RoomBanned, "room:banned"),
    (InboundEvent::QuizQuestion, "quiz:question"),
    (InboundEvent::QuizProposals, "quiz:proposals"),
    (InboundEvent::QuizResult, "quiz:result"),
    (InboundEvent::QuizEnded, "quiz:ended"),
    (InboundEvent::QuizGotoRoom, "quiz:gotoRoom"),
    (InboundEvent::QuizStarted, "quiz:started"),
    (InboundEvent::GameStarted, "game:started"),
];

impl InboundEvent {
    pub fn from_name(name: &str) -> Option<Self> {
        INBOUND
            .iter()
            .find(|(_, wire)| *wire == name)
            .map(|(event, _)| *event)
    }

    pub fn name(self) -> &'static str {
        INBOUND
            .iter()
            .find(|(event, _)| *event == self)
            .map_or("unknown", |(_, wire)| *wire)
    }

    /// Round activity broadcast: always moves the client to the quiz view.
    pub fn forces_quiz_view(self) -> bool {
        matches!(
            self,
            Self::QuizQuestion
                | Self::QuizStarted
                | Self::RoomStarted
                | Self::RoomRunning
                | Self::GameStarted
        )
    }

    /// Membership-style events: applied as a room update, resync when nothing changed.
    pub fn is_membership(self) -> bool {
        matches!(
            self,
            Self::RoomJoin
                | Self::RoomJoined
                | Self::RoomLeft
                | Self::RoomLeave
                | Self::RoomMemberJoined
                | Self::RoomMemberLeft
                | Self::RoomPlayers
                | Self::RoomMembers
                | Self::RoomSync
        )
    }
}

/// Every event the client emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutboundEvent {
    RoomJoin,
    RoomLeave,
    RoomSync,
    RoomStart,
    RoomConfig,
    RoomUnban,
    QuizSync,
    QuizAnswer,
    ProfileUpdate,
}

impl OutboundEvent {
    pub fn name(self) -> &'static str {
        match self {
            Self::RoomJoin => "room:join",
            Self::RoomLeave => "room:leave",
            Self::RoomSync => "room:sync",
            Self::RoomStart => "room:start",
            Self::RoomConfig => "room:config",
            Self::RoomUnban => "room:unban",
            Self::QuizSync => "quiz:sync",
            Self::QuizAnswer => "quiz:answer",
            Self::ProfileUpdate => "profile:update",
        }
    }
}
