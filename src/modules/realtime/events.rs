//! Actor messages exchanged between the session actors and the server
//! actor.

use actix::prelude::*;
use uuid::Uuid;

use super::message::ServerMessage;
use super::session::WsSession;

/// A new WebSocket connection registered with the server.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Connect {
    pub id: Uuid,
    pub addr: Addr<WsSession>,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Disconnect {
    pub id: Uuid,
}

/// Session authenticated; bind it to a user (multi-device: one user may
/// hold several sessions).
#[derive(Message)]
#[rtype(result = "()")]
pub struct Authenticate {
    pub session_id: Uuid,
    pub user_id: Uuid,
}

/// A session opened a conversation and wants its live stream. Rooms
/// are keyed by session, not user, so one device switching threads
/// never evicts another device of the same user.
#[derive(Message)]
#[rtype(result = "()")]
pub struct JoinRoom {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub conversation_id: String,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct LeaveRoom {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub conversation_id: String,
}

#[derive(Message, Clone)]
#[rtype(result = "()")]
pub struct BroadcastToRoom {
    pub conversation_id: String,
    pub message: ServerMessage,
    pub skip_user_id: Option<Uuid>,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct SendToUser {
    pub user_id: Uuid,
    pub message: ServerMessage,
}

/// Keystroke: mark the user typing and (re)schedule the idle auto-clear.
#[derive(Message)]
#[rtype(result = "()")]
pub struct TypingStarted {
    pub conversation_id: String,
    pub user_id: Uuid,
}

/// Immediate clear: explicit stop, message send, or room exit.
#[derive(Message)]
#[rtype(result = "()")]
pub struct TypingStopped {
    pub conversation_id: String,
    pub user_id: Uuid,
}

/// Snapshot of who is currently typing in a conversation.
#[derive(Message)]
#[rtype(result = "Vec<Uuid>")]
pub struct GetTypingUsers {
    pub conversation_id: String,
}
