//! Wire protocol for the WebSocket channel: tagged JSON enums in both
//! directions, camelCase to match the rest of the HTTP surface.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::modules::message::model::MessageResponse;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Authenticate the connection with a platform-issued JWT.
    #[serde(rename_all = "camelCase")]
    Auth { token: String },

    /// Open a conversation and start receiving its stream. A session
    /// holds at most one open conversation; opening another leaves the
    /// previous room.
    #[serde(rename_all = "camelCase")]
    OpenConversation { conversation_id: String },

    /// Leave the currently open conversation.
    #[serde(rename_all = "camelCase")]
    CloseConversation { conversation_id: String },

    #[serde(rename_all = "camelCase")]
    SendMessage { conversation_id: String, content: String },

    /// Keystroke signal; every repeat reschedules the idle auto-clear.
    #[serde(rename_all = "camelCase")]
    TypingStart { conversation_id: String },

    #[serde(rename_all = "camelCase")]
    TypingStop { conversation_id: String },

    /// Explicit seen-flip for the open conversation.
    #[serde(rename_all = "camelCase")]
    MarkSeen { conversation_id: String },

    Ping,
}

/// Why a send was rejected. `permission` means the reciprocal friend
/// gate failed (not retried automatically); `transient` means try
/// again; `validation` never reached the backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RejectReason {
    Permission,
    Validation,
    Transient,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    #[serde(rename_all = "camelCase")]
    AuthSuccess { user_id: Uuid },

    #[serde(rename_all = "camelCase")]
    AuthFailed { reason: String },

    #[serde(rename_all = "camelCase")]
    ConversationOpened { conversation_id: String, typing_user_ids: Vec<Uuid> },

    #[serde(rename_all = "camelCase")]
    NewMessage { conversation_id: String, message: MessageResponse },

    #[serde(rename_all = "camelCase")]
    MessageDeleted { conversation_id: String, message_id: Uuid },

    /// Batched seen-flip happened; every unseen message addressed to
    /// `seen_by` in this conversation is now seen.
    #[serde(rename_all = "camelCase")]
    MessagesSeen { conversation_id: String, seen_by: Uuid },

    /// A send failed. `content` echoes the attempted text back so the
    /// composer can restore it instead of losing the input.
    #[serde(rename_all = "camelCase")]
    SendRejected {
        conversation_id: String,
        reason: RejectReason,
        message: String,
        content: String,
    },

    #[serde(rename_all = "camelCase")]
    TypingState { conversation_id: String, user_id: Uuid, is_typing: bool },

    #[serde(rename_all = "camelCase")]
    FriendRequestReceived { request_id: Uuid, sender_id: Uuid },

    #[serde(rename_all = "camelCase")]
    FriendRequestAccepted {
        peer_id: Uuid,
        since: Option<chrono::DateTime<chrono::Utc>>,
    },

    /// The friendship with `peer_id` no longer exists; any open composer
    /// toward them must re-gate immediately.
    #[serde(rename_all = "camelCase")]
    FriendshipRevoked { peer_id: Uuid },

    Pong,

    #[serde(rename_all = "camelCase")]
    Error { message: String },
}
