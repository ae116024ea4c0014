//! Seam between the domain services and the actor system. Services
//! broadcast through this trait instead of holding a concrete actor
//! address, which keeps them constructible in tests without a running
//! actor system.

use actix::Addr;
use uuid::Uuid;

use super::events::{BroadcastToRoom, SendToUser, TypingStopped};
use super::message::ServerMessage;
use super::server::ChatServer;

pub trait RealtimeBroker: Send + Sync + 'static {
    /// Fan out to every device of one user.
    fn notify_user(&self, user_id: Uuid, event: ServerMessage);

    /// Fan out to everyone with the conversation open, optionally
    /// skipping one participant.
    fn notify_conversation(
        &self,
        conversation_id: &str,
        event: ServerMessage,
        skip_user_id: Option<Uuid>,
    );

    /// Force-clear a typing flag without waiting for the idle timeout.
    fn clear_typing(&self, conversation_id: &str, user_id: Uuid);
}

/// Production broker: forwards to the `ChatServer` actor mailbox.
#[derive(Clone)]
pub struct ServerBroker {
    server: Addr<ChatServer>,
}

impl ServerBroker {
    pub fn new(server: Addr<ChatServer>) -> Self {
        Self { server }
    }
}

impl RealtimeBroker for ServerBroker {
    fn notify_user(&self, user_id: Uuid, event: ServerMessage) {
        self.server.do_send(SendToUser { user_id, message: event });
    }

    fn notify_conversation(
        &self,
        conversation_id: &str,
        event: ServerMessage,
        skip_user_id: Option<Uuid>,
    ) {
        self.server.do_send(BroadcastToRoom {
            conversation_id: conversation_id.to_string(),
            message: event,
            skip_user_id,
        });
    }

    fn clear_typing(&self, conversation_id: &str, user_id: Uuid) {
        self.server
            .do_send(TypingStopped { conversation_id: conversation_id.to_string(), user_id });
    }
}
