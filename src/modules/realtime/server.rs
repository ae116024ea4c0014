//! Central actor owning all connection state: which sessions exist,
//! which user each belongs to, who has which conversation open, and who
//! is currently typing where.

use actix::prelude::*;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use uuid::Uuid;

use super::events::*;
use super::message::ServerMessage;
use super::session::WsSession;

/// How long a typing flag survives without a repeat keystroke signal.
const TYPING_IDLE_TIMEOUT: Duration = Duration::from_secs(4);

pub struct ChatServer {
    /// session_id -> session actor address
    sessions: HashMap<Uuid, Addr<WsSession>>,

    /// user_id -> set of session_ids (multi-device)
    users: HashMap<Uuid, HashSet<Uuid>>,

    /// session_id -> user_id, the reverse of `users`
    session_user: HashMap<Uuid, Uuid>,

    /// conversation_id -> set of session_ids with the conversation
    /// open. Session-keyed: two devices of one user hold independent
    /// memberships.
    rooms: HashMap<String, HashSet<Uuid>>,

    /// conversation_id -> set of user_ids currently typing there
    typing: HashMap<String, HashSet<Uuid>>,

    /// Pending auto-clear per (conversation, user). A repeat keystroke
    /// cancels and reschedules; a send or explicit stop cancels.
    typing_timers: HashMap<(String, Uuid), SpawnHandle>,

    typing_idle: Duration,
}

impl ChatServer {
    pub fn new() -> Self {
        Self::with_typing_idle(TYPING_IDLE_TIMEOUT)
    }

    pub fn with_typing_idle(typing_idle: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            users: HashMap::new(),
            session_user: HashMap::new(),
            rooms: HashMap::new(),
            typing: HashMap::new(),
            typing_timers: HashMap::new(),
            typing_idle,
        }
    }

    fn send_to_session(&self, session_id: &Uuid, message: ServerMessage) {
        if let Some(session_addr) = self.sessions.get(session_id) {
            session_addr.do_send(message);
        }
    }

    fn send_to_user(&self, user_id: &Uuid, message: ServerMessage) {
        if let Some(session_ids) = self.users.get(user_id) {
            for session_id in session_ids {
                self.send_to_session(session_id, message.clone());
            }
        }
    }

    fn broadcast_to_room(
        &self,
        conversation_id: &str,
        message: ServerMessage,
        skip_user_id: Option<Uuid>,
    ) {
        let Some(room_sessions) = self.rooms.get(conversation_id) else {
            tracing::debug!("Broadcast to empty room {conversation_id}, dropped");
            return;
        };

        for session_id in room_sessions {
            if let Some(skip) = skip_user_id {
                if self.session_user.get(session_id) == Some(&skip) {
                    continue;
                }
            }
            self.send_to_session(session_id, message.clone());
        }
    }

    /// Whether any session of `user_id` still has the conversation
    /// open.
    fn user_in_room(&self, conversation_id: &str, user_id: &Uuid) -> bool {
        self.rooms.get(conversation_id).is_some_and(|room| {
            room.iter().any(|session_id| self.session_user.get(session_id) == Some(user_id))
        })
    }

    /// Drops the typing flag and tells the room, if the flag was set.
    /// Safe to call when it was not; repeat clears are no-ops.
    fn clear_typing_flag(&mut self, conversation_id: &str, user_id: Uuid, ctx: &mut Context<Self>) {
        if let Some(handle) = self.typing_timers.remove(&(conversation_id.to_string(), user_id)) {
            ctx.cancel_future(handle);
        }

        let was_typing = self
            .typing
            .get_mut(conversation_id)
            .map(|set| set.remove(&user_id))
            .unwrap_or(false);
        self.typing.retain(|_, set| !set.is_empty());

        if was_typing {
            self.broadcast_to_room(
                conversation_id,
                ServerMessage::TypingState {
                    conversation_id: conversation_id.to_string(),
                    user_id,
                    is_typing: false,
                },
                Some(user_id),
            );
        }
    }
}

impl Actor for ChatServer {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("Chat server started");
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("Chat server stopped");
    }
}

impl Handler<Connect> for ChatServer {
    type Result = ();

    fn handle(&mut self, msg: Connect, _: &mut Context<Self>) {
        tracing::debug!("New session connected: {}", msg.id);
        self.sessions.insert(msg.id, msg.addr);
    }
}

impl Handler<Disconnect> for ChatServer {
    type Result = ();

    fn handle(&mut self, msg: Disconnect, ctx: &mut Context<Self>) {
        tracing::debug!("Session disconnected: {}", msg.id);

        self.sessions.remove(&msg.id);
        self.session_user.remove(&msg.id);

        for room_sessions in self.rooms.values_mut() {
            room_sessions.remove(&msg.id);
        }
        self.rooms.retain(|_, sessions| !sessions.is_empty());

        let mut user_to_remove: Option<Uuid> = None;
        for (&user_id, sessions) in self.users.iter_mut() {
            if sessions.remove(&msg.id) {
                if sessions.is_empty() {
                    user_to_remove = Some(user_id);
                }
                break;
            }
        }

        if let Some(user_id) = user_to_remove {
            self.users.remove(&user_id);

            // A vanished user must not stay "typing..." on anyone's
            // screen.
            let stale: Vec<String> = self
                .typing
                .iter()
                .filter(|(_, users)| users.contains(&user_id))
                .map(|(conversation_id, _)| conversation_id.clone())
                .collect();
            for conversation_id in stale {
                self.clear_typing_flag(&conversation_id, user_id, ctx);
            }

            tracing::info!("User {user_id} fully disconnected, removed from all rooms");
        }
    }
}

impl Handler<Authenticate> for ChatServer {
    type Result = ();

    fn handle(&mut self, msg: Authenticate, _: &mut Context<Self>) {
        self.session_user.insert(msg.session_id, msg.user_id);
        let sessions = self.users.entry(msg.user_id).or_default();
        sessions.insert(msg.session_id);

        tracing::info!(
            "User {} authenticated on session {} ({} active session(s))",
            msg.user_id,
            msg.session_id,
            sessions.len()
        );
    }
}

impl Handler<JoinRoom> for ChatServer {
    type Result = ();

    fn handle(&mut self, msg: JoinRoom, _: &mut Context<Self>) {
        self.rooms.entry(msg.conversation_id.clone()).or_default().insert(msg.session_id);

        tracing::debug!(
            "User {} joined conversation {} ({} sessions in room)",
            msg.user_id,
            msg.conversation_id,
            self.rooms.get(&msg.conversation_id).map_or(0, HashSet::len)
        );
    }
}

impl Handler<LeaveRoom> for ChatServer {
    type Result = ();

    fn handle(&mut self, msg: LeaveRoom, ctx: &mut Context<Self>) {
        if let Some(room) = self.rooms.get_mut(&msg.conversation_id) {
            room.remove(&msg.session_id);
            if room.is_empty() {
                self.rooms.remove(&msg.conversation_id);
            }
        }

        // The typing flag is user-scoped; drop it only once no device
        // of this user still has the conversation open.
        if !self.user_in_room(&msg.conversation_id, &msg.user_id) {
            self.clear_typing_flag(&msg.conversation_id, msg.user_id, ctx);
        }
    }
}

impl Handler<BroadcastToRoom> for ChatServer {
    type Result = ();

    fn handle(&mut self, msg: BroadcastToRoom, _: &mut Context<Self>) {
        self.broadcast_to_room(&msg.conversation_id, msg.message, msg.skip_user_id);
    }
}

impl Handler<SendToUser> for ChatServer {
    type Result = ();

    fn handle(&mut self, msg: SendToUser, _: &mut Context<Self>) {
        self.send_to_user(&msg.user_id, msg.message);
    }
}

impl Handler<TypingStarted> for ChatServer {
    type Result = ();

    fn handle(&mut self, msg: TypingStarted, ctx: &mut Context<Self>) {
        let newly_typing = self
            .typing
            .entry(msg.conversation_id.clone())
            .or_default()
            .insert(msg.user_id);

        // Only the first keystroke broadcasts; repeats just push the
        // auto-clear further out.
        if newly_typing {
            self.broadcast_to_room(
                &msg.conversation_id,
                ServerMessage::TypingState {
                    conversation_id: msg.conversation_id.clone(),
                    user_id: msg.user_id,
                    is_typing: true,
                },
                Some(msg.user_id),
            );
        }

        let key = (msg.conversation_id.clone(), msg.user_id);
        if let Some(handle) = self.typing_timers.remove(&key) {
            ctx.cancel_future(handle);
        }

        let conversation_id = msg.conversation_id;
        let user_id = msg.user_id;
        let handle = ctx.run_later(self.typing_idle, move |actor, inner_ctx| {
            tracing::debug!("Typing idle timeout for user {user_id} in {conversation_id}");
            actor.clear_typing_flag(&conversation_id, user_id, inner_ctx);
        });
        self.typing_timers.insert(key, handle);
    }
}

impl Handler<TypingStopped> for ChatServer {
    type Result = ();

    fn handle(&mut self, msg: TypingStopped, ctx: &mut Context<Self>) {
        self.clear_typing_flag(&msg.conversation_id, msg.user_id, ctx);
    }
}

impl Handler<GetTypingUsers> for ChatServer {
    type Result = Vec<Uuid>;

    fn handle(&mut self, msg: GetTypingUsers, _: &mut Context<Self>) -> Self::Result {
        self.typing
            .get(&msg.conversation_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }
}

impl Message for ServerMessage {
    type Result = ();
}

impl Default for ChatServer {
    fn default() -> Self {
        Self::new()
    }
}
