//! Per-connection actor. Holds the session's auth state and its single
//! open conversation, and bridges outbound JSON to the WebSocket task
//! through an mpsc channel.

use actix::prelude::*;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::ENV;
use crate::api::error;
use crate::modules::message::handle::MessageSvc;
use crate::utils::{Claims, TypeClaims};

use super::events::*;
use super::message::{ClientMessage, RejectReason, ServerMessage};
use super::server::ChatServer;

pub struct WsSession {
    pub id: Uuid,

    /// Set after a successful `auth` frame.
    pub user_id: Option<Uuid>,

    /// The one conversation this session is viewing. Opening another
    /// conversation implicitly leaves this one.
    pub open_conversation: Option<String>,

    pub server: Addr<ChatServer>,

    /// Outbound JSON to the WebSocket task.
    pub tx: mpsc::UnboundedSender<String>,

    /// None only in actor-level tests.
    pub message_service: Option<actix_web::web::Data<MessageSvc>>,
}

impl WsSession {
    pub fn new(
        server: Addr<ChatServer>,
        tx: mpsc::UnboundedSender<String>,
        message_service: actix_web::web::Data<MessageSvc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id: None,
            open_conversation: None,
            server,
            tx,
            message_service: Some(message_service),
        }
    }

    fn send_to_client(&self, msg: &ServerMessage) {
        match serde_json::to_string(msg) {
            Ok(json) => {
                if let Err(e) = self.tx.send(json) {
                    tracing::error!("Failed to push message to client (session {}): {}", self.id, e);
                }
            }
            Err(e) => {
                tracing::error!("Failed to serialize server message (session {}): {}", self.id, e);
            }
        }
    }

    fn send_error(&self, message: &str) {
        self.send_to_client(&ServerMessage::Error { message: message.to_string() });
    }

    fn require_auth(&self) -> Option<Uuid> {
        if self.user_id.is_none() {
            self.send_error("You must authenticate before performing this action");
            tracing::warn!("Session {} not authenticated, request refused", self.id);
        }
        self.user_id
    }

    fn handle_client_message(&mut self, msg: ClientMessage, ctx: &mut Context<Self>) {
        match msg {
            ClientMessage::Auth { token } => self.handle_auth(&token),

            ClientMessage::OpenConversation { conversation_id } => {
                self.handle_open_conversation(conversation_id, ctx);
            }

            ClientMessage::CloseConversation { conversation_id } => {
                self.handle_close_conversation(&conversation_id);
            }

            ClientMessage::SendMessage { conversation_id, content } => {
                self.handle_send_message(conversation_id, content);
            }

            ClientMessage::TypingStart { conversation_id } => {
                if let Some(user_id) = self.require_auth() {
                    self.server.do_send(TypingStarted { conversation_id, user_id });
                }
            }

            ClientMessage::TypingStop { conversation_id } => {
                if let Some(user_id) = self.require_auth() {
                    self.server.do_send(TypingStopped { conversation_id, user_id });
                }
            }

            ClientMessage::MarkSeen { conversation_id } => {
                if let Some(user_id) = self.require_auth() {
                    self.spawn_mark_seen(user_id, conversation_id);
                }
            }

            ClientMessage::Ping => self.send_to_client(&ServerMessage::Pong),
        }
    }

    fn handle_auth(&mut self, token: &str) {
        if self.user_id.is_some() {
            self.send_error("Session is already authenticated");
            return;
        }

        let claims = match Claims::decode(token, ENV.jwt_secret.as_ref()) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::warn!("JWT verification failed (session {}): {}", self.id, e);
                self.send_to_client(&ServerMessage::AuthFailed {
                    reason: "Invalid or expired token".to_string(),
                });
                return;
            }
        };

        if claims._type.as_ref() != Some(&TypeClaims::AccessToken) {
            self.send_to_client(&ServerMessage::AuthFailed {
                reason: "Only access tokens are accepted".to_string(),
            });
            return;
        }

        let user_id = claims.sub;
        self.user_id = Some(user_id);
        self.server.do_send(Authenticate { session_id: self.id, user_id });
        self.send_to_client(&ServerMessage::AuthSuccess { user_id });

        tracing::info!("User {} authenticated on session {}", user_id, self.id);
    }

    /// Switches the session's view to a conversation: leave the previous
    /// room, join the new one, flip anything already addressed to us as
    /// seen, and reply with the current typing snapshot.
    fn handle_open_conversation(&mut self, conversation_id: String, ctx: &mut Context<Self>) {
        let Some(user_id) = self.require_auth() else {
            return;
        };

        if let Some(previous) = self.open_conversation.take() {
            if previous != conversation_id {
                self.server
                    .do_send(TypingStopped { conversation_id: previous.clone(), user_id });
                self.server.do_send(LeaveRoom {
                    session_id: self.id,
                    conversation_id: previous,
                    user_id,
                });
            }
        }

        self.open_conversation = Some(conversation_id.clone());
        self.server.do_send(JoinRoom {
            session_id: self.id,
            conversation_id: conversation_id.clone(),
            user_id,
        });

        // Catch-up flip: history was fetched over HTTP, but anything
        // unseen in it becomes seen the moment the thread is on screen.
        self.spawn_mark_seen(user_id, conversation_id.clone());

        let snapshot = self.server.send(GetTypingUsers { conversation_id: conversation_id.clone() });
        ctx.spawn(snapshot.into_actor(self).map(move |res, actor, _ctx| {
            let typing_user_ids = res.unwrap_or_default();
            actor.send_to_client(&ServerMessage::ConversationOpened {
                conversation_id: conversation_id.clone(),
                typing_user_ids,
            });
        }));
    }

    fn handle_close_conversation(&mut self, conversation_id: &str) {
        let Some(user_id) = self.require_auth() else {
            return;
        };

        if self.open_conversation.as_deref() == Some(conversation_id) {
            self.open_conversation = None;
        }

        self.server
            .do_send(TypingStopped { conversation_id: conversation_id.to_string(), user_id });
        self.server.do_send(LeaveRoom {
            session_id: self.id,
            conversation_id: conversation_id.to_string(),
            user_id,
        });
    }

    /// A failed send never swallows the input: the rejection echoes the
    /// attempted content so the client can restore its composer.
    fn handle_send_message(&self, conversation_id: String, content: String) {
        let Some(user_id) = self.require_auth() else {
            return;
        };

        let Some(service) = self.message_service.clone() else {
            self.send_error("Message service unavailable");
            return;
        };

        let tx = self.tx.clone();
        let session_id = self.id;

        actix_web::rt::spawn(async move {
            // Success needs no extra work here: the service broadcasts
            // the new message to the room, sender included.
            if let Err(e) = service.send_message(user_id, &conversation_id, &content).await {
                tracing::warn!(
                    "Send failed (session {session_id}, conversation {conversation_id}): {e}"
                );

                let rejection = ServerMessage::SendRejected {
                    conversation_id,
                    reason: reject_reason(&e),
                    message: e.to_string(),
                    content,
                };
                if let Ok(json) = serde_json::to_string(&rejection) {
                    let _ = tx.send(json);
                }
            }
        });
    }

    /// Fire-and-forget seen flip; a failure only costs a redundant
    /// retry later, so it logs and moves on.
    fn spawn_mark_seen(&self, user_id: Uuid, conversation_id: String) {
        let Some(service) = self.message_service.clone() else {
            return;
        };

        actix_web::rt::spawn(async move {
            if let Err(e) = service.mark_seen(user_id, &conversation_id).await {
                tracing::warn!("Seen flip failed for conversation {conversation_id}: {e}");
            }
        });
    }
}

/// Maps a send failure onto the client-facing rejection taxonomy.
fn reject_reason(e: &error::SystemError) -> RejectReason {
    match e {
        error::SystemError::Forbidden(_) => RejectReason::Permission,
        e if e.is_transient() => RejectReason::Transient,
        _ => RejectReason::Validation,
    }
}

impl Actor for WsSession {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::debug!("Session started: {}", self.id);
        self.server.do_send(Connect { id: self.id, addr: ctx.address() });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::debug!("Session stopped: {}", self.id);
        self.server.do_send(Disconnect { id: self.id });
    }
}

impl Message for ClientMessage {
    type Result = ();
}

impl Handler<ClientMessage> for WsSession {
    type Result = ();

    fn handle(&mut self, msg: ClientMessage, ctx: &mut Context<Self>) {
        self.handle_client_message(msg, ctx);
    }
}

/// Outbound path from the server actor. A new message addressed to this
/// session's user, in the conversation they are looking at, is flipped
/// seen on delivery before being forwarded.
impl Handler<ServerMessage> for WsSession {
    type Result = ();

    fn handle(&mut self, msg: ServerMessage, _ctx: &mut Context<Self>) {
        if let ServerMessage::NewMessage { conversation_id, message } = &msg {
            let addressed_here = self.user_id == Some(message.receiver_id);
            let on_screen = self.open_conversation.as_deref() == Some(conversation_id.as_str());

            if addressed_here && on_screen {
                if let Some(user_id) = self.user_id {
                    self.spawn_mark_seen(user_id, conversation_id.clone());
                }
            }
        }

        self.send_to_client(&msg);
    }
}
