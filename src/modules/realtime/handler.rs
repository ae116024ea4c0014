//! HTTP upgrade endpoint and the bidirectional pump between the
//! WebSocket and the session actor:
//! - inbound: frame -> `ClientMessage` -> session actor mailbox
//! - outbound: session actor -> mpsc channel -> WebSocket

use actix::{Actor, Addr};
use actix_web::{Error, HttpRequest, HttpResponse, web};
use actix_ws::Message;
use tokio::sync::mpsc;

use crate::modules::message::handle::MessageSvc;

use super::message::ClientMessage;
use super::server::ChatServer;
use super::session::WsSession;

/// Prefix of a raw frame for log lines. Counts characters, not bytes;
/// slicing at a fixed byte index can land inside a multi-byte character
/// and panic.
fn truncate_for_log(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// GET /ws
pub async fn websocket_handler(
    req: HttpRequest,
    stream: web::Payload,
    server: web::Data<Addr<ChatServer>>,
    message_service: web::Data<MessageSvc>,
) -> Result<HttpResponse, Error> {
    tracing::debug!("WebSocket upgrade request from {:?}", req.peer_addr());

    let (response, mut ws_session, mut msg_stream) = actix_ws::handle(&req, stream)?;

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let addr = WsSession::new(server.get_ref().clone(), tx, message_service).start();

    actix_web::rt::spawn(async move {
        loop {
            tokio::select! {
                msg = msg_stream.recv() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            let text_str = text.to_string();

                            match serde_json::from_str::<ClientMessage>(&text_str) {
                                Ok(client_msg) => {
                                    addr.do_send(client_msg);
                                }
                                Err(e) => {
                                    tracing::warn!(
                                        "Unparseable client message: {} - raw: {}",
                                        e,
                                        truncate_for_log(&text_str, 100)
                                    );
                                }
                            }
                        }

                        Some(Ok(Message::Ping(data))) => {
                            if let Err(e) = ws_session.pong(&data).await {
                                tracing::error!("Failed to send pong: {}", e);
                                break;
                            }
                        }

                        Some(Ok(Message::Pong(_))) => {}

                        Some(Ok(Message::Close(reason))) => {
                            tracing::info!("WebSocket close frame: {:?}", reason);
                            break;
                        }

                        Some(Ok(Message::Binary(_))) => {
                            tracing::warn!("Binary messages are not supported");
                        }

                        Some(Ok(Message::Continuation(_) | Message::Nop)) => {}

                        Some(Err(e)) => {
                            tracing::error!("WebSocket protocol error: {}", e);
                            break;
                        }

                        None => break,
                    }
                }

                Some(json) = rx.recv() => {
                    if ws_session.text(json).await.is_err() {
                        tracing::error!("Failed to write to WebSocket client");
                        break;
                    }
                }
            }
        }

        let _ = ws_session.close(None).await;
        tracing::debug!("WebSocket message loop ended");
    });

    tracing::info!("WebSocket connection established");
    Ok(response)
}
