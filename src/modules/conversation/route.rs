use actix_web::web::{ServiceConfig, scope};

use crate::modules::conversation::handle::*;
use crate::modules::message::handle::{delete_message, get_messages, mark_seen, send_message};

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/conversations")
            .service(resolve_conversation)
            .service(get_messages)
            .service(send_message)
            .service(mark_seen)
            .service(delete_message),
    );
}
